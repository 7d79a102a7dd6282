//! Layout styles for the page snapshot.
//!
//! Survey pages hide options with class rules from their own `<style>`
//! blocks (`.ls-hidden`), inline `display:none`, the `hidden` attribute or
//! explicit zero sizes, so only the properties that decide whether an
//! element ends up with a box are computed here.

pub mod selector;

use crate::dom::{DomNode, NodeType};
use selector::{parse_stylesheet, CssRule, Matchable};

/// Computed layout styles for a single element.
#[derive(Debug, Clone)]
pub struct LayoutStyle {
    pub display: Display,

    pub width: Dimension,
    pub height: Dimension,
    pub min_width: Dimension,
    pub min_height: Dimension,
    pub max_width: Dimension,
    pub max_height: Dimension,
    pub margin: Edges,
    pub padding: Edges,

    pub position: Position,

    pub font_size: f32,
    pub line_height: f32,

    pub overflow: Overflow,
}

impl Default for LayoutStyle {
    fn default() -> Self {
        Self {
            display: Display::Block,
            width: Dimension::Auto,
            height: Dimension::Auto,
            min_width: Dimension::Auto,
            min_height: Dimension::Auto,
            max_width: Dimension::Auto,
            max_height: Dimension::Auto,
            margin: Edges::zero(),
            padding: Edges::zero(),
            position: Position::Static,
            font_size: 16.0,
            line_height: 1.2,
            overflow: Overflow::Visible,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Display {
    Block,
    Inline,
    InlineBlock,
    Flex,
    InlineFlex,
    Grid,
    None,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Dimension {
    Px(f32),
    Percent(f32),
    Auto,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edges {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Edges {
    pub fn zero() -> Self {
        Self {
            top: 0.0,
            right: 0.0,
            bottom: 0.0,
            left: 0.0,
        }
    }

    fn uniform(v: f32) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Position {
    Static,
    Relative,
    Absolute,
    Fixed,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Overflow {
    Visible,
    Hidden,
    Scroll,
    Auto,
}

/// A DOM node with computed layout styles.
#[derive(Debug, Clone)]
pub struct StyledNode {
    pub tag: String,
    pub attributes: std::collections::HashMap<String, String>,
    pub text: String,
    pub node_type: NodeType,
    pub style: LayoutStyle,
    pub children: Vec<StyledNode>,
}

/// Cascade for every node: tag defaults, presentational `width`/`height`
/// attributes, the page's `<style>` rules by ascending specificity (source
/// order breaks ties), inline `style`, then the `hidden` attribute.
pub fn compute_styles(dom: &DomNode) -> StyledNode {
    let mut rules = Vec::new();
    collect_stylesheets(dom, &mut rules);
    rules.sort_by_key(|rule| rule.selector.specificity);

    let mut ancestors = Vec::new();
    style_node(dom, &rules, &mut ancestors)
}

fn collect_stylesheets(node: &DomNode, rules: &mut Vec<CssRule>) {
    if node.tag == "style" {
        rules.extend(parse_stylesheet(&node.text));
    }
    for child in &node.children {
        collect_stylesheets(child, rules);
    }
}

/// A DOM element seen through the chain of nodes leading to it, so
/// selectors can walk up without parent links in the tree.
#[derive(Clone, Copy)]
struct DomPath<'a, 'n> {
    path: &'a [&'n DomNode],
}

impl Matchable for DomPath<'_, '_> {
    fn tag(&self) -> &str {
        self.path.last().map(|n| n.tag.as_str()).unwrap_or("")
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.path.last()?.get_attr(name)
    }

    fn parent_element(&self) -> Option<Self> {
        let (_, parents) = self.path.split_last()?;
        match parents.last() {
            Some(parent) if parent.node_type == NodeType::Element => Some(DomPath { path: parents }),
            _ => None,
        }
    }
}

fn style_node<'n>(
    node: &'n DomNode,
    rules: &[CssRule],
    ancestors: &mut Vec<&'n DomNode>,
) -> StyledNode {
    let mut style = default_style_for_tag(&node.tag);

    if node.tag == "input" {
        match node.get_attr("type").map(|t| t.to_ascii_lowercase()).as_deref() {
            Some("hidden") => style.display = Display::None,
            // Checkable inputs render as a 13px square
            Some("radio") | Some("checkbox") => {
                style.width = Dimension::Px(13.0);
                style.height = Dimension::Px(13.0);
            }
            _ => {}
        }
    }

    if let Some(w) = node.get_attr("width") {
        if let Some(dim) = parse_dimension_value(w) {
            style.width = dim;
        }
    }
    if let Some(h) = node.get_attr("height") {
        if let Some(dim) = parse_dimension_value(h) {
            style.height = dim;
        }
    }

    ancestors.push(node);
    if node.node_type == NodeType::Element && !rules.is_empty() {
        let element = DomPath { path: ancestors.as_slice() };
        for rule in rules.iter().filter(|r| r.selector.matches(&element)) {
            apply_declarations(&rule.declarations, &mut style);
        }
    }

    if let Some(inline) = node.get_attr("style") {
        apply_declarations(inline, &mut style);
    }

    if node.attributes.contains_key("hidden") {
        style.display = Display::None;
    }

    let children = node
        .children
        .iter()
        .map(|child| style_node(child, rules, ancestors))
        .collect();
    ancestors.pop();

    StyledNode {
        tag: node.tag.clone(),
        attributes: node.attributes.clone(),
        text: node.text.clone(),
        node_type: node.node_type.clone(),
        style,
        children,
    }
}

/// Default layout styles based on HTML tag.
fn default_style_for_tag(tag: &str) -> LayoutStyle {
    let mut style = LayoutStyle::default();

    match tag {
        "a" | "span" | "strong" | "em" | "b" | "i" | "u" | "small" | "sub" | "sup" | "label"
        | "abbr" | "code" | "mark" | "q" | "s" | "time" => {
            style.display = Display::Inline;
        }

        "button" | "select" | "textarea" => {
            style.display = Display::InlineBlock;
        }

        "input" => {
            style.display = Display::InlineBlock;
            style.width = Dimension::Px(173.0);
            style.height = Dimension::Px(21.0);
        }

        "head" | "meta" | "link" | "title" | "script" | "style" | "noscript" | "template" => {
            style.display = Display::None;
        }

        "body" => {
            style.display = Display::Block;
            style.margin = Edges::uniform(8.0);
        }

        _ => {
            style.display = Display::Block;
        }
    }

    style
}

/// Apply a `property: value; ...` block, from a rule or an inline `style`.
fn apply_declarations(style_str: &str, style: &mut LayoutStyle) {
    for declaration in style_str.split(';') {
        let declaration = declaration.trim();
        if declaration.is_empty() {
            continue;
        }
        let mut parts = declaration.splitn(2, ':');
        let property = match parts.next() {
            Some(p) => p.trim().to_lowercase(),
            None => continue,
        };
        let value = match parts.next() {
            Some(v) => v.trim().trim_end_matches("!important").trim(),
            None => continue,
        };

        match property.as_str() {
            "display" => {
                style.display = match value {
                    "none" => Display::None,
                    "inline" => Display::Inline,
                    "inline-block" => Display::InlineBlock,
                    "flex" => Display::Flex,
                    "inline-flex" => Display::InlineFlex,
                    "grid" => Display::Grid,
                    _ => Display::Block,
                };
            }
            "position" => {
                style.position = match value {
                    "relative" => Position::Relative,
                    "absolute" => Position::Absolute,
                    "fixed" => Position::Fixed,
                    _ => Position::Static,
                };
            }
            "width" => {
                if let Some(dim) = parse_dimension_value(value) {
                    style.width = dim;
                }
            }
            "height" => {
                if let Some(dim) = parse_dimension_value(value) {
                    style.height = dim;
                }
            }
            "min-width" => {
                if let Some(dim) = parse_dimension_value(value) {
                    style.min_width = dim;
                }
            }
            "min-height" => {
                if let Some(dim) = parse_dimension_value(value) {
                    style.min_height = dim;
                }
            }
            "max-width" => {
                if let Some(dim) = parse_dimension_value(value) {
                    style.max_width = dim;
                }
            }
            "max-height" => {
                if let Some(dim) = parse_dimension_value(value) {
                    style.max_height = dim;
                }
            }
            "margin" => {
                style.margin = parse_edges(value);
            }
            "padding" => {
                style.padding = parse_edges(value);
            }
            "font-size" => {
                if let Some(v) = parse_px(value) {
                    style.font_size = v;
                }
            }
            "line-height" => {
                if let Ok(v) = value.parse::<f32>() {
                    style.line_height = v;
                } else if let Some(v) = parse_px(value) {
                    style.line_height = v / style.font_size;
                }
            }
            "overflow" => {
                style.overflow = match value {
                    "hidden" => Overflow::Hidden,
                    "scroll" => Overflow::Scroll,
                    "auto" => Overflow::Auto,
                    _ => Overflow::Visible,
                };
            }
            _ => {}
        }
    }
}

fn parse_dimension_value(value: &str) -> Option<Dimension> {
    let value = value.trim();
    if value == "auto" {
        return Some(Dimension::Auto);
    }
    if value.ends_with('%') {
        let num = value.trim_end_matches('%').trim().parse::<f32>().ok()?;
        return Some(Dimension::Percent(num / 100.0));
    }
    if let Some(px) = parse_px(value) {
        return Some(Dimension::Px(px));
    }
    value.parse::<f32>().ok().map(Dimension::Px)
}

fn parse_px(value: &str) -> Option<f32> {
    let value = value.trim();
    if value == "0" {
        return Some(0.0);
    }
    if let Some(px) = value.strip_suffix("px") {
        return px.trim().parse().ok();
    }
    // 1em = 1rem = 16px
    if let Some(rem) = value.strip_suffix("rem") {
        return rem.trim().parse::<f32>().ok().map(|v| v * 16.0);
    }
    if let Some(em) = value.strip_suffix("em") {
        return em.trim().parse::<f32>().ok().map(|v| v * 16.0);
    }
    None
}

fn parse_edges(value: &str) -> Edges {
    let parts: Vec<f32> = value.split_whitespace().filter_map(parse_px).collect();

    match parts.len() {
        1 => Edges::uniform(parts[0]),
        2 => Edges {
            top: parts[0],
            right: parts[1],
            bottom: parts[0],
            left: parts[1],
        },
        3 => Edges {
            top: parts[0],
            right: parts[1],
            bottom: parts[2],
            left: parts[1],
        },
        4 => Edges {
            top: parts[0],
            right: parts[1],
            bottom: parts[2],
            left: parts[3],
        },
        _ => Edges::zero(),
    }
}
