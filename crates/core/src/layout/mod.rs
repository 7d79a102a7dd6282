use crate::css;
use crate::css::StyledNode;
use crate::dom::NodeType;
use crate::error::HelperError;
use taffy::prelude::*;

/// Border box of a node in page coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    /// The `offsetWidth == 0 || offsetHeight == 0` test a browser script
    /// would use to decide an option is not shown.
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

/// Compute bounds for every node of the styled tree, in pre-order.
///
/// Nodes that do not get their own taffy node (children of a `display:none`
/// subtree, text under a text-only element) inherit the bounds of the
/// closest ancestor that has one.
pub fn compute_bounds(
    root: &StyledNode,
    viewport_width: f32,
    viewport_height: f32,
) -> Result<Vec<Bounds>, HelperError> {
    let mut tree: TaffyTree<()> = TaffyTree::new();

    let root_taffy = build_taffy_tree(&mut tree, root, viewport_width)?;

    tree.compute_layout(
        root_taffy,
        Size {
            width: AvailableSpace::Definite(viewport_width),
            height: AvailableSpace::Definite(viewport_height),
        },
    )
    .map_err(|e| HelperError::Layout(e.to_string()))?;

    let mut out = Vec::new();
    extract_bounds(&tree, Some(root_taffy), root, 0.0, 0.0, &Bounds::default(), &mut out)?;
    Ok(out)
}

fn build_taffy_tree(
    tree: &mut TaffyTree<()>,
    node: &StyledNode,
    parent_width: f32,
) -> Result<NodeId, HelperError> {
    // display:none subtrees collapse to a single empty leaf
    if node.style.display == css::Display::None {
        let taffy_style = Style {
            display: Display::None,
            ..Default::default()
        };
        return tree.new_leaf(taffy_style).map_err(layout_err);
    }

    let taffy_style = to_taffy_style(&node.style);

    if node.children.is_empty() && node.node_type == NodeType::Text {
        // Text node: estimate size from character count
        let text_len = node.text.trim().chars().count() as f32;
        let char_width = node.style.font_size * 0.6;
        let text_width = text_len * char_width;
        let text_height = node.style.font_size * node.style.line_height;

        let mut style = taffy_style;
        style.min_size.width = Dimension::Length(text_width.min(parent_width));
        style.size.height = Dimension::Length(text_height);

        return tree.new_leaf(style).map_err(layout_err);
    }

    if is_text_only(node) {
        let text_len = collect_direct_text(node).chars().count() as f32;
        let char_width = node.style.font_size * 0.6;
        let text_width = text_len * char_width;
        let text_height = node.style.font_size * node.style.line_height;

        let mut style = taffy_style;
        if matches!(style.size.width, Dimension::Auto) {
            style.min_size.width = Dimension::Length(text_width.min(parent_width));
        }
        if matches!(style.size.height, Dimension::Auto) {
            style.min_size.height = Dimension::Length(text_height);
        }

        return tree.new_leaf(style).map_err(layout_err);
    }

    let child_ids = node
        .children
        .iter()
        .map(|c| build_taffy_tree(tree, c, parent_width))
        .collect::<Result<Vec<NodeId>, HelperError>>()?;

    tree.new_with_children(taffy_style, &child_ids)
        .map_err(layout_err)
}

/// Elements whose only children are text become a single measured leaf.
fn is_text_only(node: &StyledNode) -> bool {
    node.node_type == NodeType::Element
        && !node.children.is_empty()
        && node.children.iter().all(|c| c.node_type == NodeType::Text)
}

fn collect_direct_text(node: &StyledNode) -> String {
    let mut result = String::new();
    for child in &node.children {
        if child.node_type == NodeType::Text {
            let t = child.text.trim();
            if !t.is_empty() {
                if !result.is_empty() {
                    result.push(' ');
                }
                result.push_str(t);
            }
        }
    }
    result
}

fn layout_err(e: taffy::TaffyError) -> HelperError {
    HelperError::Layout(e.to_string())
}

fn to_taffy_style(style: &css::LayoutStyle) -> Style {
    Style {
        display: match style.display {
            css::Display::Block => Display::Block,
            css::Display::Flex | css::Display::InlineFlex => Display::Flex,
            css::Display::Grid => Display::Grid,
            css::Display::None => Display::None,
            // Inline and InlineBlock approximated as Flex for taffy
            css::Display::Inline | css::Display::InlineBlock => Display::Flex,
        },
        position: match style.position {
            css::Position::Relative | css::Position::Static => Position::Relative,
            css::Position::Absolute | css::Position::Fixed => Position::Absolute,
        },
        size: Size {
            width: to_taffy_dim(&style.width),
            height: to_taffy_dim(&style.height),
        },
        min_size: Size {
            width: to_taffy_dim(&style.min_width),
            height: to_taffy_dim(&style.min_height),
        },
        max_size: Size {
            width: to_taffy_dim(&style.max_width),
            height: to_taffy_dim(&style.max_height),
        },
        margin: Rect {
            top: LengthPercentageAuto::Length(style.margin.top),
            right: LengthPercentageAuto::Length(style.margin.right),
            bottom: LengthPercentageAuto::Length(style.margin.bottom),
            left: LengthPercentageAuto::Length(style.margin.left),
        },
        padding: Rect {
            top: LengthPercentage::Length(style.padding.top),
            right: LengthPercentage::Length(style.padding.right),
            bottom: LengthPercentage::Length(style.padding.bottom),
            left: LengthPercentage::Length(style.padding.left),
        },
        overflow: taffy::Point {
            x: to_taffy_overflow(&style.overflow),
            y: to_taffy_overflow(&style.overflow),
        },
        ..Default::default()
    }
}

fn to_taffy_dim(dim: &css::Dimension) -> Dimension {
    match dim {
        css::Dimension::Px(v) => Dimension::Length(*v),
        css::Dimension::Percent(v) => Dimension::Percent(*v),
        css::Dimension::Auto => Dimension::Auto,
    }
}

fn to_taffy_overflow(overflow: &css::Overflow) -> taffy::Overflow {
    match overflow {
        css::Overflow::Hidden => taffy::Overflow::Hidden,
        css::Overflow::Scroll => taffy::Overflow::Scroll,
        _ => taffy::Overflow::Visible,
    }
}

fn extract_bounds(
    tree: &TaffyTree<()>,
    node_id: Option<NodeId>,
    styled: &StyledNode,
    parent_x: f32,
    parent_y: f32,
    inherited: &Bounds,
    out: &mut Vec<Bounds>,
) -> Result<(), HelperError> {
    let bounds = match node_id {
        Some(id) => {
            let layout = tree.layout(id).map_err(layout_err)?;
            Bounds {
                x: parent_x + layout.location.x,
                y: parent_y + layout.location.y,
                width: layout.size.width,
                height: layout.size.height,
            }
        }
        None => inherited.clone(),
    };
    out.push(bounds.clone());

    let taffy_children: Vec<NodeId> = match node_id {
        Some(id) => tree.children(id).map_err(layout_err)?,
        None => Vec::new(),
    };

    for (i, child) in styled.children.iter().enumerate() {
        let child_id = taffy_children.get(i).copied();
        extract_bounds(tree, child_id, child, bounds.x, bounds.y, &bounds, out)?;
    }
    Ok(())
}
