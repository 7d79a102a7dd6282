//! The page snapshot the helper works on.
//!
//! A parsed, styled and laid-out survey page flattened into an arena. Every
//! element keeps its parent link for selector matching, its layout bounds for
//! the hidden test, and the editable widget state (checked, selected, value)
//! that answering a question mutates.

use crate::css::selector::{parse_selector_list, Matchable, Selector};
use crate::dom::NodeType;
use crate::error::HelperError;
use crate::layout::Bounds;
use std::collections::HashMap;

/// Index of an element in the page arena. The document node is 0.
pub type ElementId = usize;

#[derive(Debug, Clone)]
pub struct Element {
    pub tag: String,
    pub attributes: HashMap<String, String>,
    pub text: String,
    pub node_type: NodeType,
    pub parent: Option<ElementId>,
    pub children: Vec<ElementId>,
    /// One past the last descendant; descendants occupy `id + 1..subtree_end`.
    pub subtree_end: ElementId,
    pub bounds: Bounds,
    pub checked: bool,
    pub selected: bool,
    pub value: String,
}

impl Element {
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(|s| s.as_str())
    }

    pub fn is_element(&self) -> bool {
        self.node_type == NodeType::Element
    }

    fn input_type(&self) -> String {
        self.get_attr("type").unwrap_or("text").to_ascii_lowercase()
    }

    fn is_checkable(&self) -> bool {
        self.tag == "input" && matches!(self.input_type().as_str(), "radio" | "checkbox")
    }
}

/// A parsed survey page with mutable widget state.
#[derive(Debug, Clone)]
pub struct Page {
    elements: Vec<Element>,
}

/// Borrowed view of one element, used for selector matching.
#[derive(Debug, Clone, Copy)]
pub struct ElementRef<'a> {
    page: &'a Page,
    id: ElementId,
}

impl<'a> ElementRef<'a> {
    pub fn id(&self) -> ElementId {
        self.id
    }
}

impl Matchable for ElementRef<'_> {
    fn tag(&self) -> &str {
        &self.page.elements[self.id].tag
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.page.elements[self.id].get_attr(name)
    }

    fn parent_element(&self) -> Option<Self> {
        let parent = self.page.elements[self.id].parent?;
        if self.page.elements[parent].is_element() {
            Some(ElementRef {
                page: self.page,
                id: parent,
            })
        } else {
            None
        }
    }
}

impl Page {
    /// Parse, style and lay out an HTML document.
    pub fn parse(html: &str, viewport_width: f32, viewport_height: f32) -> Result<Self, HelperError> {
        let dom_tree = crate::dom::parse_html(html)?;
        let styled = crate::css::compute_styles(&dom_tree);
        let bounds = crate::layout::compute_bounds(&styled, viewport_width, viewport_height)?;
        Ok(Self::from_styled(&styled, bounds))
    }

    /// Flatten a styled tree in pre-order; `bounds` must come from
    /// `layout::compute_bounds` over the same tree.
    pub fn from_styled(root: &crate::css::StyledNode, bounds: Vec<Bounds>) -> Self {
        let mut page = Page {
            elements: Vec::with_capacity(bounds.len()),
        };
        let mut bounds = bounds.into_iter();
        page.push_node(root, None, &mut bounds);
        page.init_select_state();
        page
    }

    fn push_node(
        &mut self,
        node: &crate::css::StyledNode,
        parent: Option<ElementId>,
        bounds: &mut impl Iterator<Item = Bounds>,
    ) -> ElementId {
        let id = self.elements.len();
        let checked = node.attributes.contains_key("checked");
        let selected = node.attributes.contains_key("selected");
        let value = node.attributes.get("value").cloned().unwrap_or_default();

        self.elements.push(Element {
            tag: node.tag.clone(),
            attributes: node.attributes.clone(),
            text: node.text.clone(),
            node_type: node.node_type.clone(),
            parent,
            children: Vec::new(),
            subtree_end: id + 1,
            bounds: bounds.next().unwrap_or_default(),
            checked,
            selected,
            value,
        });

        for child in &node.children {
            let child_id = self.push_node(child, Some(id), bounds);
            self.elements[id].children.push(child_id);
        }
        self.elements[id].subtree_end = self.elements.len();

        if self.elements[id].tag == "textarea" && !self.elements[id].attributes.contains_key("value") {
            self.elements[id].value = self.text_content(id);
        }
        id
    }

    /// A single-select shows its first option when none is marked selected.
    fn init_select_state(&mut self) {
        for select in self.query_all("select") {
            if self.attr(select, "multiple").is_some() {
                continue;
            }
            let options = self.options(select);
            if !options.iter().any(|&o| self.elements[o].selected) {
                if let Some(&first) = options.first() {
                    self.elements[first].selected = true;
                }
            }
        }
    }

    pub fn root(&self) -> ElementId {
        0
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn element(&self, id: ElementId) -> ElementRef<'_> {
        ElementRef { page: self, id }
    }

    // --- Queries ---

    /// First element in document order matching the selector list.
    pub fn query(&self, selector: &str) -> Option<ElementId> {
        self.query_within(self.root(), selector)
    }

    pub fn query_all(&self, selector: &str) -> Vec<ElementId> {
        self.query_all_within(self.root(), selector)
    }

    /// First descendant of `scope` matching the selector. As with
    /// `Element.querySelector`, ancestors outside the scope still count for
    /// combinators.
    pub fn query_within(&self, scope: ElementId, selector: &str) -> Option<ElementId> {
        let selectors = parse_selector_list(selector);
        self.descendants(scope)
            .find(|&id| self.matches_any(&selectors, id))
    }

    pub fn query_all_within(&self, scope: ElementId, selector: &str) -> Vec<ElementId> {
        let selectors = parse_selector_list(selector);
        self.descendants(scope)
            .filter(|&id| self.matches_any(&selectors, id))
            .collect()
    }

    /// The element itself or its nearest ancestor matching the selector.
    pub fn closest(&self, id: ElementId, selector: &str) -> Option<ElementId> {
        let selectors = parse_selector_list(selector);
        let mut current = Some(id);
        while let Some(candidate) = current {
            if self.matches_any(&selectors, candidate) {
                return Some(candidate);
            }
            current = self.elements.get(candidate).and_then(|e| e.parent);
        }
        None
    }

    fn descendants(&self, scope: ElementId) -> impl Iterator<Item = ElementId> + '_ {
        let end = self.elements.get(scope).map(|e| e.subtree_end).unwrap_or(scope);
        (scope + 1..end).filter(move |&id| self.elements[id].is_element())
    }

    fn matches_any(&self, selectors: &[Selector], id: ElementId) -> bool {
        if !self.elements[id].is_element() {
            return false;
        }
        let el = self.element(id);
        selectors.iter().any(|s| s.matches(&el))
    }

    // --- Element properties ---

    pub fn attr(&self, id: ElementId, name: &str) -> Option<&str> {
        self.elements.get(id).and_then(|e| e.get_attr(name))
    }

    /// `data-<name>` attribute, the `dataset[name]` of a browser element.
    pub fn dataset(&self, id: ElementId, name: &str) -> Option<&str> {
        self.attr(id, &format!("data-{}", name))
    }

    pub fn tag(&self, id: ElementId) -> &str {
        self.elements.get(id).map(|e| e.tag.as_str()).unwrap_or("")
    }

    pub fn classes(&self, id: ElementId) -> Vec<&str> {
        self.attr(id, "class")
            .map(|c| c.split_whitespace().collect())
            .unwrap_or_default()
    }

    pub fn has_class(&self, id: ElementId, class: &str) -> bool {
        self.classes(id).contains(&class)
    }

    /// Text of the element and its descendants, whitespace collapsed.
    pub fn text_content(&self, id: ElementId) -> String {
        self.collect_text(id, false)
    }

    /// Like [`Page::text_content`], but text without a rendered box
    /// (under `display:none`, zero-sized parents) is left out.
    pub fn visible_text(&self, id: ElementId) -> String {
        self.collect_text(id, true)
    }

    fn collect_text(&self, id: ElementId, visible_only: bool) -> String {
        let Some(el) = self.elements.get(id) else {
            return String::new();
        };
        let mut out = String::new();
        for node in &self.elements[id..el.subtree_end] {
            if node.node_type != NodeType::Text || (visible_only && node.bounds.is_empty()) {
                continue;
            }
            let t = node.text.trim();
            if !t.is_empty() {
                if !out.is_empty() && !out.ends_with(' ') {
                    out.push(' ');
                }
                out.push_str(t);
            }
        }
        out
    }

    /// Whether the element has no rendered box (zero width or height).
    pub fn is_hidden(&self, id: ElementId) -> bool {
        self.elements
            .get(id)
            .map(|e| e.bounds.is_empty())
            .unwrap_or(true)
    }

    pub fn bounds(&self, id: ElementId) -> Option<&Bounds> {
        self.elements.get(id).map(|e| &e.bounds)
    }

    // --- Widget state ---

    pub fn is_checked(&self, id: ElementId) -> bool {
        self.elements.get(id).map(|e| e.checked).unwrap_or(false)
    }

    /// Set the checked flag. Checking a radio unchecks the other radios of
    /// its `name` group.
    pub fn set_checked(&mut self, id: ElementId, checked: bool) {
        let Some(el) = self.elements.get(id) else {
            return;
        };
        if !el.is_checkable() {
            return;
        }
        if checked && el.input_type() == "radio" {
            if let Some(name) = el.get_attr("name").map(str::to_string) {
                for other in self.elements.iter_mut() {
                    if other.tag == "input"
                        && other.input_type() == "radio"
                        && other.get_attr("name") == Some(name.as_str())
                    {
                        other.checked = false;
                    }
                }
            }
        }
        self.elements[id].checked = checked;
    }

    pub fn value(&self, id: ElementId) -> &str {
        self.elements.get(id).map(|e| e.value.as_str()).unwrap_or("")
    }

    pub fn set_value(&mut self, id: ElementId, value: impl Into<String>) {
        if let Some(el) = self.elements.get_mut(id) {
            el.value = value.into();
        }
    }

    /// `<option>` elements of a select, in document order.
    pub fn options(&self, select: ElementId) -> Vec<ElementId> {
        self.query_all_within(select, "option")
    }

    /// The submitted value of an option: its `value` attribute, or its text.
    pub fn option_value(&self, option: ElementId) -> String {
        match self.attr(option, "value") {
            Some(v) => v.to_string(),
            None => self.text_content(option),
        }
    }

    pub fn is_selected(&self, id: ElementId) -> bool {
        self.elements.get(id).map(|e| e.selected).unwrap_or(false)
    }

    /// Select `option` in a single-select, clearing the other options.
    pub fn select_option(&mut self, select: ElementId, option: ElementId) {
        for other in self.options(select) {
            self.elements[other].selected = other == option;
        }
    }

    pub fn selected_option(&self, select: ElementId) -> Option<ElementId> {
        self.options(select).into_iter().find(|&o| self.is_selected(o))
    }

    /// Name/value pairs the current widget state would submit.
    pub fn form_values(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        for (id, el) in self.elements.iter().enumerate() {
            if !el.is_element() || el.attributes.contains_key("disabled") {
                continue;
            }
            let Some(name) = el.get_attr("name") else {
                continue;
            };
            match el.tag.as_str() {
                "input" => match el.input_type().as_str() {
                    "radio" | "checkbox" => {
                        if el.checked {
                            let val = if el.value.is_empty() { "on" } else { el.value.as_str() };
                            out.push((name.to_string(), val.to_string()));
                        }
                    }
                    "submit" | "button" | "reset" | "image" => {}
                    _ => out.push((name.to_string(), el.value.clone())),
                },
                "textarea" => out.push((name.to_string(), el.value.clone())),
                "select" => {
                    for option in self.options(id) {
                        if self.is_selected(option) {
                            out.push((name.to_string(), self.option_value(option)));
                        }
                    }
                }
                _ => {}
            }
        }
        out
    }
}
