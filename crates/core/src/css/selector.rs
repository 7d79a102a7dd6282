/// Minimal CSS selector engine used to query the page snapshot and to match
/// the page's own `<style>` rules.
/// Supports: tag, .class, #id, [attr] / [attr="v"], the descendant and child
/// combinators, and comma-separated selector lists.

/// One stylesheet rule. Selector lists are split, so every rule carries a
/// single selector and its specificity.
#[derive(Debug, Clone)]
pub struct CssRule {
    pub selector: Selector,
    /// Raw `property: value; ...` block.
    pub declarations: String,
}

/// A single selector (one part of a comma-separated list).
#[derive(Debug, Clone)]
pub struct Selector {
    pub parts: Vec<SelectorPart>,
    pub specificity: u32,
}

/// A component of a selector chain.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectorPart {
    /// Matches a tag name: `div`, `input`, etc.
    Tag(String),
    /// Matches a class: `.foo`
    Class(String),
    /// Matches an ID: `#bar`
    Id(String),
    /// Matches an attribute: `[type="radio"]`
    Attribute(String, Option<String>),
    /// Descendant combinator (space)
    Descendant,
    /// Child combinator (>)
    Child,
    /// Universal selector (*)
    Universal,
    /// Pseudo-class, never matches a static snapshot
    PseudoClass(String),
}

/// Something a selector can be matched against: an element that knows its
/// tag, its attributes and its parent element.
pub trait Matchable: Sized {
    fn tag(&self) -> &str;
    fn attr(&self, name: &str) -> Option<&str>;
    fn parent_element(&self) -> Option<Self>;

    fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|c| c.split_whitespace().any(|cl| cl == class))
            .unwrap_or(false)
    }
}

/// Parse the body of a `<style>` element. At-rules (`@media`, `@font-face`)
/// are skipped whole.
pub fn parse_stylesheet(css: &str) -> Vec<CssRule> {
    let css = strip_comments(css);
    let mut rules = Vec::new();
    let mut prelude = String::new();
    let mut chars = css.chars();

    while let Some(ch) = chars.next() {
        if ch != '{' {
            prelude.push(ch);
            continue;
        }

        let mut depth = 1;
        let mut block = String::new();
        for c in chars.by_ref() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                _ => {}
            }
            block.push(c);
        }

        let selectors = prelude.trim();
        if !selectors.is_empty() && !selectors.starts_with('@') {
            let declarations = block.trim();
            rules.extend(
                parse_selector_list(selectors)
                    .into_iter()
                    .map(|selector| CssRule {
                        selector,
                        declarations: declarations.to_string(),
                    }),
            );
        }
        prelude.clear();
    }

    rules
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        rest = match rest[start + 2..].find("*/") {
            Some(end) => &rest[start + 2 + end + 2..],
            None => "",
        };
    }
    out.push_str(rest);
    out
}

/// Parse a comma-separated selector list. Unparseable entries are dropped.
pub fn parse_selector_list(input: &str) -> Vec<Selector> {
    input.split(',').filter_map(parse_selector).collect()
}

/// Parse a single selector string into a Selector.
pub fn parse_selector(input: &str) -> Option<Selector> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let mut parts = Vec::new();
    let mut specificity: u32 = 0;
    let mut current = String::new();
    let mut chars = input.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            '.' => {
                flush_tag(&mut current, &mut parts, &mut specificity);
                chars.next();
                let class_name = read_ident(&mut chars);
                if !class_name.is_empty() {
                    parts.push(SelectorPart::Class(class_name));
                    specificity += 10;
                }
            }
            '#' => {
                flush_tag(&mut current, &mut parts, &mut specificity);
                chars.next();
                let id_name = read_ident(&mut chars);
                if !id_name.is_empty() {
                    parts.push(SelectorPart::Id(id_name));
                    specificity += 100;
                }
            }
            '[' => {
                flush_tag(&mut current, &mut parts, &mut specificity);
                chars.next();
                let mut attr = String::new();
                let mut value = None;
                while let Some(&c) = chars.peek() {
                    if c == ']' {
                        chars.next();
                        break;
                    }
                    if c == '=' {
                        chars.next();
                        value = Some(read_attr_value(&mut chars));
                    } else {
                        attr.push(c);
                        chars.next();
                    }
                }
                parts.push(SelectorPart::Attribute(attr.trim().to_lowercase(), value));
                specificity += 10;
            }
            ':' => {
                flush_tag(&mut current, &mut parts, &mut specificity);
                chars.next();
                if chars.peek() == Some(&':') {
                    chars.next();
                }
                let pseudo = read_ident(&mut chars);
                if chars.peek() == Some(&'(') {
                    chars.next();
                    let mut depth = 1;
                    while let Some(&c) = chars.peek() {
                        chars.next();
                        if c == '(' {
                            depth += 1;
                        } else if c == ')' {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                    }
                }
                parts.push(SelectorPart::PseudoClass(pseudo));
                specificity += 10;
            }
            '>' => {
                flush_tag(&mut current, &mut parts, &mut specificity);
                chars.next();
                skip_whitespace(&mut chars);
                parts.push(SelectorPart::Child);
            }
            ' ' | '\t' | '\n' | '\r' => {
                flush_tag(&mut current, &mut parts, &mut specificity);
                chars.next();
                skip_whitespace(&mut chars);
                if let Some(&next) = chars.peek() {
                    if next != '>' {
                        parts.push(SelectorPart::Descendant);
                    }
                }
            }
            '*' => {
                flush_tag(&mut current, &mut parts, &mut specificity);
                chars.next();
                parts.push(SelectorPart::Universal);
            }
            _ => {
                current.push(ch);
                chars.next();
            }
        }
    }

    flush_tag(&mut current, &mut parts, &mut specificity);

    if parts.is_empty() {
        None
    } else {
        Some(Selector { parts, specificity })
    }
}

fn flush_tag(current: &mut String, parts: &mut Vec<SelectorPart>, specificity: &mut u32) {
    let tag = current.trim().to_string();
    if !tag.is_empty() {
        parts.push(SelectorPart::Tag(tag.to_lowercase()));
        *specificity += 1;
        current.clear();
    }
}

fn read_ident(chars: &mut std::iter::Peekable<std::str::Chars>) -> String {
    let mut name = String::new();
    while let Some(&c) = chars.peek() {
        if c.is_alphanumeric() || c == '-' || c == '_' {
            name.push(c);
            chars.next();
        } else {
            break;
        }
    }
    name
}

fn read_attr_value(chars: &mut std::iter::Peekable<std::str::Chars>) -> String {
    let mut val = String::new();
    match chars.peek().copied() {
        Some(quote @ ('"' | '\'')) => {
            chars.next();
            while let Some(&vc) = chars.peek() {
                chars.next();
                if vc == quote {
                    break;
                }
                val.push(vc);
            }
        }
        _ => {
            while let Some(&vc) = chars.peek() {
                if vc == ']' {
                    break;
                }
                val.push(vc);
                chars.next();
            }
        }
    }
    val
}

fn skip_whitespace(chars: &mut std::iter::Peekable<std::str::Chars>) {
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else {
            break;
        }
    }
}

impl Selector {
    /// Check whether the selector matches `element`, walking its ancestors
    /// for the combinators. Descendant combinators backtrack, so
    /// `div.a div.b > input` matches whatever nesting the page uses.
    pub fn matches<E: Matchable>(&self, element: &E) -> bool {
        let segments = self.segments();
        if segments.is_empty() {
            return false;
        }
        matches_segment(&segments, segments.len() - 1, element)
    }

    /// Split into compound segments. Each segment carries the combinator that
    /// links it to the segment on its left.
    fn segments(&self) -> Vec<(Vec<&SelectorPart>, Option<&SelectorPart>)> {
        let mut segments = Vec::new();
        let mut current: Vec<&SelectorPart> = Vec::new();
        let mut pending: Option<&SelectorPart> = None;

        for part in &self.parts {
            match part {
                SelectorPart::Descendant | SelectorPart::Child => {
                    if !current.is_empty() {
                        segments.push((std::mem::take(&mut current), pending));
                    }
                    pending = Some(part);
                }
                _ => current.push(part),
            }
        }
        if !current.is_empty() {
            segments.push((current, pending));
        }
        segments
    }
}

fn matches_segment<E: Matchable>(
    segments: &[(Vec<&SelectorPart>, Option<&SelectorPart>)],
    idx: usize,
    element: &E,
) -> bool {
    let (compound, combinator) = &segments[idx];
    if !compound_matches(compound, element) {
        return false;
    }
    if idx == 0 {
        return true;
    }

    match combinator {
        Some(SelectorPart::Child) => element
            .parent_element()
            .map(|parent| matches_segment(segments, idx - 1, &parent))
            .unwrap_or(false),
        _ => {
            let mut ancestor = element.parent_element();
            while let Some(candidate) = ancestor {
                if matches_segment(segments, idx - 1, &candidate) {
                    return true;
                }
                ancestor = candidate.parent_element();
            }
            false
        }
    }
}

fn compound_matches<E: Matchable>(compound: &[&SelectorPart], element: &E) -> bool {
    compound.iter().all(|part| match part {
        SelectorPart::Tag(t) => element.tag().eq_ignore_ascii_case(t),
        SelectorPart::Class(c) => element.has_class(c),
        SelectorPart::Id(i) => element.attr("id") == Some(i.as_str()),
        SelectorPart::Attribute(name, expected) => match expected {
            Some(val) => element.attr(name) == Some(val.as_str()),
            None => element.attr(name).is_some(),
        },
        SelectorPart::Universal => true,
        SelectorPart::PseudoClass(_) => false,
        SelectorPart::Descendant | SelectorPart::Child => true,
    })
}
