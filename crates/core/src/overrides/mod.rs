//! Per-question `force` / `avoid` overrides.
//!
//! Survey authors drop marker elements into a page to steer the helper:
//!
//! ```html
//! <force data-force="Q1,A2|Q7,A1,A3"></force>
//! <avoid data-avoid="Q3,A9"></avoid>
//! ```
//!
//! Each payload is a `|`-separated list of groups; each group is a
//! comma-separated record whose first field is a question code and whose
//! remaining fields are raw option values. Tables are carried across page
//! loads for the rest of the session, so markers only need to appear once.

use crate::page::Page;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

const GROUP_DELIMITER: char = '|';
const FIELD_DELIMITER: char = ',';

/// The two recognized marker kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    Avoid,
    Force,
}

impl CommandKind {
    pub const ALL: [CommandKind; 2] = [CommandKind::Avoid, CommandKind::Force];

    /// Marker tag name, also the `data-*` attribute holding the payload.
    pub fn tag(&self) -> &'static str {
        match self {
            CommandKind::Avoid => "avoid",
            CommandKind::Force => "force",
        }
    }
}

/// Forced and avoided raw values, keyed by question code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideTable {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub avoid: BTreeMap<String, BTreeSet<String>>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub force: BTreeMap<String, Vec<String>>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Result of scanning a page for markers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScannedOverrides {
    pub table: OverrideTable,
    /// Whether any marker element was present at all.
    pub found: bool,
}

impl OverrideTable {
    pub fn is_empty(&self) -> bool {
        self.avoid.is_empty() && self.force.is_empty()
    }

    /// Combine a freshly scanned table with the one persisted earlier in the
    /// session. Codes present in `fresh` keep their fresh values; persisted
    /// codes only fill the gaps.
    pub fn merge(fresh: &OverrideTable, persisted: &OverrideTable) -> OverrideTable {
        let mut merged = fresh.clone();
        for (code, values) in &persisted.avoid {
            merged
                .avoid
                .entry(code.clone())
                .or_insert_with(|| values.clone());
        }
        for (code, values) in &persisted.force {
            merged
                .force
                .entry(code.clone())
                .or_insert_with(|| values.clone());
        }
        merged
    }

    /// Forced values for a question, `None` when there are none.
    pub fn lookup_forced(&self, question: &str) -> Option<&[String]> {
        self.force
            .get(question)
            .filter(|v| !v.is_empty())
            .map(|v| v.as_slice())
    }

    /// Avoided values for a question, `None` when there are none.
    pub fn lookup_avoided(&self, question: &str) -> Option<&BTreeSet<String>> {
        self.avoid.get(question).filter(|v| !v.is_empty())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

/// Parse one marker payload into `(code, values)` groups. Spaces are
/// stripped; groups without a question code are skipped.
pub fn parse_payload(payload: &str) -> Vec<(String, Vec<String>)> {
    let mut groups = Vec::new();
    for group in payload.split(GROUP_DELIMITER) {
        let compact: String = group.chars().filter(|c| !c.is_whitespace()).collect();
        let mut fields = compact.split(FIELD_DELIMITER).map(str::to_string);
        let code = fields.next().unwrap_or_default();
        if code.is_empty() {
            if !compact.is_empty() {
                warn!(group = %group, "override group without a question code, skipping");
            }
            continue;
        }
        let values: Vec<String> = fields.filter(|v| !v.is_empty()).collect();
        groups.push((code, values));
    }
    groups
}

/// Read every `force` / `avoid` marker on the page. When several markers of
/// the same kind exist the last one in document order wins.
pub fn scan_markers(page: &Page) -> ScannedOverrides {
    let mut scanned = ScannedOverrides::default();

    for kind in CommandKind::ALL {
        for marker in page.query_all(kind.tag()) {
            scanned.found = true;
            let payload = page.dataset(marker, kind.tag()).unwrap_or("");
            let groups = parse_payload(payload);
            debug!(kind = kind.tag(), groups = groups.len(), "override marker");

            match kind {
                CommandKind::Avoid => {
                    scanned.table.avoid = groups
                        .into_iter()
                        .map(|(code, values)| (code, values.into_iter().collect()))
                        .collect();
                }
                CommandKind::Force => {
                    scanned.table.force = groups.into_iter().collect();
                }
            }
        }
    }

    scanned
}
