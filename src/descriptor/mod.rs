//! Stream descriptor metadata
//!
//! Recorders attach a free-form metadata tree to every stream (manufacturer,
//! per-channel labels and units, ...). Generic readers hand that tree over as
//! a mapping of `key -> list of values`, which cannot tell "one value" apart
//! from "the only instance of a repeatable element". This module resolves
//! the ambiguity once, up front:
//!
//! - [`RawNode`] - the generic tree as parsed, source order and duplicate
//!   keys preserved
//! - [`DescriptorEntry`] - the tagged form produced by [`classify`]: a scalar
//!   leaf, a group of scalars, or a group of repeated groups
//! - [`DescriptorTree`] - the metadata tree attached to an output channel
//!   declaration
//! - [`reconstruct`] - rebuilds a [`DescriptorTree`] branch from a raw tree
//!
//! # Example
//!
//! ```ignore
//! // {"manufacturer": ["BioSemi"],
//! //  "channels": [{"channel": [{"label": ["C3"]}, {"label": ["C4"]}]}]}
//! let mut tree = DescriptorTree::new();
//! let issues = reconstruct(&raw, &mut tree, tree.root());
//! assert!(issues.is_empty());
//! ```

pub mod reconstruct;
pub mod tree;

pub use reconstruct::reconstruct;
pub use tree::{DescriptorTree, GroupId, NodeRef};

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Generic descriptor tree as produced by a recording reader
///
/// Every mapping value is a list, mirroring how XML-derived readers expose
/// elements that may repeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawNode {
    /// Text content
    Scalar(String),
    /// Child elements in source order; keys may repeat
    Mapping(Vec<(String, Vec<RawNode>)>),
}

impl Default for RawNode {
    fn default() -> Self {
        RawNode::Mapping(Vec::new())
    }
}

impl RawNode {
    /// Create a scalar node
    pub fn scalar(value: impl Into<String>) -> Self {
        RawNode::Scalar(value.into())
    }

    /// Create a mapping node from `(key, values)` pairs
    pub fn mapping<K: Into<String>>(entries: impl IntoIterator<Item = (K, Vec<RawNode>)>) -> Self {
        RawNode::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns true for a scalar node
    pub fn is_scalar(&self) -> bool {
        matches!(self, RawNode::Scalar(_))
    }

    /// Returns true for a mapping without entries
    pub fn is_empty(&self) -> bool {
        match self {
            RawNode::Scalar(s) => s.is_empty(),
            RawNode::Mapping(entries) => entries.is_empty(),
        }
    }
}

/// Either a single node or a list of nodes, as found at a mapping value
enum Parsed {
    Node(RawNode),
    List(Vec<RawNode>),
}

struct ParsedVisitor;

impl<'de> Visitor<'de> for ParsedVisitor {
    type Value = Parsed;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a descriptor scalar, mapping or list")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Parsed, E> {
        Ok(Parsed::Node(RawNode::Scalar(v.to_string())))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Parsed, E> {
        Ok(Parsed::Node(RawNode::Scalar(v)))
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Parsed, E> {
        Ok(Parsed::Node(RawNode::Scalar(v.to_string())))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Parsed, E> {
        Ok(Parsed::Node(RawNode::Scalar(v.to_string())))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Parsed, E> {
        Ok(Parsed::Node(RawNode::Scalar(v.to_string())))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Parsed, E> {
        Ok(Parsed::Node(RawNode::Scalar(v.to_string())))
    }

    // Empty elements come through as null and read as empty text
    fn visit_unit<E: de::Error>(self) -> Result<Parsed, E> {
        Ok(Parsed::Node(RawNode::Scalar(String::new())))
    }

    fn visit_none<E: de::Error>(self) -> Result<Parsed, E> {
        self.visit_unit()
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Parsed, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<RawNode>()? {
            items.push(item);
        }
        Ok(Parsed::List(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Parsed, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some(key) = map.next_key::<String>()? {
            let values = match map.next_value::<Parsed>()? {
                Parsed::Node(node) => vec![node],
                Parsed::List(nodes) => nodes,
            };
            entries.push((key, values));
        }
        Ok(Parsed::Node(RawNode::Mapping(entries)))
    }
}

impl<'de> Deserialize<'de> for Parsed {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ParsedVisitor)
    }
}

impl<'de> Deserialize<'de> for RawNode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Parsed::deserialize(deserializer)? {
            Parsed::Node(node) => Ok(node),
            Parsed::List(mut nodes) if nodes.len() <= 1 => Ok(nodes.pop().unwrap_or_default()),
            Parsed::List(nodes) => Err(de::Error::invalid_length(
                nodes.len(),
                &"a single descriptor node",
            )),
        }
    }
}

impl Serialize for RawNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RawNode::Scalar(value) => serializer.serialize_str(value),
            RawNode::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, values) in entries {
                    map.serialize_entry(key, values)?;
                }
                map.end()
            }
        }
    }
}

/// One instance of a repeated element inside a [`DescriptorEntry::RepeatedGroup`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    /// Element tag shared by sibling instances (e.g. `channel`)
    pub tag: String,
    /// The instance's own scalar fields, in source order
    pub leaves: Vec<(String, String)>,
}

/// Tagged form of one top-level descriptor entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorEntry {
    /// `key: value`
    Leaf { key: String, value: String },
    /// A group whose children are all scalar leaves
    Group {
        key: String,
        leaves: Vec<(String, String)>,
    },
    /// A group of repeated sibling groups (e.g. `channels -> channel*`)
    RepeatedGroup {
        key: String,
        members: Vec<GroupMember>,
    },
    /// A branch no reconstruction rule applies to
    Unsupported { key: String, reason: String },
}

impl DescriptorEntry {
    /// Key of the entry
    pub fn key(&self) -> &str {
        match self {
            DescriptorEntry::Leaf { key, .. }
            | DescriptorEntry::Group { key, .. }
            | DescriptorEntry::RepeatedGroup { key, .. }
            | DescriptorEntry::Unsupported { key, .. } => key,
        }
    }
}

/// Non-fatal finding raised while reading a descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DescriptorIssue {
    /// The branch at `path` was omitted
    UnsupportedShape { path: String, reason: String },
    /// A key repeated at one level; only the first occurrence was used
    DuplicateKey { path: String },
    /// A key carried several values; only the first was used
    ExtraValues { path: String, ignored: usize },
}

impl DescriptorIssue {
    /// Path of the affected entry
    pub fn path(&self) -> &str {
        match self {
            DescriptorIssue::UnsupportedShape { path, .. }
            | DescriptorIssue::DuplicateKey { path }
            | DescriptorIssue::ExtraValues { path, .. } => path,
        }
    }

    /// Returns true if part of the descriptor was dropped
    pub fn is_unsupported(&self) -> bool {
        matches!(self, DescriptorIssue::UnsupportedShape { .. })
    }
}

impl fmt::Display for DescriptorIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DescriptorIssue::UnsupportedShape { path, reason } => {
                write!(f, "unsupported descriptor shape at '{}': {}", path, reason)
            }
            DescriptorIssue::DuplicateKey { path } => {
                write!(f, "duplicate descriptor key '{}', later occurrences ignored", path)
            }
            DescriptorIssue::ExtraValues { path, ignored } => write!(
                f,
                "descriptor key '{}' has {} extra value(s), only the first is used",
                path, ignored
            ),
        }
    }
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}/{}", parent, key)
    }
}

/// First value of every distinct key at one level, in source order
///
/// Later duplicates and extra list elements are reported and skipped.
fn first_values<'a>(
    entries: &'a [(String, Vec<RawNode>)],
    parent: &str,
    issues: &mut Vec<DescriptorIssue>,
) -> Vec<(&'a str, &'a RawNode)> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(entries.len());

    for (key, values) in entries {
        let path = join_path(parent, key);
        if !seen.insert(key.as_str()) {
            issues.push(DescriptorIssue::DuplicateKey { path });
            continue;
        }
        let Some(first) = values.first() else {
            issues.push(DescriptorIssue::UnsupportedShape {
                path,
                reason: "key has no values".to_string(),
            });
            continue;
        };
        if values.len() > 1 {
            issues.push(DescriptorIssue::ExtraValues {
                path,
                ignored: values.len() - 1,
            });
        }
        out.push((key.as_str(), first));
    }

    out
}

/// Scalar fields of one mapping, skipping anything nested
fn scalar_leaves(
    node: &RawNode,
    path: &str,
    issues: &mut Vec<DescriptorIssue>,
) -> Vec<(String, String)> {
    let RawNode::Mapping(entries) = node else {
        return Vec::new();
    };

    first_values(entries, path, issues)
        .into_iter()
        .filter_map(|(key, value)| match value {
            RawNode::Scalar(text) => Some((key.to_string(), text.clone())),
            RawNode::Mapping(_) => {
                issues.push(DescriptorIssue::UnsupportedShape {
                    path: join_path(path, key),
                    reason: "nested deeper than a repeated group".to_string(),
                });
                None
            }
        })
        .collect()
}

fn classify_mapping(
    key: &str,
    inner: &[(String, Vec<RawNode>)],
    issues: &mut Vec<DescriptorIssue>,
) -> DescriptorEntry {
    let all_scalars = inner
        .iter()
        .all(|(_, values)| values.iter().all(RawNode::is_scalar));
    let all_mappings = inner
        .iter()
        .all(|(_, values)| !values.is_empty() && values.iter().all(|v| !v.is_scalar()));

    if all_scalars {
        let path = key.to_string();
        let leaves = first_values(inner, &path, issues)
            .into_iter()
            .filter_map(|(k, v)| match v {
                RawNode::Scalar(text) => Some((k.to_string(), text.clone())),
                RawNode::Mapping(_) => None,
            })
            .collect();
        return DescriptorEntry::Group {
            key: key.to_string(),
            leaves,
        };
    }

    if all_mappings {
        let mut seen = HashSet::new();
        let mut members = Vec::new();
        for (tag, instances) in inner {
            let tag_path = join_path(key, tag);
            if !seen.insert(tag.as_str()) {
                issues.push(DescriptorIssue::DuplicateKey { path: tag_path });
                continue;
            }
            for (n, instance) in instances.iter().enumerate() {
                let path = format!("{}[{}]", tag_path, n);
                members.push(GroupMember {
                    tag: tag.clone(),
                    leaves: scalar_leaves(instance, &path, issues),
                });
            }
        }
        return DescriptorEntry::RepeatedGroup {
            key: key.to_string(),
            members,
        };
    }

    DescriptorEntry::Unsupported {
        key: key.to_string(),
        reason: "group mixes scalar values and nested elements".to_string(),
    }
}

/// Resolve a raw descriptor into tagged top-level entries
///
/// Returns the entries in source order together with every non-fatal issue
/// found on the way. Unsupported branches are returned as
/// [`DescriptorEntry::Unsupported`] and also reported as issues.
pub fn classify(root: &RawNode) -> (Vec<DescriptorEntry>, Vec<DescriptorIssue>) {
    let mut issues = Vec::new();

    let entries = match root {
        RawNode::Scalar(text) if text.is_empty() => Vec::new(),
        RawNode::Scalar(_) => {
            issues.push(DescriptorIssue::UnsupportedShape {
                path: String::new(),
                reason: "descriptor root is a scalar".to_string(),
            });
            Vec::new()
        }
        RawNode::Mapping(entries) => first_values(entries, "", &mut issues)
            .into_iter()
            .map(|(key, value)| match value {
                RawNode::Scalar(text) => DescriptorEntry::Leaf {
                    key: key.to_string(),
                    value: text.clone(),
                },
                RawNode::Mapping(inner) => classify_mapping(key, inner, &mut issues),
            })
            .collect(),
    };

    for entry in &entries {
        if let DescriptorEntry::Unsupported { key, reason } = entry {
            issues.push(DescriptorIssue::UnsupportedShape {
                path: key.clone(),
                reason: reason.clone(),
            });
        }
    }

    (entries, issues)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(v: &str) -> Vec<RawNode> {
        vec![RawNode::scalar(v)]
    }

    #[test]
    fn test_deserialize_preserves_order_and_duplicates() {
        let raw: RawNode = serde_json::from_str(
            r#"{"zeta": ["1"], "alpha": "2", "zeta": [3], "empty": null}"#,
        )
        .unwrap();

        let RawNode::Mapping(entries) = &raw else {
            panic!("expected mapping");
        };
        let keys: Vec<_> = entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "zeta", "empty"]);
        assert_eq!(entries[1].1, leaf("2"));
        assert_eq!(entries[2].1, leaf("3"));
        assert_eq!(entries[3].1, leaf(""));
    }

    #[test]
    fn test_empty_elements_are_empty_leaves() {
        let raw: RawNode = serde_json::from_str(
            r#"{"acquisition": [{"model": ["X1"], "serial": [null]}],
                "channels": [{"channel": [{"label": ["C3"], "unit": [null]}]}]}"#,
        )
        .unwrap();

        let (entries, issues) = classify(&raw);
        assert!(issues.is_empty(), "{:?}", issues);
        assert_eq!(
            entries[0],
            DescriptorEntry::Group {
                key: "acquisition".into(),
                leaves: vec![("model".into(), "X1".into()), ("serial".into(), String::new())],
            }
        );
        assert_eq!(
            entries[1],
            DescriptorEntry::RepeatedGroup {
                key: "channels".into(),
                members: vec![GroupMember {
                    tag: "channel".into(),
                    leaves: vec![("label".into(), "C3".into()), ("unit".into(), String::new())],
                }],
            }
        );

        let root: RawNode = serde_json::from_str("null").unwrap();
        assert!(root.is_empty());
        assert_eq!(classify(&root), (vec![], vec![]));
    }

    #[test]
    fn test_deserialize_unwraps_single_element_root() {
        let raw: RawNode = serde_json::from_str(r#"[{"a": ["b"]}]"#).unwrap();
        assert_eq!(raw, RawNode::mapping([("a", leaf("b"))]));

        let empty: RawNode = serde_json::from_str("[]").unwrap();
        assert!(empty.is_empty());

        assert!(serde_json::from_str::<RawNode>(r#"[{"a": "b"}, {"c": "d"}]"#).is_err());
    }

    #[test]
    fn test_serialize_round_trip() {
        let raw = RawNode::mapping([
            ("manufacturer", leaf("BioSemi")),
            (
                "channels",
                vec![RawNode::mapping([(
                    "channel",
                    vec![
                        RawNode::mapping([("label", leaf("C3"))]),
                        RawNode::mapping([("label", leaf("C4"))]),
                    ],
                )])],
            ),
        ]);
        let json = serde_json::to_string(&raw).unwrap();
        let back: RawNode = serde_json::from_str(&json).unwrap();
        assert_eq!(back, raw);
    }

    #[test]
    fn test_classify_shapes() {
        let raw = RawNode::mapping([
            ("manufacturer", leaf("BioSemi")),
            (
                "acquisition",
                vec![RawNode::mapping([("model", leaf("ActiveTwo")), ("serial", leaf("42"))])],
            ),
            (
                "channels",
                vec![RawNode::mapping([(
                    "channel",
                    vec![
                        RawNode::mapping([("label", leaf("C3")), ("type", leaf("EEG"))]),
                        RawNode::mapping([("label", leaf("C4")), ("type", leaf("EEG"))]),
                    ],
                )])],
            ),
        ]);

        let (entries, issues) = classify(&raw);
        assert!(issues.is_empty(), "{:?}", issues);
        assert_eq!(entries.len(), 3);
        assert_eq!(
            entries[0],
            DescriptorEntry::Leaf {
                key: "manufacturer".into(),
                value: "BioSemi".into()
            }
        );
        assert!(matches!(&entries[1], DescriptorEntry::Group { leaves, .. } if leaves.len() == 2));
        match &entries[2] {
            DescriptorEntry::RepeatedGroup { key, members } => {
                assert_eq!(key, "channels");
                assert_eq!(members.len(), 2);
                assert_eq!(members[1].tag, "channel");
                assert_eq!(members[1].leaves[0], ("label".to_string(), "C4".to_string()));
            }
            other => panic!("unexpected entry {:?}", other),
        }
    }

    #[test]
    fn test_classify_mixed_group_is_unsupported() {
        let raw = RawNode::mapping([(
            "odd",
            vec![RawNode::mapping([
                ("name", leaf("x")),
                ("nested", vec![RawNode::mapping([("a", leaf("b"))])]),
            ])],
        )]);

        let (entries, issues) = classify(&raw);
        assert!(matches!(entries[0], DescriptorEntry::Unsupported { .. }));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_unsupported());
        assert_eq!(issues[0].path(), "odd");
    }

    #[test]
    fn test_classify_duplicates_and_extra_values() {
        let raw = RawNode::mapping([
            ("unit", vec![RawNode::scalar("uV"), RawNode::scalar("mV")]),
            ("unit", leaf("V")),
        ]);

        let (entries, issues) = classify(&raw);
        assert_eq!(
            entries,
            vec![DescriptorEntry::Leaf {
                key: "unit".into(),
                value: "uV".into()
            }]
        );
        assert_eq!(
            issues,
            vec![
                DescriptorIssue::ExtraValues {
                    path: "unit".into(),
                    ignored: 1
                },
                DescriptorIssue::DuplicateKey { path: "unit".into() },
            ]
        );
    }

    #[test]
    fn test_classify_empty_and_scalar_root() {
        let (entries, issues) = classify(&RawNode::default());
        assert!(entries.is_empty());
        assert!(issues.is_empty());

        let (entries, issues) = classify(&RawNode::scalar("loose text"));
        assert!(entries.is_empty());
        assert_eq!(issues.len(), 1);
    }
}
