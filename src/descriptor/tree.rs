//! Metadata tree attached to a channel declaration

use serde::{Serialize, Serializer};

use super::RawNode;

/// Handle to a group node inside one [`DescriptorTree`]
///
/// Only groups can have children, so only groups get handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Leaf { key: String, value: String },
    Group { key: String, children: Vec<usize> },
}

/// Borrowed view of a child node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRef<'a> {
    /// `key: value`
    Leaf { key: &'a str, value: &'a str },
    /// A nested group
    Group { key: &'a str, id: GroupId },
}

impl<'a> NodeRef<'a> {
    /// Key of the node
    pub fn key(&self) -> &'a str {
        match self {
            NodeRef::Leaf { key, .. } | NodeRef::Group { key, .. } => key,
        }
    }
}

/// Ordered metadata tree, stored as an arena
///
/// Children keep insertion order. Handles are only meaningful for the tree
/// that issued them; passing a foreign [`GroupId`] panics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorTree {
    nodes: Vec<Node>,
}

impl Default for DescriptorTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DescriptorTree {
    /// Key of the root group
    pub const ROOT_KEY: &'static str = "desc";

    /// Create a tree holding only the empty root group
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::Group {
                key: Self::ROOT_KEY.to_string(),
                children: Vec::new(),
            }],
        }
    }

    /// The root group
    pub fn root(&self) -> GroupId {
        GroupId(0)
    }

    /// Returns true if the root has no children
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Total number of nodes below the root
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1
    }

    fn push_child(&mut self, parent: GroupId, node: Node) -> usize {
        let index = self.nodes.len();
        self.nodes.push(node);
        match &mut self.nodes[parent.0] {
            Node::Group { children, .. } => children.push(index),
            Node::Leaf { .. } => unreachable!("GroupId always points at a group"),
        }
        index
    }

    /// Append `key: value` under `parent`
    pub fn append_leaf(&mut self, parent: GroupId, key: impl Into<String>, value: impl Into<String>) {
        self.push_child(
            parent,
            Node::Leaf {
                key: key.into(),
                value: value.into(),
            },
        );
    }

    /// Append an empty group under `parent` and return its handle
    pub fn append_group(&mut self, parent: GroupId, key: impl Into<String>) -> GroupId {
        GroupId(self.push_child(
            parent,
            Node::Group {
                key: key.into(),
                children: Vec::new(),
            },
        ))
    }

    /// Key of a group
    pub fn group_key(&self, group: GroupId) -> &str {
        match &self.nodes[group.0] {
            Node::Group { key, .. } | Node::Leaf { key, .. } => key,
        }
    }

    /// Children of a group, in insertion order
    pub fn children(&self, group: GroupId) -> impl Iterator<Item = NodeRef<'_>> + '_ {
        let children: &[usize] = match &self.nodes[group.0] {
            Node::Group { children, .. } => children,
            Node::Leaf { .. } => &[],
        };
        children.iter().map(move |&index| match &self.nodes[index] {
            Node::Leaf { key, value } => NodeRef::Leaf { key, value },
            Node::Group { key, .. } => NodeRef::Group {
                key,
                id: GroupId(index),
            },
        })
    }

    /// Value of the first leaf named `key` directly under `group`
    pub fn leaf(&self, group: GroupId, key: &str) -> Option<&str> {
        self.children(group).find_map(|child| match child {
            NodeRef::Leaf { key: k, value } if k == key => Some(value),
            _ => None,
        })
    }

    /// All groups named `key` directly under `group`
    pub fn groups<'a>(&'a self, group: GroupId, key: &'a str) -> impl Iterator<Item = GroupId> + 'a {
        self.children(group).filter_map(move |child| match child {
            NodeRef::Group { key: k, id } if k == key => Some(id),
            _ => None,
        })
    }

    /// Convert back to the generic `key -> list` form
    ///
    /// Consecutive sibling groups sharing a key collapse into one list, so a
    /// tree rebuilt from a repeated group reads back as that repeated group.
    pub fn to_raw(&self) -> RawNode {
        self.group_to_raw(self.root())
    }

    fn group_to_raw(&self, group: GroupId) -> RawNode {
        let mut entries: Vec<(String, Vec<RawNode>)> = Vec::new();
        let mut last_was_group = false;

        for child in self.children(group) {
            match child {
                NodeRef::Leaf { key, value } => {
                    entries.push((key.to_string(), vec![RawNode::scalar(value)]));
                    last_was_group = false;
                }
                NodeRef::Group { key, id } => {
                    let node = self.group_to_raw(id);
                    match entries.last_mut() {
                        Some((last_key, values)) if last_was_group && last_key == key => {
                            values.push(node)
                        }
                        _ => entries.push((key.to_string(), vec![node])),
                    }
                    last_was_group = true;
                }
            }
        }

        RawNode::Mapping(entries)
    }
}

impl Serialize for DescriptorTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_raw().serialize(serializer)
    }
}
