//! Rebuild a channel declaration's metadata tree from a recorded descriptor

use super::{classify, DescriptorEntry, DescriptorIssue, DescriptorTree, GroupId, RawNode};

/// Reconstruct `raw` under `parent` in `tree`
///
/// Top-level entries are applied in source order:
///
/// - a scalar becomes a leaf
/// - a group of scalars becomes a group with one leaf per field
/// - a group of repeated elements becomes a group holding one child group
///   per instance, each with that instance's fields as leaves
///
/// Unsupported branches are left out of the tree. Nothing here is fatal;
/// every finding is returned for the caller to report.
pub fn reconstruct(raw: &RawNode, tree: &mut DescriptorTree, parent: GroupId) -> Vec<DescriptorIssue> {
    let (entries, issues) = classify(raw);

    for entry in entries {
        match entry {
            DescriptorEntry::Leaf { key, value } => tree.append_leaf(parent, key, value),
            DescriptorEntry::Group { key, leaves } => {
                let group = tree.append_group(parent, key);
                for (k, v) in leaves {
                    tree.append_leaf(group, k, v);
                }
            }
            DescriptorEntry::RepeatedGroup { key, members } => {
                let group = tree.append_group(parent, key);
                for member in members {
                    let instance = tree.append_group(group, member.tag);
                    for (k, v) in member.leaves {
                        tree.append_leaf(instance, k, v);
                    }
                }
            }
            DescriptorEntry::Unsupported { .. } => {}
        }
    }

    issues
}
