#![forbid(unsafe_code)]

use rp_core::{Node, PathSegment, largest_key, subscript_path, text_footprint};
use tracing::warn;

/// Top-level section that is never dropped; it carries the task id.
pub(crate) const PROTECTED_KEY: &str = "info";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DroppedField {
    /// Subscript path of the removed value (`results['behavior']['summary']`).
    pub path: String,
    pub size: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RemediationStep {
    pub document: Node,
    pub dropped: Vec<DroppedField>,
}

/// One remediation pass over the section at `parent_key`.
///
/// A list holding maps loses the largest nested key of every map element
/// whose footprint exceeds `threshold`, and every other element over
/// `threshold` is removed from the list. A map loses its largest nested key
/// when it exceeds `threshold`. Any other section is dropped whole once its own
/// footprint exceeds `threshold`. The `info` section is left untouched.
pub fn strip_oversized(mut document: Node, parent_key: &str, threshold: usize) -> RemediationStep {
    let mut dropped = Vec::new();
    if parent_key == PROTECTED_KEY {
        return RemediationStep { document, dropped };
    }

    let mut drop_whole = None;
    match document.get_mut(parent_key) {
        Some(Node::Array(items)) if items.iter().any(|item| item.as_map().is_some()) => {
            let mut removed = Vec::new();
            for (index, item) in items.iter_mut().enumerate() {
                if item.as_map().is_none() {
                    let size = text_footprint(item);
                    if size > threshold {
                        removed.push(index);
                        dropped.push(log_dropped(
                            subscript_path([PathSegment::Field(parent_key), PathSegment::Index(index)]),
                            size,
                        ));
                    }
                    continue;
                }
                let Some(child) = largest_key(item).filter(|child| child.size > threshold) else {
                    continue;
                };
                item.remove(&child.key);
                dropped.push(log_dropped(
                    subscript_path([
                        PathSegment::Field(parent_key),
                        PathSegment::Index(index),
                        PathSegment::Field(&child.key),
                    ]),
                    child.size,
                ));
            }
            // Paths above carry the original indices.
            for index in removed.into_iter().rev() {
                items.remove(index);
            }
        }
        Some(section) if section.as_map().is_some() => {
            if let Some(child) = largest_key(section).filter(|child| child.size > threshold) {
                section.remove(&child.key);
                dropped.push(log_dropped(
                    subscript_path([PathSegment::Field(parent_key), PathSegment::Field(&child.key)]),
                    child.size,
                ));
            }
        }
        Some(other) => {
            let size = text_footprint(other);
            if size > threshold {
                drop_whole = Some(size);
            }
        }
        None => {}
    }

    if let Some(size) = drop_whole {
        document.remove(parent_key);
        dropped.push(log_dropped(
            subscript_path([PathSegment::Field(parent_key)]),
            size,
        ));
    }
    RemediationStep { document, dropped }
}

fn log_dropped(path: String, size: usize) -> DroppedField {
    warn!("{path} deleted due to size: {size}");
    DroppedField { path, size }
}
