#![forbid(unsafe_code)]

use crate::Node;

/// Total text carried beneath one top-level key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyFootprint {
    pub key: String,
    pub size: usize,
}

/// Per-top-level-key string footprint, largest first.
///
/// A sequence of documents is profiled through its first element. Sizes count
/// characters of string scalars only; map keys and non-string scalars add
/// nothing. Equal sizes keep map order.
pub fn profile(document: &Node) -> Vec<KeyFootprint> {
    let root = match document {
        Node::Array(items) => match items.first() {
            Some(first) => first,
            None => return Vec::new(),
        },
        other => other,
    };

    let Some(map) = root.as_map() else {
        return Vec::new();
    };

    let mut totals: Vec<KeyFootprint> = map
        .iter()
        .map(|(key, value)| KeyFootprint {
            key: key.to_string(),
            size: text_footprint(value),
        })
        .collect();
    totals.sort_by(|a, b| b.size.cmp(&a.size));
    totals
}

pub fn largest_key(document: &Node) -> Option<KeyFootprint> {
    profile(document).into_iter().next()
}

/// Characters of every string scalar reachable from `node`.
pub fn text_footprint(node: &Node) -> usize {
    match node {
        Node::Str(value) => value.chars().count(),
        Node::Bytes(raw) => String::from_utf8_lossy(raw).chars().count(),
        Node::Array(items) => items.iter().map(text_footprint).sum(),
        Node::Map(map) => map.values().map(text_footprint).sum(),
        Node::Null | Node::Bool(_) | Node::Int(_) | Node::Float(_) => 0,
    }
}
