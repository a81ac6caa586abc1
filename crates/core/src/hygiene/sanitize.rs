#![forbid(unsafe_code)]

use crate::{Key, Node, join_path};
use tracing::error;

/// Rewrites every `Bytes` scalar as text, replacing invalid UTF-8 sequences
/// with U+FFFD. Returns how many scalars were rewritten.
pub fn normalize_text(node: &mut Node) -> usize {
    match node {
        Node::Bytes(raw) => {
            let raw = std::mem::take(raw);
            let text = match String::from_utf8(raw) {
                Ok(text) => text,
                Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
            };
            *node = Node::Str(text);
            1
        }
        Node::Array(items) => items.iter_mut().map(normalize_text).sum(),
        Node::Map(map) => map.values_mut().map(normalize_text).sum(),
        Node::Null | Node::Bool(_) | Node::Int(_) | Node::Float(_) | Node::Str(_) => 0,
    }
}

/// Rewrites non-string map keys to their string form, at any depth.
///
/// Each rewritten key is logged with its dotted path and returned. A coerced
/// key replaces an existing string key with the same spelling.
pub fn coerce_keys(node: &mut Node) -> Vec<String> {
    let mut rewritten = Vec::new();
    coerce_keys_at(node, "", &mut rewritten);
    rewritten
}

fn coerce_keys_at(node: &mut Node, path: &str, rewritten: &mut Vec<String>) {
    match node {
        Node::Map(map) => {
            let bad: Vec<Key> = map.keys().filter(|key| !key.is_str()).cloned().collect();
            for key in bad {
                let full_path = join_path(path, &key.to_string());
                error!("BAD KEY: {full_path}");
                if let Some(value) = map.remove(&key) {
                    map.insert(Key::Str(key.into_string()), value);
                }
                rewritten.push(full_path);
            }

            for (key, value) in map.iter_mut() {
                let child_path = join_path(path, &key.to_string());
                coerce_keys_at(value, &child_path, rewritten);
            }
        }
        Node::Array(items) => {
            for item in items {
                coerce_keys_at(item, path, rewritten);
            }
        }
        Node::Null | Node::Bool(_) | Node::Int(_) | Node::Float(_) | Node::Str(_) | Node::Bytes(_) => {}
    }
}
