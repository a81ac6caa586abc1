#![forbid(unsafe_code)]

use rp_core::{Key, Node, join_path};
use serde_json::{Map, Number, Value};
use thiserror::Error;

/// Why a document cannot be represented by the store.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("documents must have only string keys, key was {path}")]
    NonStringKey { path: String },
    #[error("key '{path}' must not contain '.' or NUL and must not start with '$'")]
    ForbiddenKey { path: String },
    #[error("cannot encode object at '{path}': invalid UTF-8 text")]
    InvalidText { path: String },
    #[error("cannot encode object at '{path}': non-finite float")]
    UnencodableNumber { path: String },
}

impl EncodeError {
    pub fn path(&self) -> &str {
        match self {
            Self::NonStringKey { path }
            | Self::ForbiddenKey { path }
            | Self::InvalidText { path }
            | Self::UnencodableNumber { path } => path,
        }
    }

    /// True when the whole document cannot be stored atomically but its
    /// sections may still be stored one by one.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::ForbiddenKey { .. } | Self::InvalidText { .. } | Self::UnencodableNumber { .. }
        )
    }
}

pub fn is_valid_field_name(name: &str) -> bool {
    !name.contains('.') && !name.contains('\0') && !name.starts_with('$')
}

/// Converts a report tree into the JSON form kept by the store, enforcing the
/// store's document rules.
pub fn encode_document(node: &Node) -> Result<Value, EncodeError> {
    encode_at(node, "")
}

/// Encodes the value of a single top-level field.
pub fn encode_field(name: &str, value: &Node) -> Result<Value, EncodeError> {
    if !is_valid_field_name(name) {
        return Err(EncodeError::ForbiddenKey {
            path: name.to_string(),
        });
    }
    encode_at(value, name)
}

fn encode_at(node: &Node, path: &str) -> Result<Value, EncodeError> {
    let value = match node {
        Node::Null => Value::Null,
        Node::Bool(value) => Value::Bool(*value),
        Node::Int(value) => Value::from(*value),
        Node::Float(value) => match Number::from_f64(*value) {
            Some(number) => Value::Number(number),
            None => {
                return Err(EncodeError::UnencodableNumber {
                    path: path.to_string(),
                });
            }
        },
        Node::Str(value) => Value::String(value.clone()),
        Node::Bytes(raw) => match std::str::from_utf8(raw) {
            Ok(text) => Value::String(text.to_string()),
            Err(_) => {
                return Err(EncodeError::InvalidText {
                    path: path.to_string(),
                });
            }
        },
        Node::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                out.push(encode_at(item, &join_path(path, &index.to_string()))?);
            }
            Value::Array(out)
        }
        Node::Map(map) => {
            let mut out = Map::new();
            for (key, value) in map {
                let Key::Str(name) = key else {
                    return Err(EncodeError::NonStringKey {
                        path: join_path(path, &key.to_string()),
                    });
                };
                let child_path = join_path(path, name);
                if !is_valid_field_name(name) {
                    return Err(EncodeError::ForbiddenKey { path: child_path });
                }
                let encoded = encode_at(value, &child_path)?;
                out.insert(name.clone(), encoded);
            }
            Value::Object(out)
        }
    };
    Ok(value)
}
