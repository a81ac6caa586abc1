#![forbid(unsafe_code)]

use crate::ReportError;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;

/// Port as written in the reporting config: a number or a numeric string.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum StoragePort {
    Number(i64),
    Text(String),
}

impl Default for StoragePort {
    fn default() -> Self {
        Self::Number(27017)
    }
}

impl StoragePort {
    pub fn resolve(&self) -> Result<u16, ReportError> {
        let raw = match self {
            Self::Number(value) => *value,
            Self::Text(text) => text.trim().parse::<i64>().map_err(|_| {
                ReportError::Configuration(format!("port must be an integer, got {text:?}"))
            })?,
        };
        match u16::try_from(raw) {
            Ok(port) if port > 0 => Ok(port),
            _ => Err(ReportError::Configuration(format!(
                "port must be in 1..=65535, got {raw}"
            ))),
        }
    }
}

/// Options of the report writer, read from the `reporting` config section.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReportingOptions {
    pub host: String,
    pub port: StoragePort,
    pub username: Option<String>,
    pub password: Option<String>,
    pub authsource: String,
    pub db: String,
    /// Delete oversized sections until the report fits.
    pub fix_large_docs: bool,
    /// Root directory of the embedded store.
    pub storage_dir: PathBuf,
    /// Task id to store the report under, ahead of any id in the report.
    pub task_id_override: Option<i64>,
}

impl Default for ReportingOptions {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: StoragePort::default(),
            username: None,
            password: None,
            authsource: "reports".to_string(),
            db: "reports".to_string(),
            fix_large_docs: false,
            storage_dir: PathBuf::from(".reporting"),
            task_id_override: None,
        }
    }
}

impl ReportingOptions {
    pub fn from_yaml_str(raw: &str) -> Result<Self, ReportError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw)
            .map_err(|err| ReportError::Configuration(format!("invalid reporting options: {err}")))
    }

    pub fn from_json_value(value: Value) -> Result<Self, ReportError> {
        serde_json::from_value(value)
            .map_err(|err| ReportError::Configuration(format!("invalid reporting options: {err}")))
    }

    /// Checks the settings that do not depend on the backend.
    pub fn validate(&self) -> Result<u16, ReportError> {
        let port = self.port.resolve()?;
        if self.username.is_some() && self.password.is_none() {
            return Err(ReportError::Configuration(
                "username given without a password".to_string(),
            ));
        }
        if self.db.trim().is_empty() {
            return Err(ReportError::Configuration(
                "database name must not be empty".to_string(),
            ));
        }
        Ok(port)
    }
}
