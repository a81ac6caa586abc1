#![forbid(unsafe_code)]

use crate::ReportError;
use rp_core::Node;

/// Task id the report is stored under, written back to `info.id`.
///
/// Precedence: `override_id`, then a non-empty `info.options.main_task_id`
/// (set when a distributed worker reports for its main task), then `info.id`.
/// Ids may be integers or numeric strings.
pub fn resolve_task_id(report: &mut Node, override_id: Option<i64>) -> Result<i64, ReportError> {
    let task_id = match override_id {
        Some(id) => id,
        None => match main_task_id(report)? {
            Some(id) => id,
            None => match report.pointer("info.id") {
                Some(id) => id.parse_i64().ok_or_else(|| {
                    ReportError::InvalidReport(format!("info.id is not an integer: {id:?}"))
                })?,
                None => return Err(ReportError::InvalidReport("missing info.id".to_string())),
            },
        },
    };

    let Some(info) = report.get_mut("info").filter(|info| info.as_map().is_some()) else {
        return Err(ReportError::InvalidReport(
            "report has no info section".to_string(),
        ));
    };
    let _ = info.insert("id", Node::Int(task_id));
    Ok(task_id)
}

fn main_task_id(report: &Node) -> Result<Option<i64>, ReportError> {
    let Some(value) = report.pointer("info.options.main_task_id") else {
        return Ok(None);
    };
    match value {
        Node::Null => Ok(None),
        Node::Str(text) if text.trim().is_empty() => Ok(None),
        Node::Int(0) => Ok(None),
        other => other.parse_i64().map(Some).ok_or_else(|| {
            ReportError::InvalidReport(format!(
                "info.options.main_task_id is not an integer: {other:?}"
            ))
        }),
    }
}
