#![forbid(unsafe_code)]

/// Dotted field path used in diagnostics (`behavior.processes.0.calls`).
pub fn join_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}.{child}")
    }
}

/// Subscript form of a removed field (`results['behavior']['summary']`).
pub fn subscript_path<'a>(segments: impl IntoIterator<Item = PathSegment<'a>>) -> String {
    let mut out = String::from("results");
    for segment in segments {
        match segment {
            PathSegment::Field(name) => {
                out.push_str("['");
                out.push_str(name);
                out.push_str("']");
            }
            PathSegment::Index(index) => {
                out.push('[');
                out.push_str(&index.to_string());
                out.push(']');
            }
        }
    }
    out
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathSegment<'a> {
    Field(&'a str),
    Index(usize),
}
