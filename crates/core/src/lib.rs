#![forbid(unsafe_code)]

mod document;
mod hygiene;

pub use document::*;
pub use hygiene::*;
