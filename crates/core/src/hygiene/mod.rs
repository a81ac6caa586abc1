#![forbid(unsafe_code)]

mod profile;
mod sanitize;

pub use profile::*;
pub use sanitize::*;
