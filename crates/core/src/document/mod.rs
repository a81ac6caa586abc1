#![forbid(unsafe_code)]

mod key;
mod node;
mod path;

pub use key::*;
pub use node::*;
pub use path::*;
