pub mod document;
pub mod identifiers;

pub use document::*;
pub use identifiers::*;
