//! Game discovery and identifier resolution.
//!
//! Maps user-facing identifiers onto game directories under the configured
//! games root. Lookups only read the filesystem; a path is never built
//! from the identifier itself.

pub mod path_safety;
pub mod resolver;

pub use resolver::{normalize_identifier, GameCatalog, GameEntry};
