//! Domain model module declarations.

pub mod control;
pub mod session;
