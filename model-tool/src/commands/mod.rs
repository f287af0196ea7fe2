//! Command implementations

pub mod model;
pub mod resolve;
