//! Shared utilities for the model-tool CLI

pub mod format;
pub mod table;

pub use format::*;
pub use table::*;
