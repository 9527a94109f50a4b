//! Utility functions and helpers
//!
//! ## Modules
//!
//! - [`naming`] - Remote and local file name resolution
//! - [`timing`] - Duration logging for bucket operations

pub mod naming;
pub mod timing;
