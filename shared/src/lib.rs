//! Shared types, rules and calculations for the restaurant inventory platform
//!
//! This crate contains everything that must behave identically on the
//! server and in the browser (via WASM): domain models, the role-based
//! ability rules, stock arithmetic, validation and the offline cache.

pub mod abilities;
pub mod calculations;
pub mod models;
pub mod offline;
pub mod types;
pub mod validation;

pub use abilities::*;
pub use calculations::*;
pub use models::*;
pub use offline::*;
pub use types::*;
pub use validation::*;
