//! HTTP request handlers

pub mod alerts;
pub mod analytics;
pub mod auth;
pub mod health;
pub mod inventory;
pub mod recipes;
pub mod sales;
pub mod stock;
pub mod suppliers;
pub mod users;

pub use alerts::*;
pub use analytics::*;
pub use auth::*;
pub use health::*;
pub use inventory::*;
pub use recipes::*;
pub use sales::*;
pub use stock::*;
pub use suppliers::*;
pub use users::*;
