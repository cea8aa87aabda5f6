//! Domain models for the restaurant inventory platform

mod alert;
mod inventory;
mod recipe;
mod sale;
mod supplier;
mod user;

pub use alert::*;
pub use inventory::*;
pub use recipe::*;
pub use sale::*;
pub use supplier::*;
pub use user::*;
