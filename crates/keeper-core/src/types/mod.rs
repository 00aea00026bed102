//! Common type definitions.

pub mod b64;
mod data_item;
mod filter;
mod identity;
mod user;

pub use data_item::*;
pub use filter::*;
pub use identity::*;
pub use user::*;
