//! Domain Layer
//!
//! Lists, items and the traits and errors shared by every layer above.

mod entity;
mod item;
mod list;

pub use entity::{new_id, DomainError, DomainResult, Entity, Ranked};
pub use item::Item;
pub use list::List;
