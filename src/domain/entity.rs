//! Domain Layer - Core Entity Traits
//!
//! Every list and item has an opaque string id and a dense rank among its
//! siblings. Ranks are the only ordering information; storage order is
//! never used for display.

use rand::Rng;
use thiserror::Error;

/// Core trait for all domain entities
pub trait Entity: Sized + Clone {
    /// Returns the entity's unique identifier
    fn id(&self) -> &str;
}

/// Entities ordered among their siblings by a dense zero-based rank
pub trait Ranked: Entity {
    fn position(&self) -> u32;
    fn set_position(&mut self, position: u32);
}

/// Common result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Upper bound (exclusive) for generated ids
const ID_SPACE: u64 = 1_000_000_000_000_000;

/// Generate a pseudo-random decimal id that is not in `taken`.
///
/// Collisions are possible in principle, so the caller passes the ids of
/// the scope the new entity must be unique in.
pub fn new_id<'a>(taken: impl Iterator<Item = &'a str> + Clone) -> String {
    let mut rng = rand::thread_rng();
    loop {
        let candidate = rng.gen_range(0..ID_SPACE).to_string();
        if !taken.clone().any(|id| id == candidate) {
            return candidate;
        }
    }
}
