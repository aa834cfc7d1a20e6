//! Positioning Operations
//!
//! Rank arithmetic for sibling collections. Entities are never moved
//! inside the slice; only their `position` changes, so untouched entities
//! keep their identity.

use crate::domain::{DomainError, DomainResult, Ranked};

/// One rank change produced by a reposition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionChange {
    pub id: String,
    pub from: u32,
    pub to: u32,
}

/// Next free rank in a dense collection
pub fn next_position<T: Ranked>(collection: &[T]) -> u32 {
    collection.len() as u32
}

/// Move `moved_id` from rank `source` onto rank `target`.
///
/// Moving down, siblings in `(source, target]` shift up by one; moving up,
/// siblings in `[target, source)` shift down by one. The moved entity
/// takes `target` in both directions. Nothing is touched unless every
/// argument checks out.
pub fn reposition<T: Ranked>(
    collection: &mut [T],
    moved_id: &str,
    source: u32,
    target: u32,
) -> DomainResult<Vec<PositionChange>> {
    let moved = collection
        .iter()
        .find(|entity| entity.id() == moved_id)
        .ok_or_else(|| DomainError::NotFound(format!("Entity {} not found", moved_id)))?;

    if moved.position() != source {
        return Err(DomainError::InvalidInput(format!(
            "Entity {} is at position {}, not {}",
            moved_id,
            moved.position(),
            source
        )));
    }

    let len = collection.len() as u32;
    if target >= len {
        return Err(DomainError::InvalidInput(format!(
            "Target position {} out of range for {} entities",
            target, len
        )));
    }

    if source == target {
        return Ok(Vec::new());
    }

    let mut changes = Vec::new();
    for entity in collection.iter_mut() {
        let current = entity.position();
        let new_position = if entity.id() == moved_id {
            target
        } else if source < target && current > source && current <= target {
            current - 1
        } else if source > target && current >= target && current < source {
            current + 1
        } else {
            current
        };

        if new_position != current {
            changes.push(PositionChange {
                id: entity.id().to_string(),
                from: current,
                to: new_position,
            });
            entity.set_position(new_position);
        }
    }

    Ok(changes)
}

/// Close the gap left by an entity removed from rank `removed`
pub fn close_gap<T: Ranked>(collection: &mut [T], removed: u32) {
    for entity in collection.iter_mut() {
        let current = entity.position();
        if current > removed {
            entity.set_position(current - 1);
        }
    }
}

/// Renumber to `0..N` keeping the current relative order.
///
/// Ties (e.g. snapshots without ranks) keep storage order.
pub fn reindex<T: Ranked>(collection: &mut [T]) {
    let mut order: Vec<usize> = (0..collection.len()).collect();
    order.sort_by_key(|&idx| (collection[idx].position(), idx));

    for (new_position, idx) in order.into_iter().enumerate() {
        collection[idx].set_position(new_position as u32);
    }
}

/// Whether ranks are exactly `0..N` without duplicates
pub fn is_dense<T: Ranked>(collection: &[T]) -> bool {
    let mut seen = vec![false; collection.len()];
    for entity in collection {
        match seen.get_mut(entity.position() as usize) {
            Some(slot) if !*slot => *slot = true,
            _ => return false,
        }
    }
    true
}
