//! Entity Store
//!
//! In-memory lists and their items. All operations are synchronous and
//! side-effect free; persisting after a mutation is the caller's job
//! (see `AppContext`).

mod positioning;

pub use positioning::{close_gap, is_dense, next_position, reindex, reposition, PositionChange};

use crate::domain::{new_id, DomainError, DomainResult, Item, List};

/// Lists of the current session, in storage order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntityStore {
    lists: Vec<List>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a loaded snapshot, normalising ranks
    pub fn from_lists(lists: Vec<List>) -> Self {
        let mut store = Self::new();
        store.replace_all(lists);
        store
    }

    /// All lists in storage order
    pub fn get_lists(&self) -> &[List] {
        &self.lists
    }

    /// All lists sorted by rank
    pub fn lists_by_position(&self) -> Vec<&List> {
        let mut lists: Vec<&List> = self.lists.iter().collect();
        lists.sort_by_key(|list| list.position);
        lists
    }

    pub fn get_list(&self, id: &str) -> Option<&List> {
        self.lists.iter().find(|list| list.id == id)
    }

    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Create a list at the end of the order
    pub fn add_list(&mut self, name: &str) -> DomainResult<List> {
        let name = validate_name(name)?;
        let id = new_id(self.lists.iter().map(|list| list.id.as_str()));
        let list = List::new(id, name, next_position(&self.lists));
        self.lists.push(list.clone());
        Ok(list)
    }

    /// Delete a list and close the gap it leaves in the order
    pub fn remove_list(&mut self, id: &str) -> DomainResult<List> {
        let index = self
            .lists
            .iter()
            .position(|list| list.id == id)
            .ok_or_else(|| list_not_found(id))?;

        let removed = self.lists.remove(index);
        close_gap(&mut self.lists, removed.position);
        Ok(removed)
    }

    /// Append an item to a list
    pub fn add_item(&mut self, list_id: &str, name: &str) -> DomainResult<Item> {
        let name = validate_name(name)?;
        let list = self.list_mut(list_id)?;
        let items = list.items_mut();
        let id = new_id(items.iter().map(|item| item.id.as_str()));
        let item = Item::new(id, name, next_position(items));
        items.push(item.clone());
        Ok(item)
    }

    /// Delete an item and close the gap among its siblings
    pub fn remove_item(&mut self, list_id: &str, item_id: &str) -> DomainResult<Item> {
        let items = self.existing_items_mut(list_id, item_id)?;
        let index = items
            .iter()
            .position(|item| item.id == item_id)
            .ok_or_else(|| item_not_found(list_id, item_id))?;

        let removed = items.remove(index);
        close_gap(items, removed.position);
        Ok(removed)
    }

    /// Set an item's completion flag. Setting the current value is allowed.
    pub fn set_item_done(&mut self, list_id: &str, item_id: &str, done: bool) -> DomainResult<Item> {
        let item = self
            .existing_items_mut(list_id, item_id)?
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or_else(|| item_not_found(list_id, item_id))?;

        item.done = done;
        Ok(item.clone())
    }

    /// Reorder within one sibling collection: the root lists when `scope`
    /// is `None`, otherwise the items of that list.
    pub fn apply_reposition(
        &mut self,
        scope: Option<&str>,
        moved_id: &str,
        source: u32,
        target: u32,
    ) -> DomainResult<Vec<PositionChange>> {
        match scope {
            None => reposition(&mut self.lists, moved_id, source, target),
            Some(list_id) => {
                let items = self.existing_items_mut(list_id, moved_id)?;
                reposition(items, moved_id, source, target)
            }
        }
    }

    /// Replace every list with a loaded snapshot
    pub fn replace_all(&mut self, mut lists: Vec<List>) {
        reindex(&mut lists);
        for list in lists.iter_mut() {
            if let Some(items) = list.items.as_mut() {
                reindex(items);
            }
        }
        self.lists = lists;
    }

    pub fn clear(&mut self) {
        self.lists.clear();
    }

    fn list_mut(&mut self, id: &str) -> DomainResult<&mut List> {
        self.lists
            .iter_mut()
            .find(|list| list.id == id)
            .ok_or_else(|| list_not_found(id))
    }

    /// Items of a list without creating a missing collection
    fn existing_items_mut(&mut self, list_id: &str, item_id: &str) -> DomainResult<&mut Vec<Item>> {
        self.list_mut(list_id)?
            .items
            .as_mut()
            .ok_or_else(|| item_not_found(list_id, item_id))
    }
}

fn validate_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::InvalidInput("Name must not be empty".to_string()));
    }
    Ok(name.to_string())
}

fn list_not_found(id: &str) -> DomainError {
    DomainError::NotFound(format!("List {} not found", id))
}

fn item_not_found(list_id: &str, item_id: &str) -> DomainError {
    DomainError::NotFound(format!("Item {} not found in list {}", item_id, list_id))
}
