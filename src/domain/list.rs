//! List Entity
//!
//! A named, ranked collection of items. A freshly created list has no
//! item collection at all (`listItems: null` on the wire) until the first
//! item is added.

use serde::{Deserialize, Serialize};
use super::entity::{Entity, Ranked};
use super::item::{deserialize_rank, Item};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    /// Unique within the store
    #[serde(rename = "listID")]
    pub id: String,
    #[serde(rename = "listName")]
    pub name: String,
    /// Rank among all lists
    #[serde(rename = "domPos", default, deserialize_with = "deserialize_rank")]
    pub position: u32,
    #[serde(rename = "listItems", default)]
    pub items: Option<Vec<Item>>,
}

impl List {
    /// Create an empty list at the given rank
    pub fn new(id: String, name: String, position: u32) -> Self {
        Self {
            id,
            name,
            position,
            items: None,
        }
    }

    /// Items in storage order (empty when the list has none yet)
    pub fn items(&self) -> &[Item] {
        self.items.as_deref().unwrap_or(&[])
    }

    /// Mutable item collection, created on first use
    pub fn items_mut(&mut self) -> &mut Vec<Item> {
        self.items.get_or_insert_with(Vec::new)
    }

    pub fn item(&self, item_id: &str) -> Option<&Item> {
        self.items().iter().find(|item| item.id == item_id)
    }

    /// Items sorted by rank
    pub fn items_by_position(&self) -> Vec<&Item> {
        let mut items: Vec<&Item> = self.items().iter().collect();
        items.sort_by_key(|item| item.position);
        items
    }
}

impl Entity for List {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Ranked for List {
    fn position(&self) -> u32 {
        self.position
    }

    fn set_position(&mut self, position: u32) {
        self.position = position;
    }
}
