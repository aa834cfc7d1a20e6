//! Item Entity
//!
//! A named entry with a completion flag, owned by exactly one list.

use serde::{Deserialize, Deserializer, Serialize};
use super::entity::{Entity, Ranked};

/// A single entry of a list
///
/// Field names on the wire match the stored snapshots (`itemID`,
/// `itemName`, `isDone`, `domPos`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Unique within the owning list
    #[serde(rename = "itemID")]
    pub id: String,
    #[serde(rename = "itemName")]
    pub name: String,
    /// Completion status
    #[serde(rename = "isDone", default)]
    pub done: bool,
    /// Rank among the list's items
    #[serde(rename = "domPos", default, deserialize_with = "deserialize_rank")]
    pub position: u32,
}

impl Item {
    pub fn new(id: String, name: String, position: u32) -> Self {
        Self {
            id,
            name,
            done: false,
            position,
        }
    }
}

impl Entity for Item {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Ranked for Item {
    fn position(&self) -> u32 {
        self.position
    }

    fn set_position(&mut self, position: u32) {
        self.position = position;
    }
}

/// Accept a rank written as a number, a numeric string, or null.
///
/// Older snapshots stored ranks as strings; null and absent ranks become 0
/// and are renumbered from array order when loaded into the store.
pub(super) fn deserialize_rank<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawRank {
        Number(u32),
        Text(String),
    }

    match Option::<RawRank>::deserialize(deserializer)? {
        None => Ok(0),
        Some(RawRank::Number(n)) => Ok(n),
        Some(RawRank::Text(s)) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}
