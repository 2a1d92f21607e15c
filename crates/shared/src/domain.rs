use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl ItemId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single to-do record.
///
/// `id` stays `None` until the backend has accepted the create call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ItemId>,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Item {
    pub fn is_confirmed(&self) -> bool {
        self.id.is_some()
    }

    pub fn has_id(&self, id: &ItemId) -> bool {
        self.id.as_ref() == Some(id)
    }
}

/// Create input. Only constructible with both fields non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub description: String,
    pub completed: bool,
}

impl NewItem {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Option<Self> {
        let name = name.into();
        let description = description.into();
        if name.is_empty() || description.is_empty() {
            return None;
        }

        Some(Self {
            name,
            description,
            completed: false,
        })
    }

    /// Local stand-in shown until the backend assigns an id.
    pub fn to_pending_item(&self) -> Item {
        Item {
            id: None,
            name: self.name.clone(),
            description: self.description.clone(),
            completed: self.completed,
            created_at: None,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPatch {
    pub id: ItemId,
    pub completed: bool,
}

#[cfg(test)]
#[path = "tests/domain_tests.rs"]
mod tests;
