//! Wire names of the operations exposed over HTTP.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Closed set of router actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageAction {
    Create,
    Read,
    Update,
    Remove,
    List,
    GetAll,
    Count,
}

impl StorageAction {
    pub const ALL: [StorageAction; 7] = [
        StorageAction::Create,
        StorageAction::Read,
        StorageAction::Update,
        StorageAction::Remove,
        StorageAction::List,
        StorageAction::GetAll,
        StorageAction::Count,
    ];

    /// Path segment used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageAction::Create => "create",
            StorageAction::Read => "read",
            StorageAction::Update => "update",
            StorageAction::Remove => "remove",
            StorageAction::List => "list",
            StorageAction::GetAll => "getAll",
            StorageAction::Count => "count",
        }
    }
}

impl fmt::Display for StorageAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StorageAction::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| format!("Unknown action: {s}"))
    }
}
