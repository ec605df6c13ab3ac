//! Snapshot row types. Field names are the on-disk JSON keys.
//! Distinct from clandestine-types API bodies to keep the storage layer independent.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
    pub id: u64,
    pub username: String,
    pub invite_token: String,
    pub created_at: i64,
    #[serde(default)]
    pub session_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRow {
    pub id: u64,
    pub user_id: u64,
    pub content: String,
    pub created_at: i64,
    pub expires_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteRow {
    pub token: String,
    pub created_at: i64,
    #[serde(default, deserialize_with = "flag")]
    pub used: bool,
    #[serde(default)]
    pub used_at: Option<i64>,
}

/// A post joined with its author's username, as shown in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedPost {
    pub id: u64,
    pub user_id: u64,
    pub username: String,
    pub content: String,
    pub created_at: i64,
    pub expires_at: i64,
}

// Older snapshots store `used` as 0/1.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(n) => n != 0,
    })
}
