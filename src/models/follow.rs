//! Follow model

use serde::{Deserialize, Serialize};

/// A subscription of `user_id` to the recipes of `author_id`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Follow {
    pub id: i64,
    /// Follower
    pub user_id: i64,
    /// Followed author
    pub author_id: i64,
}
