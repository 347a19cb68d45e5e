//! User model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A GitLab user known to the bot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct User {
    /// GitLab user ID.
    pub id: i64,

    pub username: String,

    /// Display name.
    pub name: String,

    /// Email, doubling as the user's chat identity.
    pub email: Option<String>,

    /// Maintained outside the bot; vacationing users are never picked.
    pub on_vacation: bool,
}

impl User {
    /// Chat identifier for direct messages, if the user has one.
    pub fn dm_target(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.trim().is_empty())
    }

    /// How the user is referenced in chat text.
    ///
    /// Falls back to the plain display name when there is no chat identity.
    pub fn mention(&self) -> String {
        match self.dm_target() {
            Some(email) => format!("@[{}]", email),
            None => self.name.clone(),
        }
    }
}
