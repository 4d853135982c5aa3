use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::ItemId;

/// A public user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Case-sensitive username.
    pub id: String,
    /// Account creation time in unix seconds.
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub karma: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub about: Option<String>,
    /// Stories, comments and polls by this user, newest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub submitted: Vec<ItemId>,
}

impl User {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.created, 0).single()
    }

    pub fn display_about(&self) -> String {
        let Some(about) = self.about.as_deref() else {
            return String::new();
        };
        let about = about.replace("<p>", "\n\n").replace("</p>", "");
        html_escape::decode_html_entities(&about).into_owned()
    }

    /// Usernames are letters, digits, '-' and '_'.
    pub fn is_valid_name(name: &str) -> bool {
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }
}
