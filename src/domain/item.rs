use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Identifier assigned by the remote source.
pub type ItemId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Story,
    Comment,
    Job,
    Poll,
    #[serde(rename = "pollopt")]
    PollOption,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Story => "story",
            ItemKind::Comment => "comment",
            ItemKind::Job => "job",
            ItemKind::Poll => "poll",
            ItemKind::PollOption => "pollopt",
            ItemKind::Unknown => "unknown",
        }
    }

    /// Kinds that appear on a category listing.
    pub fn is_listable(&self) -> bool {
        matches!(self, ItemKind::Story | ItemKind::Job)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteDirection {
    #[default]
    Unvoted,
    Up,
    Down,
}

/// A node in the remote content tree.
///
/// Field names follow the remote JSON payload so items deserialize directly
/// from the API and round-trip through the persisted cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(rename = "type", default)]
    pub kind: ItemKind,
    #[serde(default)]
    pub by: String,
    /// Creation time in unix seconds.
    #[serde(default)]
    pub time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poll: Option<ItemId>,
    /// Child IDs in the remote source's display order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub kids: Vec<ItemId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<ItemId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default)]
    pub score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub descendants: u64,
    /// 1-based position within a category listing; 0 when unranked.
    #[serde(default)]
    pub rank: usize,
    #[serde(default)]
    pub vote: VoteDirection,
    #[serde(default)]
    pub dead: bool,
    #[serde(default)]
    pub deleted: bool,
}

impl Item {
    pub fn new(id: ItemId, kind: ItemKind) -> Self {
        Self {
            id,
            kind,
            by: String::new(),
            time: 0,
            text: None,
            parent: None,
            poll: None,
            kids: Vec::new(),
            parts: Vec::new(),
            url: None,
            score: 0,
            title: None,
            descendants: 0,
            rank: 0,
            vote: VoteDirection::default(),
            dead: false,
            deleted: false,
        }
    }

    /// Parent ID, treating `0` the same as absent.
    pub fn parent_id(&self) -> Option<ItemId> {
        self.parent.filter(|&p| p != 0)
    }

    /// True for the top of a thread: a story, or anything without a parent.
    pub fn is_root(&self) -> bool {
        self.kind == ItemKind::Story || self.parent_id().is_none()
    }

    /// Dead and deleted items are hidden from reconstructed threads.
    pub fn is_visible(&self) -> bool {
        !self.dead && !self.deleted
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.time, 0).single()
    }

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or("(Untitled)")
    }

    /// Body text with HTML entities decoded and paragraph tags turned into
    /// blank lines.
    pub fn display_text(&self) -> String {
        let Some(text) = self.text.as_deref() else {
            return String::new();
        };
        let text = text.replace("<p>", "\n\n").replace("</p>", "");
        html_escape::decode_html_entities(&text).into_owned()
    }
}
