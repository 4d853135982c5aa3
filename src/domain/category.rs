use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A remote listing of story IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Category {
    Top,
    New,
    Best,
    Ask,
    Show,
    Job,
}

impl Category {
    /// Default background refresh rotation.
    pub const ROTATION: [Category; 6] = [
        Category::Top,
        Category::New,
        Category::Best,
        Category::Ask,
        Category::Show,
        Category::Job,
    ];

    /// Name of the remote listing endpoint.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Category::Top => "topstories",
            Category::New => "newstories",
            Category::Best => "beststories",
            Category::Ask => "askstories",
            Category::Show => "showstories",
            Category::Job => "jobstories",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.endpoint())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "topstories" | "top" | "news" => Ok(Category::Top),
            "newstories" | "new" | "newest" => Ok(Category::New),
            // the past listing is served from the best listing
            "beststories" | "best" | "paststories" | "past" => Ok(Category::Best),
            "askstories" | "ask" => Ok(Category::Ask),
            "showstories" | "show" => Ok(Category::Show),
            "jobstories" | "job" | "jobs" => Ok(Category::Job),
            other => Err(format!("Unknown category: {}", other)),
        }
    }
}

impl TryFrom<String> for Category {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.endpoint().to_string()
    }
}
