use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Item, ItemId};

/// A root item together with its reconstructed comment thread.
///
/// `comments` is in parent-before-child order. Pages are superseded by a
/// later build, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemPage {
    pub item: Item,
    pub comments: Vec<Item>,
    pub cached_at: DateTime<Utc>,
}

impl ItemPage {
    pub fn new(item: Item, comments: Vec<Item>, cached_at: DateTime<Utc>) -> Self {
        Self {
            item,
            comments,
            cached_at,
        }
    }

    /// Comments paired with their nesting depth (top-level comments are 0).
    ///
    /// Children are grouped under their parent in the parent's `kids` order,
    /// which is the order a threaded view renders them in.
    pub fn thread(&self) -> Vec<(usize, &Item)> {
        let mut children: HashMap<ItemId, Vec<&Item>> = HashMap::new();
        for comment in &self.comments {
            if let Some(parent) = comment.parent_id() {
                children.entry(parent).or_default().push(comment);
            }
        }

        let mut out = Vec::with_capacity(self.comments.len());
        let mut stack: Vec<(usize, &Item)> = Self::ordered_children(&self.item, &children)
            .into_iter()
            .rev()
            .map(|c| (0, c))
            .collect();

        while let Some((depth, comment)) = stack.pop() {
            out.push((depth, comment));
            for child in Self::ordered_children(comment, &children).into_iter().rev() {
                stack.push((depth + 1, child));
            }
        }

        out
    }

    fn ordered_children<'a>(
        parent: &Item,
        children: &HashMap<ItemId, Vec<&'a Item>>,
    ) -> Vec<&'a Item> {
        let Some(found) = children.get(&parent.id) else {
            return Vec::new();
        };
        let mut found = found.clone();
        found.sort_by_key(|c| {
            parent
                .kids
                .iter()
                .position(|&k| k == c.id)
                .unwrap_or(usize::MAX)
        });
        found
    }
}

/// A comment paired with the story it belongs to.
///
/// `story` is `None` when the parent chain could not be resolved. Scores and
/// authors reflect the time of the fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentWithStory {
    pub comment: Item,
    pub story: Option<Item>,
}
