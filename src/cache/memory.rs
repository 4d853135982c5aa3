use std::collections::HashMap;
use std::sync::RwLock;

use crate::cache::ItemTier;
use crate::domain::{Item, ItemId};

/// Process-lifetime raw item tier. Never evicts.
#[derive(Debug, Default)]
pub struct MemoryItemTier {
    items: RwLock<HashMap<ItemId, Item>>,
}

impl MemoryItemTier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ItemTier for MemoryItemTier {
    fn get(&self, id: ItemId) -> Option<Item> {
        // a poisoned lock still holds whole items; writers never leave partial state
        let items = self.items.read().unwrap_or_else(|e| e.into_inner());
        items.get(&id).cloned()
    }

    fn put(&self, item: Item) {
        let mut items = self.items.write().unwrap_or_else(|e| e.into_inner());
        items.insert(item.id, item);
    }

    fn len(&self) -> usize {
        self.items.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}
