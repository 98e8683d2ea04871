use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::models::{Category, ContentItem, ContentStatus};

use super::{next_id, StoreError};

pub struct NewContentItem {
    pub name: String,
    pub category: Category,
    pub size: String,
    pub status: ContentStatus,
    pub tags: Vec<String>,
    pub file_path: String,
    pub version: String,
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPatch {
    pub name: Option<String>,
    pub category: Option<Category>,
    pub description: Option<String>,
    pub status: Option<ContentStatus>,
    pub tags: Option<Vec<String>>,
    pub version: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentStats {
    pub total: u64,
    pub by_status: StatusBuckets,
    pub by_category: CategoryBuckets,
}

#[derive(Debug, Default, Serialize)]
pub struct StatusBuckets {
    pub draft: u64,
    pub pending: u64,
    pub approved: u64,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CategoryBuckets {
    pub documents: u64,
    pub images: u64,
    pub videos: u64,
    pub audio: u64,
    pub other: u64,
}

/// In-memory table of uploaded-content records. All read-modify-write
/// sequences run under one lock so id assignment never races.
#[derive(Default)]
pub struct ContentStore {
    items: RwLock<Vec<ContentItem>>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> Vec<ContentItem> {
        self.items.read().clone()
    }

    pub fn get(&self, id: u64) -> Result<ContentItem, StoreError> {
        self.items
            .read()
            .iter()
            .find(|item| item.id == id)
            .cloned()
            .ok_or(StoreError::NotFound("content item"))
    }

    pub fn create(&self, new: NewContentItem) -> ContentItem {
        let mut items = self.items.write();
        let item = new_item(new, next_id(items.iter().map(|item| item.id)));
        items.push(item.clone());
        item
    }

    /// Batch insert under a single lock: ids come out contiguous even with
    /// concurrent uploads in flight.
    pub fn create_bulk(&self, batch: Vec<NewContentItem>) -> Vec<ContentItem> {
        let mut items = self.items.write();
        let base = next_id(items.iter().map(|item| item.id));
        let mut created = Vec::with_capacity(batch.len());
        for (offset, new) in batch.into_iter().enumerate() {
            let item = new_item(new, base + offset as u64);
            items.push(item.clone());
            created.push(item);
        }
        created
    }

    pub fn update(&self, id: u64, patch: ContentPatch) -> Result<ContentItem, StoreError> {
        let mut items = self.items.write();
        let item = items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(StoreError::NotFound("content item"))?;
        if let Some(name) = patch.name {
            item.name = name;
        }
        if let Some(category) = patch.category {
            item.category = category;
        }
        if let Some(description) = patch.description {
            item.description = description;
        }
        if let Some(status) = patch.status {
            item.status = status;
        }
        if let Some(tags) = patch.tags {
            item.tags = tags;
        }
        if let Some(version) = patch.version {
            item.version = version;
        }
        item.modified = Utc::now().date_naive();
        Ok(item.clone())
    }

    pub fn delete(&self, id: u64) -> Result<ContentItem, StoreError> {
        let mut items = self.items.write();
        let position = items
            .iter()
            .position(|item| item.id == id)
            .ok_or(StoreError::NotFound("content item"))?;
        Ok(items.remove(position))
    }

    pub fn search(&self, query: &str) -> Vec<ContentItem> {
        let needle = query.to_lowercase();
        self.items
            .read()
            .iter()
            .filter(|item| {
                item.name.to_lowercase().contains(&needle)
                    || item.category.as_str().to_lowercase().contains(&needle)
                    || item.description.to_lowercase().contains(&needle)
                    || item.tags.iter().any(|tag| tag.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect()
    }

    pub fn stats(&self) -> ContentStats {
        let items = self.items.read();
        let mut by_status = StatusBuckets::default();
        let mut by_category = CategoryBuckets::default();
        for item in items.iter() {
            match item.status {
                ContentStatus::Draft => by_status.draft += 1,
                ContentStatus::Pending => by_status.pending += 1,
                ContentStatus::Approved => by_status.approved += 1,
            }
            match item.category {
                Category::Documents => by_category.documents += 1,
                Category::Images => by_category.images += 1,
                Category::Videos => by_category.videos += 1,
                Category::Audio => by_category.audio += 1,
                Category::Other => by_category.other += 1,
            }
        }
        ContentStats {
            total: items.len() as u64,
            by_status,
            by_category,
        }
    }
}

fn new_item(new: NewContentItem, id: u64) -> ContentItem {
    ContentItem {
        id,
        name: new.name,
        category: new.category,
        size: new.size,
        modified: Utc::now().date_naive(),
        status: new.status,
        tags: new.tags,
        file_path: new.file_path,
        version: new.version,
        description: new.description,
    }
}
