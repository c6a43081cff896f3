//! Item (lendable object) model and related types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::error::AppError;

/// Item lending status. Persisted as upper-case text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemStatus {
    #[default]
    Available,
    Borrowed,
    Unavailable,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 3] = [
        ItemStatus::Available,
        ItemStatus::Borrowed,
        ItemStatus::Unavailable,
    ];

    /// Return the DB code for this status
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Available => "AVAILABLE",
            ItemStatus::Borrowed => "BORROWED",
            ItemStatus::Unavailable => "UNAVAILABLE",
        }
    }
}

impl std::str::FromStr for ItemStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AVAILABLE" => Ok(ItemStatus::Available),
            "BORROWED" => Ok(ItemStatus::Borrowed),
            "UNAVAILABLE" => Ok(ItemStatus::Unavailable),
            other => Err(AppError::Internal(format!("Unknown item status '{}'", other))),
        }
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Item model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub status: ItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Raw `items` row; status is text in the database
#[derive(Debug, FromRow)]
pub struct ItemRow {
    pub id: i64,
    pub owner_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<ItemRow> for Item {
    type Error = AppError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(Item {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            description: row.description,
            category: row.category,
            image_url: row.image_url,
            status: row.status.parse()?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Create item request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateItem {
    #[validate(length(min = 3, max = 200, message = "Title must be between 3 and 200 characters"))]
    pub title: String,
    pub description: Option<String>,
    #[validate(length(max = 100, message = "Category must not exceed 100 characters"))]
    pub category: Option<String>,
    pub image_url: Option<String>,
}

/// Update item request. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateItem {
    #[validate(length(min = 3, max = 200, message = "Title must be between 3 and 200 characters"))]
    pub title: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 100, message = "Category must not exceed 100 characters"))]
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub status: Option<ItemStatus>,
}

impl UpdateItem {
    /// Apply the present fields onto an item
    pub fn apply_to(&self, item: &mut Item) {
        if let Some(ref title) = self.title {
            item.title = title.clone();
        }
        if let Some(ref description) = self.description {
            item.description = Some(description.clone());
        }
        if let Some(ref category) = self.category {
            item.category = Some(category.clone());
        }
        if let Some(ref image_url) = self.image_url {
            item.image_url = Some(image_url.clone());
        }
        if let Some(status) = self.status {
            item.status = status;
        }
    }
}

/// Item filters. Each `None` imposes no constraint; present filters are AND-combined.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ItemFilters {
    pub status: Option<ItemStatus>,
    pub owner_id: Option<i64>,
    /// Exact, case-sensitive match
    pub category: Option<String>,
    /// Case-insensitive substring of title or description. Used literally,
    /// so an empty keyword matches every item.
    pub keyword: Option<String>,
}

impl ItemFilters {
    pub fn by_status(status: ItemStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn by_owner(owner_id: i64) -> Self {
        Self {
            owner_id: Some(owner_id),
            ..Default::default()
        }
    }

    pub fn by_category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
            ..Default::default()
        }
    }

    pub fn by_keyword(keyword: impl Into<String>) -> Self {
        Self {
            keyword: Some(keyword.into()),
            ..Default::default()
        }
    }

    /// Evaluate the filters against an in-memory item
    pub fn matches(&self, item: &Item) -> bool {
        if let Some(status) = self.status {
            if item.status != status {
                return false;
            }
        }
        if let Some(owner_id) = self.owner_id {
            if item.owner_id != owner_id {
                return false;
            }
        }
        if let Some(ref category) = self.category {
            if item.category.as_deref() != Some(category.as_str()) {
                return false;
            }
        }
        if let Some(ref keyword) = self.keyword {
            if !keyword_matches(item, keyword) {
                return false;
            }
        }
        true
    }
}

fn keyword_matches(item: &Item, keyword: &str) -> bool {
    let needle = keyword.to_lowercase();
    item.title.to_lowercase().contains(&needle)
        || item
            .description
            .as_deref()
            .map(|d| d.to_lowercase().contains(&needle))
            .unwrap_or(false)
}
