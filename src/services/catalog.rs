//! Catalog service: item lookups, listings and owner-side item management

use validator::Validate;

use crate::{
    config::PaginationConfig,
    error::{AppError, AppResult},
    models::{
        CreateItem, Item, ItemFilters, ItemStatus, Page, PageQuery, PageRequest, UpdateItem,
    },
    repository::Repository,
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
    pagination: PaginationConfig,
}

impl CatalogService {
    pub fn new(repository: Repository, pagination: PaginationConfig) -> Self {
        Self {
            repository,
            pagination,
        }
    }

    /// Normalise caller pagination against configured limits
    pub fn page_request(&self, query: &PageQuery) -> PageRequest {
        self.pagination.resolve(query)
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub async fn items_by_status(&self, status: ItemStatus, page: &PageRequest) -> AppResult<Page<Item>> {
        self.repository.items.find(&ItemFilters::by_status(status), page).await
    }

    pub async fn items_by_owner(&self, owner_id: i64, page: &PageRequest) -> AppResult<Page<Item>> {
        self.repository.items.find(&ItemFilters::by_owner(owner_id), page).await
    }

    pub async fn items_by_category(&self, category: &str, page: &PageRequest) -> AppResult<Page<Item>> {
        self.repository.items.find(&ItemFilters::by_category(category), page).await
    }

    /// Case-insensitive substring search over title and description.
    /// The keyword is taken literally; an empty keyword matches everything.
    pub async fn search_items(&self, keyword: &str, page: &PageRequest) -> AppResult<Page<Item>> {
        self.repository.items.find(&ItemFilters::by_keyword(keyword), page).await
    }

    /// Optional status, category and keyword filters, AND-combined
    pub async fn find_items_with_filters(
        &self,
        status: Option<ItemStatus>,
        category: Option<String>,
        keyword: Option<String>,
        page: &PageRequest,
    ) -> AppResult<Page<Item>> {
        let filters = ItemFilters {
            status,
            category,
            keyword,
            ..Default::default()
        };
        self.repository.items.find(&filters, page).await
    }

    /// Public catalog listing: only available items unless a status is asked for
    pub async fn browse(&self, mut filters: ItemFilters, page: &PageRequest) -> AppResult<Page<Item>> {
        filters.status.get_or_insert(ItemStatus::Available);
        self.repository.items.find(&filters, page).await
    }

    /// Item totals per status
    pub async fn status_summary(&self) -> AppResult<Vec<(ItemStatus, i64)>> {
        let probe = PageRequest::new(1, 1);
        let mut summary = Vec::with_capacity(ItemStatus::ALL.len());
        for status in ItemStatus::ALL {
            let page = self.items_by_status(status, &probe).await?;
            summary.push((status, page.total));
        }
        Ok(summary)
    }

    // =========================================================================
    // ITEM MANAGEMENT
    // =========================================================================

    pub async fn get_item(&self, id: i64) -> AppResult<Item> {
        self.repository.items.get_by_id(id).await
    }

    /// Create a new item owned by `owner_id`
    pub async fn create_item(&self, owner_id: i64, item: CreateItem) -> AppResult<Item> {
        item.validate()?;
        let created = self.repository.items.create(owner_id, &item).await?;
        tracing::info!("Item {} created by user {}", created.id, owner_id);
        Ok(created)
    }

    /// Update an item; only its owner may do so
    pub async fn update_item(&self, id: i64, changes: UpdateItem, user_id: i64) -> AppResult<Item> {
        changes.validate()?;
        let item = self.repository.items.get_by_id(id).await?;
        if item.owner_id != user_id {
            return Err(AppError::Authorization(
                "You are not authorized to update this item".to_string(),
            ));
        }
        self.repository.items.update(id, &changes).await
    }

    /// Delete an item; only its owner may do so
    pub async fn delete_item(&self, id: i64, user_id: i64) -> AppResult<()> {
        let item = self.repository.items.get_by_id(id).await?;
        if item.owner_id != user_id {
            return Err(AppError::Authorization(
                "You are not authorized to delete this item".to_string(),
            ));
        }
        self.repository.items.delete(id).await?;
        tracing::info!("Item {} deleted by user {}", id, user_id);
        Ok(())
    }
}
