//! Items repository for database operations.
//!
//! Listing queries share one filter renderer so that every lookup (by status,
//! owner, category, keyword or any combination) has the same predicate
//! semantics. All caller values are bound, never interpolated.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        item::ItemRow, CreateItem, Item, ItemFilters, ItemStatus, Page, PageRequest, UpdateItem,
    },
};

use super::ItemStore;

const ITEM_COLUMNS: &str =
    "id, owner_id, title, description, category, image_url, status, created_at, updated_at";

/// Append ` AND ...` clauses for each present filter
fn push_item_filters(builder: &mut QueryBuilder<'_, Postgres>, filters: &ItemFilters) {
    if let Some(status) = filters.status {
        builder.push(" AND status = ");
        builder.push_bind(status.as_str());
    }
    if let Some(owner_id) = filters.owner_id {
        builder.push(" AND owner_id = ");
        builder.push_bind(owner_id);
    }
    if let Some(ref category) = filters.category {
        builder.push(" AND category = ");
        builder.push_bind(category.clone());
    }
    if let Some(ref keyword) = filters.keyword {
        // position() keeps the keyword literal: no LIKE wildcards to escape.
        // Both sides go through lower() so they fold the same way.
        builder.push(" AND (position(lower(");
        builder.push_bind(keyword.clone());
        builder.push(") in lower(title)) > 0 OR position(lower(");
        builder.push_bind(keyword.clone());
        builder.push(") in lower(COALESCE(description, ''))) > 0)");
    }
}

#[derive(Clone)]
pub struct ItemsRepository {
    pool: Pool<Postgres>,
}

impl ItemsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ItemStore for ItemsRepository {
    /// Get item by ID
    async fn get_by_id(&self, id: i64) -> AppResult<Item> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            "SELECT {} FROM items WHERE id = $1",
            ITEM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))?;

        row.try_into()
    }

    /// Filtered, sorted and paginated item listing
    async fn find(&self, filters: &ItemFilters, page: &PageRequest) -> AppResult<Page<Item>> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM items WHERE 1=1");
        push_item_filters(&mut count, filters);
        let (total,): (i64,) = count.build_query_as().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM items WHERE 1=1",
            ITEM_COLUMNS
        ));
        push_item_filters(&mut select, filters);
        let direction = page.direction.as_sql();
        select.push(format!(
            " ORDER BY {} {} NULLS LAST, id {}",
            page.sort.as_column(),
            direction,
            direction
        ));
        select.push(" LIMIT ");
        select.push_bind(page.per_page);
        select.push(" OFFSET ");
        select.push_bind(page.offset());

        let rows: Vec<ItemRow> = select.build_query_as().fetch_all(&self.pool).await?;
        let items = rows
            .into_iter()
            .map(Item::try_from)
            .collect::<AppResult<Vec<_>>>()?;

        tracing::debug!(
            "Item query {:?} page {} returned {}/{} items",
            filters,
            page.page,
            items.len(),
            total
        );

        Ok(Page::new(items, total, page))
    }

    /// Create a new item; new items are always available
    async fn create(&self, owner_id: i64, item: &CreateItem) -> AppResult<Item> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            INSERT INTO items (owner_id, title, description, category, image_url, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(owner_id)
        .bind(&item.title)
        .bind(&item.description)
        .bind(&item.category)
        .bind(&item.image_url)
        .bind(ItemStatus::Available.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    /// Update an existing item, keeping absent fields
    async fn update(&self, id: i64, changes: &UpdateItem) -> AppResult<Item> {
        let row = sqlx::query_as::<_, ItemRow>(&format!(
            r#"
            UPDATE items SET
                title = COALESCE($2, title),
                description = COALESCE($3, description),
                category = COALESCE($4, category),
                image_url = COALESCE($5, image_url),
                status = COALESCE($6, status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ITEM_COLUMNS
        ))
        .bind(id)
        .bind(&changes.title)
        .bind(&changes.description)
        .bind(&changes.category)
        .bind(&changes.image_url)
        .bind(changes.status.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Item with id {} not found", id)))?;

        row.try_into()
    }

    /// Delete an item (its borrow requests go with it)
    async fn delete(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Item with id {} not found", id)));
        }

        Ok(())
    }
}
