//! Repository layer for database operations

pub mod borrow_requests;
pub mod items;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{Pool, Postgres};

use crate::{
    error::AppResult,
    models::{
        BorrowRequest, CreateItem, Item, ItemFilters, NewBorrowRequest, Page, PageRequest,
        RequestFilter, UpdateItem,
    },
    models::borrow_request::StatusChange,
};

/// Storage for items
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Fails with `NotFound` for an unknown id
    async fn get_by_id(&self, id: i64) -> AppResult<Item>;

    /// One page of items matching all present filters
    async fn find(&self, filters: &ItemFilters, page: &PageRequest) -> AppResult<Page<Item>>;

    async fn create(&self, owner_id: i64, item: &CreateItem) -> AppResult<Item>;

    async fn update(&self, id: i64, changes: &UpdateItem) -> AppResult<Item>;

    async fn delete(&self, id: i64) -> AppResult<()>;
}

/// Storage for borrow requests
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BorrowRequestStore: Send + Sync {
    /// Fails with `NotFound` for an unknown id
    async fn get_by_id(&self, id: i64) -> AppResult<BorrowRequest>;

    /// All requests matching the filter, newest first
    async fn find(&self, filter: &RequestFilter) -> AppResult<Vec<BorrowRequest>>;

    async fn count(&self, filter: &RequestFilter) -> AppResult<i64>;

    async fn create(&self, request: &NewBorrowRequest) -> AppResult<BorrowRequest>;

    /// Apply a guarded transition, together with its item status change.
    /// Fails with `Conflict` when the request or item moved on meanwhile.
    async fn apply_status_change(&self, change: &StatusChange) -> AppResult<BorrowRequest>;

    /// Delete a request that is still pending
    async fn delete_pending(&self, id: i64) -> AppResult<()>;
}

/// Main repository struct holding the stores
#[derive(Clone)]
pub struct Repository {
    pub items: Arc<dyn ItemStore>,
    pub borrow_requests: Arc<dyn BorrowRequestStore>,
}

impl Repository {
    /// Create a new repository with the given database pool
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            items: Arc::new(items::ItemsRepository::new(pool.clone())),
            borrow_requests: Arc::new(borrow_requests::BorrowRequestsRepository::new(pool)),
        }
    }

    /// Repository backed by a process-local store
    pub fn in_memory() -> Self {
        Self::from_memory(memory::MemoryStore::new())
    }

    pub fn from_memory(store: memory::MemoryStore) -> Self {
        Self {
            items: Arc::new(store.clone()),
            borrow_requests: Arc::new(store),
        }
    }

    pub fn from_stores(items: Arc<dyn ItemStore>, borrow_requests: Arc<dyn BorrowRequestStore>) -> Self {
        Self {
            items,
            borrow_requests,
        }
    }
}
