//! Process-local store implementing both store traits.
//!
//! Items and requests share one lock so a status change and its item update
//! are applied atomically, the same guarantee the Postgres repositories get
//! from a transaction.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, AppResult},
    models::{
        borrow_request::StatusChange, BorrowRequest, CreateItem, Item, ItemFilters,
        ItemSortField, ItemStatus, NewBorrowRequest, Page, PageRequest, RequestFilter,
        RequestStatus, SortDirection, UpdateItem,
    },
};

use super::{BorrowRequestStore, ItemStore};

#[derive(Default)]
struct State {
    items: BTreeMap<i64, Item>,
    requests: BTreeMap<i64, BorrowRequest>,
    last_item_id: i64,
    last_request_id: i64,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully-formed item, keeping its id. Used to seed fixtures.
    pub async fn insert_item(&self, item: Item) {
        let mut state = self.state.write().await;
        state.last_item_id = state.last_item_id.max(item.id);
        state.items.insert(item.id, item);
    }

    /// Insert a fully-formed request, keeping its id and status
    pub async fn insert_request(&self, request: BorrowRequest) {
        let mut state = self.state.write().await;
        state.last_request_id = state.last_request_id.max(request.id);
        state.requests.insert(request.id, request);
    }
}

/// Case-insensitive text order, raw text as tie-break
fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

fn compare_items(a: &Item, b: &Item, sort: ItemSortField) -> Ordering {
    let primary = match sort {
        ItemSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        ItemSortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
        ItemSortField::Title => compare_text(&a.title, &b.title),
        // NULLS LAST in both directions, as in the SQL ordering
        ItemSortField::Category => match (&a.category, &b.category) {
            (Some(x), Some(y)) => compare_text(x, y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        ItemSortField::Status => a.status.as_str().cmp(b.status.as_str()),
        ItemSortField::Id => Ordering::Equal,
    };
    primary.then(a.id.cmp(&b.id))
}

fn not_found_item(id: i64) -> AppError {
    AppError::NotFound(format!("Item with id {} not found", id))
}

fn not_found_request(id: i64) -> AppError {
    AppError::NotFound(format!("Borrow request with id {} not found", id))
}

#[async_trait]
impl ItemStore for MemoryStore {
    async fn get_by_id(&self, id: i64) -> AppResult<Item> {
        let state = self.state.read().await;
        state.items.get(&id).cloned().ok_or_else(|| not_found_item(id))
    }

    async fn find(&self, filters: &ItemFilters, page: &PageRequest) -> AppResult<Page<Item>> {
        let state = self.state.read().await;
        let mut matching: Vec<&Item> = state.items.values().filter(|i| filters.matches(i)).collect();

        matching.sort_by(|a, b| {
            let ord = compare_items(a, b, page.sort);
            match page.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => match (page.sort, &a.category, &b.category) {
                    // keep missing categories last when descending too
                    (ItemSortField::Category, Some(_), None) => Ordering::Less,
                    (ItemSortField::Category, None, Some(_)) => Ordering::Greater,
                    _ => ord.reverse(),
                },
            }
        });

        let total = matching.len() as i64;
        let skip = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(skip)
            .take(page.per_page as usize)
            .cloned()
            .collect();

        Ok(Page::new(items, total, page))
    }

    async fn create(&self, owner_id: i64, item: &CreateItem) -> AppResult<Item> {
        let mut state = self.state.write().await;
        state.last_item_id += 1;
        let now = Utc::now();
        let created = Item {
            id: state.last_item_id,
            owner_id,
            title: item.title.clone(),
            description: item.description.clone(),
            category: item.category.clone(),
            image_url: item.image_url.clone(),
            status: ItemStatus::Available,
            created_at: now,
            updated_at: now,
        };
        state.items.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, id: i64, changes: &UpdateItem) -> AppResult<Item> {
        let mut state = self.state.write().await;
        let item = state.items.get_mut(&id).ok_or_else(|| not_found_item(id))?;
        changes.apply_to(item);
        item.updated_at = Utc::now();
        Ok(item.clone())
    }

    async fn delete(&self, id: i64) -> AppResult<()> {
        let mut state = self.state.write().await;
        state.items.remove(&id).ok_or_else(|| not_found_item(id))?;
        state.requests.retain(|_, r| r.item_id != id);
        Ok(())
    }
}

#[async_trait]
impl BorrowRequestStore for MemoryStore {
    async fn get_by_id(&self, id: i64) -> AppResult<BorrowRequest> {
        let state = self.state.read().await;
        state.requests.get(&id).cloned().ok_or_else(|| not_found_request(id))
    }

    async fn find(&self, filter: &RequestFilter) -> AppResult<Vec<BorrowRequest>> {
        let state = self.state.read().await;
        let mut found: Vec<BorrowRequest> = state
            .requests
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(found)
    }

    async fn count(&self, filter: &RequestFilter) -> AppResult<i64> {
        let state = self.state.read().await;
        Ok(state.requests.values().filter(|r| filter.matches(r)).count() as i64)
    }

    async fn create(&self, request: &NewBorrowRequest) -> AppResult<BorrowRequest> {
        let mut state = self.state.write().await;
        if !state.items.contains_key(&request.item_id) {
            return Err(not_found_item(request.item_id));
        }
        state.last_request_id += 1;
        let now = Utc::now();
        let created = BorrowRequest {
            id: state.last_request_id,
            item_id: request.item_id,
            borrower_id: request.borrower_id,
            lender_id: request.lender_id,
            status: RequestStatus::Pending,
            request_message: request.request_message.clone(),
            response_message: None,
            borrow_date: request.borrow_date,
            return_date: request.return_date,
            returned_at: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
        };
        state.requests.insert(created.id, created.clone());
        Ok(created)
    }

    async fn apply_status_change(&self, change: &StatusChange) -> AppResult<BorrowRequest> {
        let mut state = self.state.write().await;

        let current = state
            .requests
            .get(&change.request_id)
            .ok_or_else(|| not_found_request(change.request_id))?;
        if current.status != change.expected {
            return Err(AppError::Conflict(format!(
                "Borrow request {} is no longer {}",
                change.request_id, change.expected
            )));
        }

        // Check the item guard before touching anything
        if let Some(item_change) = change.item {
            let item = state
                .items
                .get(&item_change.item_id)
                .ok_or_else(|| AppError::Conflict("Item is no longer available".to_string()))?;
            if let Some(expected) = item_change.expected {
                if item.status != expected {
                    return Err(AppError::Conflict("Item is no longer available".to_string()));
                }
            }
        }

        let now = Utc::now();
        if let Some(item_change) = change.item {
            if let Some(item) = state.items.get_mut(&item_change.item_id) {
                item.status = item_change.next;
                item.updated_at = now;
            }
        }

        let request = state
            .requests
            .get_mut(&change.request_id)
            .ok_or_else(|| not_found_request(change.request_id))?;
        request.status = change.next;
        if let Some(ref message) = change.response_message {
            request.response_message = Some(message.clone());
        }
        match change.next {
            RequestStatus::Returned => request.returned_at = Some(now),
            RequestStatus::Completed => request.completed_at = Some(now),
            _ => {}
        }
        request.updated_at = now;

        Ok(request.clone())
    }

    async fn delete_pending(&self, id: i64) -> AppResult<()> {
        let mut state = self.state.write().await;
        let status = state.requests.get(&id).map(|r| r.status);
        match status {
            Some(RequestStatus::Pending) => {
                state.requests.remove(&id);
                Ok(())
            }
            Some(_) => Err(AppError::Conflict(format!("Borrow request {} is not pending", id))),
            None => Err(not_found_request(id)),
        }
    }
}
