//! Pagination and sorting for item listings

use serde::{Deserialize, Serialize};

use crate::config::PaginationConfig;

/// Sortable item columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    Category,
    Status,
    Id,
}

impl ItemSortField {
    pub fn as_column(&self) -> &'static str {
        match self {
            ItemSortField::CreatedAt => "created_at",
            ItemSortField::UpdatedAt => "updated_at",
            ItemSortField::Title => "title",
            ItemSortField::Category => "category",
            ItemSortField::Status => "status",
            ItemSortField::Id => "id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Raw pagination parameters as supplied by a caller
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub sort: Option<ItemSortField>,
    pub direction: Option<SortDirection>,
}

/// Normalised page request: 1-based page, bounded page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
    pub sort: ItemSortField,
    pub direction: SortDirection,
}

impl PageRequest {
    pub fn new(page: i64, per_page: i64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
            sort: ItemSortField::default(),
            direction: SortDirection::default(),
        }
    }

    pub fn sorted(mut self, sort: ItemSortField, direction: SortDirection) -> Self {
        self.sort = sort;
        self.direction = direction;
        self
    }

    /// Rows to skip; saturates instead of overflowing on huge page numbers
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl PaginationConfig {
    /// Resolve caller parameters against the configured defaults and limits
    pub fn resolve(&self, query: &PageQuery) -> PageRequest {
        let per_page = query
            .per_page
            .unwrap_or(self.default_per_page)
            .clamp(1, self.max_per_page.max(1));
        PageRequest::new(query.page.unwrap_or(1), per_page).sorted(
            query.sort.unwrap_or_default(),
            query.direction.unwrap_or_default(),
        )
    }
}

/// One page of results plus what is needed to fetch the next one
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: &PageRequest) -> Self {
        let total_pages = if total == 0 {
            0
        } else {
            (total + request.per_page - 1) / request.per_page
        };
        Self {
            items,
            total,
            page: request.page,
            per_page: request.per_page,
            total_pages,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}
