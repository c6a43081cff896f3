//! Data models for RentKar

pub mod borrow_request;
pub mod item;
pub mod pagination;

// Re-export commonly used types
pub use borrow_request::{
    BorrowRequest, CreateBorrowRequest, NewBorrowRequest, RequestFilter, RequestStatistics,
    RequestStatus,
};
pub use item::{CreateItem, Item, ItemFilters, ItemStatus, UpdateItem};
pub use pagination::{ItemSortField, Page, PageQuery, PageRequest, SortDirection};
