//! Business logic services

pub mod borrow_requests;
pub mod catalog;
pub mod stats;

use crate::{config::PaginationConfig, repository::Repository};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub catalog: catalog::CatalogService,
    pub borrow_requests: borrow_requests::BorrowRequestsService,
    pub stats: stats::StatsService,
}

impl Services {
    /// Create all services with the given repository
    pub fn new(repository: Repository, pagination: PaginationConfig) -> Self {
        Self {
            catalog: catalog::CatalogService::new(repository.clone(), pagination),
            borrow_requests: borrow_requests::BorrowRequestsService::new(repository.clone()),
            stats: stats::StatsService::new(repository),
        }
    }
}
