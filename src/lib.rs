//! RentKar lending core
//!
//! Data access and input validation for a peer-to-peer item lending
//! application: item catalog queries, borrow request queries and workflow,
//! dashboard counts, and the borrow date validators.

pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;
pub mod validation;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use repository::Repository;
pub use services::Services;
