//! Borrow request model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::{Validate, ValidationErrors};

use crate::error::AppError;
use crate::validation;

/// Borrow request lifecycle status. Persisted as upper-case text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Returned,
    Completed,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 5] = [
        RequestStatus::Pending,
        RequestStatus::Approved,
        RequestStatus::Rejected,
        RequestStatus::Returned,
        RequestStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "PENDING",
            RequestStatus::Approved => "APPROVED",
            RequestStatus::Rejected => "REJECTED",
            RequestStatus::Returned => "RETURNED",
            RequestStatus::Completed => "COMPLETED",
        }
    }

    /// No further transitions leave a terminal status
    pub fn is_terminal(&self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::Completed)
    }
}

impl std::str::FromStr for RequestStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(RequestStatus::Pending),
            "APPROVED" => Ok(RequestStatus::Approved),
            "REJECTED" => Ok(RequestStatus::Rejected),
            "RETURNED" => Ok(RequestStatus::Returned),
            "COMPLETED" => Ok(RequestStatus::Completed),
            other => Err(AppError::Internal(format!("Unknown request status '{}'", other))),
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Borrow request model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorrowRequest {
    pub id: i64,
    pub item_id: i64,
    pub borrower_id: i64,
    pub lender_id: i64,
    pub status: RequestStatus,
    pub request_message: Option<String>,
    pub response_message: Option<String>,
    pub borrow_date: NaiveDate,
    pub return_date: NaiveDate,
    pub returned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BorrowRequest {
    /// Whether the user takes part in this request as borrower or lender
    pub fn involves(&self, user_id: i64) -> bool {
        self.borrower_id == user_id || self.lender_id == user_id
    }
}

/// Raw `borrow_requests` row
#[derive(Debug, FromRow)]
pub struct BorrowRequestRow {
    pub id: i64,
    pub item_id: i64,
    pub borrower_id: i64,
    pub lender_id: i64,
    pub status: String,
    pub request_message: Option<String>,
    pub response_message: Option<String>,
    pub borrow_date: NaiveDate,
    pub return_date: NaiveDate,
    pub returned_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BorrowRequestRow> for BorrowRequest {
    type Error = AppError;

    fn try_from(row: BorrowRequestRow) -> Result<Self, Self::Error> {
        Ok(BorrowRequest {
            id: row.id,
            item_id: row.item_id,
            borrower_id: row.borrower_id,
            lender_id: row.lender_id,
            status: row.status.parse()?,
            request_message: row.request_message,
            response_message: row.response_message,
            borrow_date: row.borrow_date,
            return_date: row.return_date,
            returned_at: row.returned_at,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Borrow request input as submitted by a borrower.
///
/// Field rules (presence, message length) come from the derive; the date
/// rules run through [`CreateBorrowRequest::validate_on`].
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBorrowRequest {
    #[validate(required(message = "Borrow date is required"))]
    pub borrow_date: Option<NaiveDate>,
    #[validate(required(message = "Return date is required"))]
    pub return_date: Option<NaiveDate>,
    #[validate(length(max = 500, message = "Request message must not exceed 500 characters"))]
    pub request_message: Option<String>,
}

impl CreateBorrowRequest {
    /// Run field rules and date rules, with `today` as the reference date
    pub fn validate_on(&self, today: NaiveDate) -> Result<(), ValidationErrors> {
        let field_result = self.validate();
        let mut failed = field_result.is_err();
        let mut errors = field_result.err().unwrap_or_else(ValidationErrors::new);

        if !validation::not_past_date_on(self.borrow_date, today) {
            errors.add(
                "borrow_date",
                validation::error("not_past_date", "Borrow date cannot be in the past"),
            );
            failed = true;
        }
        if !validation::valid_date_range(self.borrow_date, self.return_date) {
            errors.add(
                "return_date",
                validation::error("valid_date_range", "Return date must be after borrow date"),
            );
            failed = true;
        }

        if failed {
            Err(errors)
        } else {
            Ok(())
        }
    }
}

/// Validated borrow request ready to be stored
#[derive(Debug, Clone)]
pub struct NewBorrowRequest {
    pub item_id: i64,
    pub borrower_id: i64,
    pub lender_id: i64,
    pub borrow_date: NaiveDate,
    pub return_date: NaiveDate,
    pub request_message: Option<String>,
}

/// Borrow request filters, AND-combined; `None` means unconstrained
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RequestFilter {
    pub borrower_id: Option<i64>,
    pub lender_id: Option<i64>,
    pub item_id: Option<i64>,
    pub status: Option<RequestStatus>,
}

impl RequestFilter {
    pub fn borrower(borrower_id: i64) -> Self {
        Self {
            borrower_id: Some(borrower_id),
            ..Default::default()
        }
    }

    pub fn lender(lender_id: i64) -> Self {
        Self {
            lender_id: Some(lender_id),
            ..Default::default()
        }
    }

    pub fn item(item_id: i64) -> Self {
        Self {
            item_id: Some(item_id),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: RequestStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, request: &BorrowRequest) -> bool {
        self.borrower_id.map_or(true, |id| request.borrower_id == id)
            && self.lender_id.map_or(true, |id| request.lender_id == id)
            && self.item_id.map_or(true, |id| request.item_id == id)
            && self.status.map_or(true, |s| request.status == s)
    }
}

/// Item status update applied together with a request transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemStatusChange {
    pub item_id: i64,
    /// Required current status, if any
    pub expected: Option<super::item::ItemStatus>,
    pub next: super::item::ItemStatus,
}

/// Guarded status transition of a borrow request.
///
/// Applied only while the request is still in `expected`. Moving to
/// `Returned` stamps `returned_at`, moving to `Completed` stamps `completed_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub request_id: i64,
    pub expected: RequestStatus,
    pub next: RequestStatus,
    pub response_message: Option<String>,
    pub item: Option<ItemStatusChange>,
}

/// Per-user dashboard counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestStatistics {
    pub pending_count: i64,
    pub approved_count: i64,
    pub rejected_count: i64,
    pub returned_count: i64,
    pub completed_count: i64,
    pub total_sent: i64,
    pub total_received: i64,
}
