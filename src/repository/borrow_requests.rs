//! Borrow requests repository for database operations

use async_trait::async_trait;
use sqlx::{Pool, Postgres, QueryBuilder};

use crate::{
    error::{AppError, AppResult},
    models::{
        borrow_request::{BorrowRequestRow, StatusChange},
        BorrowRequest, NewBorrowRequest, RequestFilter, RequestStatus,
    },
};

use super::BorrowRequestStore;

const REQUEST_COLUMNS: &str = "id, item_id, borrower_id, lender_id, status, request_message, \
     response_message, borrow_date, return_date, returned_at, completed_at, created_at, updated_at";

fn push_request_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &RequestFilter) {
    if let Some(borrower_id) = filter.borrower_id {
        builder.push(" AND borrower_id = ");
        builder.push_bind(borrower_id);
    }
    if let Some(lender_id) = filter.lender_id {
        builder.push(" AND lender_id = ");
        builder.push_bind(lender_id);
    }
    if let Some(item_id) = filter.item_id {
        builder.push(" AND item_id = ");
        builder.push_bind(item_id);
    }
    if let Some(status) = filter.status {
        builder.push(" AND status = ");
        builder.push_bind(status.as_str());
    }
}

#[derive(Clone)]
pub struct BorrowRequestsRepository {
    pool: Pool<Postgres>,
}

impl BorrowRequestsRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BorrowRequestStore for BorrowRequestsRepository {
    /// Get request by ID
    async fn get_by_id(&self, id: i64) -> AppResult<BorrowRequest> {
        let row = sqlx::query_as::<_, BorrowRequestRow>(&format!(
            "SELECT {} FROM borrow_requests WHERE id = $1",
            REQUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Borrow request with id {} not found", id)))?;

        row.try_into()
    }

    async fn find(&self, filter: &RequestFilter) -> AppResult<Vec<BorrowRequest>> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM borrow_requests WHERE 1=1",
            REQUEST_COLUMNS
        ));
        push_request_filter(&mut builder, filter);
        builder.push(" ORDER BY created_at DESC, id DESC");

        let rows: Vec<BorrowRequestRow> = builder.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(BorrowRequest::try_from).collect()
    }

    async fn count(&self, filter: &RequestFilter) -> AppResult<i64> {
        let mut builder =
            QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM borrow_requests WHERE 1=1");
        push_request_filter(&mut builder, filter);

        let (count,): (i64,) = builder.build_query_as().fetch_one(&self.pool).await?;
        Ok(count)
    }

    /// Create a new pending request
    async fn create(&self, request: &NewBorrowRequest) -> AppResult<BorrowRequest> {
        let row = sqlx::query_as::<_, BorrowRequestRow>(&format!(
            r#"
            INSERT INTO borrow_requests (
                item_id, borrower_id, lender_id, status, request_message, borrow_date, return_date
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(request.item_id)
        .bind(request.borrower_id)
        .bind(request.lender_id)
        .bind(RequestStatus::Pending.as_str())
        .bind(&request.request_message)
        .bind(request.borrow_date)
        .bind(request.return_date)
        .fetch_one(&self.pool)
        .await?;

        row.try_into()
    }

    /// Apply a status transition and its item change in one transaction
    async fn apply_status_change(&self, change: &StatusChange) -> AppResult<BorrowRequest> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, BorrowRequestRow>(&format!(
            r#"
            UPDATE borrow_requests SET
                status = $3,
                response_message = COALESCE($4, response_message),
                returned_at = CASE WHEN $3 = 'RETURNED' THEN NOW() ELSE returned_at END,
                completed_at = CASE WHEN $3 = 'COMPLETED' THEN NOW() ELSE completed_at END,
                updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(change.request_id)
        .bind(change.expected.as_str())
        .bind(change.next.as_str())
        .bind(&change.response_message)
        .fetch_optional(&mut *tx)
        .await?;

        let row = match row {
            Some(row) => row,
            None => {
                // Distinguish a missing request from one that moved on
                let exists: bool = sqlx::query_scalar(
                    "SELECT EXISTS(SELECT 1 FROM borrow_requests WHERE id = $1)",
                )
                .bind(change.request_id)
                .fetch_one(&mut *tx)
                .await?;
                return Err(if exists {
                    AppError::Conflict(format!(
                        "Borrow request {} is no longer {}",
                        change.request_id, change.expected
                    ))
                } else {
                    AppError::NotFound(format!(
                        "Borrow request with id {} not found",
                        change.request_id
                    ))
                });
            }
        };

        if let Some(item) = change.item {
            let result = sqlx::query(
                r#"
                UPDATE items SET status = $2, updated_at = NOW()
                WHERE id = $1 AND ($3::text IS NULL OR status = $3)
                "#,
            )
            .bind(item.item_id)
            .bind(item.next.as_str())
            .bind(item.expected.map(|s| s.as_str()))
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                return Err(AppError::Conflict("Item is no longer available".to_string()));
            }
        }

        tx.commit().await?;

        tracing::info!(
            "Borrow request {} moved {} -> {}",
            change.request_id,
            change.expected,
            change.next
        );

        row.try_into()
    }

    /// Delete a pending request
    async fn delete_pending(&self, id: i64) -> AppResult<()> {
        let result = sqlx::query("DELETE FROM borrow_requests WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(RequestStatus::Pending.as_str())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            // Existing request with a later status, or no request at all
            self.get_by_id(id).await?;
            return Err(AppError::Conflict(format!(
                "Borrow request {} is not pending",
                id
            )));
        }

        Ok(())
    }
}
