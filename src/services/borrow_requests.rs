//! Borrow request service: request queries, dashboard counts and the lending workflow

use chrono::NaiveDate;

use crate::{
    error::{AppError, AppResult},
    models::{
        borrow_request::{ItemStatusChange, StatusChange},
        BorrowRequest, CreateBorrowRequest, ItemStatus, NewBorrowRequest, RequestFilter,
        RequestStatus,
    },
    repository::Repository,
    validation,
};

/// Keep a response message only if it has visible content
fn non_blank(message: Option<String>) -> Option<String> {
    message.filter(|m| !m.trim().is_empty())
}

#[derive(Clone)]
pub struct BorrowRequestsService {
    repository: Repository,
}

impl BorrowRequestsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    pub async fn requests_by_borrower(&self, borrower_id: i64) -> AppResult<Vec<BorrowRequest>> {
        self.repository.borrow_requests.find(&RequestFilter::borrower(borrower_id)).await
    }

    pub async fn requests_by_lender(&self, lender_id: i64) -> AppResult<Vec<BorrowRequest>> {
        self.repository.borrow_requests.find(&RequestFilter::lender(lender_id)).await
    }

    pub async fn requests_by_borrower_and_status(
        &self,
        borrower_id: i64,
        status: RequestStatus,
    ) -> AppResult<Vec<BorrowRequest>> {
        let filter = RequestFilter::borrower(borrower_id).with_status(status);
        self.repository.borrow_requests.find(&filter).await
    }

    pub async fn requests_by_lender_and_status(
        &self,
        lender_id: i64,
        status: RequestStatus,
    ) -> AppResult<Vec<BorrowRequest>> {
        let filter = RequestFilter::lender(lender_id).with_status(status);
        self.repository.borrow_requests.find(&filter).await
    }

    pub async fn requests_by_item(&self, item_id: i64) -> AppResult<Vec<BorrowRequest>> {
        self.repository.borrow_requests.find(&RequestFilter::item(item_id)).await
    }

    /// Pending requests awaiting this lender's answer
    pub async fn count_pending_for_lender(&self, lender_id: i64) -> AppResult<i64> {
        let filter = RequestFilter::lender(lender_id).with_status(RequestStatus::Pending);
        self.repository.borrow_requests.count(&filter).await
    }

    pub async fn count_by_borrower_and_status(&self, borrower_id: i64, status: RequestStatus) -> AppResult<i64> {
        let filter = RequestFilter::borrower(borrower_id).with_status(status);
        self.repository.borrow_requests.count(&filter).await
    }

    pub async fn count_by_lender_and_status(&self, lender_id: i64, status: RequestStatus) -> AppResult<i64> {
        let filter = RequestFilter::lender(lender_id).with_status(status);
        self.repository.borrow_requests.count(&filter).await
    }

    /// Requests sent by a borrower, optionally narrowed to one status
    pub async fn sent_requests(
        &self,
        borrower_id: i64,
        status: Option<RequestStatus>,
    ) -> AppResult<Vec<BorrowRequest>> {
        match status {
            Some(status) => self.requests_by_borrower_and_status(borrower_id, status).await,
            None => self.requests_by_borrower(borrower_id).await,
        }
    }

    /// Requests received by a lender, optionally narrowed to one status
    pub async fn received_requests(
        &self,
        lender_id: i64,
        status: Option<RequestStatus>,
    ) -> AppResult<Vec<BorrowRequest>> {
        match status {
            Some(status) => self.requests_by_lender_and_status(lender_id, status).await,
            None => self.requests_by_lender(lender_id).await,
        }
    }

    /// Get a request visible to its borrower or lender
    pub async fn get_request(&self, id: i64, user_id: i64) -> AppResult<BorrowRequest> {
        let request = self.repository.borrow_requests.get_by_id(id).await?;
        if !request.involves(user_id) {
            return Err(AppError::Authorization(
                "Not authorized to view this request".to_string(),
            ));
        }
        Ok(request)
    }

    // =========================================================================
    // WORKFLOW
    // =========================================================================

    /// Create a pending request for an item, dated against today's local date
    pub async fn create_request(
        &self,
        item_id: i64,
        input: CreateBorrowRequest,
        borrower_id: i64,
    ) -> AppResult<BorrowRequest> {
        self.create_request_on(item_id, input, borrower_id, validation::today()).await
    }

    /// [`Self::create_request`] with an explicit reference date
    pub async fn create_request_on(
        &self,
        item_id: i64,
        input: CreateBorrowRequest,
        borrower_id: i64,
        today: NaiveDate,
    ) -> AppResult<BorrowRequest> {
        input.validate_on(today)?;
        let (borrow_date, return_date) = match (input.borrow_date, input.return_date) {
            (Some(b), Some(r)) => (b, r),
            _ => return Err(AppError::Validation("Borrow and return dates are required".to_string())),
        };

        let item = self.repository.items.get_by_id(item_id).await?;
        if item.status != ItemStatus::Available {
            return Err(AppError::BusinessRule(
                "Item is not available for borrowing".to_string(),
            ));
        }
        if item.owner_id == borrower_id {
            return Err(AppError::BusinessRule("Cannot borrow your own item".to_string()));
        }

        let request = self
            .repository
            .borrow_requests
            .create(&NewBorrowRequest {
                item_id,
                borrower_id,
                lender_id: item.owner_id,
                borrow_date,
                return_date,
                request_message: input.request_message,
            })
            .await?;

        tracing::info!(
            "Borrow request {} created: item {} borrower {} lender {}",
            request.id,
            item_id,
            borrower_id,
            request.lender_id
        );

        Ok(request)
    }

    /// Load a request and check that `user_id` plays the required role
    async fn load_for(
        &self,
        id: i64,
        user_id: i64,
        as_lender: bool,
        denial: &str,
    ) -> AppResult<BorrowRequest> {
        let request = self.repository.borrow_requests.get_by_id(id).await?;
        let actor = if as_lender {
            request.lender_id
        } else {
            request.borrower_id
        };
        if actor != user_id {
            return Err(AppError::Authorization(denial.to_string()));
        }
        Ok(request)
    }

    fn require_status(request: &BorrowRequest, expected: RequestStatus, message: &str) -> AppResult<()> {
        if request.status != expected {
            return Err(AppError::BusinessRule(message.to_string()));
        }
        Ok(())
    }

    /// Approve a pending request; the item becomes borrowed
    pub async fn approve(
        &self,
        id: i64,
        response_message: Option<String>,
        lender_id: i64,
    ) -> AppResult<BorrowRequest> {
        let request = self
            .load_for(id, lender_id, true, "Only the item owner can approve this request")
            .await?;
        Self::require_status(&request, RequestStatus::Pending, "Only pending requests can be approved")?;

        let item = self.repository.items.get_by_id(request.item_id).await?;
        if item.status != ItemStatus::Available {
            return Err(AppError::BusinessRule("Item is no longer available".to_string()));
        }

        self.repository
            .borrow_requests
            .apply_status_change(&StatusChange {
                request_id: id,
                expected: RequestStatus::Pending,
                next: RequestStatus::Approved,
                response_message: non_blank(response_message),
                item: Some(ItemStatusChange {
                    item_id: request.item_id,
                    expected: Some(ItemStatus::Available),
                    next: ItemStatus::Borrowed,
                }),
            })
            .await
    }

    /// Reject a pending request; the item stays as it is
    pub async fn reject(
        &self,
        id: i64,
        response_message: Option<String>,
        lender_id: i64,
    ) -> AppResult<BorrowRequest> {
        let request = self
            .load_for(id, lender_id, true, "Only the item owner can reject this request")
            .await?;
        Self::require_status(&request, RequestStatus::Pending, "Only pending requests can be rejected")?;

        self.repository
            .borrow_requests
            .apply_status_change(&StatusChange {
                request_id: id,
                expected: RequestStatus::Pending,
                next: RequestStatus::Rejected,
                response_message: non_blank(response_message),
                item: None,
            })
            .await
    }

    /// Lender records that the item came back; the item is available again
    pub async fn mark_returned(&self, id: i64, lender_id: i64) -> AppResult<BorrowRequest> {
        let request = self
            .load_for(id, lender_id, true, "Only the item owner can mark the item as returned")
            .await?;
        Self::require_status(
            &request,
            RequestStatus::Approved,
            "Only approved requests can be marked as returned",
        )?;

        self.repository
            .borrow_requests
            .apply_status_change(&StatusChange {
                request_id: id,
                expected: RequestStatus::Approved,
                next: RequestStatus::Returned,
                response_message: None,
                item: Some(ItemStatusChange {
                    item_id: request.item_id,
                    expected: None,
                    next: ItemStatus::Available,
                }),
            })
            .await
    }

    /// Borrower confirms the return, completing the request
    pub async fn confirm_return(&self, id: i64, borrower_id: i64) -> AppResult<BorrowRequest> {
        let request = self
            .load_for(id, borrower_id, false, "Only the borrower can confirm the return")
            .await?;
        Self::require_status(&request, RequestStatus::Returned, "Only returned requests can be confirmed")?;

        self.repository
            .borrow_requests
            .apply_status_change(&StatusChange {
                request_id: id,
                expected: RequestStatus::Returned,
                next: RequestStatus::Completed,
                response_message: None,
                item: None,
            })
            .await
    }

    /// Borrower withdraws a pending request
    pub async fn cancel(&self, id: i64, borrower_id: i64) -> AppResult<()> {
        let request = self
            .load_for(id, borrower_id, false, "Only the borrower can cancel this request")
            .await?;
        Self::require_status(&request, RequestStatus::Pending, "Only pending requests can be canceled")?;

        self.repository.borrow_requests.delete_pending(id).await?;
        tracing::info!("Borrow request {} canceled by borrower {}", id, borrower_id);
        Ok(())
    }
}
