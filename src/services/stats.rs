//! Dashboard statistics

use crate::{
    error::AppResult,
    models::{RequestFilter, RequestStatistics, RequestStatus},
    repository::Repository,
};

#[derive(Clone)]
pub struct StatsService {
    repository: Repository,
}

impl StatsService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Per-status counts over the requests a user sent and received
    pub async fn request_statistics(&self, user_id: i64) -> AppResult<RequestStatistics> {
        let store = &self.repository.borrow_requests;
        let mut stats = RequestStatistics::default();

        for status in RequestStatus::ALL {
            let sent = store.count(&RequestFilter::borrower(user_id).with_status(status)).await?;
            let received = store.count(&RequestFilter::lender(user_id).with_status(status)).await?;

            let slot = match status {
                RequestStatus::Pending => &mut stats.pending_count,
                RequestStatus::Approved => &mut stats.approved_count,
                RequestStatus::Rejected => &mut stats.rejected_count,
                RequestStatus::Returned => &mut stats.returned_count,
                RequestStatus::Completed => &mut stats.completed_count,
            };
            *slot = sent + received;
            stats.total_sent += sent;
            stats.total_received += received;
        }

        tracing::debug!("Request statistics for user {}: {:?}", user_id, stats);
        Ok(stats)
    }
}
