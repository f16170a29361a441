pub mod memory;
pub mod pg;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::models::{
    NewSubmission, Page, Source, Submission, SubmissionFilter, SubmissionPatch, UserTypeCount,
};

pub use memory::MemoryStore;
pub use pg::PgStore;

pub type SharedStore = Arc<dyn SubmissionStore>;

#[derive(Debug)]
pub enum StoreError {
    /// The backing database could not be reached.
    Connection(String),
    Database(sqlx::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Connection(msg) => write!(f, "Connection failure: {msg}"),
            StoreError::Database(err) => write!(f, "Database error: {err}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => StoreError::Connection(err.to_string()),
            other => StoreError::Database(other),
        }
    }
}

/// A page of submissions plus the total matching the filter.
#[derive(Debug, Clone)]
pub struct Listing {
    pub items: Vec<Submission>,
    pub total: i64,
}

/// Persistence operations for form submissions.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Submission>, StoreError>;

    /// Newest first; equal timestamps keep insertion order.
    async fn list(&self, filter: &SubmissionFilter, page: Page) -> Result<Listing, StoreError>;

    async fn create(&self, submission: NewSubmission) -> Result<Submission, StoreError>;

    /// Insert one `csv` submission per row, all stamped with the same time.
    async fn bulk_create_from_csv(
        &self,
        rows: Vec<Map<String, Value>>,
    ) -> Result<Vec<Submission>, StoreError>;

    async fn update(
        &self,
        id: Uuid,
        patch: &SubmissionPatch,
    ) -> Result<Option<Submission>, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<Option<Submission>, StoreError>;

    async fn count(&self, filter: &SubmissionFilter) -> Result<i64, StoreError>;

    /// Counts per non-null `userType`, largest first.
    async fn count_by_user_type(&self) -> Result<Vec<UserTypeCount>, StoreError>;

    /// Case-insensitive substring match over name, email, company,
    /// business name and school. Newest first, unpaginated.
    async fn search(&self, text: &str) -> Result<Vec<Submission>, StoreError>;

    async fn recent(&self, limit: i64) -> Result<Vec<Submission>, StoreError>;

    async fn count_by_source(&self, source: Source) -> Result<i64, StoreError> {
        self.count(&SubmissionFilter {
            source: Some(source),
            user_type: None,
        })
        .await
    }

    /// Release backend resources on shutdown.
    async fn close(&self) {}
}

/// Build the `csv` submissions for one import batch.
pub(crate) fn csv_batch(rows: Vec<Map<String, Value>>) -> Vec<NewSubmission> {
    let now = chrono::Utc::now();
    rows.into_iter()
        .map(|row| {
            let fields = crate::submission::fields::lift_csv_row(&row);
            NewSubmission::csv(row, fields, now)
        })
        .collect()
}
