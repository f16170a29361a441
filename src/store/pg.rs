use async_trait::async_trait;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::db::{self, Database};
use crate::models::{
    NewSubmission, Page, Submission, SubmissionFilter, SubmissionPatch, UserTypeCount,
};

use super::{csv_batch, Listing, StoreError, SubmissionStore};

/// Postgres-backed store. Connects on first use.
pub struct PgStore {
    db: Database,
}

impl PgStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

#[async_trait]
impl SubmissionStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        let pool = self.db.pool().await?;
        db::submissions::ping(pool).await?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Submission>, StoreError> {
        let pool = self.db.pool().await?;
        Ok(db::submissions::find_by_id(pool, id).await?)
    }

    async fn list(&self, filter: &SubmissionFilter, page: Page) -> Result<Listing, StoreError> {
        let pool = self.db.pool().await?;
        let items = db::submissions::list(pool, filter, page.limit, page.offset()).await?;
        let total = db::submissions::count(pool, filter).await?;
        Ok(Listing { items, total })
    }

    async fn create(&self, submission: NewSubmission) -> Result<Submission, StoreError> {
        let pool = self.db.pool().await?;
        let mut conn = pool.acquire().await?;
        Ok(db::submissions::insert(&mut *conn, &submission.into_submission()).await?)
    }

    async fn bulk_create_from_csv(
        &self,
        rows: Vec<Map<String, Value>>,
    ) -> Result<Vec<Submission>, StoreError> {
        let pool = self.db.pool().await?;

        // One transaction per import: a failed row rolls back the whole batch.
        let mut tx = pool.begin().await?;
        let mut inserted = Vec::with_capacity(rows.len());
        for new in csv_batch(rows) {
            inserted.push(db::submissions::insert(&mut *tx, &new.into_submission()).await?);
        }
        tx.commit().await?;

        Ok(inserted)
    }

    async fn update(
        &self,
        id: Uuid,
        patch: &SubmissionPatch,
    ) -> Result<Option<Submission>, StoreError> {
        let pool = self.db.pool().await?;
        Ok(db::submissions::update(pool, id, patch).await?)
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Submission>, StoreError> {
        let pool = self.db.pool().await?;
        Ok(db::submissions::delete(pool, id).await?)
    }

    async fn count(&self, filter: &SubmissionFilter) -> Result<i64, StoreError> {
        let pool = self.db.pool().await?;
        Ok(db::submissions::count(pool, filter).await?)
    }

    async fn count_by_user_type(&self) -> Result<Vec<UserTypeCount>, StoreError> {
        let pool = self.db.pool().await?;
        let rows = db::submissions::count_by_user_type(pool).await?;
        Ok(rows
            .into_iter()
            .map(|(user_type, count)| UserTypeCount { user_type, count })
            .collect())
    }

    async fn search(&self, text: &str) -> Result<Vec<Submission>, StoreError> {
        let pool = self.db.pool().await?;
        Ok(db::submissions::search(pool, text).await?)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Submission>, StoreError> {
        let pool = self.db.pool().await?;
        Ok(db::submissions::recent(pool, limit).await?)
    }

    async fn close(&self) {
        self.db.close().await;
    }
}
