use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{
    NewSubmission, Page, Submission, SubmissionFilter, SubmissionPatch, UserTypeCount,
};

use super::{csv_batch, Listing, StoreError, SubmissionStore};

/// In-process store with the same ordering and matching rules as Postgres.
/// Data lives until the process exits.
#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<Vec<Submission>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first. `sort_by` is stable, so equal timestamps keep insertion order.
fn newest_first(rows: &[Submission]) -> Vec<&Submission> {
    let mut sorted: Vec<&Submission> = rows.iter().collect();
    sorted.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
    sorted
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Submission>, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().find(|s| s.id == id).cloned())
    }

    async fn list(&self, filter: &SubmissionFilter, page: Page) -> Result<Listing, StoreError> {
        let rows = self.rows.read().await;
        let matching: Vec<&Submission> = newest_first(&rows)
            .into_iter()
            .filter(|s| filter.matches(s))
            .collect();

        let total = matching.len() as i64;
        let items = matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.limit as usize)
            .cloned()
            .collect();

        Ok(Listing { items, total })
    }

    async fn create(&self, submission: NewSubmission) -> Result<Submission, StoreError> {
        let submission = submission.into_submission();
        self.rows.write().await.push(submission.clone());
        Ok(submission)
    }

    async fn bulk_create_from_csv(
        &self,
        rows: Vec<Map<String, Value>>,
    ) -> Result<Vec<Submission>, StoreError> {
        let inserted: Vec<Submission> = csv_batch(rows)
            .into_iter()
            .map(NewSubmission::into_submission)
            .collect();
        self.rows.write().await.extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn update(
        &self,
        id: Uuid,
        patch: &SubmissionPatch,
    ) -> Result<Option<Submission>, StoreError> {
        let mut rows = self.rows.write().await;
        let Some(submission) = rows.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };
        submission.apply(patch);
        Ok(Some(submission.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<Option<Submission>, StoreError> {
        let mut rows = self.rows.write().await;
        Ok(rows
            .iter()
            .position(|s| s.id == id)
            .map(|idx| rows.remove(idx)))
    }

    async fn count(&self, filter: &SubmissionFilter) -> Result<i64, StoreError> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|s| filter.matches(s)).count() as i64)
    }

    async fn count_by_user_type(&self) -> Result<Vec<UserTypeCount>, StoreError> {
        let rows = self.rows.read().await;
        let mut counts: HashMap<&str, i64> = HashMap::new();
        for user_type in rows.iter().filter_map(|s| s.fields.user_type.as_deref()) {
            *counts.entry(user_type).or_default() += 1;
        }

        let mut grouped: Vec<UserTypeCount> = counts
            .into_iter()
            .map(|(user_type, count)| UserTypeCount {
                user_type: user_type.to_string(),
                count,
            })
            .collect();
        grouped.sort_by(|a, b| match b.count.cmp(&a.count) {
            Ordering::Equal => a.user_type.cmp(&b.user_type),
            other => other,
        });
        Ok(grouped)
    }

    async fn search(&self, text: &str) -> Result<Vec<Submission>, StoreError> {
        let needle = text.to_lowercase();
        let rows = self.rows.read().await;
        Ok(newest_first(&rows)
            .into_iter()
            .filter(|s| {
                s.fields
                    .searchable()
                    .into_iter()
                    .flatten()
                    .any(|v| v.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Submission>, StoreError> {
        let rows = self.rows.read().await;
        Ok(newest_first(&rows)
            .into_iter()
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}
