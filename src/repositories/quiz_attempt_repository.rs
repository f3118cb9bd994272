use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, DateTime as BsonDateTime},
    options::IndexOptions,
    Collection, IndexModel,
};

use crate::{
    db::{Database, QUIZ_ATTEMPTS_COLLECTION},
    errors::AppResult,
    models::domain::{AttemptStatus, QuizAttempt},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizAttemptRepository: Send + Sync {
    /// Inserts a new in-progress attempt. Fails with `AlreadyExists` when the
    /// (enrollment, quiz) pair already has an in-progress attempt or the
    /// attempt number is taken.
    async fn create(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt>;
    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizAttempt>>;
    async fn find_in_progress(
        &self,
        enrollment_id: &str,
        quiz_id: &str,
    ) -> AppResult<Option<QuizAttempt>>;
    /// All attempts of the pair, ordered by attempt number.
    async fn find_by_enrollment_and_quiz(
        &self,
        enrollment_id: &str,
        quiz_id: &str,
    ) -> AppResult<Vec<QuizAttempt>>;
    async fn count_attempts(&self, enrollment_id: &str, quiz_id: &str) -> AppResult<usize>;
    async fn latest_attempt_number(&self, enrollment_id: &str, quiz_id: &str) -> AppResult<i32>;
    async fn has_passed(&self, enrollment_id: &str, quiz_id: &str) -> AppResult<bool>;
    /// Replaces a stored in-progress attempt with its closed form. Returns
    /// false when the stored attempt is no longer in progress.
    async fn close_in_progress(&self, attempt: &QuizAttempt) -> AppResult<bool>;
    /// In-progress attempts whose deadline lies strictly before `cutoff`.
    /// Untimed attempts never match.
    async fn find_expiring_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<QuizAttempt>>;
}

pub struct MongoQuizAttemptRepository {
    collection: Collection<QuizAttempt>,
}

impl MongoQuizAttemptRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(QUIZ_ATTEMPTS_COLLECTION);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quiz_attempts collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let attempt_number_index = IndexModel::builder()
            .keys(doc! { "enrollment_id": 1, "quiz_id": 1, "attempt_number": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("enrollment_quiz_attempt_number_unique".to_string())
                    .build(),
            )
            .build();

        let single_in_progress_index = IndexModel::builder()
            .keys(doc! { "enrollment_id": 1, "quiz_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .partial_filter_expression(
                        doc! { "status": AttemptStatus::InProgress.as_str() },
                    )
                    .name("single_in_progress".to_string())
                    .build(),
            )
            .build();

        let status_index = IndexModel::builder()
            .keys(doc! { "status": 1, "expires_at": 1 })
            .options(
                IndexOptions::builder()
                    .name("status_expires_at".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(attempt_number_index).await?;
        self.collection.create_index(single_in_progress_index).await?;
        self.collection.create_index(status_index).await?;

        log::info!("Successfully created indexes for quiz_attempts collection");
        Ok(())
    }
}

#[async_trait]
impl QuizAttemptRepository for MongoQuizAttemptRepository {
    async fn create(&self, attempt: QuizAttempt) -> AppResult<QuizAttempt> {
        self.collection.insert_one(&attempt).await?;
        Ok(attempt)
    }

    async fn find_by_id(&self, id: &str) -> AppResult<Option<QuizAttempt>> {
        let attempt = self.collection.find_one(doc! { "id": id }).await?;
        Ok(attempt)
    }

    async fn find_in_progress(
        &self,
        enrollment_id: &str,
        quiz_id: &str,
    ) -> AppResult<Option<QuizAttempt>> {
        let attempt = self
            .collection
            .find_one(doc! {
                "enrollment_id": enrollment_id,
                "quiz_id": quiz_id,
                "status": AttemptStatus::InProgress.as_str(),
            })
            .await?;
        Ok(attempt)
    }

    async fn find_by_enrollment_and_quiz(
        &self,
        enrollment_id: &str,
        quiz_id: &str,
    ) -> AppResult<Vec<QuizAttempt>> {
        let attempts = self
            .collection
            .find(doc! {
                "enrollment_id": enrollment_id,
                "quiz_id": quiz_id
            })
            .sort(doc! { "attempt_number": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(attempts)
    }

    async fn count_attempts(&self, enrollment_id: &str, quiz_id: &str) -> AppResult<usize> {
        let count = self
            .collection
            .count_documents(doc! {
                "enrollment_id": enrollment_id,
                "quiz_id": quiz_id
            })
            .await?;
        Ok(count as usize)
    }

    async fn latest_attempt_number(&self, enrollment_id: &str, quiz_id: &str) -> AppResult<i32> {
        let latest = self
            .collection
            .find_one(doc! {
                "enrollment_id": enrollment_id,
                "quiz_id": quiz_id
            })
            .sort(doc! { "attempt_number": -1 })
            .await?;
        Ok(latest.map(|a| a.attempt_number).unwrap_or(0))
    }

    async fn has_passed(&self, enrollment_id: &str, quiz_id: &str) -> AppResult<bool> {
        let passed = self
            .collection
            .find_one(doc! {
                "enrollment_id": enrollment_id,
                "quiz_id": quiz_id,
                "status": AttemptStatus::Graded.as_str(),
                "is_passed": true,
            })
            .await?;
        Ok(passed.is_some())
    }

    async fn close_in_progress(&self, attempt: &QuizAttempt) -> AppResult<bool> {
        let result = self
            .collection
            .replace_one(
                doc! {
                    "id": &attempt.id,
                    "status": AttemptStatus::InProgress.as_str(),
                },
                attempt,
            )
            .await?;
        Ok(result.matched_count == 1)
    }

    async fn find_expiring_before(&self, cutoff: DateTime<Utc>) -> AppResult<Vec<QuizAttempt>> {
        let cutoff = BsonDateTime::from_millis(cutoff.timestamp_millis());
        let attempts = self
            .collection
            .find(doc! {
                "status": AttemptStatus::InProgress.as_str(),
                "expires_at": { "$lt": cutoff },
            })
            .await?
            .try_collect()
            .await?;
        Ok(attempts)
    }
}
