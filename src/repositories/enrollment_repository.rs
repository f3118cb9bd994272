use async_trait::async_trait;
use chrono::Utc;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::{Database, ENROLLMENTS_COLLECTION},
    errors::{AppError, AppResult},
    models::domain::Enrollment,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Enrollment>>;
    async fn find_by_student_and_course(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> AppResult<Option<Enrollment>>;
    async fn create(&self, enrollment: Enrollment) -> AppResult<Enrollment>;
    /// Marks the lesson completed and the quiz passed; repeated calls are no-ops.
    async fn record_quiz_passed(
        &self,
        enrollment_id: &str,
        lesson_id: &str,
        quiz_id: &str,
    ) -> AppResult<()>;
}

pub struct MongoEnrollmentRepository {
    collection: Collection<Enrollment>,
}

impl MongoEnrollmentRepository {
    pub fn new(db: &Database) -> Self {
        let collection = db.get_collection(ENROLLMENTS_COLLECTION);
        Self { collection }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for enrollments collection");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let student_course_index = IndexModel::builder()
            .keys(doc! { "student_id": 1, "course_id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("student_course_unique".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.collection.create_index(student_course_index).await?;

        log::info!("Successfully created indexes for enrollments collection");
        Ok(())
    }
}

#[async_trait]
impl EnrollmentRepository for MongoEnrollmentRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Enrollment>> {
        let enrollment = self.collection.find_one(doc! { "id": id }).await?;
        Ok(enrollment)
    }

    async fn find_by_student_and_course(
        &self,
        student_id: &str,
        course_id: &str,
    ) -> AppResult<Option<Enrollment>> {
        let enrollment = self
            .collection
            .find_one(doc! {
                "student_id": student_id,
                "course_id": course_id
            })
            .await?;
        Ok(enrollment)
    }

    async fn create(&self, enrollment: Enrollment) -> AppResult<Enrollment> {
        self.collection.insert_one(&enrollment).await?;
        Ok(enrollment)
    }

    async fn record_quiz_passed(
        &self,
        enrollment_id: &str,
        lesson_id: &str,
        quiz_id: &str,
    ) -> AppResult<()> {
        let modified_at = mongodb::bson::to_bson(&Utc::now())?;

        let result = self
            .collection
            .update_one(
                doc! { "id": enrollment_id },
                doc! {
                    "$addToSet": {
                        "completed_lesson_ids": lesson_id,
                        "passed_quiz_ids": quiz_id,
                    },
                    "$set": { "modified_at": modified_at },
                },
            )
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::EnrollmentNotFound(enrollment_id.to_string()));
        }
        Ok(())
    }
}
