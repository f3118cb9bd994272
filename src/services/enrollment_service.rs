use std::sync::Arc;

use validator::Validate;

use crate::{
    auth::{require_owner_or_staff, Claims},
    errors::{AppError, AppResult},
    models::{domain::Enrollment, dto::request::EnrollRequest},
    repositories::EnrollmentRepository,
};

pub struct EnrollmentService {
    repository: Arc<dyn EnrollmentRepository>,
}

impl EnrollmentService {
    pub fn new(repository: Arc<dyn EnrollmentRepository>) -> Self {
        Self { repository }
    }

    /// Enrolls the caller; enrolling twice in a course returns the first enrollment.
    pub async fn enroll(&self, claims: &Claims, request: EnrollRequest) -> AppResult<Enrollment> {
        request.validate()?;

        if let Some(existing) = self
            .repository
            .find_by_student_and_course(&claims.sub, &request.course_id)
            .await?
        {
            return Ok(existing);
        }

        match self
            .repository
            .create(Enrollment::new(&claims.sub, &request.course_id))
            .await
        {
            Ok(enrollment) => {
                log::info!(
                    "Student {} enrolled in course {}",
                    claims.sub,
                    request.course_id
                );
                Ok(enrollment)
            }
            Err(AppError::AlreadyExists(_)) => self
                .repository
                .find_by_student_and_course(&claims.sub, &request.course_id)
                .await?
                .ok_or_else(|| {
                    AppError::InternalError("enrollment vanished after conflict".to_string())
                }),
            Err(e) => Err(e),
        }
    }

    pub async fn get_enrollment(&self, claims: &Claims, id: &str) -> AppResult<Enrollment> {
        let enrollment = self.repository.find_by_id(id).await?.ok_or_else(|| {
            AppError::EnrollmentNotFound(format!("Enrollment with id '{}' not found", id))
        })?;

        require_owner_or_staff(claims, &enrollment.student_id)?;
        Ok(enrollment)
    }
}
