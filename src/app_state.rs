use std::sync::Arc;

use crate::{
    auth::JwtService,
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{
        EnrollmentRepository, MongoEnrollmentRepository, MongoQuizAttemptRepository,
        MongoQuizRepository, QuizAttemptRepository, QuizRepository,
    },
    services::{
        ChannelEventPublisher, CompletionWorker, EnrollmentService, QuizAttemptService,
        QuizService,
    },
};

#[derive(Clone)]
pub struct AppState {
    pub quiz_service: Arc<QuizService>,
    pub enrollment_service: Arc<EnrollmentService>,
    pub attempt_service: Arc<QuizAttemptService>,
    pub jwt_service: JwtService,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config, db: &Database) -> AppResult<Self> {
        let quiz_repository = Arc::new(MongoQuizRepository::new(db));
        quiz_repository.ensure_indexes().await?;

        let enrollment_repository = Arc::new(MongoEnrollmentRepository::new(db));
        enrollment_repository.ensure_indexes().await?;

        let attempt_repository = Arc::new(MongoQuizAttemptRepository::new(db));
        attempt_repository.ensure_indexes().await?;

        Ok(Self::with_repositories(
            config,
            quiz_repository,
            enrollment_repository,
            attempt_repository,
        ))
    }

    /// Wires services over the given stores and starts the completion worker.
    /// Must be called inside a tokio runtime.
    pub fn with_repositories(
        config: Config,
        quiz_repository: Arc<dyn QuizRepository>,
        enrollment_repository: Arc<dyn EnrollmentRepository>,
        attempt_repository: Arc<dyn QuizAttemptRepository>,
    ) -> Self {
        let quiz_service = Arc::new(QuizService::new(
            quiz_repository,
            config.quiz_cache_ttl_seconds,
            config.quiz_cache_max_capacity,
        ));

        let (publisher, receiver) = ChannelEventPublisher::channel();
        CompletionWorker::spawn(receiver, Arc::clone(&enrollment_repository));

        let attempt_service = Arc::new(QuizAttemptService::new(
            Arc::clone(&quiz_service),
            Arc::clone(&enrollment_repository),
            attempt_repository,
            Arc::new(publisher),
            config.attempt_policy.clone(),
        ));

        let enrollment_service = Arc::new(EnrollmentService::new(enrollment_repository));
        let jwt_service = JwtService::new(&config.jwt_secret, config.jwt_expiration_hours);

        Self {
            quiz_service,
            enrollment_service,
            attempt_service,
            jwt_service,
            config: Arc::new(config),
        }
    }
}
