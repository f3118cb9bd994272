use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::{Database, QUIZZES_COLLECTION, QUIZ_QUESTIONS_COLLECTION},
    errors::{AppError, AppResult},
    models::domain::{Quiz, QuizQuestion},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>>;
    async fn create(&self, quiz: Quiz) -> AppResult<Quiz>;
    async fn update(&self, quiz: Quiz) -> AppResult<Quiz>;
    /// Removes the quiz together with its questions.
    async fn delete(&self, id: &str) -> AppResult<()>;
    /// Questions of a quiz sorted by their `order`.
    async fn find_questions(&self, quiz_id: &str) -> AppResult<Vec<QuizQuestion>>;
    async fn add_question(&self, question: QuizQuestion) -> AppResult<QuizQuestion>;
}

pub struct MongoQuizRepository {
    collection: Collection<Quiz>,
    questions: Collection<QuizQuestion>,
}

impl MongoQuizRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.get_collection(QUIZZES_COLLECTION),
            questions: db.get_collection(QUIZ_QUESTIONS_COLLECTION),
        }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for quizzes and quiz_questions collections");

        let id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let question_id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let quiz_order_index = IndexModel::builder()
            .keys(doc! { "quiz_id": 1, "order": 1 })
            .options(
                IndexOptions::builder()
                    .name("quiz_order".to_string())
                    .build(),
            )
            .build();

        self.collection.create_index(id_index).await?;
        self.questions.create_index(question_id_index).await?;
        self.questions.create_index(quiz_order_index).await?;

        log::info!("Successfully created indexes for quizzes and quiz_questions collections");
        Ok(())
    }
}

#[async_trait]
impl QuizRepository for MongoQuizRepository {
    async fn find_by_id(&self, id: &str) -> AppResult<Option<Quiz>> {
        let quiz = self.collection.find_one(doc! { "id": id }).await?;
        Ok(quiz)
    }

    async fn create(&self, quiz: Quiz) -> AppResult<Quiz> {
        self.collection.insert_one(&quiz).await?;
        Ok(quiz)
    }

    async fn update(&self, quiz: Quiz) -> AppResult<Quiz> {
        let result = self
            .collection
            .replace_one(doc! { "id": &quiz.id }, &quiz)
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::QuizNotFound(quiz.id));
        }
        Ok(quiz)
    }

    async fn delete(&self, id: &str) -> AppResult<()> {
        let result = self.collection.delete_one(doc! { "id": id }).await?;
        if result.deleted_count == 0 {
            return Err(AppError::QuizNotFound(id.to_string()));
        }

        let removed = self.questions.delete_many(doc! { "quiz_id": id }).await?;
        log::info!(
            "Deleted quiz {} and {} question(s)",
            id,
            removed.deleted_count
        );
        Ok(())
    }

    async fn find_questions(&self, quiz_id: &str) -> AppResult<Vec<QuizQuestion>> {
        let questions = self
            .questions
            .find(doc! { "quiz_id": quiz_id })
            .sort(doc! { "order": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(questions)
    }

    async fn add_question(&self, question: QuizQuestion) -> AppResult<QuizQuestion> {
        self.questions.insert_one(&question).await?;
        Ok(question)
    }
}
