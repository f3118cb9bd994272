use async_graphql::{Context, Object};
use validator::Validate;

use crate::{
    app_state::AppState,
    auth::extract_claims_from_context,
    errors::AppResult,
    graphql::helpers::{parse_id, to_graphql},
    models::dto::{
        request::{StartAttemptRequest, SubmitQuizAttemptInput},
        response::AttemptView,
    },
};

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Starts a new attempt or resumes the one already in progress.
    async fn start_quiz_attempt(
        &self,
        ctx: &Context<'_>,
        input: StartAttemptRequest,
    ) -> async_graphql::Result<AttemptView> {
        to_graphql(start_quiz_attempt(ctx, input).await)
    }

    async fn submit_quiz_attempt(
        &self,
        ctx: &Context<'_>,
        input: SubmitQuizAttemptInput,
    ) -> async_graphql::Result<AttemptView> {
        to_graphql(submit_quiz_attempt(ctx, input).await)
    }
}

async fn start_quiz_attempt(ctx: &Context<'_>, input: StartAttemptRequest) -> AppResult<AttemptView> {
    let state = ctx.data::<AppState>()?;
    let claims = extract_claims_from_context(ctx)?;
    input.validate()?;

    let started = state
        .attempt_service
        .start_attempt(
            &claims,
            &parse_id(&input.enrollment_id)?,
            &parse_id(&input.quiz_id)?,
        )
        .await?;
    state
        .attempt_service
        .attempt_view(&started.attempt, started.resumed)
        .await
}

async fn submit_quiz_attempt(
    ctx: &Context<'_>,
    input: SubmitQuizAttemptInput,
) -> AppResult<AttemptView> {
    let state = ctx.data::<AppState>()?;
    let claims = extract_claims_from_context(ctx)?;

    let attempt_id = parse_id(&input.attempt_id)?;
    let answers = input.answer_map()?;

    let attempt = state
        .attempt_service
        .submit_attempt(&claims, &attempt_id, answers)
        .await?;
    state.attempt_service.attempt_view(&attempt, false).await
}
