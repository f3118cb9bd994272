use async_graphql::{Context, Object, ID};

use crate::{
    app_state::AppState,
    auth::extract_claims_from_context,
    errors::AppResult,
    graphql::helpers::{parse_id, to_graphql},
    models::dto::response::{AttemptSummary, AttemptView},
};

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Questions while the attempt is open, the graded result afterwards.
    async fn quiz_attempt(
        &self,
        ctx: &Context<'_>,
        attempt_id: ID,
    ) -> async_graphql::Result<AttemptView> {
        to_graphql(quiz_attempt(ctx, &attempt_id).await)
    }

    async fn quiz_attempts(
        &self,
        ctx: &Context<'_>,
        enrollment_id: ID,
        quiz_id: ID,
    ) -> async_graphql::Result<Vec<AttemptSummary>> {
        to_graphql(quiz_attempts(ctx, &enrollment_id, &quiz_id).await)
    }
}

async fn quiz_attempt(ctx: &Context<'_>, attempt_id: &str) -> AppResult<AttemptView> {
    let state = ctx.data::<AppState>()?;
    let claims = extract_claims_from_context(ctx)?;

    let attempt_id = parse_id(attempt_id)?;
    let attempt = state.attempt_service.get_attempt(&claims, &attempt_id).await?;
    state.attempt_service.attempt_view(&attempt, false).await
}

async fn quiz_attempts(
    ctx: &Context<'_>,
    enrollment_id: &str,
    quiz_id: &str,
) -> AppResult<Vec<AttemptSummary>> {
    let state = ctx.data::<AppState>()?;
    let claims = extract_claims_from_context(ctx)?;

    let attempts = state
        .attempt_service
        .list_attempts(&claims, &parse_id(enrollment_id)?, &parse_id(quiz_id)?)
        .await?;
    Ok(attempts.iter().map(AttemptSummary::from).collect())
}
