use async_graphql::Context;

use crate::{
    auth::Claims,
    errors::{AppError, AppResult},
};

pub fn require_staff(claims: &Claims) -> AppResult<()> {
    if !claims.is_staff() {
        return Err(AppError::Forbidden(
            "Only instructors and admins can perform this action".to_string(),
        ));
    }
    Ok(())
}

pub fn require_owner(claims: &Claims, resource_owner: &str) -> AppResult<()> {
    if claims.sub != resource_owner {
        return Err(AppError::Forbidden(
            "You can only act on your own enrollments and attempts".to_string(),
        ));
    }
    Ok(())
}

pub fn require_owner_or_staff(claims: &Claims, resource_owner: &str) -> AppResult<()> {
    if !claims.is_staff() && claims.sub != resource_owner {
        return Err(AppError::Forbidden(
            "You can only access your own resources".to_string(),
        ));
    }
    Ok(())
}

pub fn extract_claims_from_context(ctx: &Context<'_>) -> AppResult<Claims> {
    ctx.data::<Claims>()
        .cloned()
        .map_err(|_| AppError::Unauthorized("Authentication required".to_string()))
}
