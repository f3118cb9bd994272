use async_graphql::ErrorExtensions;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// Helper to parse a GraphQL ID that must hold a UUID
pub fn parse_id(id: &str) -> AppResult<String> {
    Uuid::parse_str(id)
        .map(|uuid| uuid.to_string())
        .map_err(|_| AppError::ValidationError(format!("'{}' is not a valid id", id)))
}

/// Carries the error kind into the GraphQL `extensions.code` field.
pub fn to_graphql<T>(result: AppResult<T>) -> async_graphql::Result<T> {
    result.map_err(|e| e.extend())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id() {
        let id = Uuid::new_v4().to_string();
        assert_eq!(parse_id(&id).unwrap(), id);
        assert!(matches!(parse_id("abc"), Err(AppError::ValidationError(_))));
    }

    #[test]
    fn test_to_graphql_sets_code() {
        let err = to_graphql::<()>(Err(AppError::AttemptLimitExceeded("done".into()))).unwrap_err();
        let json = serde_json::to_value(err.into_server_error(async_graphql::Pos::default()))
            .unwrap();
        assert_eq!(json["extensions"]["code"], "ATTEMPT_LIMIT_EXCEEDED");
    }
}
