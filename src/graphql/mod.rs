pub mod helpers;
pub mod schema_impl;

use actix_web::{web, HttpResponse};
use async_graphql::http::GraphiQLSource;
use async_graphql_actix_web::{GraphQLRequest, GraphQLResponse};

use crate::auth::AuthenticatedUser;

pub use schema_impl::{create_schema, Schema};

/// Claims from `AuthMiddleware` are handed to resolvers as request data.
pub async fn graphql_handler(
    schema: web::Data<Schema>,
    auth: AuthenticatedUser,
    request: GraphQLRequest,
) -> GraphQLResponse {
    schema.execute(request.into_inner().data(auth.0)).await.into()
}

pub async fn graphiql() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(GraphiQLSource::build().endpoint("/graphql").finish())
}
