pub mod mutations;
pub mod queries;

use async_graphql::{EmptySubscription, Schema as GraphQLSchema, SchemaBuilder};

use crate::app_state::AppState;

pub use mutations::MutationRoot;
pub use queries::QueryRoot;

pub type Schema = GraphQLSchema<QueryRoot, MutationRoot, EmptySubscription>;

/// Deep enough for the GraphiQL introspection query.
const MAX_QUERY_DEPTH: usize = 16;

fn schema_builder() -> SchemaBuilder<QueryRoot, MutationRoot, EmptySubscription> {
    GraphQLSchema::build(QueryRoot, MutationRoot, EmptySubscription).limit_depth(MAX_QUERY_DEPTH)
}

pub fn create_schema(app_state: &AppState) -> Schema {
    schema_builder().data(app_state.clone()).finish()
}
