use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};

use lms_quiz_server::{
    app_state::AppState,
    auth::AuthMiddleware,
    config::{Config, LateSubmissionPolicy},
    db::Database,
    graphql::{create_schema, graphiql, graphql_handler},
    handlers::{self, health_handler},
    middleware::RequestIdMiddleware,
    services::attempt_sweeper,
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let config = Config::from_env();
    if config.is_production() {
        config.validate_for_production();
    }

    let db = Database::connect(&config)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    let state = AppState::new(config.clone(), &db)
        .await
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    if config.attempt_policy.late_submission == LateSubmissionPolicy::Reject {
        attempt_sweeper::spawn(
            state.attempt_service.clone(),
            config.attempt_sweep_interval_seconds,
        );
    }

    let schema = create_schema(&state);
    let bind_address = (config.web_server_host.clone(), config.web_server_port);

    log::info!(
        "Starting HTTP server on {}:{}",
        config.web_server_host,
        config.web_server_port
    );
    log::info!(
        "GraphiQL playground: http://{}:{}/graphiql",
        config.web_server_host,
        config.web_server_port
    );

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .app_data(web::Data::new(state.jwt_service.clone()))
            .app_data(web::Data::new(db.clone()))
            .app_data(web::Data::new(schema.clone()))
            .app_data(handlers::json_config())
            .wrap(Cors::permissive())
            .wrap(Logger::default())
            .wrap(RequestIdMiddleware)
            .configure(health_handler::configure)
            .service(
                web::resource("/graphql")
                    .wrap(AuthMiddleware)
                    .route(web::post().to(graphql_handler)),
            )
            .route("/graphiql", web::get().to(graphiql))
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(handlers::configure_api),
            )
    })
    .bind(bind_address)?
    .run()
    .await
}
