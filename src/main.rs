mod access;
mod admin;
mod app;
mod attendance;
mod auth;
mod classrooms;
mod config;
mod dashboard;
mod error;
mod grades;
mod invitations;
mod members;
mod organizations;
mod parents;
mod people;
mod query;
mod quizzes;
mod state;
mod stats;
mod students;
mod teachers;
#[cfg(test)]
mod testing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "campusdesk=debug,axum=info,tower_http=info,sqlx=warn".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;

    sqlx::migrate!("./migrations").run(&app_state.db).await?;
    tracing::info!("migrations applied");

    let bind_addr = app_state.config.bind_addr();
    let app = app::build_app(app_state);
    app::serve(app, &bind_addr).await
}
