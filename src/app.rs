use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;
use crate::{
    admin, attendance, auth, classrooms, dashboard, grades, invitations, members, organizations, parents, quizzes,
    students, teachers,
};

pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(organizations::router())
        .merge(members::router())
        .merge(invitations::router())
        .merge(teachers::router())
        .merge(students::router())
        .merge(parents::router())
        .merge(classrooms::router())
        .merge(attendance::router())
        .merge(grades::router())
        .merge(quizzes::router())
        .merge(dashboard::router())
        .merge(admin::router())
        .route("/health", get(|| async { "ok" }))
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_router())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri, status = tracing::field::Empty)
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, ms, "response");
                        } else {
                            tracing::info!(%status, ms, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router, bind_addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_module_mounts_without_route_conflicts() {
        // Overlapping routes panic at build time.
        let _app = build_app(AppState::fake());
    }
}
