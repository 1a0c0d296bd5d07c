use axum::{
    routing::{get, post},
    Router,
};
use mockexam_backend::services::queue_service::ExamQueueService;
use mockexam_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes, AppState,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool)?;
    info!(seeds = app_state.seed_pool.len(), "Seed pool loaded");

    {
        let state = app_state.clone();
        tokio::spawn(async move {
            let queue = ExamQueueService::new(state.pool.clone());
            loop {
                match queue.run_once(&state).await {
                    Ok(true) => {}
                    Ok(false) => {
                        tokio::time::sleep(Duration::from_millis(750)).await;
                    }
                    Err(e) => {
                        tracing::error!(error = ?e, "Exam queue worker error");
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });
    }

    let app = Router::new()
        .route("/api/health", get(routes::health::health))
        .route("/api/exams", post(routes::exam::enqueue_exam))
        .route("/api/exams/jobs/:id", get(routes::exam::get_exam_job))
        .route("/api/attempts/score", post(routes::attempt::score_attempt))
        .route(
            "/api/study-guide",
            post(routes::attempt::generate_study_guide),
        )
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
