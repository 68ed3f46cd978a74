use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quizbox::{
    api, broadcast,
    engine::GameEngine,
    supplier::SupplierConfig,
    transport::{self, ws::WsTransport},
    types::GameConfig,
    ws::{self, AppCtx},
};

#[tokio::main]
async fn main() {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quizbox=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting quizbox host...");

    let game_config = GameConfig::from_env();
    let supplier = SupplierConfig::from_env().build();

    let room_token = transport::generate_room_token();
    let ws_transport = Arc::new(WsTransport::new(&room_token));
    tracing::info!("Room token: {}", room_token);

    let engine = GameEngine::new(game_config, supplier, ws_transport.clone());

    // Background tasks: inbound event pump + periodic state sync
    broadcast::spawn_event_pump(engine.clone());
    broadcast::spawn_sync_broadcaster(engine.clone());

    let ctx = Arc::new(AppCtx {
        engine: engine.clone(),
        ws: ws_transport,
    });

    let app = Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/api/room", get(api::room_info))
        .route("/api/start", post(api::start_game))
        .fallback_service(ServeDir::new("static"))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    let addr = SocketAddr::from(([0, 0, 0, 0], 8490));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();

    engine.shutdown();
}
