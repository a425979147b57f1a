mod config;
mod db;
mod error;
mod handlers;
mod models;
mod routes;
mod services;
mod state;
mod utils;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::AppConfig;
use crate::services::imgbb::ImgbbClient;
use crate::services::mailer::{Mailer, MailerDeshabilitado, SmtpMailer};
use crate::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(AppConfig::from_env());

    let pool = db::init_db(&config.database_url).await;
    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Error al aplicar las migraciones");
    tracing::info!("✅ Conexión a Postgres exitosa");

    // Carpeta de staging para imágenes pendientes de subir a ImgBB
    std::fs::create_dir_all(&config.upload_dir)
        .expect("No se pudo crear la carpeta de staging de imágenes");

    let imgbb = Arc::new(ImgbbClient::new(config.imgbb.clone()));
    let mailer: Arc<dyn Mailer> = match SmtpMailer::desde_config(&config.smtp) {
        Some(m) => Arc::new(m),
        None => Arc::new(MailerDeshabilitado),
    };

    let state = AppState {
        pool,
        config: Arc::clone(&config),
        imgbb,
        mailer,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::create_routes(state).layer(cors);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.puerto)
        .parse()
        .expect("Dirección IP/Puerto inválido");

    tracing::info!("🚀 Servidor del diario corriendo en http://{}", addr);

    let listener = TcpListener::bind(addr).await.expect("Fallo al enlazar el puerto");
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
