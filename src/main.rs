use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use chrono::Datelike;
use dotenvy::dotenv;
use std::sync::Arc;

use hrm_leave::config::Config;
use hrm_leave::docs::ApiDoc;
use hrm_leave::notify::LogNotifier;
use hrm_leave::routes;
use hrm_leave::state::AppState;
use hrm_leave::store::{MySqlStore, Store};

use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "Leave engine up"
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    let config = Config::from_env();

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let store = match &config.database_url {
        Some(url) => match MySqlStore::connect(url).await {
            Ok(store) => Store::MySql(store),
            Err(err) => {
                eprintln!("Failed to connect to database: {err}");
                return Err(std::io::Error::other(err.to_string()));
            }
        },
        None => {
            warn!("DATABASE_URL not set, using the in-memory store");
            Store::mem()
        }
    };

    let state = Data::new(AppState::new(store, Arc::new(LogNotifier)));

    // Seed the policy catalog and warm the holiday cache off the hot path.
    let state_for_seed = state.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = state_for_seed.registry.seed_defaults().await {
            eprintln!("Failed to seed leave type catalog: {e:?}");
        }
    });
    let state_for_warmup = state.clone();
    actix_web::rt::spawn(async move {
        let year = chrono::Utc::now().date_naive().year();
        if let Err(e) = state_for_warmup.calendar.warmup(year).await {
            eprintln!("Failed to warm holiday cache: {e:?}");
        }
    });

    let server_addr = config.server_addr.clone();
    let config_data = config.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(state.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, config_data.clone()))
    })
    .bind(server_addr)?
    .run()
    .await
}
