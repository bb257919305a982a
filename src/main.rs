//! Orderhub server - main entry point.
//!
//! Starts the Actix-web server with configured routes and middleware.

use std::path::PathBuf;
use std::time::Duration;

use actix_cors::Cors;
use actix_files::{Files, NamedFile};
use actix_web::{App, HttpRequest, HttpServer, Result as ActixResult, http::header, web};
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use orderhub_lib::api::{self, ApiDoc, UploadLimit};
use orderhub_lib::auth::AdminKey;
use orderhub_lib::config::{ADMIN_KEY_HEADER, Config, USER_ID_HEADER, USER_ROLE_HEADER};
use orderhub_lib::db::DbPool;
use orderhub_lib::db::settings::merge_storage_settings;
use orderhub_lib::middleware;
use orderhub_lib::services::storage::{S3Driver, Storage};

/// SPA fallback handler - serves index.html for client-side routing.
async fn spa_fallback(req: HttpRequest) -> ActixResult<NamedFile> {
    let static_dir = req
        .app_data::<web::Data<PathBuf>>()
        .ok_or_else(|| actix_web::error::ErrorNotFound("Static dir not configured"))?;
    Ok(NamedFile::open(static_dir.join("index.html"))?)
}

fn exit_with(message: &str) -> ! {
    error!("{}", message);
    std::process::exit(1);
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            error!("");
            error!("Please check your environment variables:");
            error!("  - RUST_ENV must be set to 'development' or 'production'");
            error!("  - In production, DATABASE_URL must be set");
            error!("  - In production, values must not match development defaults");
            std::process::exit(1);
        }
    };

    info!("========================================");
    info!("  Orderhub Server");
    info!("  Environment: {}", config.environment);
    info!("========================================");

    if config.is_development() {
        warn!("Running in DEVELOPMENT mode - do not use in production!");
    }

    let pool = match DbPool::new(&config.database).await {
        Ok(pool) => pool,
        Err(e) => exit_with(&format!("Failed to initialize database: {}", e)),
    };
    if let Err(e) = pool.run_migrations().await {
        exit_with(&format!("Failed to run migrations: {}", e));
    }
    info!("Database migrations complete");

    // Persisted settings win over the environment.
    let stored = match pool.load_storage_settings().await {
        Ok(stored) => stored,
        Err(e) => {
            warn!("Failed to load stored storage settings: {}", e);
            Default::default()
        }
    };
    let mut storage_settings = merge_storage_settings(&config.storage, &stored);

    let s3 = config.s3.is_complete().then(|| S3Driver::new(&config.s3));
    match (&s3, storage_settings.driver.as_str()) {
        (Some(driver), "s3") => {
            if let Err(e) = driver.ensure_bucket_exists().await {
                exit_with(&format!("Failed to prepare S3 bucket: {}", e));
            }
        }
        (None, "s3") => {
            warn!("Storage driver 's3' selected but S3 is not configured; using local storage");
            storage_settings.driver = "local".to_string();
        }
        _ => {}
    }

    if let Err(e) = tokio::fs::create_dir_all(&storage_settings.local_storage_path).await {
        exit_with(&format!("Failed to create local storage directory: {}", e));
    }
    info!(
        "Storage driver: {} (local root {:?})",
        storage_settings.driver, storage_settings.local_storage_path
    );

    let local_mount = storage_settings
        .local_base_url
        .starts_with('/')
        .then(|| {
            (
                storage_settings.local_base_url.trim_end_matches('/').to_string(),
                storage_settings.local_storage_path.clone(),
            )
        });

    let storage = web::Data::new(Storage::new(
        storage_settings,
        s3,
        Duration::from_secs(config.url_expires_secs),
    ));
    let bind_address = config.bind_address();
    let admin_key = AdminKey::new(config.admin_key.clone());
    let import_settings = config.import.clone();
    let max_upload_size = config.max_upload_size;
    let static_dir = config.static_dir.clone();
    let is_development = config.is_development();
    let openapi = ApiDoc::openapi();

    if static_dir.is_some() {
        info!("Static file serving enabled from {:?}", static_dir);
    }

    let worker_count = if is_development {
        info!(
            "Starting server at http://{} (4 workers - development mode)",
            bind_address
        );
        4
    } else {
        let cpus = num_cpus::get();
        info!("Starting server at http://{} ({} workers)", bind_address, cpus);
        cpus
    };

    let server = HttpServer::new(move || {
        let allowed_headers = vec![
            header::ACCEPT,
            header::CONTENT_TYPE,
            header::HeaderName::from_static("x-admin-key"),
            header::HeaderName::from_static("x-user-id"),
            header::HeaderName::from_static("x-user-role"),
        ];
        let cors = if is_development {
            Cors::default()
                .allowed_origin("http://localhost:3000")
                .allowed_origin("http://127.0.0.1:3000")
                .allowed_origin("http://localhost:5173")
                .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                .allowed_headers(allowed_headers)
                .expose_headers(vec![header::CONTENT_DISPOSITION])
                .max_age(3600)
        } else {
            // Same-origin only in production
            Cors::default()
                .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
                .allowed_headers(allowed_headers)
                .expose_headers(vec![header::CONTENT_DISPOSITION])
                .max_age(3600)
        };

        let mut app = App::new()
            .wrap(cors)
            .wrap(middleware::RequestLogger)
            .app_data(web::Data::new(pool.clone()))
            .app_data(storage.clone())
            .app_data(web::Data::new(admin_key.clone()))
            .app_data(web::Data::new(import_settings.clone()))
            .app_data(web::Data::new(UploadLimit(max_upload_size)))
            .app_data(web::PayloadConfig::new(max_upload_size))
            .app_data(web::JsonConfig::default().limit(max_upload_size))
            .service(web::scope("/api/v1").configure(api::configure_routes))
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi.clone()),
            );

        if let Some((mount, root)) = &local_mount {
            app = app.service(Files::new(mount, root.clone()));
        }

        if let Some(ref dir) = static_dir {
            app = app
                .app_data(web::Data::new(dir.clone()))
                .service(Files::new("/assets", dir.join("assets")).prefer_utf8(true))
                .service(Files::new("/favicon", dir.clone()).index_file("favicon.ico"))
                .default_service(web::route().to(spa_fallback));
        }

        app
    });

    info!(
        "Identity headers: {}, {} (admin key via {})",
        USER_ID_HEADER, USER_ROLE_HEADER, ADMIN_KEY_HEADER
    );

    server.workers(worker_count).bind(&bind_address)?.run().await
}
