use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use dashboard_gateway::{
    access::Authenticator,
    config::Config,
    custom_token::CustomTokenMinter,
    handlers,
    identity::SupabaseIdentityProvider,
    permissions::InMemoryPermissionStore,
    security_middleware::BearerAuth,
    services::DashboardService,
};
use dotenv::dotenv;
use sheet_ledger::oauth::{SCOPE_SPREADSHEETS, SCOPE_SPREADSHEETS_READONLY};
use sheet_ledger::{GoogleSheetsStore, LedgerReader, LedgerWriter};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false);

    if std::env::var("LOG_FORMAT").map_or(false, |f| f.eq_ignore_ascii_case("json")) {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    info!("Starting Dashboard Gateway on port {}", config.server.port);

    let resolver = config.ledger.resolver()?;

    // Writer and reader get separately scoped credentials
    let write_store = GoogleSheetsStore::from_config(&config.ledger, SCOPE_SPREADSHEETS)
        .context("Failed to create Sheets client")?;
    let read_store = GoogleSheetsStore::from_config(&config.ledger, SCOPE_SPREADSHEETS_READONLY)
        .context("Failed to create read-only Sheets client")?;

    let writer = LedgerWriter::new(Arc::new(write_store), resolver)
        .with_default_marketplace(config.ledger.default_marketplace.clone());
    let reader = LedgerReader::new(Arc::new(read_store), resolver);

    let identity = Arc::new(SupabaseIdentityProvider::new(
        config.identity.url.clone(),
        config.identity.anon_key.clone(),
        config.identity.request_timeout_secs,
    )?);

    let minter = match config.custom_token.service_account_key.as_deref() {
        Some(key) => match CustomTokenMinter::from_json(key) {
            Ok(minter) => {
                info!("Custom token minting initialized");
                Some(minter)
            }
            Err(e) => {
                warn!("Custom token minting disabled: {}", e);
                None
            }
        },
        None => {
            warn!("Custom token minting not configured: FIREBASE_SERVICE_ACCOUNT_KEY not set");
            None
        }
    };

    let permissions = Arc::new(InMemoryPermissionStore::from_config(&config.permissions));
    let authenticator = Arc::new(Authenticator::new(
        identity.clone(),
        permissions,
        config.permissions.default_categories.clone(),
    ));

    let service = Arc::new(DashboardService::new(writer, reader, identity, minter));

    HttpServer::new(move || {
        let cors = Cors::permissive();
        let auth = BearerAuth::new(authenticator.clone());

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::NormalizePath::trim())
            .app_data(web::Data::new(service.clone()))
            .configure(|cfg| handlers::configure_routes(cfg, auth))
    })
    .workers(config.server.workers)
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await?;

    Ok(())
}
