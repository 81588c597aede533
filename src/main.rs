use std::{process, sync::Arc};

use folio::{
    application::{
        auth::{AdminAuthenticator, hash_password},
        error::AppError,
        pages::SitePages,
        posts::PostService,
        render::MarkdownRenderer,
    },
    cache::{CacheConfig, CacheInvalidator, CacheState, CacheStores},
    config,
    infra::{
        assets::StaticFiles,
        db::SqliteRepositories,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    match command {
        config::Command::Serve(_) => {
            telemetry::init(&settings.logging)?;
            run_serve(settings).await
        }
        config::Command::HashPassword(args) => {
            println!("sha256${}", hash_password(&args.password, &args.salt));
            Ok(())
        }
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let credentials = settings.admin.credentials.clone().ok_or_else(|| {
        InfraError::Configuration(
            "admin.username and admin.password_hash must be set; see `folio hash-password`"
                .to_string(),
        )
    })?;

    let repositories = init_repositories(&settings).await?;

    let renderer = Arc::new(MarkdownRenderer::new());
    let pages = SitePages::load(&settings.content.pages_dir, &renderer)?;
    info!(
        pages = pages.len(),
        intro = pages.intro().is_some(),
        dir = %settings.content.pages_dir.display(),
        "loaded markdown pages"
    );

    let cache_config = CacheConfig::from(&settings.cache);
    if !cache_config.enabled {
        warn!("response cache disabled by configuration");
    }
    let stores = Arc::new(CacheStores::new(&cache_config));
    let invalidator = CacheInvalidator::new(&cache_config, stores.clone());
    let cache = CacheState::new(cache_config, stores);

    let state = HttpState {
        site: Arc::new(settings.site.clone()),
        pages: Arc::new(pages),
        posts: PostService::new(repositories, invalidator),
        renderer,
        static_files: StaticFiles::new(settings.content.static_dir.clone()),
        cache,
        admin: AdminAuthenticator::new(credentials),
    };

    serve_http(&settings, state).await
}

async fn init_repositories(settings: &config::Settings) -> Result<Arc<SqliteRepositories>, AppError> {
    let pool = SqliteRepositories::connect(&settings.database).await?;
    SqliteRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;
    info!(url = %settings.database.url, "database ready");

    Ok(Arc::new(SqliteRepositories::new(pool)))
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let addr = settings.server.addr;
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| AppError::from(InfraError::Bind { addr, source }))?;
    info!(%addr, "listening");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
