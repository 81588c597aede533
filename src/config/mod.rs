//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroU32, path::PathBuf, str::FromStr};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "folio";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_DATABASE_URL: &str = "sqlite://folio.db?mode=rwc";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_SITE_NAME: &str = "Folio";
const DEFAULT_PAGES_DIR: &str = "content/pages";
const DEFAULT_STATIC_DIR: &str = "static";
const DEFAULT_CACHE_STATIC_CAPACITY: usize = 1000;
const DEFAULT_CACHE_PAGE_CAPACITY: usize = 1000;
const DEFAULT_CACHE_NON_CACHEABLE_CAPACITY: usize = 10_000;
const DEFAULT_CACHE_STATIC_BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Placeholder credentials shipped in sample configs; never accepted.
const PLACEHOLDER_USERNAME: &str = "changeadmin";
const PLACEHOLDER_PASSWORD: &str = "changepass";
pub(crate) const PASSWORD_HASH_PREFIX: &str = "sha256$";

/// Command-line arguments for the Folio binary.
#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Folio blog server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FOLIO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(Box<ServeArgs>),
    /// Print a password hash suitable for `admin.password_hash`.
    #[command(name = "hash-password")]
    HashPassword(HashPasswordArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct HashPasswordArgs {
    /// Password to hash.
    #[arg(long, env = "FOLIO_ADMIN_PASSWORD", value_name = "PASSWORD")]
    pub password: String,

    /// Salt appended to the password before hashing.
    #[arg(long, value_name = "SALT")]
    pub salt: String,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the directory scanned for markdown pages.
    #[arg(long = "content-pages-dir", value_name = "PATH")]
    pub pages_dir: Option<PathBuf>,

    /// Override the directory served under `/static/`.
    #[arg(long = "content-static-dir", value_name = "PATH")]
    pub static_dir: Option<PathBuf>,

    /// Toggle the response cache.
    #[arg(
        long = "cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub cache_enabled: Option<bool>,

    /// Override the largest static body admitted into the cache.
    #[arg(long = "cache-static-body-limit-bytes", value_name = "BYTES")]
    pub cache_static_body_limit_bytes: Option<usize>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub site: SiteSettings,
    pub content: ContentSettings,
    pub admin: AdminSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: String,
    pub max_connections: NonZeroU32,
}

/// Site identity, footer content, and the legal contact block.
#[derive(Debug, Clone)]
pub struct SiteSettings {
    pub name: String,
    pub description: String,
    pub author: String,
    pub copyright_year: i32,
    pub social_links: Vec<SocialLink>,
    pub show_routes_in_nav: bool,
    pub show_impressum: bool,
    pub show_privacy_policy: bool,
    pub show_attribution: bool,
    /// Loaded from the `[legal]` section.
    pub legal: LegalSettings,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            name: DEFAULT_SITE_NAME.to_string(),
            description: String::new(),
            author: String::new(),
            copyright_year: current_year(),
            social_links: Vec::new(),
            show_routes_in_nav: true,
            show_impressum: true,
            show_privacy_policy: true,
            show_attribution: true,
            legal: LegalSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocialLink {
    pub name: String,
    pub url: String,
}

/// Contact details for the impressum. Blank values are treated as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegalSettings {
    pub name: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub pages_dir: PathBuf,
    pub static_dir: PathBuf,
}

/// Administrator credentials. `None` until configured; `serve` refuses to run
/// without them.
#[derive(Debug, Clone)]
pub struct AdminSettings {
    pub credentials: Option<AdminCredentials>,
}

#[derive(Clone)]
pub struct AdminCredentials {
    pub username: String,
    /// Lowercase hex SHA-256 digest of `password + salt`, without the prefix.
    pub password_digest: String,
    pub salt: String,
}

impl std::fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub static_capacity: usize,
    pub page_capacity: usize,
    pub non_cacheable_capacity: usize,
    pub static_body_limit_bytes: usize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("FOLIO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::HashPassword(_)) => {}
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    site: RawSiteSettings,
    legal: RawLegalSettings,
    content: RawContentSettings,
    admin: RawAdminSettings,
    cache: RawCacheSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(dir) = overrides.pages_dir.as_ref() {
            self.content.pages_dir = Some(dir.clone());
        }
        if let Some(dir) = overrides.static_dir.as_ref() {
            self.content.static_dir = Some(dir.clone());
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(limit) = overrides.cache_static_body_limit_bytes {
            self.cache.static_body_limit_bytes = Some(limit);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            site,
            legal,
            content,
            admin,
            cache,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            site: build_site_settings(site, legal)?,
            content: build_content_settings(content)?,
            admin: build_admin_settings(admin)?,
            cache: build_cache_settings(cache)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    Ok(ServerSettings { addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database
        .url
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string());

    let max_connections = database
        .max_connections
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS);
    let max_connections = NonZeroU32::new(max_connections).ok_or_else(|| {
        LoadError::invalid("database.max_connections", "must be greater than zero")
    })?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_site_settings(
    site: RawSiteSettings,
    legal: RawLegalSettings,
) -> Result<SiteSettings, LoadError> {
    let defaults = SiteSettings::default();

    let copyright_year = site.copyright_year.unwrap_or(defaults.copyright_year);
    if !(1..=9999).contains(&copyright_year) {
        return Err(LoadError::invalid(
            "site.copyright_year",
            format!("expected a four-digit year, got {copyright_year}"),
        ));
    }

    let social_links = site
        .social_links
        .unwrap_or_default()
        .into_iter()
        .map(|link| {
            let name = link.name.trim().to_string();
            let url = link.url.trim().to_string();
            if name.is_empty() || url.is_empty() {
                return Err(LoadError::invalid(
                    "site.social_links",
                    "every link needs a non-empty name and url",
                ));
            }
            Ok(SocialLink { name, url })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(SiteSettings {
        name: site.name.unwrap_or(defaults.name),
        description: site.description.unwrap_or_default(),
        author: site.author.unwrap_or_default(),
        copyright_year,
        social_links,
        show_routes_in_nav: site.show_routes_in_nav.unwrap_or(defaults.show_routes_in_nav),
        show_impressum: site.show_impressum.unwrap_or(defaults.show_impressum),
        show_privacy_policy: site
            .show_privacy_policy
            .unwrap_or(defaults.show_privacy_policy),
        show_attribution: site.show_attribution.unwrap_or(defaults.show_attribution),
        legal: LegalSettings {
            name: non_blank(legal.name),
            address: non_blank(legal.address),
            email: non_blank(legal.email),
            phone: non_blank(legal.phone),
        },
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn current_year() -> i32 {
    time::OffsetDateTime::now_utc().year()
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let pages_dir = content
        .pages_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PAGES_DIR));
    if pages_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "content.pages_dir",
            "path must not be empty",
        ));
    }

    let static_dir = content
        .static_dir
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));
    if static_dir.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "content.static_dir",
            "path must not be empty",
        ));
    }

    Ok(ContentSettings {
        pages_dir,
        static_dir,
    })
}

fn build_admin_settings(admin: RawAdminSettings) -> Result<AdminSettings, LoadError> {
    let username = admin.username.filter(|value| !value.trim().is_empty());
    let password_hash = admin.password_hash.filter(|value| !value.trim().is_empty());

    let (username, password_hash) = match (username, password_hash) {
        (None, None) => return Ok(AdminSettings { credentials: None }),
        (Some(_), None) => {
            return Err(LoadError::invalid(
                "admin.password_hash",
                "must be set when admin.username is set",
            ));
        }
        (None, Some(_)) => {
            return Err(LoadError::invalid(
                "admin.username",
                "must be set when admin.password_hash is set",
            ));
        }
        (Some(username), Some(hash)) => (username, hash),
    };

    if username == PLACEHOLDER_USERNAME {
        return Err(LoadError::invalid(
            "admin.username",
            "the placeholder username must be changed",
        ));
    }

    let salt = admin.salt.unwrap_or_default();
    let digest = password_hash
        .strip_prefix(PASSWORD_HASH_PREFIX)
        .ok_or_else(|| {
            LoadError::invalid(
                "admin.password_hash",
                format!("expected `{PASSWORD_HASH_PREFIX}<hex>`"),
            )
        })?
        .to_ascii_lowercase();

    if digest.len() != 64 || hex::decode(&digest).is_err() {
        return Err(LoadError::invalid(
            "admin.password_hash",
            "digest must be 64 hexadecimal characters",
        ));
    }

    if digest == crate::application::auth::hash_password(PLACEHOLDER_PASSWORD, &salt) {
        return Err(LoadError::invalid(
            "admin.password_hash",
            "the placeholder password must be changed",
        ));
    }

    Ok(AdminSettings {
        credentials: Some(AdminCredentials {
            username,
            password_digest: digest,
            salt,
        }),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let static_capacity = non_zero_capacity(
        cache.static_capacity,
        DEFAULT_CACHE_STATIC_CAPACITY,
        "cache.static_capacity",
    )?;
    let page_capacity = non_zero_capacity(
        cache.page_capacity,
        DEFAULT_CACHE_PAGE_CAPACITY,
        "cache.page_capacity",
    )?;
    let non_cacheable_capacity = non_zero_capacity(
        cache.non_cacheable_capacity,
        DEFAULT_CACHE_NON_CACHEABLE_CAPACITY,
        "cache.non_cacheable_capacity",
    )?;

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        static_capacity,
        page_capacity,
        non_cacheable_capacity,
        static_body_limit_bytes: cache
            .static_body_limit_bytes
            .unwrap_or(DEFAULT_CACHE_STATIC_BODY_LIMIT_BYTES),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSiteSettings {
    name: Option<String>,
    description: Option<String>,
    author: Option<String>,
    copyright_year: Option<i32>,
    social_links: Option<Vec<RawSocialLink>>,
    show_routes_in_nav: Option<bool>,
    show_impressum: Option<bool>,
    show_privacy_policy: Option<bool>,
    show_attribution: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSocialLink {
    name: String,
    url: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLegalSettings {
    name: Option<String>,
    address: Option<String>,
    email: Option<String>,
    phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    pages_dir: Option<PathBuf>,
    static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAdminSettings {
    username: Option<String>,
    password_hash: Option<String>,
    salt: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    static_capacity: Option<usize>,
    page_capacity: Option<usize>,
    non_cacheable_capacity: Option<usize>,
    static_body_limit_bytes: Option<usize>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_capacity(
    value: Option<usize>,
    default: usize,
    key: &'static str,
) -> Result<usize, LoadError> {
    match value.unwrap_or(default) {
        0 => Err(LoadError::invalid(key, "must be greater than zero")),
        value => Ok(value),
    }
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
