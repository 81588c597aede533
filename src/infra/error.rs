use std::{io, net::SocketAddr, path::PathBuf};

use thiserror::Error;

/// Failures raised while bringing the server up.
#[derive(Debug, Error)]
pub enum InfraError {
    #[error("failed to read pages under {}: {source}", path.display())]
    Pages {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("database unavailable: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migrations failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
    #[error("telemetry initialization failed: {0}")]
    Telemetry(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

impl InfraError {
    pub(crate) fn pages(path: &std::path::Path) -> impl FnOnce(io::Error) -> Self + '_ {
        move |source| Self::Pages {
            path: path.to_path_buf(),
            source,
        }
    }
}
