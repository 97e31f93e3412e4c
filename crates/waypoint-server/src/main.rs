//! # waypoint
//!
//! Server binary: loads settings, opens and migrates the database, and
//! serves the `/v1` API until ctrl-c.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;

use waypoint_server::WaypointServer;
use waypoint_settings::{DatabaseSettings, WaypointSettings};
use waypoint_store::{ConnectionConfig, ConnectionPool};

const IN_MEMORY: &str = ":memory:";

/// Waypoint planning and community server.
#[derive(Parser, Debug)]
#[command(name = "waypoint", about = "Waypoint planning and community server")]
struct Cli {
    /// Settings file (defaults to `~/.waypoint/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Host to bind (overrides settings).
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, 0 for auto-assign (overrides settings).
    #[arg(long)]
    port: Option<u16>,

    /// Database file (overrides settings).
    #[arg(long)]
    db_path: Option<String>,
}

impl Cli {
    fn apply(&self, settings: &mut WaypointSettings) {
        if let Some(ref host) = self.host {
            settings.server.host.clone_from(host);
        }
        if let Some(port) = self.port {
            settings.server.port = port;
        }
        if let Some(ref path) = self.db_path {
            settings.database.path.clone_from(path);
        }
    }
}

/// Relative paths live under the data directory.
fn resolve_db_path(path: &str, data_dir: &Path) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        data_dir.join(path)
    }
}

fn open_pool(db: &DatabaseSettings) -> Result<ConnectionPool> {
    let config = ConnectionConfig {
        pool_size: db.pool_size,
        busy_timeout_ms: db.busy_timeout_ms,
        cache_size_kib: db.cache_size_kib,
    };
    if db.path == IN_MEMORY {
        return waypoint_store::connection::new_in_memory(&config).context("Failed to open in-memory database");
    }

    let path = resolve_db_path(&db.path, &waypoint_settings::loader::data_dir());
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    waypoint_store::connection::new_file(&path.to_string_lossy(), &config)
        .with_context(|| format!("Failed to open database: {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let mut settings = match args.settings {
        Some(ref path) => waypoint_settings::load_settings_from_path(path),
        None => waypoint_settings::load_settings(),
    }
    .context("Failed to load settings")?;
    args.apply(&mut settings);

    waypoint_core::logging::init_subscriber(&settings.logging.level, settings.logging.json);

    let pool = open_pool(&settings.database)?;
    {
        let conn = pool.get().context("Failed to get DB connection")?;
        let applied = waypoint_store::run_migrations(&conn).context("Failed to run migrations")?;
        let version = waypoint_store::migrations::current_version(&conn).context("Failed to read schema version")?;
        tracing::info!(applied, schema_version = version, "database ready");
    }

    let server = WaypointServer::new(settings.server.clone(), pool);
    let (addr, handle) = server.listen().await.context("Failed to bind server")?;
    tracing::info!("Waypoint listening on http://{addr}/v1");

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;
    tracing::info!("shutting down");
    if !server.shutdown().drain(handle).await {
        tracing::warn!("exiting with requests still open");
    }

    Ok(())
}
