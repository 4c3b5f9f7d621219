pub mod config;   // YAML configuration
pub mod error;    // Library error type and file_error! macros
pub mod format;   // Response rendering
pub mod options;  // Command line options parsing
pub mod p18;      // P18 commands, responses and client
pub mod prelude;  // Common imports and types
pub mod server;   // TCP daemon
pub mod transport; // USB, serial and pseudo device links

// Get the package version from Cargo.toml
pub const CARGO_PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

use crate::prelude::*;
use crate::p18::Client;
use crate::server::{Server, Session, Shutdown};

/// Installs the env_logger backend with `default_level` as the filter
/// unless RUST_LOG says otherwise. Safe to call more than once.
pub fn init_logging(default_level: &str) {
    let result = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {} {}] {}",
                chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f"),
                record.level(),
                record.module_path().unwrap_or(""),
                record.args()
            )
        })
        .write_style(env_logger::WriteStyle::Never)
        .try_init();

    if let Err(e) = result {
        debug!("logger already initialized: {}", e);
    }
}

/// Opens the configured device and hands it to a new session.
pub fn open_session(config: &ConfigWrapper, shutdown: Shutdown) -> anyhow::Result<Session> {
    let settings = config.device();

    let transport = Transport::open(&settings)
        .map_err(|err| file_error_with_source!(err, "failed to open {} device", settings.kind()))?;
    let device = Device::new(transport).with_timeout(settings.timeout());

    Ok(Session::new(Client::new(device), &config.server(), shutdown))
}

/// Daemon main loop: open the device, accept connections until `shutdown`
/// fires, then let open connections finish what they are doing.
pub async fn app(shutdown: Shutdown, config: ConfigWrapper) -> anyhow::Result<()> {
    info!("inverterd {} starting", CARGO_PKG_VERSION);

    let session = open_session(&config, shutdown.clone())?;
    let listener = Server::bind(&config.server()).await?;

    let server = Server::new(session, shutdown);
    server.serve(listener).await?;

    info!("Application shutdown complete");
    Ok(())
}
