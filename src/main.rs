use p18_bridge::options::Options;
use p18_bridge::prelude::*;
use p18_bridge::server::Shutdown;

#[tokio::main]
async fn main() {
    let options = Options::new();

    let config = ConfigWrapper::new(options.config_file.clone()).unwrap_or_else(|err| {
        p18_bridge::init_logging("info");
        error!("Failed to load config: {:?}", err);
        std::process::exit(255);
    });

    if let Some(kind) = options.device {
        config.set_device_kind(kind);
    }

    let loglevel = if options.verbose {
        "debug".to_string()
    } else {
        config.loglevel()
    };
    p18_bridge::init_logging(&loglevel);
    config.log();

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown.clone().on_signal());

    if let Err(err) = p18_bridge::app(shutdown, config).await {
        error!("{:#}", err);
        std::process::exit(1);
    }
}
