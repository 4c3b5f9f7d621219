use p18_bridge::options::CtlOptions;
use p18_bridge::p18::{registry, Client};
use p18_bridge::prelude::*;
use p18_bridge::transport::Flags;

fn run(options: &CtlOptions) -> Result<()> {
    let settings = options.device_settings();

    let transport = Transport::open(&settings)?;
    let device = Device::new(transport)
        .with_flags(Flags::read_only_crc())
        .with_timeout(settings.timeout());
    let mut client = Client::new(device);

    if let Some(raw) = &options.raw {
        let response = client.run_raw(raw)?;
        println!("{}", String::from_utf8_lossy(&response));
        if options.verbose {
            println!("{}", transport::hexdump(&response));
        }
        return Ok(());
    }

    let command = options.command.as_deref().unwrap_or_default();
    let (kind, args) = registry::validate(command, &options.args)?;
    let response = client.execute(kind, &args)?;

    println!("{}", format::render(&response, options.output_format()));

    Ok(())
}

fn main() {
    let options = CtlOptions::new();
    p18_bridge::init_logging(if options.verbose { "debug" } else { "warn" });

    if let Err(err) = run(&options) {
        let response = Response::error(err.into_runtime().to_string());
        println!("{}", format::render(&response, options.output_format()));
        std::process::exit(1);
    }
}
