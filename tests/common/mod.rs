#![allow(dead_code)]

use p18_bridge::p18::Client;
use p18_bridge::prelude::*;
use p18_bridge::server::{Session, Shutdown};
use p18_bridge::transport::{History, PseudoTransport};

pub use std::time::Duration;

pub fn common_setup() {
    p18_bridge::init_logging("debug");
}

pub struct Factory;
impl Factory {
    pub fn client() -> (Client, History) {
        Self::client_with(PseudoTransport::new())
    }

    pub fn client_with(pseudo: PseudoTransport) -> (Client, History) {
        let history = pseudo.history();
        let device = Device::new(Transport::Pseudo(pseudo));
        (Client::new(device), history)
    }

    pub fn server_settings() -> config::Server {
        config::Server {
            port: 0,
            ..config::Server::default()
        }
    }

    pub fn session(settings: config::Server) -> (Session, History, Shutdown) {
        Self::session_with(PseudoTransport::new(), settings)
    }

    pub fn session_with(
        pseudo: PseudoTransport,
        settings: config::Server,
    ) -> (Session, History, Shutdown) {
        let (client, history) = Self::client_with(pseudo);
        let shutdown = Shutdown::new();
        (Session::new(client, &settings, shutdown.clone()), history, shutdown)
    }

    /// 28 fields, battery capacity (index 12) at 78 %.
    pub fn general_status() -> &'static str {
        "2301,499,2300,500,0115,0018,002,534,000,000,000,012,078,019,000,000,0120,0000,0450,0000,1,2,1,1,1,2,1,0"
    }

    /// One sample argument list per command name.
    pub fn sample_arguments() -> Vec<(&'static str, Vec<&'static str>)> {
        vec![
            ("get-protocol-id", vec![]),
            ("get-date-time", vec![]),
            ("get-total-generated", vec![]),
            ("get-year-generated", vec!["2024"]),
            ("get-month-generated", vec!["2024", "2"]),
            ("get-day-generated", vec!["2024", "02", "29"]),
            ("get-serial-number", vec![]),
            ("get-cpu-version", vec![]),
            ("get-rated", vec![]),
            ("get-status", vec![]),
            ("get-mode", vec![]),
            ("get-errors", vec![]),
            ("get-flags", vec![]),
            ("get-rated-defaults", vec![]),
            ("get-allowed-charge-currents", vec![]),
            ("get-allowed-ac-charge-currents", vec![]),
            ("get-p-rated", vec!["0"]),
            ("get-p-status", vec!["1"]),
            ("get-ac-charge-time", vec![]),
            ("get-ac-supply-time", vec![]),
            ("set-ac-supply", vec!["1"]),
            ("set-flag", vec!["BUZZ", "0"]),
            ("set-rated-defaults", vec![]),
            ("set-max-charge-current", vec!["0", "60"]),
            ("set-max-ac-charge-current", vec!["0", "30"]),
            ("set-ac-output-freq", vec!["50"]),
            ("set-max-charge-voltage", vec!["57.6", "54"]),
            ("set-ac-output-voltage", vec!["230"]),
            ("set-output-source-priority", vec!["SBU"]),
            ("set-charge-thresholds", vec!["50", "54"]),
            ("set-charge-source-priority", vec!["0", "SU"]),
            ("set-solar-power-priority", vec!["LBU"]),
            ("set-ac-input-voltage-range", vec!["UPS"]),
            ("set-battery-type", vec!["USER"]),
            ("set-output-mode", vec!["0", "P"]),
            ("set-battery-cutoff-voltage", vec!["42.5"]),
            ("set-solar-configuration", vec!["12345"]),
            ("clear-generated-data", vec![]),
            ("set-date-time", vec!["2024", "10", "19", "12", "30", "45"]),
            ("set-ac-charge-time", vec!["23:00", "06:30"]),
            ("set-ac-supply-time", vec!["00:00", "00:00"]),
        ]
    }
}

pub fn strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}
