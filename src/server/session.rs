use crate::prelude::*;
use crate::p18::Client;
use crate::server::Shutdown;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Clone, Debug)]
struct Cached {
    at: Instant,
    args: Vec<String>,
    response: Response,
}

impl Cached {
    fn matches(&self, args: &[String], ttl: Duration) -> bool {
        self.at.elapsed() <= ttl && self.args == args
    }
}

/// Everything that may only be touched while holding the device lock.
struct State {
    client: Client,
    cache: HashMap<CommandKind, Cached>,
    last_finished: Option<Instant>,
    device_errors: u32,
}

/// Serialized access to the one device the daemon owns, shared by every
/// connection.
///
/// One lock covers the device, the response cache and the pacing clock, so
/// two connections never talk to the device at the same time.
#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<State>>,
    cache_timeout: Duration,
    delay: Duration,
    device_error_limit: u32,
    device_failed: Arc<AtomicBool>,
    shutdown: Shutdown,
}

impl Session {
    pub fn new(client: Client, settings: &config::Server, shutdown: Shutdown) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                client,
                cache: HashMap::new(),
                last_finished: None,
                device_errors: 0,
            })),
            cache_timeout: settings.cache_timeout(),
            delay: settings.delay(),
            device_error_limit: settings.device_error_limit(),
            device_failed: Arc::new(AtomicBool::new(false)),
            shutdown,
        }
    }

    /// Runs a validated command, or answers from the cache when the same
    /// command with the same arguments completed within the cache timeout.
    ///
    /// Failures from the device or the codec come back as
    /// [`Error::Runtime`] with a prefix naming the failing layer.
    pub async fn execute(&self, kind: CommandKind, args: Vec<String>) -> Result<Response> {
        let mut state = self.state.clone().lock_owned().await;

        let hit = state
            .cache
            .get(&kind)
            .filter(|cached| cached.matches(&args, self.cache_timeout))
            .map(|cached| cached.response.clone());

        if let Some(response) = hit {
            debug!("{:?}: answering from cache", kind);
            return Ok(response);
        }
        state.cache.remove(&kind);

        if !self.delay.is_zero() {
            if let Some(since) = state.last_finished.map(|at| at.elapsed()) {
                if since < self.delay {
                    let wait = self.delay - since;
                    debug!("{:?}: pacing, sleeping {} ms", kind, wait.as_millis());
                    tokio::time::sleep(wait).await;
                }
            }
        }

        let request = args.clone();
        let (mut state, result) = tokio::task::spawn_blocking(move || {
            let result = state.client.execute(kind, &request);
            (state, result)
        })
        .await
        .map_err(|err| Error::Internal(format!("device task failed: {}", err)))?;

        state.last_finished = Some(Instant::now());

        match result {
            Ok(response) => {
                state.device_errors = 0;
                state.cache.insert(
                    kind,
                    Cached {
                        at: Instant::now(),
                        args,
                        response: response.clone(),
                    },
                );
                Ok(response)
            }
            Err(err) => {
                if err.is_device_level() {
                    state.device_errors += 1;
                    self.check_error_limit(state.device_errors);
                }
                Err(err.into_runtime())
            }
        }
    }

    fn check_error_limit(&self, errors: u32) {
        if self.device_error_limit == 0 || errors < self.device_error_limit {
            return;
        }

        error!("{} consecutive device errors, shutting down", errors);
        self.device_failed.store(true, Ordering::SeqCst);
        self.shutdown.trigger();
    }

    /// True once the device error limit has been reached.
    pub fn device_failed(&self) -> bool {
        self.device_failed.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::PseudoTransport;

    fn session(pseudo: PseudoTransport, settings: config::Server) -> Session {
        let client = Client::new(Device::new(Transport::Pseudo(pseudo)));
        Session::new(client, &settings, Shutdown::new())
    }

    #[tokio::test]
    async fn cache_hit_skips_device() {
        let pseudo = PseudoTransport::new();
        let history = pseudo.history();
        let session = session(pseudo, config::Server::default());

        let first = session.execute(CommandKind::GetProtocolId, vec![]).await.unwrap();
        let second = session.execute(CommandKind::GetProtocolId, vec![]).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn different_arguments_miss() {
        let pseudo = PseudoTransport::new();
        let history = pseudo.history();
        let session = session(pseudo, config::Server::default());

        let args = |y: &str| vec![y.to_string()];
        session.execute(CommandKind::GetYearGenerated, args("2023")).await.unwrap();
        session.execute(CommandKind::GetYearGenerated, args("2024")).await.unwrap();
        session.execute(CommandKind::GetYearGenerated, args("2024")).await.unwrap();

        assert_eq!(history.len(), 2);
    }

    #[tokio::test]
    async fn errors_are_wrapped() {
        let mut pseudo = PseudoTransport::new();
        pseudo.push_response("^D0");
        let session = session(pseudo, config::Server::default());

        let err = session.execute(CommandKind::GetGeneralStatus, vec![]).await.unwrap_err();

        assert!(matches!(&err, Error::Runtime(m) if m.starts_with("response is invalid: ")));
    }

    #[tokio::test]
    async fn device_error_limit_triggers_shutdown() {
        let mut pseudo = PseudoTransport::new().without_crc();
        pseudo.push_raw(b"^1\x00\x00\r".to_vec());
        pseudo.push_raw(b"^1\x00\x00\r".to_vec());

        let settings = config::Server {
            device_error_limit: 2,
            ..config::Server::default()
        };
        let session = session(pseudo, settings);

        let err = session.execute(CommandKind::SetAcOutputFreq, vec!["50".into()]).await.unwrap_err();
        assert!(matches!(&err, Error::Runtime(m) if m.starts_with("data is invalid: ")));
        assert!(!session.shutdown.is_triggered());
        assert!(!session.device_failed());

        assert!(session.execute(CommandKind::SetAcOutputFreq, vec!["50".into()]).await.is_err());
        assert!(session.shutdown.is_triggered());
        assert!(session.device_failed());
    }
}
