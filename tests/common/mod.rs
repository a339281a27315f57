use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use code_feedback::analyzer::{Analyzer, AnalyzerError};
use code_feedback::server::Server;
use code_feedback::{app, AppState};
use tokio::sync::Notify;

/// Tracks environment variable mutations and restores originals on drop.
#[allow(dead_code)]
pub struct EnvGuard {
    originals: HashMap<String, Option<String>>,
}

impl EnvGuard {
    #[allow(dead_code)]
    pub fn new() -> Self {
        Self {
            originals: HashMap::new(),
        }
    }

    #[allow(dead_code)]
    pub fn set(&mut self, key: &str, value: &str) {
        self.capture(key);
        std::env::set_var(key, value);
    }

    #[allow(dead_code)]
    pub fn remove(&mut self, key: &str) {
        self.capture(key);
        std::env::remove_var(key);
    }

    fn capture(&mut self, key: &str) {
        if self.originals.contains_key(key) {
            return;
        }
        let original = std::env::var(key).ok();
        self.originals.insert(key.to_string(), original);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, original) in self.originals.drain() {
            match original {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}

/// Analyzer that sleeps before answering, to keep a request in flight.
/// `started` is notified as soon as a request reaches the analyzer.
#[allow(dead_code)]
pub struct SlowAnalyzer {
    pub delay: Duration,
    pub started: Arc<Notify>,
}

impl SlowAnalyzer {
    #[allow(dead_code)]
    pub fn new(delay: Duration) -> (Self, Arc<Notify>) {
        let started = Arc::new(Notify::new());
        (
            Self {
                delay,
                started: started.clone(),
            },
            started,
        )
    }
}

#[async_trait::async_trait]
impl Analyzer for SlowAnalyzer {
    fn name(&self) -> &str {
        "slow"
    }

    async fn analyze(&self, code: &str) -> Result<String, AnalyzerError> {
        self.started.notify_one();
        tokio::time::sleep(self.delay).await;
        Ok(format!("slow feedback for {}", code))
    }
}

/// Analyzer whose backend is always down.
#[allow(dead_code)]
pub struct FailingAnalyzer;

#[async_trait::async_trait]
impl Analyzer for FailingAnalyzer {
    fn name(&self) -> &str {
        "failing"
    }

    async fn analyze(&self, _code: &str) -> Result<String, AnalyzerError> {
        Err(AnalyzerError::Backend("upstream unavailable".into()))
    }
}

/// Start a live server on an ephemeral loopback port.
#[allow(dead_code)]
pub async fn spawn_server(state: AppState) -> (String, Server) {
    let server = Server::start(([127, 0, 0, 1], 0).into(), app(state))
        .await
        .unwrap();
    (format!("http://{}", server.local_addr()), server)
}
