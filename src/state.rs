use std::sync::Arc;

use crate::config::Config;
use crate::document::asset::{FaultSink, TracingFaultSink};
use crate::email::{Mailer, Notifier, SmtpMailer};
use crate::storage::{ArtifactStore, DirectoryStore};

pub type SharedState = Arc<AppState>;

/// Read-only per-process state, built once at startup.
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn ArtifactStore>,
    pub notifier: Option<Notifier>,
    pub faults: Arc<dyn FaultSink>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, String> {
        let notifier = match &config.smtp {
            Some(smtp) => {
                let mailer = SmtpMailer::new(smtp)?;
                tracing::info!(host = %smtp.host, port = smtp.port, "SMTP configured");
                Some(Notifier::new(smtp.clone(), Arc::new(mailer)))
            }
            None => {
                tracing::info!("SMTP not configured, submissions will not be emailed");
                None
            }
        };

        Ok(Self {
            store: Arc::new(DirectoryStore::new(config.out_dir.clone())),
            config,
            notifier,
            faults: Arc::new(TracingFaultSink),
        })
    }

    /// Replace the mail transport. Has no effect without SMTP configuration.
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.notifier = self
            .config
            .smtp
            .clone()
            .map(|smtp| Notifier::new(smtp, mailer));
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ArtifactStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_fault_sink(mut self, faults: Arc<dyn FaultSink>) -> Self {
        self.faults = faults;
        self
    }
}
