//! The delivery service: composition root and serve loop.

use std::{sync::Arc, time::Duration};

use lettermill_common::{Signal, config::Config};
use lettermill_spool::{ChangeEvent, DocumentStore};
use tokio::{sync::broadcast, task::JoinSet};
use tracing::{debug, error, info, warn};

use crate::{
    cleanup::sweep_terminal,
    directory::UserDirectory,
    error::DeliveryError,
    events::{EventSink, NullSink},
    executor::DeliveryExecutor,
    machine::QueueStateMachine,
    payload::PayloadPreparer,
    template::TemplateRenderer,
    transport::Mailer,
};

const CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Process-wide composition root for queue delivery.
///
/// Holds every shared collaborator (store, transport, renderer, directory,
/// event sink), constructed once at startup and shared read-only by all
/// concurrent invocations.
#[derive(Debug)]
pub struct DeliveryService {
    store: Arc<dyn DocumentStore>,
    mailer: Arc<dyn Mailer>,
    renderer: Option<Arc<dyn TemplateRenderer>>,
    directory: Option<Arc<dyn UserDirectory>>,
    sink: Arc<dyn EventSink>,
    lease: Duration,
    retention: Option<Duration>,
    default_from: Option<String>,
    default_reply_to: Option<String>,
}

impl DeliveryService {
    #[must_use]
    pub fn new(config: &Config, store: Arc<dyn DocumentStore>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            store,
            mailer,
            renderer: None,
            directory: None,
            sink: Arc::new(NullSink),
            lease: config.lease(),
            retention: config.retention(),
            default_from: config.default_from.clone(),
            default_reply_to: config.default_reply_to.clone(),
        }
    }

    /// Attach a template renderer.
    #[must_use]
    pub fn with_renderer(mut self, renderer: Arc<dyn TemplateRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Attach a user directory for uid-based addressing.
    #[must_use]
    pub fn with_directory(mut self, directory: Arc<dyn UserDirectory>) -> Self {
        self.directory = Some(directory);
        self
    }

    /// Attach an event sink for transition observers.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Assemble the state machine from the configured collaborators.
    #[must_use]
    pub fn machine(&self) -> QueueStateMachine {
        let mut preparer = PayloadPreparer::new(&Config {
            default_from: self.default_from.clone(),
            default_reply_to: self.default_reply_to.clone(),
            ..Config::default()
        });
        if let Some(renderer) = &self.renderer {
            preparer = preparer.with_renderer(Arc::clone(renderer));
        }
        if let Some(directory) = &self.directory {
            preparer = preparer.with_directory(Arc::clone(directory));
        }

        let executor = DeliveryExecutor::new(preparer, Arc::clone(&self.mailer));
        QueueStateMachine::new(
            Arc::clone(&self.store),
            executor,
            Arc::clone(&self.sink),
            self.lease,
        )
    }

    /// Run the delivery service until the change feed closes or a shutdown
    /// signal arrives.
    ///
    /// Every change event is handled by its own task, so slow deliveries for
    /// one document never block the feed. On shutdown, in-flight deliveries
    /// are drained before returning. When a retention window is configured,
    /// terminal documents are swept on an interval.
    ///
    /// # Errors
    ///
    /// Returns an error if the serve loop encounters a fatal error.
    pub async fn serve(
        &self,
        mut changes: broadcast::Receiver<ChangeEvent>,
        mut shutdown: broadcast::Receiver<Signal>,
    ) -> Result<(), DeliveryError> {
        info!("Delivery service starting");

        let machine = Arc::new(self.machine());
        let mut tasks: JoinSet<()> = JoinSet::new();

        let mut cleanup_timer = tokio::time::interval(CLEANUP_INTERVAL);
        // Skip the first tick to avoid immediate execution
        cleanup_timer.tick().await;

        loop {
            tokio::select! {
                change = changes.recv() => match change {
                    Ok(event) => {
                        let machine = Arc::clone(&machine);
                        tasks.spawn(async move {
                            machine.handle_change(&event).await;
                        });
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Change feed lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        info!("Change feed closed");
                        break;
                    }
                },
                _ = cleanup_timer.tick() => {
                    if let Some(retention) = self.retention {
                        match sweep_terminal(self.store.as_ref(), retention).await {
                            Ok(0) => debug!("Cleanup sweep found nothing to remove"),
                            Ok(removed) => {
                                info!(removed, "Swept terminal queue documents");
                            }
                            Err(failure) => {
                                error!(error = %failure, "Cleanup sweep failed");
                            }
                        }
                    }
                },
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {},
                signal = shutdown.recv() => {
                    match signal {
                        Ok(Signal::Shutdown) => {
                            info!("Delivery service received shutdown signal");
                        }
                        Err(failure) => {
                            error!(error = %failure, "Shutdown channel error");
                        }
                    }
                    break;
                }
            }
        }

        // Drain in-flight deliveries before returning
        while tasks.join_next().await.is_some() {}

        info!("Delivery service shutdown complete");
        Ok(())
    }
}
