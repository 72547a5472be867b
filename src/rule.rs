//! The rule: start a server, run a test body, always stop the server.
use crate::error::Error;
use crate::server::{LifecycleEvent, LifecycleLog, ManagedServer, RuleState, ServerInfo};
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;

/// Brackets test bodies with a server start and a guaranteed stop.
///
/// One rule may run several bodies in sequence (a class-scoped rule); each
/// run goes through `Idle -> Starting -> Running -> Stopping -> Done`.
pub struct Rule<S: ManagedServer> {
    server: S,
    log: LifecycleLog,
}

impl<S: ManagedServer> Rule<S> {
    /// Wrap an already configured server.
    pub fn new(server: S) -> Self {
        Self {
            server,
            log: LifecycleLog::new(),
        }
    }

    /// The wrapped server
    pub fn server(&self) -> &S {
        &self.server
    }

    /// Shared handle on this rule's lifecycle history
    pub fn log(&self) -> LifecycleLog {
        self.log.clone()
    }

    /// State of the current or last run
    pub fn state(&self) -> RuleState {
        self.log.state()
    }

    /// Run `body` with the server up.
    ///
    /// A start failure is returned before `body` runs. Whatever `body`
    /// returns is passed through after the server is stopped; a panic in
    /// `body` is resumed after the stop. Stop failures are logged only.
    #[tracing::instrument(skip_all)]
    pub async fn run<F, Fut, T, E>(&mut self, body: F) -> std::result::Result<T, E>
    where
        F: FnOnce(ServerInfo) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: From<Error>,
    {
        tracing::debug!("START DB");
        self.log.record(LifecycleEvent::Starting, None);
        let info = match self.server.start().await {
            Ok(info) => info,
            Err(e) => {
                tracing::error!(error = %e, "Could not start server");
                self.log
                    .record(LifecycleEvent::StartFailed, Some(e.to_string()));
                return Err(e.into());
            }
        };
        self.log.record(
            LifecycleEvent::Started,
            Some(format!("{} on port {}", info.kind(), info.port())),
        );
        tracing::debug!(port = info.port(), "DB STARTED");

        let outcome = AssertUnwindSafe(async move { body(info).await })
            .catch_unwind()
            .await;

        tracing::debug!("SHUTTING DOWN DB");
        self.log.record(LifecycleEvent::Stopping, None);
        match self.server.stop().await {
            Ok(()) => self.log.record(LifecycleEvent::Stopped, None),
            Err(e) => {
                tracing::warn!(error = %e, "Server did not stop cleanly");
                self.log
                    .record(LifecycleEvent::StopFailed, Some(e.to_string()));
            }
        }
        tracing::debug!("DB DOWN");

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}
