// src/server/process.rs
use crate::error::{Error, Result};
use async_process::{Child, Command, Stdio};
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::TcpStream;

const READINESS_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Status of a server process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    /// Server is starting
    Starting,
    /// Server is running
    Running,
    /// Server is stopping
    Stopping,
    /// Server has stopped
    Stopped,
    /// Server failed to start or crashed
    Failed,
}

/// Command line of a server process.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSpec {
    /// Program to execute
    pub command: String,
    /// Full argument list
    pub args: Vec<String>,
    /// Extra environment variables
    pub env: HashMap<String, String>,
}

/// A database server child process
pub struct ServerProcess {
    spec: ProcessSpec,
    name: String,
    child: Option<Child>,
    status: ServerStatus,
}

impl ServerProcess {
    /// Create a new, not yet started, server process
    pub fn new(name: String, spec: ProcessSpec) -> Self {
        Self {
            spec,
            name,
            child: None,
            status: ServerStatus::Stopped,
        }
    }

    /// Get the server status
    pub fn status(&self) -> ServerStatus {
        self.status
    }

    /// Get the command line this process runs
    pub fn spec(&self) -> &ProcessSpec {
        &self.spec
    }

    /// Whether a child process is currently owned
    pub fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Spawn the server process
    pub fn start(&mut self) -> Result<()> {
        if self.child.is_some() {
            return Err(Error::AlreadyRunning);
        }

        self.status = ServerStatus::Starting;

        let mut command = Command::new(&self.spec.command);
        command.args(&self.spec.args);
        for (key, value) in &self.spec.env {
            command.env(key, value);
        }

        // Nobody reads the server's chatter; piping it would eventually block the child.
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let child = command.spawn().map_err(|e| {
            self.status = ServerStatus::Failed;
            Error::Start(format!("Failed to start '{}': {}", self.spec.command, e))
        })?;

        tracing::debug!(server = %self.name, pid = child.id(), "Spawned server process");
        self.child = Some(child);
        self.status = ServerStatus::Running;

        Ok(())
    }

    /// Wait until `port` on the loopback interface accepts connections.
    ///
    /// Fails if the child exits first or `timeout` elapses.
    pub async fn wait_until_listening(&mut self, port: u16, timeout: Duration) -> Result<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let child = self.child.as_mut().ok_or(Error::NotRunning)?;
            match child.try_status() {
                Ok(Some(status)) => {
                    self.child = None;
                    self.status = ServerStatus::Failed;
                    return Err(Error::Start(format!(
                        "Server '{}' exited before accepting connections ({})",
                        self.name, status
                    )));
                }
                Ok(None) => {}
                Err(e) => {
                    return Err(Error::Process(format!("Failed to poll process: {}", e)));
                }
            }

            if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
                tracing::debug!(server = %self.name, port, "Server accepts connections");
                return Ok(());
            }

            if tokio::time::Instant::now() >= deadline {
                self.status = ServerStatus::Failed;
                return Err(Error::Start(format!(
                    "Server '{}' did not listen on port {} within {:?}",
                    self.name, port, timeout
                )));
            }
            tokio::time::sleep(READINESS_POLL_INTERVAL).await;
        }
    }

    /// Stop the server process, waiting at most `timeout` for it to exit
    pub async fn stop(&mut self, timeout: Duration) -> Result<()> {
        let Some(mut child) = self.child.take() else {
            return Err(Error::NotRunning);
        };
        self.status = ServerStatus::Stopping;

        if let Err(e) = child.kill() {
            // Already exited on its own.
            if child.try_status().ok().flatten().is_none() {
                self.child = Some(child);
                self.status = ServerStatus::Failed;
                return Err(Error::Stop(format!("Failed to kill process: {}", e)));
            }
        }

        match tokio::time::timeout(timeout, child.status()).await {
            Ok(_) => {
                self.status = ServerStatus::Stopped;
                Ok(())
            }
            Err(_) => {
                self.child = Some(child);
                self.status = ServerStatus::Failed;
                Err(Error::Timeout(format!(
                    "Server '{}' did not exit within {:?}",
                    self.name, timeout
                )))
            }
        }
    }

    /// Kill the child without waiting; used by finalizers.
    pub(crate) fn kill_now(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                tracing::debug!(server = %self.name, error = %e, "Kill on drop failed");
            }
            self.status = ServerStatus::Stopped;
        }
    }
}
