//! H2 TCP server rule.
//!
//! The handle publishes the database directory and port as environment
//! variables (`h2.home` and `h2.port` unless renamed) before the server
//! starts and clears them once it is down. Without an explicit directory a
//! fresh `H2_HOME_<uuid>` directory is allocated under the temp dir and
//! deleted after shutdown.
//!
//! # Examples
//!
//! ```no_run
//! use db_server_rules::{BodyResult, H2Rule};
//!
//! # async fn demo() -> BodyResult {
//! let mut rule = H2Rule::builder().on_port(9092)?.build()?;
//! rule.run(|info| async move {
//!     println!("H2 home: {:?}", std::env::var("h2.home"));
//!     println!("url: {}", info.jdbc_url("test"));
//!     Ok(())
//! })
//! .await
//! # }
//! ```
use crate::config::Launcher;
use crate::config::validator::{validate_directory, validate_h2_properties, validate_port};
use crate::error::{Error, Result};
use crate::rule::Rule;
use crate::server::{ManagedServer, ServerInfo, ServerKind, ServerProcess, ServerStatus};
use crate::support::storage::{delete_storage_dir, delete_storage_dir_blocking};
use crate::support::{
    EnvironmentPublisher, allocate_storage_dir, find_free_port, purge_pending_deletions,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Rule running an H2 TCP server around a test body.
pub type H2Rule = Rule<H2Server>;

impl Rule<H2Server> {
    /// Start configuring an H2 rule.
    pub fn builder() -> H2RuleBuilder {
        H2RuleBuilder::default()
    }
}

/// Waits around the actual server stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownPolicy {
    /// Time given to connected clients before the server is stopped
    pub pre_stop_grace: Duration,
    /// Time given to the server to release its files before deletion
    pub post_stop_grace: Duration,
    /// Upper bound for the process to acknowledge the stop by exiting
    pub stop_timeout: Duration,
}

impl Default for ShutdownPolicy {
    fn default() -> Self {
        Self {
            pre_stop_grace: Duration::from_millis(800),
            post_stop_grace: Duration::from_millis(800),
            stop_timeout: Duration::from_secs(5),
        }
    }
}

impl ShutdownPolicy {
    /// No grace intervals, only the bounded exit wait.
    pub fn immediate() -> Self {
        Self {
            pre_stop_grace: Duration::ZERO,
            post_stop_grace: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Fluent configuration for an [`H2Server`].
#[derive(Debug, Clone)]
pub struct H2RuleBuilder {
    port: Option<u16>,
    db_directory: Option<PathBuf>,
    properties: BTreeMap<String, String>,
    publisher: EnvironmentPublisher,
    delete_on_shutdown: bool,
    launcher: Option<Launcher>,
    shutdown: ShutdownPolicy,
}

impl Default for H2RuleBuilder {
    fn default() -> Self {
        Self {
            port: None,
            db_directory: None,
            properties: BTreeMap::new(),
            publisher: EnvironmentPublisher::default(),
            delete_on_shutdown: true,
            launcher: None,
            shutdown: ShutdownPolicy::default(),
        }
    }
}

impl H2RuleBuilder {
    /// Listen on `port`. `0` picks a free port at build time.
    pub fn on_port(mut self, port: i32) -> Result<Self> {
        self.port = Some(validate_port(port)?);
        Ok(self)
    }

    /// Use `path` as the H2 base directory instead of a temporary one.
    pub fn with_db_directory(mut self, path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        validate_directory(&path)?;
        self.db_directory = Some(path);
        Ok(self)
    }

    /// Extra server options, e.g. `ifNotExists -> ""`. Empty values become flags.
    pub fn with_properties<I, K, V>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.properties
            .extend(properties.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Do not publish the directory variable.
    pub fn disable_db_directory_exposing(mut self) -> Self {
        self.publisher.disable_directory();
        self
    }

    /// Do not publish the port variable.
    pub fn disable_db_port_exposing(mut self) -> Self {
        self.publisher.disable_port();
        self
    }

    /// Publish the directory under `name` instead of `h2.home`.
    pub fn use_db_directory_variable_name(mut self, name: impl Into<String>) -> Result<Self> {
        self.publisher.set_directory_variable(name)?;
        Ok(self)
    }

    /// Publish the port under `name` instead of `h2.port`.
    pub fn use_db_port_variable_name(mut self, name: impl Into<String>) -> Result<Self> {
        self.publisher.set_port_variable(name)?;
        Ok(self)
    }

    /// Keep the directory after shutdown.
    pub fn do_not_delete_db_directory_on_shutdown(mut self) -> Self {
        self.delete_on_shutdown = false;
        self
    }

    /// Launch the server with `launcher` instead of the resolved default.
    pub fn with_launcher(mut self, launcher: Launcher) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Override the waits around the server stop.
    pub fn with_shutdown_policy(mut self, policy: ShutdownPolicy) -> Self {
        self.shutdown = policy;
        self
    }

    /// Build a rule around a freshly configured server.
    pub fn build(self) -> Result<H2Rule> {
        Ok(Rule::new(self.build_server()?))
    }

    /// Resolve directory and port and configure the server process.
    #[tracing::instrument(skip(self))]
    pub fn build_server(self) -> Result<H2Server> {
        let launcher = match self.launcher {
            Some(launcher) => launcher,
            None => Launcher::resolve(ServerKind::H2)?,
        };
        validate_h2_properties(&self.properties)?;

        let directory = match self.db_directory {
            Some(dir) => {
                if let Err(e) = std::fs::create_dir_all(&dir) {
                    tracing::warn!(
                        path = %dir.display(),
                        error = %e,
                        "Db directory was not created"
                    );
                }
                dir
            }
            None => allocate_storage_dir()?,
        };

        let port = match self.port {
            Some(port) if port > 0 => port,
            _ => find_free_port()?,
        };

        let args = server_arguments(&directory, port, &self.properties);
        tracing::debug!(?args, "Configured H2 server");
        let process = ServerProcess::new(format!("h2:{}", port), launcher.process_spec(args));

        Ok(H2Server {
            process,
            directory,
            port,
            publisher: self.publisher,
            delete_on_shutdown: self.delete_on_shutdown,
            ready_timeout: launcher.readiness_timeout(),
            shutdown: self.shutdown,
            cleaned_up: false,
        })
    }
}

/// Native H2 server arguments for the resolved configuration.
pub fn server_arguments(
    directory: &Path,
    port: u16,
    properties: &BTreeMap<String, String>,
) -> Vec<String> {
    let mut args = vec![
        "-tcp".to_string(),
        "-baseDir".to_string(),
        directory.to_string_lossy().into_owned(),
        "-tcpAllowOthers".to_string(),
        "-tcpPort".to_string(),
        port.to_string(),
    ];
    for (key, value) in properties {
        args.push(format!("-{}", key.trim_start_matches('-')));
        if !value.is_empty() {
            args.push(value.clone());
        }
    }
    args
}

/// A configured H2 TCP server.
pub struct H2Server {
    process: ServerProcess,
    directory: PathBuf,
    port: u16,
    publisher: EnvironmentPublisher,
    delete_on_shutdown: bool,
    ready_timeout: Option<Duration>,
    shutdown: ShutdownPolicy,
    cleaned_up: bool,
}

impl H2Server {
    /// Base directory of the databases
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// TCP port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Variable publishing settings
    pub fn publisher(&self) -> &EnvironmentPublisher {
        &self.publisher
    }

    /// Whether the directory is deleted after shutdown
    pub fn deletes_directory_on_shutdown(&self) -> bool {
        self.delete_on_shutdown
    }

    /// Full server command line
    pub fn command_line(&self) -> (&str, &[String]) {
        let spec = self.process.spec();
        (&spec.command, &spec.args)
    }

    fn info(&self) -> ServerInfo {
        ServerInfo::new(ServerKind::H2, Some(self.directory.clone()), self.port)
    }

    async fn release_storage(&mut self) {
        tokio::time::sleep(self.shutdown.post_stop_grace).await;

        if self.delete_on_shutdown {
            delete_storage_dir(&self.directory).await;
        } else {
            tracing::info!(path = %self.directory.display(), "'dbDirectory' still exists");
        }
        self.cleaned_up = true;
    }
}

#[async_trait]
impl ManagedServer for H2Server {
    #[tracing::instrument(skip(self))]
    async fn start(&mut self) -> Result<ServerInfo> {
        if self.process.is_running() {
            return Err(Error::AlreadyRunning);
        }
        if !self.directory.exists() {
            // A previous run of a reused handle deleted it.
            tokio::fs::create_dir_all(&self.directory)
                .await
                .map_err(|e| Error::Start(format!("Unable to recreate db directory: {}", e)))?;
        }

        self.publisher.publish(&self.directory, self.port);
        self.cleaned_up = false;

        if let Err(e) = self.process.start() {
            self.publisher.clear();
            return Err(e);
        }

        if let Some(timeout) = self.ready_timeout {
            if let Err(e) = self.process.wait_until_listening(self.port, timeout).await {
                self.process.kill_now();
                self.publisher.clear();
                return Err(e);
            }
        }

        tracing::info!(port = self.port, path = %self.directory.display(), "H2 server started");
        Ok(self.info())
    }

    #[tracing::instrument(skip(self))]
    async fn stop(&mut self) -> Result<()> {
        // No drain signal exists for H2 clients; give them a fixed window.
        tokio::time::sleep(self.shutdown.pre_stop_grace).await;

        let stopped = self.process.stop(self.shutdown.stop_timeout).await;
        if stopped.is_err() {
            self.process.kill_now();
        }

        self.release_storage().await;
        self.publisher.clear();
        tracing::info!(port = self.port, "H2 server stopped");
        stopped
    }

    fn status(&self) -> ServerStatus {
        self.process.status()
    }
}

impl Drop for H2Server {
    fn drop(&mut self) {
        if !self.cleaned_up {
            if self.process.is_running() {
                tracing::debug!(port = self.port, "H2 server dropped while running");
                self.process.kill_now();
                self.publisher.clear();
            }
            if self.delete_on_shutdown {
                delete_storage_dir_blocking(&self.directory);
            }
            self.cleaned_up = true;
        }
        purge_pending_deletions();
    }
}
