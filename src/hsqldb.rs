//! HSQLDB network server rule.
//!
//! Start and stop act on the server process directly: no variables are
//! published, no storage is allocated and there are no grace intervals.
//!
//! # Examples
//!
//! ```no_run
//! use db_server_rules::{BodyResult, HsqldbRule};
//!
//! # async fn demo() -> BodyResult {
//! let mut rule = HsqldbRule::builder()
//!     .on_port(10002)?
//!     .with_properties([
//!         ("server.database.0", "mem:xdb;sql.syntax_pgs=true;user=SA;password=SA"),
//!         ("server.dbname.0", "xdb"),
//!         ("server.remote_open", "true"),
//!     ])
//!     .build()?;
//!
//! rule.run(|info| async move {
//!     assert_eq!(info.jdbc_url("xdb"), "jdbc:hsqldb:hsql://localhost:10002/xdb");
//!     Ok(())
//! })
//! .await
//! # }
//! ```
use crate::config::Launcher;
use crate::config::validator::{validate_hsqldb_properties, validate_port};
use crate::error::{Error, Result};
use crate::rule::Rule;
use crate::server::{ManagedServer, ServerInfo, ServerKind, ServerProcess, ServerStatus};
use crate::support::find_free_port;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

/// Port used when none is configured.
pub const DEFAULT_PORT: u16 = 9001;

/// Database name used by the default properties.
pub const DEFAULT_DATABASE_NAME: &str = "xdb";

const STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Rule running an HSQLDB server around a test body.
pub type HsqldbRule = Rule<HsqldbServer>;

impl Rule<HsqldbServer> {
    /// Start configuring an HSQLDB rule.
    pub fn builder() -> HsqldbRuleBuilder {
        HsqldbRuleBuilder::default()
    }
}

/// Fluent configuration for an [`HsqldbServer`].
#[derive(Debug, Clone)]
pub struct HsqldbRuleBuilder {
    port: u16,
    properties: BTreeMap<String, String>,
    launcher: Option<Launcher>,
}

impl Default for HsqldbRuleBuilder {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            properties: BTreeMap::new(),
            launcher: None,
        }
    }
}

impl HsqldbRuleBuilder {
    /// Listen on `port`. `0` picks a free port at build time.
    pub fn on_port(mut self, port: i32) -> Result<Self> {
        self.port = validate_port(port)?;
        Ok(self)
    }

    /// Replace the server properties (`server.*` keys).
    ///
    /// An empty set falls back to a file database under the working directory.
    pub fn with_properties<I, K, V>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.properties = properties
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    /// Launch the server with `launcher` instead of the resolved default.
    pub fn with_launcher(mut self, launcher: Launcher) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// Build a rule around a freshly configured server.
    pub fn build(self) -> Result<HsqldbRule> {
        Ok(Rule::new(self.build_server()?))
    }

    /// Configure the server process.
    #[tracing::instrument(skip(self))]
    pub fn build_server(self) -> Result<HsqldbServer> {
        let launcher = match self.launcher {
            Some(launcher) => launcher,
            None => Launcher::resolve(ServerKind::Hsqldb)?,
        };

        let properties = if self.properties.is_empty() {
            default_properties()?
        } else {
            self.properties
        };
        validate_hsqldb_properties(&properties)?;

        let port = match self.port {
            0 => find_free_port()?,
            port => port,
        };

        let args = server_arguments(port, &properties);
        tracing::debug!(?args, "Configured HSQLDB server");
        let process = ServerProcess::new(format!("hsqldb:{}", port), launcher.process_spec(args));

        Ok(HsqldbServer {
            process,
            port,
            properties,
            ready_timeout: launcher.readiness_timeout(),
        })
    }
}

/// A file database named `xdb` under the current working directory.
pub fn default_properties() -> Result<BTreeMap<String, String>> {
    let cwd = std::env::current_dir()
        .map_err(|e| Error::configuration_caused_by("Unable to read working directory", e))?;
    let mut props = BTreeMap::new();
    props.insert(
        "server.database.0".to_string(),
        format!("file:{}", cwd.display()),
    );
    props.insert(
        "server.dbname.0".to_string(),
        DEFAULT_DATABASE_NAME.to_string(),
    );
    Ok(props)
}

/// Native HSQLDB server arguments for the resolved configuration.
pub fn server_arguments(port: u16, properties: &BTreeMap<String, String>) -> Vec<String> {
    let mut args = vec![
        "--port".to_string(),
        port.to_string(),
        "--silent".to_string(),
        "true".to_string(),
        "--no_system_exit".to_string(),
        "true".to_string(),
    ];
    for (key, value) in properties {
        let name = key.strip_prefix("server.").unwrap_or(key);
        if name == "port" {
            tracing::debug!(ignored = %value, port, "Builder port overrides 'server.port'");
            continue;
        }
        args.push(format!("--{}", name));
        args.push(value.clone());
    }
    args
}

/// A configured HSQLDB server.
pub struct HsqldbServer {
    process: ServerProcess,
    port: u16,
    properties: BTreeMap<String, String>,
    ready_timeout: Option<Duration>,
}

impl HsqldbServer {
    /// TCP port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Resolved server properties
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    /// Full server command line
    pub fn command_line(&self) -> (&str, &[String]) {
        let spec = self.process.spec();
        (&spec.command, &spec.args)
    }
}

#[async_trait]
impl ManagedServer for HsqldbServer {
    #[tracing::instrument(skip(self))]
    async fn start(&mut self) -> Result<ServerInfo> {
        self.process.start()?;

        if let Some(timeout) = self.ready_timeout {
            if let Err(e) = self.process.wait_until_listening(self.port, timeout).await {
                self.process.kill_now();
                return Err(e);
            }
        }

        tracing::info!(port = self.port, "HSQLDB server started");
        Ok(ServerInfo::new(ServerKind::Hsqldb, None, self.port))
    }

    #[tracing::instrument(skip(self))]
    async fn stop(&mut self) -> Result<()> {
        let result = self.process.stop(STOP_TIMEOUT).await;
        if result.is_err() {
            self.process.kill_now();
        }
        tracing::info!(port = self.port, "HSQLDB server stopped");
        result
    }

    fn status(&self) -> ServerStatus {
        self.process.status()
    }
}

impl Drop for HsqldbServer {
    fn drop(&mut self) {
        self.process.kill_now();
    }
}
