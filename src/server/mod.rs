/// Server management module for db-server-rules.
///
/// This module holds the seam between rules and the database servers they
/// drive: the [`ManagedServer`] trait, the [`ServerInfo`] handed to test
/// bodies, the child-process wrapper and the lifecycle event log.
///
/// # Components
///
/// * `lifecycle` - Rule states and the lifecycle event log
/// * `process` - Child process management for server instances
///
/// # Examples
///
/// ```
/// use db_server_rules::server::{ServerInfo, ServerKind};
///
/// let info = ServerInfo::new(ServerKind::Hsqldb, None, 10002);
/// assert_eq!(info.jdbc_url("xdb"), "jdbc:hsqldb:hsql://localhost:10002/xdb");
/// ```
pub mod lifecycle;
pub mod process;

pub use lifecycle::{LifecycleEvent, LifecycleLog, LifecycleRecord, RuleState};
pub use process::{ProcessSpec, ServerProcess, ServerStatus};

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};

/// The database engines a rule can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServerKind {
    /// H2 TCP server
    H2,
    /// HSQLDB network server
    Hsqldb,
}

impl ServerKind {
    /// JVM entry point of the server
    pub fn main_class(self) -> &'static str {
        match self {
            ServerKind::H2 => "org.h2.tools.Server",
            ServerKind::Hsqldb => "org.hsqldb.server.Server",
        }
    }

    /// Environment variable listing the server's jar(s)
    pub fn jar_variable(self) -> &'static str {
        match self {
            ServerKind::H2 => "H2_JAR",
            ServerKind::Hsqldb => "HSQLDB_JAR",
        }
    }
}

impl fmt::Display for ServerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerKind::H2 => write!(f, "h2"),
            ServerKind::Hsqldb => write!(f, "hsqldb"),
        }
    }
}

/// Where a started server can be reached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    kind: ServerKind,
    directory: Option<PathBuf>,
    port: u16,
}

impl ServerInfo {
    /// Describe a server of `kind` listening on `port`
    pub fn new(kind: ServerKind, directory: Option<PathBuf>, port: u16) -> Self {
        Self {
            kind,
            directory,
            port,
        }
    }

    /// Engine
    pub fn kind(&self) -> ServerKind {
        self.kind
    }

    /// Storage directory, if the server owns one
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// TCP port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// JDBC URL for `database` on this server
    pub fn jdbc_url(&self, database: &str) -> String {
        match self.kind {
            ServerKind::H2 => format!("jdbc:h2:tcp://localhost:{}/{}", self.port, database),
            ServerKind::Hsqldb => {
                format!("jdbc:hsqldb:hsql://localhost:{}/{}", self.port, database)
            }
        }
    }
}

/// A configured database server that a rule can start and stop.
///
/// Implementations own everything that has to happen around the process
/// itself, such as publishing variables before start or deleting storage
/// after stop.
#[async_trait]
pub trait ManagedServer: Send {
    /// Start the server and describe where it listens.
    async fn start(&mut self) -> Result<ServerInfo>;

    /// Stop the server and release what `start` acquired.
    async fn stop(&mut self) -> Result<()>;

    /// Current process status
    fn status(&self) -> ServerStatus;
}
