use crate::config::{LauncherConfig, RulesConfig};
use crate::error::{Error, Result};
use crate::server::ServerKind;
use crate::server::process::ProcessSpec;
use std::collections::HashMap;
use std::time::Duration;

/// Environment variable naming a JSON [`RulesConfig`] file.
pub const CONFIG_FILE_VARIABLE: &str = "DB_RULES_CONFIG";

/// Default wait for a freshly spawned server to accept connections.
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(10);

const CLASSPATH_SEPARATOR: &str = if cfg!(windows) { ";" } else { ":" };

/// The command prefix that runs a database server.
///
/// A launcher is the program plus its leading arguments; the server's own
/// arguments are appended when a handle is built. For the JVM servers the
/// prefix is `java [jvm args] -cp <classpath> <main class>`, but any program
/// will do.
///
/// # Examples
///
/// ```
/// use db_server_rules::config::Launcher;
/// use std::time::Duration;
///
/// let launcher = Launcher::new("java")
///     .args(["-cp", "/opt/h2/h2.jar", "org.h2.tools.Server"])
///     .ready_timeout(Duration::from_secs(5));
/// assert_eq!(launcher.program(), "java");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Launcher {
    program: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    ready_timeout: Option<Duration>,
}

impl Launcher {
    /// Create a launcher running `program` with no leading arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
            ready_timeout: Some(DEFAULT_READY_TIMEOUT),
        }
    }

    /// Append one leading argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several leading arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the server process.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Wait up to `timeout` for the server port to accept connections.
    pub fn ready_timeout(mut self, timeout: Duration) -> Self {
        self.ready_timeout = Some(timeout);
        self
    }

    /// Treat the server as started as soon as the process is spawned.
    pub fn without_readiness_probe(mut self) -> Self {
        self.ready_timeout = None;
        self
    }

    /// Program to execute
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Leading arguments
    pub fn leading_args(&self) -> &[String] {
        &self.args
    }

    /// Readiness timeout, `None` when probing is disabled
    pub fn readiness_timeout(&self) -> Option<Duration> {
        self.ready_timeout
    }

    /// Build a JVM launcher for `main_class` from a [`LauncherConfig`].
    pub fn from_config(config: &LauncherConfig, main_class: &str) -> Result<Self> {
        if config.classpath.is_empty() {
            return Err(Error::configuration(format!(
                "No classpath configured for {}",
                main_class
            )));
        }

        let java = config.java.clone().unwrap_or_else(default_java);
        let mut launcher = Launcher::new(java)
            .args(config.jvm_args.iter().cloned())
            .arg("-cp")
            .arg(config.classpath.join(CLASSPATH_SEPARATOR))
            .arg(main_class);
        launcher.env = config.env.clone();
        launcher.ready_timeout = match config.ready_timeout_ms {
            Some(0) => None,
            Some(ms) => Some(Duration::from_millis(ms)),
            None => Some(DEFAULT_READY_TIMEOUT),
        };
        Ok(launcher)
    }

    /// Resolve the default launcher for `kind`.
    ///
    /// Looks at the JSON file named by `DB_RULES_CONFIG` first, then at the
    /// variant's jar variable (`H2_JAR` or `HSQLDB_JAR`).
    #[tracing::instrument(skip(kind), fields(kind = %kind))]
    pub fn resolve(kind: ServerKind) -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_FILE_VARIABLE) {
            tracing::debug!(config_path = %path, "Loading launcher configuration from file");
            let config = RulesConfig::from_file(&path).map_err(|e| {
                Error::configuration_caused_by(
                    format!("Unable to read launcher config {}", path),
                    e,
                )
            })?;
            let section = match kind {
                ServerKind::H2 => config.h2,
                ServerKind::Hsqldb => config.hsqldb,
            };
            if let Some(section) = section {
                return Self::from_config(&section, kind.main_class());
            }
        }

        match std::env::var_os(kind.jar_variable()) {
            Some(jars) => {
                let classpath: Vec<String> = std::env::split_paths(&jars)
                    .map(|p| p.to_string_lossy().into_owned())
                    .filter(|p| !p.is_empty())
                    .collect();
                let config = LauncherConfig {
                    classpath,
                    ..LauncherConfig::default()
                };
                Self::from_config(&config, kind.main_class())
            }
            None => Err(Error::configuration(format!(
                "No launcher for {}: set {} or {}",
                kind,
                kind.jar_variable(),
                CONFIG_FILE_VARIABLE
            ))),
        }
    }

    pub(crate) fn process_spec(&self, server_args: Vec<String>) -> ProcessSpec {
        let mut args = self.args.clone();
        args.extend(server_args);
        ProcessSpec {
            command: self.program.clone(),
            args,
            env: self.env.clone(),
        }
    }
}

fn default_java() -> String {
    match std::env::var_os("JAVA_HOME") {
        Some(home) => std::path::Path::new(&home)
            .join("bin")
            .join("java")
            .to_string_lossy()
            .into_owned(),
        None => "java".to_string(),
    }
}
