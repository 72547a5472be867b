use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// How to launch one JVM database server.
///
/// # Examples
///
/// ```
/// use db_server_rules::config::LauncherConfig;
/// use std::collections::HashMap;
///
/// let config = LauncherConfig {
///     java: None,
///     classpath: vec!["/opt/h2/h2.jar".to_string()],
///     jvm_args: vec!["-Xmx256m".to_string()],
///     env: HashMap::new(),
///     ready_timeout_ms: None,
/// };
/// assert!(config.java.is_none());
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LauncherConfig {
    /// Java executable. Falls back to `$JAVA_HOME/bin/java`, then `java`.
    #[serde(default)]
    pub java: Option<String>,

    /// Classpath entries holding the server jar.
    pub classpath: Vec<String>,

    /// Extra JVM arguments placed before `-cp`.
    #[serde(default)]
    pub jvm_args: Vec<String>,

    /// Environment variables for the server process.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// How long to wait for the server port to accept connections.
    /// `0` disables the readiness probe.
    #[serde(default)]
    pub ready_timeout_ms: Option<u64>,
}

/// Launcher configuration for both variants.
///
/// # JSON Schema
///
/// ```json
/// {
///   "h2": { "classpath": ["/opt/h2/h2.jar"] },
///   "hsqldb": { "java": "/usr/bin/java", "classpath": ["/opt/hsqldb/hsqldb.jar"] }
/// }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RulesConfig {
    /// Launcher for the H2 TCP server
    #[serde(default)]
    pub h2: Option<LauncherConfig>,

    /// Launcher for the HSQLDB server
    #[serde(default)]
    pub hsqldb: Option<LauncherConfig>,
}

impl RulesConfig {
    /// Loads a configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON of the
    /// expected shape.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigParse(format!("Failed to read config file: {}", e)))?;

        Self::parse_from_str(&content)
    }

    /// Parses a configuration from a JSON string.
    pub fn parse_from_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse JSON config: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_camel_case_launcher() {
        let config = RulesConfig::parse_from_str(
            r#"{
                "h2": {
                    "classpath": ["/opt/h2/h2.jar"],
                    "jvmArgs": ["-Xmx64m"],
                    "readyTimeoutMs": 2500
                }
            }"#,
        )
        .unwrap();

        let h2 = config.h2.unwrap();
        assert_eq!(h2.classpath, vec!["/opt/h2/h2.jar"]);
        assert_eq!(h2.jvm_args, vec!["-Xmx64m"]);
        assert_eq!(h2.ready_timeout_ms, Some(2500));
        assert!(config.hsqldb.is_none());
    }

    #[test]
    fn test_parse_rejects_missing_classpath() {
        let err = RulesConfig::parse_from_str(r#"{"hsqldb": {"java": "java"}}"#).unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }
}
