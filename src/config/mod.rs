//! Configuration module for db-server-rules.
//!
//! This module covers how server processes are launched and the checks
//! applied to builder input. Launchers can be created in code, read from a
//! JSON file named by `DB_RULES_CONFIG`, or derived from the `H2_JAR` and
//! `HSQLDB_JAR` environment variables.
//!
//! # Examples
//!
//! Loading launchers from a file:
//!
//! ```no_run
//! use db_server_rules::config::RulesConfig;
//!
//! let config = RulesConfig::from_file("db-rules.json").unwrap();
//! println!("H2 configured: {}", config.h2.is_some());
//! ```
//!
//! Creating a launcher programmatically:
//!
//! ```
//! use db_server_rules::config::{Launcher, LauncherConfig};
//!
//! let config = LauncherConfig {
//!     classpath: vec!["/opt/hsqldb/hsqldb.jar".to_string()],
//!     ..LauncherConfig::default()
//! };
//! let launcher = Launcher::from_config(&config, "org.hsqldb.server.Server").unwrap();
//! assert!(launcher.leading_args().contains(&"org.hsqldb.server.Server".to_string()));
//! ```
mod launcher;
mod parser;
pub mod validator;

pub use launcher::{CONFIG_FILE_VARIABLE, DEFAULT_READY_TIMEOUT, Launcher};
pub use parser::{LauncherConfig, RulesConfig};
pub use validator::{validate_port, validate_variable_name};
