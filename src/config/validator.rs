use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Highest port a builder accepts.
pub const MAX_PORT: i32 = 65000;

/// Validates a port supplied to a builder.
pub fn validate_port(port: i32) -> Result<u16> {
    if !(0..=MAX_PORT).contains(&port) {
        return Err(Error::InvalidArgument(format!("Invalid port {}", port)));
    }
    Ok(port as u16)
}

/// Validates the name of a published process variable.
pub fn validate_variable_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidArgument(
            "Variable name should never be empty".to_string(),
        ));
    }
    if name.contains('=') || name.contains('\0') {
        return Err(Error::InvalidArgument(format!(
            "Variable name '{}' contains '=' or NUL",
            name
        )));
    }
    Ok(())
}

/// Validates an explicitly configured storage directory.
pub fn validate_directory(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(Error::InvalidArgument(
            "Database directory path should never be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validates HSQLDB server properties before they are turned into arguments.
pub fn validate_hsqldb_properties(properties: &BTreeMap<String, String>) -> Result<()> {
    for (key, value) in properties {
        let Some(name) = key.strip_prefix("server.") else {
            return Err(Error::configuration(format!(
                "'{}' is not a server property",
                key
            )));
        };
        if name.is_empty() {
            return Err(Error::configuration("Empty server property name"));
        }
        if name == "acl" && !Path::new(value).is_file() {
            return Err(Error::configuration_caused_by(
                format!("ACL file '{}' is not readable", value),
                std::io::Error::new(std::io::ErrorKind::NotFound, value.clone()),
            ));
        }
    }
    Ok(())
}

/// Validates H2 server argument overrides.
pub fn validate_h2_properties(properties: &BTreeMap<String, String>) -> Result<()> {
    for key in properties.keys() {
        if key.trim_start_matches('-').is_empty() {
            return Err(Error::configuration("Empty H2 server option name"));
        }
    }
    Ok(())
}
