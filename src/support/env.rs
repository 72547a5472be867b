use crate::config::validate_variable_name;
use crate::error::Result;
use std::path::Path;

/// Default variable carrying the H2 home directory.
pub const DEFAULT_DIRECTORY_VARIABLE: &str = "h2.home";

/// Default variable carrying the H2 TCP port.
pub const DEFAULT_PORT_VARIABLE: &str = "h2.port";

/// Publishes a server's directory and port as process environment variables.
///
/// The variables are process-wide. Two rules publishing the same names must
/// not run at the same time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvironmentPublisher {
    expose_directory: bool,
    expose_port: bool,
    directory_variable: String,
    port_variable: String,
}

impl Default for EnvironmentPublisher {
    fn default() -> Self {
        Self {
            expose_directory: true,
            expose_port: true,
            directory_variable: DEFAULT_DIRECTORY_VARIABLE.to_string(),
            port_variable: DEFAULT_PORT_VARIABLE.to_string(),
        }
    }
}

impl EnvironmentPublisher {
    /// Stop publishing the directory
    pub fn disable_directory(&mut self) {
        self.expose_directory = false;
    }

    /// Stop publishing the port
    pub fn disable_port(&mut self) {
        self.expose_port = false;
    }

    /// Rename the directory variable
    pub fn set_directory_variable(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        validate_variable_name(&name)?;
        self.directory_variable = name;
        Ok(())
    }

    /// Rename the port variable
    pub fn set_port_variable(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        validate_variable_name(&name)?;
        self.port_variable = name;
        Ok(())
    }

    /// Name of the directory variable
    pub fn directory_variable(&self) -> &str {
        &self.directory_variable
    }

    /// Name of the port variable
    pub fn port_variable(&self) -> &str {
        &self.port_variable
    }

    /// Whether the directory is published
    pub fn exposes_directory(&self) -> bool {
        self.expose_directory
    }

    /// Whether the port is published
    pub fn exposes_port(&self) -> bool {
        self.expose_port
    }

    /// Publish the enabled variables.
    pub fn publish(&self, directory: &Path, port: u16) {
        if self.expose_directory {
            tracing::debug!(
                variable = %self.directory_variable,
                path = %directory.display(),
                "Publishing db directory"
            );
            // SAFETY: rules sharing variable names are documented as non-reentrant;
            // names are validated to contain neither '=' nor NUL.
            unsafe { std::env::set_var(&self.directory_variable, directory) };
        }
        if self.expose_port {
            tracing::debug!(variable = %self.port_variable, port, "Publishing db port");
            // SAFETY: as above.
            unsafe { std::env::set_var(&self.port_variable, port.to_string()) };
        }
    }

    /// Remove the enabled variables; absent variables are fine.
    pub fn clear(&self) {
        if self.expose_directory {
            // SAFETY: as in `publish`.
            unsafe { std::env::remove_var(&self.directory_variable) };
        }
        if self.expose_port {
            // SAFETY: as in `publish`.
            unsafe { std::env::remove_var(&self.port_variable) };
        }
    }
}
