use crate::error::{Error, Result};
use std::net::TcpListener;

/// Ask the OS for a free ephemeral TCP port.
///
/// The probe socket is released before returning, so another process may
/// claim the port before the server binds it.
pub fn find_free_port() -> Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0))
        .map_err(|e| Error::configuration_caused_by("Could not lookup random port", e))?;
    let port = listener
        .local_addr()
        .map_err(|e| Error::configuration_caused_by("Could not lookup random port", e))?
        .port();
    drop(listener);
    tracing::trace!(port, "Found free port");
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_free_port_is_bindable() {
        let port = find_free_port().unwrap();
        assert_ne!(port, 0);
        assert!(TcpListener::bind(("127.0.0.1", port)).is_ok());
    }

    #[test]
    fn test_consecutive_probes_usually_differ() {
        // Hold the first port so the OS cannot hand it out again.
        let first = find_free_port().unwrap();
        let _held = TcpListener::bind(("127.0.0.1", first)).unwrap();
        let second = find_free_port().unwrap();
        assert_ne!(first, second);
    }
}
