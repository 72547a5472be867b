#![allow(dead_code)]

use db_server_rules::Launcher;
use tracing_subscriber::EnvFilter;

/// Install a test-friendly subscriber once per binary; honours `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A launcher whose "server" just sleeps; the server arguments land in `$1..`.
pub fn sleeping_launcher() -> Launcher {
    Launcher::new("sh")
        .args(["-c", "exec sleep 30", "db-stub"])
        .without_readiness_probe()
}

/// A launcher whose "server" exits immediately with status 3.
pub fn exiting_launcher() -> Launcher {
    Launcher::new("sh").args(["-c", "exit 3", "db-stub"])
}

/// Whether something accepts TCP connections on `port`.
pub fn is_listening(port: u16) -> bool {
    std::net::TcpStream::connect(("127.0.0.1", port)).is_ok()
}
