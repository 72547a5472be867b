mod common;

use common::{exiting_launcher, init_tracing, is_listening, sleeping_launcher};
use db_server_rules::error::Error;
use db_server_rules::server::LifecycleEvent;
use db_server_rules::{BodyResult, H2Rule, ManagedServer, ServerKind, ServerStatus, ShutdownPolicy};
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[tokio::test]
async fn test_variables_are_published_only_while_running() -> BodyResult {
    init_tracing();
    let mut rule = H2Rule::builder()
        .use_db_directory_variable_name("h2_tests.published.home")?
        .use_db_port_variable_name("h2_tests.published.port")?
        .with_launcher(sleeping_launcher())
        .with_shutdown_policy(ShutdownPolicy::immediate())
        .build()?;
    let directory = rule.server().directory().to_path_buf();
    let port = rule.server().port();

    rule.run(|info| async move {
        assert_eq!(info.kind(), ServerKind::H2);
        assert_eq!(info.port(), port);
        assert_eq!(
            std::env::var("h2_tests.published.home")?,
            directory.to_string_lossy()
        );
        assert_eq!(std::env::var("h2_tests.published.port")?, port.to_string());
        assert!(directory.is_dir());
        Ok::<_, anyhow::Error>(())
    })
    .await?;

    assert!(std::env::var_os("h2_tests.published.home").is_none());
    assert!(std::env::var_os("h2_tests.published.port").is_none());
    assert_eq!(rule.server().status(), ServerStatus::Stopped);
    Ok(())
}

#[tokio::test]
async fn test_temporary_directory_is_deleted_after_shutdown() -> BodyResult {
    let mut rule = H2Rule::builder()
        .use_db_directory_variable_name("h2_tests.delete.home")?
        .use_db_port_variable_name("h2_tests.delete.port")?
        .with_launcher(sleeping_launcher())
        .with_shutdown_policy(ShutdownPolicy::immediate())
        .build()?;
    let directory = rule.server().directory().to_path_buf();
    assert!(directory.starts_with(std::env::temp_dir()));
    assert!(directory.is_dir());

    let db_file = directory.join("test.mv.db");
    rule.run(|_| async move {
        std::fs::write(&db_file, b"pages")?;
        Ok::<_, anyhow::Error>(())
    })
    .await?;

    assert!(!directory.exists());
    Ok(())
}

#[tokio::test]
async fn test_directory_survives_when_deletion_disabled() -> BodyResult {
    let scratch = assert_fs::TempDir::new()?;
    let directory = scratch.path().join("h2-home");
    let mut rule = H2Rule::builder()
        .with_db_directory(directory.clone())?
        .do_not_delete_db_directory_on_shutdown()
        .disable_db_directory_exposing()
        .disable_db_port_exposing()
        .with_launcher(sleeping_launcher())
        .with_shutdown_policy(ShutdownPolicy::immediate())
        .build()?;

    let expected = directory.clone();
    rule.run(|info| async move {
        assert_eq!(info.directory(), Some(expected.as_path()));
        Ok::<_, anyhow::Error>(())
    })
    .await?;

    assert!(directory.is_dir());
    drop(rule);
    assert!(directory.is_dir());
    Ok(())
}

#[tokio::test]
async fn test_disabled_exposing_publishes_nothing() -> BodyResult {
    let mut rule = H2Rule::builder()
        .use_db_directory_variable_name("h2_tests.hidden.home")?
        .use_db_port_variable_name("h2_tests.hidden.port")?
        .disable_db_directory_exposing()
        .disable_db_port_exposing()
        .with_launcher(sleeping_launcher())
        .with_shutdown_policy(ShutdownPolicy::immediate())
        .build()?;

    rule.run(|_| async {
        assert!(std::env::var_os("h2_tests.hidden.home").is_none());
        assert!(std::env::var_os("h2_tests.hidden.port").is_none());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn test_start_failure_never_runs_body_and_clears_variables() -> BodyResult {
    let mut rule = H2Rule::builder()
        .use_db_directory_variable_name("h2_tests.failed.home")?
        .use_db_port_variable_name("h2_tests.failed.port")?
        .with_launcher(
            db_server_rules::Launcher::new("/nonexistent/java").without_readiness_probe(),
        )
        .build()?;
    let directory = rule.server().directory().to_path_buf();

    let ran = Arc::new(AtomicBool::new(false));
    let body_ran = Arc::clone(&ran);
    let result: BodyResult = rule
        .run(|_| async move {
            body_ran.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await;

    let err = result.unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Start(_))));
    assert!(!ran.load(Ordering::SeqCst));
    assert!(std::env::var_os("h2_tests.failed.home").is_none());
    assert!(std::env::var_os("h2_tests.failed.port").is_none());

    // The finalizer removes the never-used directory.
    drop(rule);
    assert!(!directory.exists());
    Ok(())
}

#[tokio::test]
async fn test_server_exiting_early_fails_readiness() -> BodyResult {
    let mut server = H2Rule::builder()
        .use_db_directory_variable_name("h2_tests.early.home")?
        .use_db_port_variable_name("h2_tests.early.port")?
        .with_launcher(exiting_launcher().ready_timeout(Duration::from_secs(5)))
        .build_server()?;

    let err = server.start().await.unwrap_err();
    assert!(matches!(err, Error::Start(_)));
    assert!(std::env::var_os("h2_tests.early.home").is_none());
    Ok(())
}

#[tokio::test]
async fn test_builds_get_distinct_directories_and_ports() -> BodyResult {
    let first = H2Rule::builder()
        .with_launcher(sleeping_launcher())
        .build_server()?;
    let second = H2Rule::builder()
        .with_launcher(sleeping_launcher())
        .build_server()?;

    assert_ne!(first.directory(), second.directory());
    assert!(first.directory().is_dir());
    assert!(second.directory().is_dir());
    assert_ne!(first.port(), 0);
    Ok(())
}

#[tokio::test]
async fn test_command_line_carries_resolved_settings() -> BodyResult {
    let server = H2Rule::builder()
        .on_port(9093)?
        .with_properties([("ifNotExists", "")])
        .with_launcher(sleeping_launcher())
        .build_server()?;

    let (program, args) = server.command_line();
    assert_eq!(program, "sh");
    let directory = server.directory().to_string_lossy().into_owned();
    let tail: Vec<&str> = args.iter().skip(3).map(String::as_str).collect();
    assert_eq!(
        tail,
        vec![
            "-tcp",
            "-baseDir",
            directory.as_str(),
            "-tcpAllowOthers",
            "-tcpPort",
            "9093",
            "-ifNotExists",
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_reused_rule_recreates_directory_between_runs() -> BodyResult {
    let mut rule = H2Rule::builder()
        .use_db_directory_variable_name("h2_tests.reuse.home")?
        .use_db_port_variable_name("h2_tests.reuse.port")?
        .with_launcher(sleeping_launcher())
        .with_shutdown_policy(ShutdownPolicy::immediate())
        .build()?;

    for _ in 0..2 {
        rule.run(|info| async move {
            assert!(info.directory().is_some_and(|d| d.is_dir()));
            Ok::<_, anyhow::Error>(())
        })
        .await?;
    }

    assert_eq!(rule.log().count(LifecycleEvent::Stopped), 2);
    assert!(!rule.server().directory().exists());
    Ok(())
}

#[tokio::test]
#[ignore = "requires H2_JAR pointing at an H2 jar and a java runtime"]
async fn test_real_h2_server_accepts_connections() -> BodyResult {
    init_tracing();
    let mut rule = H2Rule::builder().build()?;

    rule.run(|info| async move {
        assert!(is_listening(info.port()));
        assert_eq!(std::env::var("h2.port")?, info.port().to_string());
        Ok(())
    })
    .await
}

#[tokio::test]
async fn test_builder_flags_reach_the_server() -> BodyResult {
    let server = H2Rule::builder()
        .disable_db_port_exposing()
        .do_not_delete_db_directory_on_shutdown()
        .with_launcher(sleeping_launcher())
        .build_server()?;

    assert!(server.publisher().exposes_directory());
    assert!(!server.publisher().exposes_port());
    assert!(!server.deletes_directory_on_shutdown());

    let directory = server.directory().to_path_buf();
    drop(server);
    assert!(directory.is_dir());
    std::fs::remove_dir_all(&directory)?;
    Ok(())
}

#[tokio::test]
async fn test_class_scoped_rule_on_port_9003_is_reachable_in_each_run() -> BodyResult {
    init_tracing();
    // Stands in for the server socket; the readiness probe connects to it.
    let _listener = TcpListener::bind(("127.0.0.1", 9003))?;
    let mut rule = H2Rule::builder()
        .on_port(9003)?
        .use_db_directory_variable_name("h2_tests.class.home")?
        .use_db_port_variable_name("h2_tests.class.port")?
        .with_launcher(sleeping_launcher().ready_timeout(Duration::from_secs(5)))
        .with_shutdown_policy(ShutdownPolicy::immediate())
        .build()?;
    let log = rule.log();

    for run in 1..=2 {
        let log = log.clone();
        rule.run(|info| async move {
            assert_eq!(info.port(), 9003);
            assert!(is_listening(9003));
            assert_eq!(log.count(LifecycleEvent::Started), run);
            Ok::<_, anyhow::Error>(())
        })
        .await?;
    }

    assert_eq!(rule.log().count(LifecycleEvent::Started), 2);
    assert_eq!(rule.log().count(LifecycleEvent::Stopped), 2);
    Ok(())
}
