use db_server_rules::config::{CONFIG_FILE_VARIABLE, Launcher, LauncherConfig, RulesConfig};
use db_server_rules::error::{Error, Result};
use db_server_rules::ServerKind;
use std::io::Write;
use std::time::Duration;

#[test]
fn test_parse_config() -> Result<()> {
    let config = RulesConfig::parse_from_str(
        r#"{
            "h2": {
                "java": "/usr/lib/jvm/bin/java",
                "classpath": ["/opt/h2/h2-2.2.224.jar"],
                "env": { "TZ": "UTC" }
            },
            "hsqldb": {
                "classpath": ["/opt/hsqldb/hsqldb.jar", "/opt/hsqldb/sqltool.jar"],
                "readyTimeoutMs": 0
            }
        }"#,
    )?;

    let h2 = config.h2.as_ref().unwrap();
    assert_eq!(h2.java.as_deref(), Some("/usr/lib/jvm/bin/java"));
    assert_eq!(h2.env.get("TZ"), Some(&"UTC".to_string()));

    let hsqldb = config.hsqldb.as_ref().unwrap();
    assert_eq!(hsqldb.classpath.len(), 2);
    assert!(hsqldb.jvm_args.is_empty());

    let launcher = Launcher::from_config(hsqldb, ServerKind::Hsqldb.main_class())?;
    assert_eq!(launcher.readiness_timeout(), None);
    assert_eq!(
        launcher.leading_args().last().map(String::as_str),
        Some("org.hsqldb.server.Server")
    );
    Ok(())
}

#[test]
fn test_missing_file_is_parse_error() {
    let err = RulesConfig::from_file("/definitely/not/here.json").unwrap_err();
    assert!(matches!(err, Error::ConfigParse(_)));
}

#[test]
fn test_default_ready_timeout_applies() -> Result<()> {
    let config = LauncherConfig {
        java: Some("java".to_string()),
        classpath: vec!["h2.jar".to_string()],
        ..LauncherConfig::default()
    };
    let launcher = Launcher::from_config(&config, ServerKind::H2.main_class())?;
    assert_eq!(launcher.readiness_timeout(), Some(Duration::from_secs(10)));
    Ok(())
}

// The only test in this binary touching the process environment.
#[test]
fn test_resolve_reads_config_file_variable() -> Result<()> {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"hsqldb": {{"java": "java", "classpath": ["/opt/hsqldb/hsqldb.jar"]}}}}"#
    )
    .unwrap();

    // SAFETY: no other test in this binary reads or writes the environment.
    unsafe { std::env::set_var(CONFIG_FILE_VARIABLE, file.path()) };
    let resolved = Launcher::resolve(ServerKind::Hsqldb);
    unsafe { std::env::remove_var(CONFIG_FILE_VARIABLE) };

    let launcher = resolved?;
    assert_eq!(launcher.program(), "java");
    assert!(
        launcher
            .leading_args()
            .contains(&"/opt/hsqldb/hsqldb.jar".to_string())
    );
    Ok(())
}
