/*!
 # db-server-rules

 Test lifecycle rules that run an embedded database server around a test body.

 ## Overview

 A rule starts a server before the body runs and always stops it afterwards,
 whether the body returns `Ok`, returns `Err` or panics. The body's outcome
 is handed back unchanged. Two variants exist:

 - [`H2Rule`]: an H2 TCP server on a free (or given) port with a temporary
   base directory that is deleted after shutdown. The directory and port are
   published as the `h2.home` and `h2.port` environment variables while the
   server runs.
 - [`HsqldbRule`]: an HSQLDB server, port 9001 by default, configured through
   `server.*` properties.

 The servers are JVM programs. Their launcher is taken from the JSON file
 named by `DB_RULES_CONFIG`, from `H2_JAR` / `HSQLDB_JAR`, or set in code
 with `with_launcher`.

 ## Basic Usage

 ```no_run
 use db_server_rules::{BodyResult, H2Rule};

 #[tokio::main]
 async fn main() -> BodyResult {
     let mut rule = H2Rule::builder().build()?;

     rule.run(|info| async move {
         println!("H2-HOME : {:?}", info.directory());
         println!("H2-PORT : {}", info.port());
         Ok(())
     })
     .await
 }
 ```

 ## License

 This project is licensed under the terms in the LICENSE file.
*/

pub mod config;
pub mod error;
pub mod h2;
pub mod hsqldb;
pub mod rule;
pub mod server;
pub mod support;

pub use config::Launcher;
pub use error::{Error, Result};
pub use h2::{H2Rule, H2RuleBuilder, H2Server, ShutdownPolicy};
pub use hsqldb::{HsqldbRule, HsqldbRuleBuilder, HsqldbServer};
pub use rule::Rule;
pub use server::{ManagedServer, ServerInfo, ServerKind, ServerStatus};

/// Result type for test bodies run by a rule.
///
/// Any [`Error`] raised while starting converts into it, so a body and its
/// rule can share one `?`-friendly error type.
pub type BodyResult<T = ()> = anyhow::Result<T>;
