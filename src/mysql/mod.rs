// ABOUTME: MySQL/MariaDB server access through the native client binaries
// ABOUTME: Resolves credentials once and fixes how every client command is executed

pub mod command;
pub mod credentials;
#[cfg(all(test, unix))]
pub(crate) mod test_support;

pub use command::{shell_join, shell_quote, Arg, ClientCommand, Invocation};
pub use credentials::{CredentialSource, PromptCredentials, StaticCredentials};

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fmt;

/// User injected when none is configured
pub const DEFAULT_USER: &str = "root";

/// Variable expected to hold the password inside a container
pub const PASSWORD_ENV_VAR: &str = "MYSQL_ROOT_PASSWORD";

/// Container runtime used when none is configured
pub const DEFAULT_CONTAINER_RUNTIME: &str = "docker";

/// The server's own schema (users, privileges)
pub const SYSTEM_SCHEMA: &str = "mysql";

/// Virtual schemas exposing server metadata; never dumped or imported
pub const INTROSPECTION_SCHEMAS: [&str; 2] = ["information_schema", "performance_schema"];

/// Returns true for `information_schema` and `performance_schema`
pub fn is_introspection_schema(name: &str) -> bool {
    INTROSPECTION_SCHEMAS.contains(&name)
}

/// Returns true for the three schemas that always exist on a server
pub fn is_reserved_schema(name: &str) -> bool {
    name == SYSTEM_SCHEMA || is_introspection_schema(name)
}

/// Client binary family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `mysqldump` / `mysql`
    #[default]
    Mysql,
    /// `mariadb-dump` / `mariadb`
    Mariadb,
}

impl Dialect {
    /// Binary providing `command` for this family
    pub fn binary(&self, command: ClientCommand) -> &'static str {
        match (self, command) {
            (Dialect::Mysql, ClientCommand::Dump) => "mysqldump",
            (Dialect::Mysql, _) => "mysql",
            (Dialect::Mariadb, ClientCommand::Dump) => "mariadb-dump",
            (Dialect::Mariadb, _) => "mariadb",
        }
    }

    /// Flags that always follow the binary name
    pub fn default_flags(&self, command: ClientCommand) -> &'static [&'static str] {
        match (self, command) {
            // mariadb-dump enables --opt by default, which adds LOCK TABLES around inserts
            (Dialect::Mariadb, ClientCommand::Dump) => &["--skip-opt"],
            _ => &[],
        }
    }

    /// Package name shown when a binary cannot be started
    pub fn client_package(&self) -> &'static str {
        match self {
            Dialect::Mysql => "mysql-client",
            Dialect::Mariadb => "mariadb-client",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Mysql => write!(f, "mysql"),
            Dialect::Mariadb => write!(f, "mariadb"),
        }
    }
}

/// Where client binaries run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStrategy {
    /// Binaries on this host, arguments passed as discrete tokens
    Local,
    /// `<runtime> exec -i <name> bash -c "<line>"`
    Container { runtime: String, name: String },
}

/// Raw connection settings as collected from flags and config
#[derive(Debug, Clone, Default)]
pub struct ConnectionOptions {
    pub container: Option<String>,
    pub container_runtime: Option<String>,
    pub host: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub dialect: Dialect,
}

/// How to reach the server. Immutable once built and shared by reference
/// across every command of a run.
#[derive(Clone)]
pub struct ServerConnection {
    strategy: ExecutionStrategy,
    host: Option<String>,
    user: Option<String>,
    password: Option<String>,
    dialect: Dialect,
}

impl ServerConnection {
    /// Build a connection, asking `credentials` for a password when the
    /// server is reached locally and none was supplied.
    ///
    /// Inside a container the password is left unset so that commands
    /// reference `$MYSQL_ROOT_PASSWORD` from the container's environment.
    pub fn new(options: ConnectionOptions, credentials: &dyn CredentialSource) -> Result<Self> {
        let container = non_empty(options.container);
        let host = non_empty(options.host);
        let user = non_empty(options.user);
        // Kept verbatim: surrounding spaces may be part of the password
        let mut password = options.password.filter(|p| !p.is_empty());

        let strategy = match container {
            Some(name) => ExecutionStrategy::Container {
                runtime: non_empty(options.container_runtime)
                    .unwrap_or_else(|| DEFAULT_CONTAINER_RUNTIME.to_string()),
                name,
            },
            None => ExecutionStrategy::Local,
        };

        if strategy == ExecutionStrategy::Local && password.is_none() {
            let resolved = credentials
                .password(user.as_deref().unwrap_or(DEFAULT_USER), host.as_deref())
                .context("Failed to obtain database password")?;
            password = Some(resolved);
        }

        Ok(Self {
            strategy,
            host,
            user,
            password,
            dialect: options.dialect,
        })
    }

    pub fn strategy(&self) -> &ExecutionStrategy {
        &self.strategy
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    /// Configured user, or `root`
    pub fn user(&self) -> &str {
        self.user.as_deref().unwrap_or(DEFAULT_USER)
    }

    /// Prepare `command` with caller arguments. Credentials and wrapping are
    /// applied when the invocation is built, not here.
    pub fn command(&self, command: ClientCommand, args: Vec<String>) -> Invocation<'_> {
        Invocation::new(self, command, args)
    }

    /// Host, user and password flags, in that order
    pub(crate) fn auth_args(&self) -> Vec<Arg> {
        let mut args = Vec::with_capacity(3);
        if let Some(host) = &self.host {
            args.push(Arg::Literal(format!("-h{}", host)));
        }
        args.push(Arg::Literal(format!("-u{}", self.user())));
        match &self.password {
            // A bare -p makes the client prompt on its own tty
            Some(password) if password.is_empty() => {}
            Some(password) => args.push(Arg::Secret {
                prefix: "-p".to_string(),
                value: password.clone(),
            }),
            None => args.push(Arg::EnvRef {
                prefix: "-p".to_string(),
                var: PASSWORD_ENV_VAR.to_string(),
            }),
        }
        args
    }
}

impl fmt::Debug for ServerConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConnection")
            .field("strategy", &self.strategy)
            .field("host", &self.host)
            .field("user", &self.user())
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("dialect", &self.dialect)
            .finish()
    }
}

/// `None` for blank values; others are kept untrimmed
fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct CountingCredentials {
        calls: Cell<u32>,
    }

    impl CredentialSource for CountingCredentials {
        fn password(&self, _user: &str, _host: Option<&str>) -> Result<String> {
            self.calls.set(self.calls.get() + 1);
            Ok("prompted".to_string())
        }
    }

    #[test]
    fn test_local_without_password_asks_credentials_once() {
        let creds = CountingCredentials {
            calls: Cell::new(0),
        };
        let conn = ServerConnection::new(ConnectionOptions::default(), &creds).unwrap();

        assert_eq!(creds.calls.get(), 1);
        assert_eq!(
            conn.auth_args().last(),
            Some(&Arg::Secret {
                prefix: "-p".to_string(),
                value: "prompted".to_string()
            })
        );
        assert_eq!(conn.strategy(), &ExecutionStrategy::Local);
    }

    #[test]
    fn test_explicit_password_skips_credentials() {
        let creds = CountingCredentials {
            calls: Cell::new(0),
        };
        let options = ConnectionOptions {
            password: Some("secret".to_string()),
            ..Default::default()
        };
        ServerConnection::new(options, &creds).unwrap();
        assert_eq!(creds.calls.get(), 0);
    }

    #[test]
    fn test_container_skips_credentials_and_uses_env_reference() {
        let creds = CountingCredentials {
            calls: Cell::new(0),
        };
        let options = ConnectionOptions {
            container: Some("mysql".to_string()),
            ..Default::default()
        };
        let conn = ServerConnection::new(options, &creds).unwrap();

        assert_eq!(creds.calls.get(), 0);
        assert_eq!(
            conn.strategy(),
            &ExecutionStrategy::Container {
                runtime: "docker".to_string(),
                name: "mysql".to_string()
            }
        );
        assert_eq!(
            conn.auth_args().last(),
            Some(&Arg::EnvRef {
                prefix: "-p".to_string(),
                var: "MYSQL_ROOT_PASSWORD".to_string()
            })
        );
    }

    #[test]
    fn test_empty_strings_are_treated_as_unset() {
        let options = ConnectionOptions {
            container: Some(String::new()),
            host: Some("  ".to_string()),
            user: Some(String::new()),
            ..Default::default()
        };
        let conn = ServerConnection::new(options, &StaticCredentials::new("pw")).unwrap();

        assert_eq!(conn.strategy(), &ExecutionStrategy::Local);
        assert_eq!(conn.host(), None);
        assert_eq!(conn.user(), "root");
    }

    #[test]
    fn test_password_is_kept_verbatim() {
        for given in ["  ", " pass word "] {
            let creds = CountingCredentials {
                calls: Cell::new(0),
            };
            let options = ConnectionOptions {
                password: Some(given.to_string()),
                ..Default::default()
            };
            let conn = ServerConnection::new(options, &creds).unwrap();

            assert_eq!(creds.calls.get(), 0);
            assert_eq!(
                conn.auth_args().last(),
                Some(&Arg::Secret {
                    prefix: "-p".to_string(),
                    value: given.to_string()
                })
            );
        }
    }

    #[test]
    fn test_empty_password_option_asks_credentials() {
        let creds = CountingCredentials {
            calls: Cell::new(0),
        };
        let options = ConnectionOptions {
            password: Some(String::new()),
            ..Default::default()
        };
        ServerConnection::new(options, &creds).unwrap();
        assert_eq!(creds.calls.get(), 1);
    }

    #[test]
    fn test_auth_args_order_host_user_password() {
        let options = ConnectionOptions {
            host: Some("db.internal".to_string()),
            user: Some("backup".to_string()),
            password: Some("pw".to_string()),
            ..Default::default()
        };
        let conn = ServerConnection::new(options, &StaticCredentials::new("unused")).unwrap();

        assert_eq!(
            conn.auth_args(),
            vec![
                Arg::Literal("-hdb.internal".to_string()),
                Arg::Literal("-ubackup".to_string()),
                Arg::Secret {
                    prefix: "-p".to_string(),
                    value: "pw".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_debug_redacts_password() {
        let options = ConnectionOptions {
            password: Some("hunter2".to_string()),
            ..Default::default()
        };
        let conn = ServerConnection::new(options, &StaticCredentials::new("unused")).unwrap();
        let rendered = format!("{:?}", conn);

        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("****"));
    }

    #[test]
    fn test_dialect_binaries() {
        assert_eq!(Dialect::Mysql.binary(ClientCommand::Dump), "mysqldump");
        assert_eq!(Dialect::Mysql.binary(ClientCommand::Import), "mysql");
        assert_eq!(Dialect::Mariadb.binary(ClientCommand::Dump), "mariadb-dump");
        assert_eq!(Dialect::Mariadb.binary(ClientCommand::Query), "mariadb");
        assert_eq!(
            Dialect::Mariadb.default_flags(ClientCommand::Dump),
            &["--skip-opt"]
        );
        assert!(Dialect::Mariadb.default_flags(ClientCommand::Import).is_empty());
        assert!(Dialect::Mysql.default_flags(ClientCommand::Dump).is_empty());
    }

    #[test]
    fn test_reserved_schemas() {
        assert!(is_reserved_schema("mysql"));
        assert!(is_reserved_schema("information_schema"));
        assert!(is_reserved_schema("performance_schema"));
        assert!(!is_reserved_schema("sys"));
        assert!(!is_introspection_schema("mysql"));
    }
}
