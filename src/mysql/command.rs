// ABOUTME: Builds and runs one client invocation (dump, import or query)
// ABOUTME: Applies dialect, credentials and local/container wrapping at execution time

use super::{ExecutionStrategy, ServerConnection};
use anyhow::{bail, Context, Result};
use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};

/// Logical client tool, independent of the binary family providing it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCommand {
    Dump,
    Import,
    Query,
}

impl fmt::Display for ClientCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientCommand::Dump => write!(f, "dump"),
            ClientCommand::Import => write!(f, "import"),
            ClientCommand::Query => write!(f, "query"),
        }
    }
}

/// One command-line token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Arg {
    /// Passed as-is locally, shell-quoted inside a container
    Literal(String),
    /// `<prefix>"$VAR"`, expanded by the shell where the command runs
    EnvRef { prefix: String, var: String },
    /// Like `Literal`, but never rendered in logs or errors
    Secret { prefix: String, value: String },
}

impl Arg {
    /// Token handed straight to the process, no shell involved.
    /// Environment references are resolved from this process' environment.
    fn local_token(&self) -> String {
        match self {
            Arg::Literal(value) => value.clone(),
            Arg::EnvRef { prefix, var } => {
                format!("{}{}", prefix, std::env::var(var).unwrap_or_default())
            }
            Arg::Secret { prefix, value } => format!("{}{}", prefix, value),
        }
    }

    /// Token as it appears in a `bash -c` line
    fn shell_token(&self) -> String {
        match self {
            Arg::Literal(value) => shell_quote(value),
            Arg::EnvRef { prefix, var } => format!("{}\"${}\"", shell_quote(prefix), var),
            Arg::Secret { prefix, value } => shell_quote(&format!("{}{}", prefix, value)),
        }
    }

    fn redacted_token(&self) -> String {
        match self {
            Arg::Secret { prefix, .. } => format!("{}****", prefix),
            other => other.shell_token(),
        }
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Literal(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Literal(value.to_string())
    }
}

/// Quote `value` for a POSIX shell.
///
/// Plain words are returned unchanged; anything containing shell syntax is
/// single-quoted, so backticks, `$` and `"` are inert inside the result.
///
/// # Examples
///
/// ```
/// # use seren_mysql_dumper::mysql::shell_quote;
/// assert_eq!(shell_quote("--quick"), "--quick");
/// assert_eq!(shell_quote("show databases;"), "'show databases;'");
/// assert_eq!(shell_quote("it's"), r#"'it'\''s'"#);
/// ```
pub fn shell_quote(value: &str) -> String {
    shell_words::quote(value).into_owned()
}

/// Join tokens into the single line given to `bash -c`.
///
/// This is the only place a shell line is assembled; every literal goes
/// through [`shell_quote`].
pub fn shell_join<'a>(args: impl IntoIterator<Item = &'a Arg>) -> String {
    args.into_iter()
        .map(Arg::shell_token)
        .collect::<Vec<_>>()
        .join(" ")
}

/// A client command about to run against a server.
///
/// Holds the caller's arguments only; dialect flags, credentials and the
/// container wrapper are added by [`Invocation::build`].
#[derive(Clone)]
pub struct Invocation<'a> {
    conn: &'a ServerConnection,
    command: ClientCommand,
    args: Vec<String>,
    database: Option<String>,
}

impl<'a> Invocation<'a> {
    pub fn new(conn: &'a ServerConnection, command: ClientCommand, args: Vec<String>) -> Self {
        Self {
            conn,
            command,
            args,
            database: None,
        }
    }

    /// Tag errors from this invocation with a database name
    pub fn for_database(mut self, database: &str) -> Self {
        self.database = Some(database.to_string());
        self
    }

    pub fn command(&self) -> ClientCommand {
        self.command
    }

    /// Binary for the connection's dialect
    pub fn program(&self) -> &'static str {
        self.conn.dialect().binary(self.command)
    }

    /// Full client argument list: dialect flags, host, user, password, caller args
    pub fn argv(&self) -> Vec<Arg> {
        let dialect = self.conn.dialect();
        let mut argv: Vec<Arg> = dialect
            .default_flags(self.command)
            .iter()
            .map(|flag| Arg::from(*flag))
            .collect();
        argv.extend(self.conn.auth_args());
        argv.extend(self.args.iter().cloned().map(Arg::Literal));
        argv
    }

    /// Shell line run inside a container
    pub fn shell_line(&self) -> String {
        let program = Arg::from(self.program());
        let argv = self.argv();
        shell_join(std::iter::once(&program).chain(argv.iter()))
    }

    /// Process for this invocation, not yet started
    pub fn build(&self) -> Command {
        let mut cmd = match self.conn.strategy() {
            ExecutionStrategy::Local => {
                let mut cmd = Command::new(self.program());
                cmd.args(self.argv().iter().map(Arg::local_token));
                cmd
            }
            ExecutionStrategy::Container { runtime, name } => {
                let mut cmd = Command::new(runtime);
                cmd.arg("exec")
                    .arg("-i")
                    .arg(name)
                    .arg("bash")
                    .arg("-c")
                    .arg(self.shell_line());
                cmd
            }
        };
        // Own process group: a terminal Ctrl-C never reaches a running client
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }
        cmd
    }

    /// Run with inherited stdio and wait for exit
    pub fn run(&self) -> Result<()> {
        let mut cmd = self.build();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        let mut child = self.spawn(&mut cmd)?;
        let status = child
            .wait()
            .with_context(|| format!("Failed to wait for {}", self.label()))?;
        self.check_status(status)
    }

    /// Run with stdout copied into `sink`; returns bytes copied
    pub fn run_with_output<W: Write + ?Sized>(&self, sink: &mut W) -> Result<u64> {
        let mut cmd = self.build();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        let mut child = self.spawn(&mut cmd)?;

        let copied = match child.stdout.take() {
            // Dropping stdout at the end of this arm unblocks a child still writing
            Some(mut stdout) => io::copy(&mut stdout, sink),
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "child stdout was not captured",
            )),
        };

        let status = child
            .wait()
            .with_context(|| format!("Failed to wait for {}", self.label()))?;
        // A failing sink is the cause; the child's exit is only its SIGPIPE
        let copied = copied.with_context(|| {
            format!(
                "Failed to stream output of {} (child {})",
                self.label(),
                status
            )
        })?;
        self.check_status(status)?;
        Ok(copied)
    }

    /// Run with `source` copied into stdin; returns bytes copied
    pub fn run_with_input<R: Read + ?Sized>(&self, source: &mut R) -> Result<u64> {
        let mut cmd = self.build();
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        let mut child = self.spawn(&mut cmd)?;

        let copied = match child.stdin.take() {
            // stdin is closed when this arm ends so the child sees EOF
            Some(mut stdin) => io::copy(source, &mut stdin),
            None => Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "child stdin was not captured",
            )),
        };

        let status = child
            .wait()
            .with_context(|| format!("Failed to wait for {}", self.label()))?;
        match copied {
            // A broken pipe means the child went away first; its exit says why
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                self.check_status(status)?;
                Err(e).with_context(|| format!("Failed to stream input to {}", self.label()))
            }
            Err(e) => Err(e).with_context(|| {
                format!(
                    "Failed to stream input to {} (child {})",
                    self.label(),
                    status
                )
            }),
            Ok(copied) => {
                self.check_status(status)?;
                Ok(copied)
            }
        }
    }

    /// Run and collect stdout as trimmed, non-blank lines
    pub fn output_lines(&self) -> Result<Vec<String>> {
        let mut cmd = self.build();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        let mut child = self.spawn(&mut cmd)?;

        let mut lines = Vec::new();
        let mut read_error = None;
        if let Some(stdout) = child.stdout.take() {
            for line in BufReader::new(stdout).lines() {
                match line {
                    Ok(line) => {
                        let line = line.trim();
                        if !line.is_empty() {
                            lines.push(line.to_string());
                        }
                    }
                    Err(e) => {
                        read_error = Some(e);
                        break;
                    }
                }
            }
        }

        let status = child
            .wait()
            .with_context(|| format!("Failed to wait for {}", self.label()))?;
        self.check_status(status)?;
        if let Some(e) = read_error {
            return Err(e).with_context(|| format!("Failed to read output of {}", self.label()));
        }
        Ok(lines)
    }

    fn spawn(&self, cmd: &mut Command) -> Result<Child> {
        tracing::debug!("Running {}", self);
        cmd.spawn().with_context(|| self.spawn_hint())
    }

    fn check_status(&self, status: ExitStatus) -> Result<()> {
        if !status.success() {
            bail!("{} exited with {}", self.label(), status);
        }
        Ok(())
    }

    fn label(&self) -> String {
        match &self.database {
            Some(db) => format!("{} ({}) for database '{}'", self.program(), self.command, db),
            None => format!("{} ({})", self.program(), self.command),
        }
    }

    fn spawn_hint(&self) -> String {
        match self.conn.strategy() {
            ExecutionStrategy::Local => format!(
                "Failed to execute {}. Is the {} client installed?\n\
                 Install with:\n\
                 - Ubuntu/Debian: sudo apt-get install {}\n\
                 - macOS: brew install {}",
                self.label(),
                self.conn.dialect(),
                self.conn.dialect().client_package(),
                self.conn.dialect(),
            ),
            ExecutionStrategy::Container { runtime, name } => format!(
                "Failed to execute {} via '{} exec' in container '{}'. Is {} installed and on PATH?",
                self.label(),
                runtime,
                name,
                runtime
            ),
        }
    }
}

/// Redacted command line, safe for logs
impl fmt::Display for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Same tokens as the shell line, with secrets masked
        let line = std::iter::once(self.program().to_string())
            .chain(self.argv().iter().map(Arg::redacted_token))
            .collect::<Vec<_>>()
            .join(" ");
        match self.conn.strategy() {
            ExecutionStrategy::Local => write!(f, "{}", line),
            ExecutionStrategy::Container { runtime, name } => {
                write!(f, "{} exec -i {} bash -c \"{}\"", runtime, name, line)
            }
        }
    }
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("command", &self.command)
            .field("line", &self.to_string())
            .field("database", &self.database)
            .finish()
    }
}
