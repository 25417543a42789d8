// ABOUTME: CLI entry point for seren-mysql-dumper
// ABOUTME: Parses commands, merges config file defaults, and routes to dump or import

use clap::{Args, Parser, Subcommand};
use seren_mysql_dumper::commands::{self, Cancellation, DumpOptions, ImportOptions};
use seren_mysql_dumper::config::{load_config, ConnectionConfig, ToolConfig};
use seren_mysql_dumper::filters::DatabaseFilter;
use seren_mysql_dumper::mysql::{
    ConnectionOptions, Dialect, PromptCredentials, ServerConnection,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "seren-mysql-dumper")]
#[command(about = "Dump and restore every database on a MySQL or MariaDB server", long_about = None)]
struct Cli {
    /// TOML file with connection and run defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(flatten)]
    connection: ConnectionArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConnectionArgs {
    /// Run the client tools inside this container (password read from $MYSQL_ROOT_PASSWORD there)
    #[arg(long, global = true)]
    container: Option<String>,
    /// Container runtime used with --container (default: docker)
    #[arg(long, global = true)]
    container_runtime: Option<String>,
    /// Server host (default: client default, usually the local socket)
    #[arg(long, global = true)]
    host: Option<String>,
    /// Server user (default: root)
    #[arg(short = 'u', long, global = true)]
    user: Option<String>,
    /// Server password (prompted when omitted and no container is used)
    #[arg(short = 'p', long, global = true)]
    password: Option<String>,
    /// Client binary family
    #[arg(long, value_enum, global = true)]
    client: Option<Dialect>,
}

#[derive(Subcommand)]
enum Commands {
    /// Dump every database into <DEST>/<db>.sql.gz
    Dump {
        #[arg(default_value = "dumps")]
        dest: PathBuf,
        /// Databases that should not be locked during dump (comma-separated)
        #[arg(long, value_delimiter = ',')]
        no_lock: Vec<String>,
        /// Do not lock tables of any database
        #[arg(long)]
        no_lock_all: bool,
        /// Dump only these databases (comma-separated)
        #[arg(long, value_delimiter = ',')]
        include_databases: Option<Vec<String>>,
        /// Skip these databases (comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude_databases: Option<Vec<String>>,
        /// Skip these tables (format: database.table, comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude_tables: Option<Vec<String>>,
    },
    /// Import every <db>.sql.gz file found in <SRC>
    Import {
        #[arg(default_value = "dumps")]
        src: PathBuf,
        /// Also import the mysql schema (only safe between identical server versions)
        #[arg(long)]
        include_mysql: bool,
        /// Do not drop databases before importing them
        #[arg(long)]
        no_drop: bool,
        /// Import only these databases (comma-separated)
        #[arg(long, value_delimiter = ',')]
        include_databases: Option<Vec<String>>,
        /// Skip these databases (comma-separated)
        #[arg(long, value_delimiter = ',')]
        exclude_databases: Option<Vec<String>>,
    },
}

fn connection_options(args: ConnectionArgs, config: ConnectionConfig) -> ConnectionOptions {
    ConnectionOptions {
        container: args.container.or(config.container),
        container_runtime: args.container_runtime.or(config.container_runtime),
        host: args.host.or(config.host),
        user: args.user.or(config.user),
        password: args.password.or(config.password),
        dialect: args.client.or(config.client).unwrap_or_default(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging - default to INFO level if RUST_LOG not set
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ToolConfig::default(),
    };

    let conn = ServerConnection::new(
        connection_options(cli.connection, config.connection),
        &PromptCredentials,
    )?;

    match cli.command {
        Commands::Dump {
            dest,
            no_lock,
            no_lock_all,
            include_databases,
            exclude_databases,
            exclude_tables,
        } => {
            let filter = DatabaseFilter::new(
                include_databases.or(config.dump.include_databases),
                exclude_databases.or(config.dump.exclude_databases),
                exclude_tables.or(config.dump.exclude_tables),
            )?;
            let mut no_lock_list = config.dump.no_lock;
            no_lock_list.extend(no_lock);
            let options = DumpOptions {
                no_lock_all: no_lock_all || config.dump.no_lock_all,
                no_lock: no_lock_list,
                filter,
            };
            commands::dump(conn, dest, options).await
        }
        Commands::Import {
            src,
            include_mysql,
            no_drop,
            include_databases,
            exclude_databases,
        } => {
            let filter = DatabaseFilter::new(
                include_databases.or(config.import.include_databases),
                exclude_databases.or(config.import.exclude_databases),
                None,
            )?;
            let options = ImportOptions {
                include_mysql: include_mysql || config.import.include_mysql,
                no_drop: no_drop || config.import.no_drop,
                filter,
            };

            // Stop between databases on Ctrl-C; already imported databases stay
            let cancel = Cancellation::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupt received, stopping after the current database");
                    on_interrupt.cancel();
                }
            });

            commands::import(conn, src, options, cancel).await
        }
    }
}
