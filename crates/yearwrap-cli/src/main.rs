mod fetch;
mod show;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "yearwrap-cli")]
#[command(about = "yearwrap command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch this year's stats for an account, printing live progress
    Fetch {
        /// Account handle (a leading `@` is ignored)
        subject: String,
        /// Keep the result in memory instead of writing it to the database
        #[arg(long)]
        dry_run: bool,
    },
    /// Print stored stats for an account
    Show {
        /// Account handle (a leading `@` is ignored)
        subject: String,
        /// Year to show (defaults to the current year)
        #[arg(long)]
        year: Option<i32>,
    },
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check that the database is reachable
    Ping,
    /// Apply pending migrations
    Migrate,
}

async fn connect(config: &yearwrap_core::AppConfig) -> anyhow::Result<sqlx::PgPool> {
    let pool_config = yearwrap_db::PoolConfig::from_app_config(config);
    let pool = yearwrap_db::connect_pool(&config.database_url, pool_config).await?;
    Ok(pool)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("yearwrap-cli: run with --help to list commands");
        return Ok(());
    };

    let config = yearwrap_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    // Progress goes to stdout; keep logs on stderr.
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match command {
        Commands::Fetch { subject, dry_run } => {
            fetch::run_fetch(&config, &subject, dry_run).await?;
        }
        Commands::Show { subject, year } => {
            let pool = connect(&config).await?;
            show::run_show(&pool, &subject, year).await?;
        }
        Commands::Db { command } => {
            let pool = connect(&config).await?;
            match command {
                DbCommands::Ping => {
                    yearwrap_db::health_check(&pool).await?;
                    println!("database ok");
                }
                DbCommands::Migrate => {
                    let applied = yearwrap_db::run_migrations(&pool).await?;
                    println!("applied {applied} migration(s)");
                }
            }
        }
    }

    Ok(())
}
