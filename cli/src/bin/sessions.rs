use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Context, eyre};
use sessionstore_cli::{Error, tracing::Tracing, util::ui::UI};
use sessionstore_config::{Config, Environment, get_env, load_config, parse_env};
use sessionstore_db::{SessionStore, connect_pool, create_database_if_not_exists, spawn_prune_task};
use tokio::signal;
use tracing::debug;

#[tokio::main]
async fn main() -> ExitCode {
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();

    let args = Cli::parse();
    let mut ui = UI::new(&mut stdout, &mut stderr, !args.no_color, !args.quiet);

    if let Err(e) = color_eyre::install() {
        ui.error("Could not install error report handler", &e);
    }

    match cli(&mut ui, args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            ui.error(e.to_string().as_str(), &e.into());
            ExitCode::FAILURE
        }
    }
}

#[derive(Parser)]
#[command(author, version, about = "A CLI tool to inspect and maintain the sessions table.", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true, help = "Choose the environment (development, test, production). Defaults to APP_ENVIRONMENT, then development.", value_parser = parse_env)]
    env: Option<Environment>,

    #[arg(long, global = true, help = "Disable colored output.")]
    no_color: bool,

    #[arg(long, global = true, help = "Disable debug output.")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Create the sessions table and its index")]
    Init,
    #[command(about = "Print a live session as JSON")]
    Get { sid: String },
    #[command(about = "Count stored and live sessions")]
    Count,
    #[command(about = "Delete expired sessions once")]
    Prune,
    #[command(about = "Delete one session")]
    Destroy { sid: String },
    #[command(about = "Delete all sessions")]
    Clear,
    #[command(about = "Keep deleting expired sessions until interrupted")]
    Watch,
}

async fn cli(ui: &mut UI<'_>, cli: Cli) -> Result<(), Error> {
    let env = match cli.env {
        Some(env) => env,
        None => get_env()?,
    };
    let config: Config = load_config(&env)?;
    Tracing::init(&config.tracing, !cli.no_color);

    ui.log(&format!("Connecting to {} sessions database…", &env));
    let store = connect_store(&config)
        .await
        .context("Could not open the session store!")?;

    match cli.command {
        Commands::Init => {
            ui.success("Sessions table is ready.");
            Ok(())
        }
        Commands::Get { sid } => {
            match store.get(&sid).await? {
                Some(session) => {
                    let json = serde_json::to_string_pretty(&session)
                        .context("Could not format session!")?;
                    ui.print(&json);
                }
                None => ui.info(&format!("No live session {sid}.")),
            }
            Ok(())
        }
        Commands::Count => {
            let stored = store.length().await?;
            let live = store.live_length().await?;
            ui.info(&format!("{stored} stored sessions, {live} live."));
            Ok(())
        }
        Commands::Prune => {
            ui.info(&format!("Pruning {} sessions…", &env));
            let pruned = store.prune_expired().await?;
            ui.success(&format!("Pruned {pruned} expired sessions."));
            Ok(())
        }
        Commands::Destroy { sid } => {
            store.destroy(&sid).await?;
            ui.success(&format!("Destroyed session {sid}."));
            Ok(())
        }
        Commands::Clear => {
            ui.info(&format!("Clearing {} sessions…", &env));
            store.clear().await?;
            ui.success("Cleared all sessions.");
            Ok(())
        }
        Commands::Watch => {
            let period = Duration::from_secs(config.store.prune_interval_secs);
            ui.info(&format!(
                "Pruning expired sessions every {}s, press Ctrl-C to stop…",
                period.as_secs()
            ));

            let prune_task = spawn_prune_task(store, period);
            let signal = shutdown_signal().await;
            prune_task.abort();

            match prune_task.await {
                Ok(_) => (),
                Err(err) if err.is_cancelled() => debug!("prune task cleaned up."),
                Err(err) => return Err(eyre!("prune task failed: {err}").into()),
            }
            signal?;

            ui.success("Stopped pruning.");
            Ok(())
        }
    }
}

async fn connect_store(config: &Config) -> Result<SessionStore, Error> {
    create_database_if_not_exists(&config.database).await?;
    let pool = connect_pool(&config.database).await?;

    let store = SessionStore::builder()
        .pool(pool)
        .config(&config.store)
        .build()?;
    store.ready().await?;

    Ok(store)
}

async fn shutdown_signal() -> Result<(), std::io::Error> {
    let ctrl_c = signal::ctrl_c();

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())?
            .recv()
            .await;
        Ok::<(), std::io::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<(), std::io::Error>>();

    tokio::select! {
        result = ctrl_c => result,
        result = terminate => result,
    }
}
