use autodev::cli::{Args, Commands, commands};
use autodev::config::Config;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_env(autodev::env::vars::LOG_LEVEL)
        .unwrap_or_else(|_| EnvFilter::new("autodev=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(commands::EXIT_FAILED);
        }
    };
    info!(
        workspace_root = %config.workspace_root.display(),
        data_root = %config.data_root.display(),
        "starting autodev"
    );

    let code = match args.command {
        Commands::Start {
            requirement,
            human_loop,
            project_dir,
            batch_coding,
        } => commands::start(&config, requirement, human_loop, project_dir, batch_coding).await,
        Commands::Continue {
            session_id,
            feedback,
        } => commands::resume(&config, session_id, feedback).await,
        Commands::Status { session_id } => commands::status(&config, session_id).await,
        Commands::Show {
            session_id,
            artifact,
        } => commands::show(&config, session_id, artifact).await,
        Commands::ListSessions => commands::list_sessions(&config).await,
    };

    std::process::exit(code);
}
