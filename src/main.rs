//! table-talk - ask natural-language questions about a spreadsheet.

use std::io::IsTerminal;
use std::sync::Arc;

use table_talk::backend::{initialize_backend, BackendState};
use table_talk::chat::ChatSession;
use table_talk::cli::{Cli, CliCommand};
use table_talk::config::Config;
use table_talk::dataset::{self, DatabaseStatus};
use table_talk::error::Result;
use table_talk::llm::{build_schema_prompt, create_client, Conversation, LlmService};
use table_talk::logging;
use tokio::io::BufReader;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("{}: {}", e.category(), e);
        eprintln!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse_args();
    let dotenv = dotenvy::dotenv();

    let config_path = cli.config_path();
    let mut config = Config::load_from_file(&config_path)?;
    cli.apply_overrides(&mut config);
    config.llm.apply_env_defaults();

    if cli.is_interactive() {
        let log_path = config
            .logging
            .file
            .clone()
            .unwrap_or_else(logging::default_log_path);
        logging::init_file_logging(&log_path);
    } else {
        logging::init_stderr_logging();
    }

    info!("Loaded config from: {}", config_path.display());
    if let Ok(path) = dotenv {
        info!("Loaded environment from: {}", path.display());
    }

    match cli.command() {
        CliCommand::Import { force } => import(&config, force).await,
        CliCommand::Schema => {
            let state = init_backend(&config).await;
            println!("{}", state.schema.format_for_display().trim_end());
            println!();
            println!("{}", build_schema_prompt(&state, config.prompt.sample_limit));
            state.db.close().await
        }
        CliCommand::Ask { question } => {
            let client = create_client(&config.llm)?;
            let state = init_backend(&config).await;
            let service = LlmService::new(client, Arc::clone(&state), &config);

            let mut conversation = Conversation::new();
            conversation.add_user(question.join(" "));
            service.process_user_query(&mut conversation).await?;

            if let Some(answer) = conversation.last() {
                println!("{}", answer.text());
            }
            state.db.close().await
        }
        CliCommand::Chat => {
            let client = create_client(&config.llm)?;
            let state = init_backend(&config).await;
            let service = LlmService::new(client, Arc::clone(&state), &config);

            let color = !cli.no_color && std::io::stdout().is_terminal();
            let mut session = ChatSession::new(
                service,
                BufReader::new(tokio::io::stdin()),
                tokio::io::stdout(),
            )
            .with_color(color)
            .with_prompt(config.chat.prompt.clone());

            session.run().await?;
            state.db.close().await
        }
    }
}

/// Initializes the backend, exiting the process if it cannot be built.
async fn init_backend(config: &Config) -> Arc<BackendState> {
    match initialize_backend(config).await {
        Ok(state) => Arc::new(state),
        Err(e) => {
            error!("Backend Initialization Error: {}", e);
            eprintln!("Backend Initialization Error: {e}");
            std::process::exit(1);
        }
    }
}

async fn import(config: &Config, force: bool) -> Result<()> {
    config.dataset.validate()?;
    let db_path = config.dataset.db_path();

    if force {
        let rows = dataset::rebuild_database(&config.dataset).await?;
        println!(
            "Imported {} rows into '{}' at {}",
            rows,
            config.dataset.table,
            db_path.display()
        );
        return Ok(());
    }

    match dataset::ensure_database(&config.dataset).await? {
        DatabaseStatus::Existing => println!(
            "Database already exists at {}. Use --force to rebuild it.",
            db_path.display()
        ),
        DatabaseStatus::Created(rows) => println!(
            "Imported {} rows into '{}' at {}",
            rows,
            config.dataset.table,
            db_path.display()
        ),
    }

    Ok(())
}
