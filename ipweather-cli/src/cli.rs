use std::{path::PathBuf, process::ExitCode};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select, Text};
use ipweather_core::{Config, HistoryFormat, Language, Pipeline, history::storage_from_config};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "ipweather", version, about = "Current weather for wherever you are")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show current weather and append it to history (the default).
    Show(ShowArgs),

    /// Set API key, language and history format interactively.
    Configure,

    /// Print stored history, oldest first.
    History {
        /// Only show the last N entries.
        #[arg(long)]
        limit: Option<usize>,

        /// History file to read instead of the configured one.
        #[arg(long)]
        history: Option<PathBuf>,
    },
}

/// Per-run overrides of the stored configuration.
#[derive(Debug, Default, Args)]
pub struct ShowArgs {
    /// Language tag: en or ua.
    #[arg(long)]
    lang: Option<String>,

    /// History file to append to.
    #[arg(long)]
    history: Option<PathBuf>,

    /// History format: plain or json. Inferred from the file extension if omitted.
    #[arg(long)]
    format: Option<String>,

    /// Use the coordinates exactly as returned by the geolocation service.
    #[arg(long)]
    no_round: bool,

    /// Accept untrusted TLS certificates from both services.
    #[arg(long)]
    accept_invalid_certs: bool,
}

impl ShowArgs {
    fn apply(self, config: &mut Config) {
        if let Some(lang) = self.lang {
            config.language = lang;
        }
        if let Some(path) = self.history {
            config.history_path = path;
            // A new path without --format means "infer from this path".
            config.history_format = None;
        }
        if let Some(format) = self.format {
            config.history_format = Some(format);
        }
        if self.no_round {
            config.round_coordinates = false;
        }
        if self.accept_invalid_certs {
            config.accept_invalid_certs = true;
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<ExitCode> {
        match self.command.unwrap_or(Command::Show(ShowArgs::default())) {
            Command::Show(args) => show(args).await,
            Command::Configure => configure(),
            Command::History { limit, history } => print_history(limit, history),
        }
    }
}

async fn show(args: ShowArgs) -> anyhow::Result<ExitCode> {
    let mut config = Config::load()?;
    args.apply(&mut config);

    let pipeline = Pipeline::from_config(&config)?;

    match pipeline.run().await {
        Ok(report) => {
            print!("{}", report.output);
            if let Some(err) = report.storage_error {
                eprintln!("Warning: {} ({err})", err.user_message());
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::debug!(error = %err, "run aborted");
            eprintln!("{}", err.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}

fn configure() -> anyhow::Result<ExitCode> {
    // Only what is on disk; a key from the environment must not be saved.
    let mut config = Config::load_from(&Config::config_file_path()?)?;

    let api_key = Password::new("OpenWeather API key (leave empty to keep the current one):")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    if !api_key.trim().is_empty() {
        config.api_key = Some(api_key.trim().to_string());
    }

    let current_lang = config.language().unwrap_or_default();
    let languages = Language::all().to_vec();
    let cursor = languages.iter().position(|l| *l == current_lang).unwrap_or(0);
    let language = Select::new("Language:", languages)
        .with_starting_cursor(cursor)
        .prompt()
        .context("Failed to read language")?;
    config.language = language.as_str().to_string();

    let history_path = Text::new("History file:")
        .with_default(&config.history_path.display().to_string())
        .prompt()
        .context("Failed to read history path")?;
    config.history_path = PathBuf::from(history_path);

    let formats = HistoryFormat::all().to_vec();
    let inferred = HistoryFormat::from_path(&config.history_path);
    let cursor = formats.iter().position(|f| *f == inferred).unwrap_or(0);
    let format = Select::new("History format:", formats)
        .with_starting_cursor(cursor)
        .prompt()
        .context("Failed to read history format")?;
    config.history_format = Some(format.as_str().to_string());

    config.save()?;
    println!("Configuration saved to {}", Config::config_file_path()?.display());

    Ok(ExitCode::SUCCESS)
}

fn print_history(limit: Option<usize>, history: Option<PathBuf>) -> anyhow::Result<ExitCode> {
    let mut config = Config::load()?;
    if let Some(path) = history {
        config.history_path = path;
        config.history_format = None;
    }

    let entries = storage_from_config(&config)?.entries()?;
    let skip = limit.map_or(0, |n| entries.len().saturating_sub(n));

    for entry in entries.iter().skip(skip) {
        println!("{entry}");
    }

    Ok(ExitCode::SUCCESS)
}
