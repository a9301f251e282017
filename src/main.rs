use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod config;
mod controller;
mod error;
mod events;
mod llm;
mod logging;
mod prompts;
mod tui;
mod ui;

use config::Config;
use controller::{ConversationAction, ConversationController, ControllerOptions};
use events::ControllerUpdate;
use llm::LlmClient;
use logging::LogTarget;
use tui::{EventHandler, TuiEvent};
use ui::conversation::ConversationManager;

#[derive(Parser)]
#[command(name = "counselor")]
#[command(version)]
#[command(about = "Talk through your week with an AI counselor", long_about = None)]
struct Cli {
    /// Config file (default: ~/.counselor/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Model to request
    #[arg(long, global = true)]
    model: Option<String>,

    /// Completion API base URL
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Minimum time before a reply appears, in milliseconds
    #[arg(long, global = true)]
    min_delay_ms: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send a single message and print the reply
    Ask { text: String },
    /// Show the resolved configuration
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

impl Cli {
    fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => Config::default_path(),
        }
    }

    fn apply_overrides(&self, config: &mut Config) {
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(min_delay_ms) = self.min_delay_ms {
            config.min_reply_delay_ms = min_delay_ms;
        }
    }
}

fn build_controller(config: &Config) -> Result<ConversationController> {
    if !config.has_api_key() {
        bail!(
            "No API key configured. Set `api_key` in config.toml or the {} environment variable.",
            config.api_key_env
        );
    }

    let client = LlmClient::new(config)?;
    tracing::debug!(endpoint = client.url(), model = %config.model, "completion client ready");
    Ok(ConversationController::new(Arc::new(client), ControllerOptions::from(config)))
}

async fn run_chat(config: Config) -> Result<()> {
    let mut manager = ConversationManager::new(build_controller(&config)?);
    manager.start_conversation();
    tracing::info!(session = %manager.controller().session_id(), model = %config.model, "chat session started");

    tui::install_panic_hook();
    let mut terminal = tui::init().context("Failed to initialize terminal")?;
    let mut events = EventHandler::new();

    let result = event_loop(&mut terminal, &mut manager, &mut events).await;

    tui::restore()?;
    tracing::info!("chat session ended");
    result
}

async fn event_loop(
    terminal: &mut tui::Tui,
    manager: &mut ConversationManager,
    events: &mut EventHandler,
) -> Result<()> {
    loop {
        terminal.draw(|frame| manager.render(frame.size(), frame.buffer_mut()))?;

        tokio::select! {
            event = events.next() => match event {
                Some(TuiEvent::Key(key)) => {
                    if manager.handle_key(key) == ConversationAction::Terminate {
                        return Ok(());
                    }
                }
                Some(TuiEvent::Tick) => {
                    manager.on_tick();
                }
                Some(TuiEvent::Resize) => {}
                None => return Ok(()),
            },
            update = manager.next_update() => {
                tracing::debug!(?update, "controller update");
            }
        }
    }
}

async fn ask(config: Config, text: &str) -> Result<()> {
    let mut controller = build_controller(&config)?;
    controller.initialize();

    let Some(ticket) = controller.submit_user_message(text) else {
        bail!("Nothing to send: message is empty");
    };

    while let Some(update) = controller.next_event().await {
        if update == ControllerUpdate::ReplyApplied(ticket) {
            break;
        }
    }

    if let Some(reply) = controller.transcript().last() {
        println!("{}: {}", prompts::speaker_label(reply.role()), reply.content());
    }
    Ok(())
}

fn show_config(config: &Config, path: &Path, init: bool) -> Result<()> {
    if init {
        if Config::init_at(path)? {
            println!("✅ Wrote default config to {}", path.display());
        } else {
            println!("Config already exists at {}", path.display());
        }
    }

    let status = if path.exists() { "" } else { " (not found, using defaults)" };
    println!("📄 {}{}\n", path.display(), status);

    let mut shown = config.clone();
    shown.api_key = config.masked_api_key();
    print!("{}", toml::to_string_pretty(&shown).context("Failed to serialize config")?);
    if shown.api_key.is_none() {
        println!("# no API key: set api_key above or {}", config.api_key_env);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let path = cli.config_path()?;
    let mut config = Config::load_from(&path)?;
    cli.apply_overrides(&mut config);

    match &cli.command {
        None => {
            logging::init(LogTarget::File(Config::home_dir()?.join("counselor.log")))?;
            run_chat(config).await
        }
        Some(Commands::Ask { text }) => {
            logging::init(LogTarget::Stderr)?;
            ask(config, text).await
        }
        Some(Commands::Config { init }) => show_config(&config, &path, *init),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_file_values() {
        let cli = Cli::try_parse_from([
            "counselor",
            "--model",
            "gpt-4o-mini",
            "--min-delay-ms",
            "0",
            "ask",
            "こんにちは",
        ])
        .unwrap();

        let mut config = Config::default();
        cli.apply_overrides(&mut config);

        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.min_reply_delay_ms, 0);
        assert_eq!(config.base_url, Config::default().base_url);
        assert!(matches!(cli.command, Some(Commands::Ask { ref text }) if text == "こんにちは"));
    }

    #[test]
    fn no_subcommand_means_chat() {
        let cli = Cli::try_parse_from(["counselor"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn explicit_config_path_is_used() {
        let cli = Cli::try_parse_from(["counselor", "config", "--config", "/tmp/c.toml"]).unwrap();
        assert_eq!(cli.config_path().unwrap(), PathBuf::from("/tmp/c.toml"));
    }

    #[test]
    fn controller_requires_a_key() {
        let config = Config {
            api_key: None,
            api_key_env: "COUNSELOR_TEST_UNSET_KEY_VAR".to_string(),
            ..Config::default()
        };
        assert!(build_controller(&config).is_err());
    }
}
