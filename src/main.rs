use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use dialoguer::{theme::ColorfulTheme, Select};
use std::io::{self, BufRead, Write};

use lmchat::diagnostics::{DiagStatus, DiagnosticsRunner};
use lmchat::prefs::{FileStore, KeyValueStore, API_URL_KEY, MODEL_KEY};
use lmchat::{endpoint, ApiError, ChatMessage, Conversation, LmStudioClient};

#[derive(Parser)]
#[command(name = "lmchat")]
#[command(about = "Chat with a local LM Studio (or any OpenAI-compatible) inference server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive chat session
    Chat {
        /// Model id to use (overrides the saved selection)
        #[arg(short, long)]
        model: Option<String>,
        /// API base URL (overrides the saved URL)
        #[arg(short, long)]
        url: Option<String>,
    },
    /// List models available on the server
    Models {
        /// Interactively pick a model and save it as the default
        #[arg(long)]
        pick: bool,
        /// API base URL (overrides the saved URL)
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Run network diagnostics against the configured server
    Doctor {
        /// The inference server runs on a different machine than this client
        #[arg(long)]
        remote: bool,
    },
    /// Show or change saved settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the saved API URL and model
    Show,
    /// Validate and save the API base URL
    SetUrl { url: String },
    /// Save the default model id
    SetModel { model: String },
    /// Restore the default API URL
    ResetUrl,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let store = FileStore::default_location()?;

    match cli.command {
        Commands::Chat { model, url } => {
            let api_url = url.unwrap_or_else(|| endpoint::resolve(&store));
            let model = model.unwrap_or_else(|| endpoint::resolve_model(&store));
            run_chat(&api_url, &model).await?;
        }
        Commands::Models { pick, url } => {
            let api_url = url.unwrap_or_else(|| endpoint::resolve(&store));
            list_models(&store, &api_url, pick).await?;
        }
        Commands::Doctor { remote } => {
            run_doctor(&store, remote).await;
        }
        Commands::Config { command } => run_config(&store, command)?,
    }

    Ok(())
}

async fn run_chat(api_url: &str, model: &str) -> Result<()> {
    let client = LmStudioClient::new(api_url);
    let mut conversation = Conversation::new();

    println!("{}", "LM Studio Chat".bold().blue());
    println!("API: {}  Model: {}", api_url.cyan(), model.cyan());
    println!(
        "Type a message, {} to clear, {} to exit.\n",
        "/clear".yellow(),
        "/quit".yellow()
    );

    let stdin = io::stdin();
    loop {
        print!("{} ", ">".green().bold());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();

        match input {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                conversation.clear();
                println!("{}", "Conversation cleared.".yellow());
                continue;
            }
            _ => {}
        }

        // Snapshot the history before recording the new turn: the request
        // carries prior turns plus the fresh input, and the turn stays in
        // the transcript whether or not the send succeeds.
        let history = conversation.messages().to_vec();
        conversation.push(ChatMessage::user(input));

        match client.send_chat(&history, input, model).await {
            Ok(reply) => {
                println!("\n{}\n", reply.content.trim());
                conversation.push(reply);
            }
            Err(err) => print_send_error(&err, api_url, model),
        }
    }

    Ok(())
}

fn print_send_error(err: &ApiError, api_url: &str, model: &str) {
    eprintln!("\n{} {}", "Error:".red().bold(), err);
    match err {
        ApiError::Http { status, body } => {
            eprintln!("The server answered but rejected the request (HTTP {status}).");
            if !body.is_empty() {
                eprintln!("Server said: {}", body.trim());
            }
            eprintln!("Check that the model '{model}' is loaded on the server.");
        }
        ApiError::MalformedResponse => {
            eprintln!("The server answered with an unexpected response format.");
            eprintln!("Is {api_url} really an OpenAI-compatible endpoint?");
        }
        ApiError::Timeout | ApiError::Transport(_) => {
            eprintln!("Failed to reach the inference server.\n");
            eprintln!("Make sure:");
            eprintln!("  1. LM Studio is running");
            eprintln!("  2. A model is loaded ({model})");
            eprintln!("  3. The local API server is started");
            eprintln!("  4. Both machines are on the same network");
            if endpoint::is_loopback(api_url) {
                eprintln!(
                    "\n{} {api_url} is a loopback address. If the server runs on another \
                     machine, use its IP address instead (e.g., http://192.168.1.100:1234).",
                    "Note:".yellow().bold()
                );
            }
            eprintln!("\nCurrent API URL: {api_url}");
            eprintln!("Run {} for a full report.", "lmchat doctor".cyan());
        }
        ApiError::InvalidUrl(reason) => {
            eprintln!("{reason}");
        }
    }
    eprintln!("{}\n", "Your message was kept; edit the URL or retry.".dimmed());
}

async fn list_models(store: &dyn KeyValueStore, api_url: &str, pick: bool) -> Result<()> {
    let client = LmStudioClient::new(api_url);

    let models = match client.list_models(None).await {
        Ok(models) => models,
        Err(err) => {
            print_send_error(&err, api_url, "-");
            return Ok(());
        }
    };

    if models.is_empty() {
        println!("{}", "No models found.".yellow());
        println!("Make sure a model is loaded and the API server is running.");
        println!("Queried: {api_url}/v1/models");
        return Ok(());
    }

    if pick {
        let labels: Vec<String> = models
            .iter()
            .map(|m| match &m.owned_by {
                Some(owner) => format!("{} ({})", m.id, owner),
                None => m.id.clone(),
            })
            .collect();
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Select a model")
            .items(&labels)
            .default(0)
            .interact()?;
        let chosen = &models[selection].id;
        store.set(MODEL_KEY, chosen)?;
        println!("{} {}", "Saved default model:".green(), chosen.bold());
    } else {
        let current = endpoint::resolve_model(store);
        println!("{}", "Available models:".bold());
        for model in &models {
            let marker = if model.id == current {
                "*".green().to_string()
            } else {
                " ".to_string()
            };
            match &model.owned_by {
                Some(owner) => println!(" {marker} {}  ({owner})", model.id),
                None => println!(" {marker} {}", model.id),
            }
        }
        println!("\nRun {} to change the default.", "lmchat models --pick".cyan());
    }

    Ok(())
}

async fn run_doctor(store: &dyn KeyValueStore, remote: bool) {
    println!("{}", "Network Diagnostics".bold().blue());

    let runner = DiagnosticsRunner::new().with_loopback_reaches_server(!remote);
    let report = runner.run(store).await;

    println!("Testing API URL: {}\n", report.api_url.cyan());

    for result in &report.results {
        let (icon, color) = match result.status {
            DiagStatus::Success => ("✓", Color::Green),
            DiagStatus::Warning => ("!", Color::Yellow),
            DiagStatus::Error => ("✗", Color::Red),
            DiagStatus::Pending => ("·", Color::White),
        };
        println!("{} {}", icon.color(color).bold(), result.name.bold());
        println!("  {}", result.message.color(color));
        if let Some(details) = &result.details {
            println!("  {}", details.dimmed());
        }
        println!();
    }

    println!(
        "{}: {} passed, {} warnings, {} failed",
        "Summary".bold(),
        report.passed().to_string().green(),
        report.warnings().to_string().yellow(),
        report.failed().to_string().red()
    );
}

fn run_config(store: &dyn KeyValueStore, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            println!("api_url:        {}", endpoint::resolve(store));
            println!("selected_model: {}", endpoint::resolve_model(store));
        }
        ConfigCommands::SetUrl { url } => match endpoint::validate(&url) {
            Ok(clean) => {
                store.set(API_URL_KEY, &clean)?;
                println!("{} {}", "Saved API URL:".green(), clean.bold());
                if endpoint::is_loopback(&clean) {
                    println!(
                        "{} loopback addresses only work when the server runs on this machine.",
                        "Note:".yellow().bold()
                    );
                }
            }
            Err(err) => {
                eprintln!("{} {}", "Error:".red().bold(), err);
                std::process::exit(1);
            }
        },
        ConfigCommands::SetModel { model } => {
            store.set(MODEL_KEY, &model)?;
            println!("{} {}", "Saved default model:".green(), model.bold());
        }
        ConfigCommands::ResetUrl => {
            store.remove(API_URL_KEY)?;
            println!(
                "{} {}",
                "API URL reset to".green(),
                endpoint::DEFAULT_API_URL.bold()
            );
        }
    }
    Ok(())
}
