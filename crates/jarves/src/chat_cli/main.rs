//! Terminal chat client for a running Jarves proxy.

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use jarves::chat::{ChatError, ChatSession, HttpTransport, RequestState, SendOutcome};
use jarves::config::DEFAULT_MODEL;
use jarves::speech::{CommandSpeech, DEFAULT_SPEECH_COMMAND, Narrator};

const DEFAULT_SERVER: &str = "http://127.0.0.1:3001";

const HELP: &str = "\
Commands:
  /stop           cancel the pending request
  /clear          start a new conversation
  /model [ID]     show or switch the model
  /models         list models offered by the server
  /health         check the server
  /speak          toggle spoken replies
  /help           show this help
  /quit           exit";

#[derive(Debug, Parser)]
#[command(author, version, about = "Chat with Jarves from the terminal.")]
struct Cli {
    /// Base URL of the Jarves server
    #[arg(long, env = "JARVES_API_BASE", default_value = DEFAULT_SERVER)]
    server: String,
    /// Model to use (defaults to the server's default model)
    #[arg(long, env = "JARVES_MODEL")]
    model: Option<String>,
    /// Read replies aloud
    #[arg(long)]
    speak: bool,
    /// Program used to read replies aloud
    #[arg(long, value_name = "PROGRAM", default_value = DEFAULT_SPEECH_COMMAND)]
    speech_command: String,
    /// Increase logging verbosity (stackable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Message(String),
    Stop,
    Clear,
    Model(Option<String>),
    Models,
    Health,
    Speak,
    Help,
    Quit,
    Empty,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }

    let Some(command) = line.strip_prefix('/') else {
        return Input::Message(line.to_string());
    };

    let mut parts = command.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let arg = parts
        .next()
        .map(str::trim)
        .filter(|arg| !arg.is_empty())
        .map(str::to_string);

    match name {
        "stop" => Input::Stop,
        "clear" => Input::Clear,
        "model" => Input::Model(arg),
        "models" => Input::Models,
        "health" => Input::Health,
        "speak" => Input::Speak,
        "help" | "?" => Input::Help,
        "quit" | "exit" | "q" => Input::Quit,
        other => Input::Unknown(other.to_string()),
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("{err:?}");
        std::process::exit(1);
    }
}

fn init_logging(verbose: u8) {
    use tracing_subscriber::EnvFilter;

    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("jarves={level},jarves_chat={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .ok();
}

async fn run(cli: Cli) -> Result<()> {
    let transport = Arc::new(HttpTransport::new(&cli.server));

    let model = match cli.model {
        Some(model) => model,
        None => match transport.list_models().await {
            Ok(models) => models.default_model,
            Err(err) => {
                warn!("could not fetch models from {}: {err}", transport.base_url());
                DEFAULT_MODEL.to_string()
            }
        },
    };

    let session = ChatSession::new(transport.clone(), model);
    let engine = Arc::new(CommandSpeech::new(cli.speech_command));
    let mut narrator = Narrator::new(engine, cli.speak);

    for message in session.messages().await {
        println!("jarves> {}", message.content);
    }
    println!("(model: {}, /help for commands)", session.model().await);

    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel::<SendOutcome>();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt(false);
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    break;
                };

                match parse_input(&line) {
                    Input::Empty => {}
                    Input::Message(text) => match session.submit(&text).await {
                        Ok(pending) => {
                            debug!(generation = pending.generation(), "sending");
                            let tx = outcome_tx.clone();
                            tokio::spawn(async move {
                                let _ = tx.send(pending.wait().await);
                            });
                            println!("jarves> …");
                        }
                        Err(ChatError::EmptyInput) => {}
                    },
                    Input::Stop => {
                        if session.stop().await {
                            narrator.cancel();
                            println!("(stopped)");
                        } else {
                            println!("(nothing to stop)");
                        }
                    }
                    Input::Clear => {
                        narrator.cancel();
                        session.clear().await;
                        if let Some(greeting) = session.messages().await.first() {
                            println!("jarves> {}", greeting.content);
                        }
                    }
                    Input::Model(None) => println!("model: {}", session.model().await),
                    Input::Model(Some(model)) => {
                        session.set_model(model.as_str()).await;
                        println!("model set to {model}");
                    }
                    Input::Models => match transport.list_models().await {
                        Ok(models) => {
                            let current = session.model().await;
                            for model in models.models {
                                let marker = if model.id == current { '*' } else { ' ' };
                                println!("{marker} {:<24} {}", model.id, model.label);
                            }
                        }
                        Err(err) => eprintln!("could not list models: {err}"),
                    },
                    Input::Health => match transport.health().await {
                        Ok(true) => println!("server ok ({})", transport.base_url()),
                        Ok(false) => println!("server unhealthy ({})", transport.base_url()),
                        Err(err) => eprintln!("server unreachable: {err}"),
                    },
                    Input::Speak => {
                        let on = narrator.toggle();
                        println!("spoken replies {}", if on { "on" } else { "off" });
                    }
                    Input::Help => println!("{HELP}"),
                    Input::Quit => break,
                    Input::Unknown(name) => println!("unknown command /{name} (try /help)"),
                }
                prompt(session.last_error().await.is_some());
            }
            Some(outcome) = outcome_rx.recv() => {
                match outcome {
                    SendOutcome::Fulfilled(message) => {
                        println!("\njarves> {}", message.content);
                        narrator.announce(&message);
                    }
                    SendOutcome::Failed(message) => eprintln!("\n{}", message.content),
                    SendOutcome::Aborted => continue,
                }
                if session.state().await == RequestState::Idle {
                    prompt(session.last_error().await.is_some());
                }
            }
        }
    }

    session.stop().await;
    narrator.cancel();
    Ok(())
}

/// Prints the input prompt, flagged while the last request failed.
fn prompt(failed: bool) {
    print!("{}you> ", if failed { "[!] " } else { "" });
    let _ = io::stdout().flush();
}
