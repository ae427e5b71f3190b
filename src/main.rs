//! Persona pipeline
//!
//! A Business Analyst, a Software Engineer and a Product Owner take turns
//! on a user's request until the Product Owner signs off.

mod artifact;
mod chat;
mod llm;
mod transcript;

use chat::{
    default_personas, is_approved, load_personas, run_pipeline, ApprovalTermination, ChatMessage,
    GroupChat, DEFAULT_MAXIMUM_ITERATIONS,
};
use clap::Parser;
use llm::{build_service, LlmConfig};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use transcript::Transcript;

const DEFAULT_PROMPT: &str = "I need a simple calculator web app that can perform basic arithmetic operations (addition, subtraction, multiplication, division)";

#[derive(Parser)]
#[command(name = "persona-pipeline")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run a request through analyst, engineer and product owner personas", long_about = None)]
struct Cli {
    /// Request handed to the personas
    #[arg(default_value = DEFAULT_PROMPT)]
    prompt: String,

    /// JSON array of {name, instructions} objects replacing the built-in personas
    #[arg(long, env = "PERSONA_PIPELINE_PERSONAS")]
    personas: Option<PathBuf>,

    /// Stop after this many replies even without approval
    #[arg(long, default_value_t = DEFAULT_MAXIMUM_ITERATIONS)]
    max_iterations: usize,

    /// Completion token limit per reply
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Write the latest fenced html block from the replies to this file
    #[arg(long)]
    html_out: Option<PathBuf>,

    /// Write the full conversation as JSON to this file
    #[arg(long)]
    transcript: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json: bool,
}

fn init_tracing(verbose: bool, json: bool) {
    let default_filter = if verbose {
        "persona_pipeline=debug"
    } else {
        "persona_pipeline=info"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(json.then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .with_writer(std::io::stderr)
        }))
        .with((!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();
}

fn print_response(message: &ChatMessage) {
    println!("{message}");
}

/// Completion banner followed by every reply, one `name: content` line each
fn write_report(out: &mut impl Write, responses: &[ChatMessage]) -> std::io::Result<()> {
    writeln!(out, "\n=== CONVERSATION COMPLETED ===")?;
    for response in responses {
        writeln!(out, "{response}")?;
    }
    out.flush()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json);

    let personas = match &cli.personas {
        Some(path) => load_personas(path)?,
        None => default_personas(),
    };

    let llm = build_service(&LlmConfig::from_env())?;

    let mut chat = GroupChat::new(personas, llm)
        .with_termination(ApprovalTermination::new().with_maximum_iterations(cli.max_iterations))
        .with_max_tokens(cli.max_tokens);

    tracing::info!(conversation = %chat.id(), "Starting conversation");
    let started_at = chrono::Utc::now();
    let responses = run_pipeline(&mut chat, &cli.prompt, print_response).await?;

    write_report(&mut std::io::stdout().lock(), &responses)?;

    if !is_approved(&responses) {
        tracing::warn!(
            iterations = chat.iterations(),
            complete = chat.is_complete(),
            "Conversation ended without approval"
        );
    }

    if let Some(path) = &cli.html_out {
        match artifact::latest_html(&responses) {
            Some(html) => artifact::write_artifact(path, &html)?,
            None => tracing::warn!("No ```html block found in the replies; nothing written"),
        }
    }

    if let Some(path) = &cli.transcript {
        Transcript::new(chat.id(), cli.prompt.clone(), started_at, responses).write(path)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(["persona-pipeline"]).unwrap();
        assert_eq!(cli.prompt, DEFAULT_PROMPT);
        assert_eq!(cli.max_iterations, DEFAULT_MAXIMUM_ITERATIONS);
        assert!(cli.max_tokens.is_none());
        assert!(cli.html_out.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::try_parse_from([
            "persona-pipeline",
            "Build a todo list",
            "--max-iterations",
            "6",
            "--max-tokens",
            "800",
            "--html-out",
            "out/index.html",
            "--transcript",
            "out/run.json",
            "--json",
        ])
        .unwrap();

        assert_eq!(cli.prompt, "Build a todo list");
        assert_eq!(cli.max_iterations, 6);
        assert_eq!(cli.max_tokens, Some(800));
        assert_eq!(cli.html_out, Some(PathBuf::from("out/index.html")));
        assert_eq!(cli.transcript, Some(PathBuf::from("out/run.json")));
        assert!(cli.json);
    }

    #[test]
    fn test_report_lists_every_reply_after_banner() {
        let responses = [
            ChatMessage::assistant("BusinessAnalyst", "Plan: four operations"),
            ChatMessage::assistant("SoftwareEngineer", "```html\n<p>calc</p>\n```"),
            ChatMessage::assistant("ProductOwner", "READY FOR USER APPROVAL"),
        ];

        let mut out = Vec::new();
        write_report(&mut out, &responses).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\n=== CONVERSATION COMPLETED ===\n\
             BusinessAnalyst: Plan: four operations\n\
             SoftwareEngineer: ```html\n<p>calc</p>\n```\n\
             ProductOwner: READY FOR USER APPROVAL\n"
        );
    }

    #[test]
    fn test_report_without_replies_is_just_banner() {
        let mut out = Vec::new();
        write_report(&mut out, &[]).unwrap();
        assert_eq!(out, b"\n=== CONVERSATION COMPLETED ===\n");
    }
}
