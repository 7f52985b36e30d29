use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flume::unbounded;
use replybot::activity::{note, ActivityLog};
use replybot::agent::generator::{GenerationOutcome, ReplyGenerator};
use replybot::config::BotConfig;
use replybot::runtime::{preview_reply, standalone_generator, BotRuntime};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Replies to new subreddit threads with generated comments")]
struct Cli {
    /// TOML config file; env vars override its values
    #[arg(short, long, env = "REPLYBOT_CONFIG", default_value = "replybot.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Poll and reply on an interval, with the liveness server and self-ping
    Run,
    /// Run a single cycle and exit
    Once,
    /// Preview a generated reply without posting; interactive when no question is given
    Ask { question: Option<String> },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,replybot=debug")),
        )
        .init();

    let cli = Cli::parse();
    let config = BotConfig::load(Some(&cli.config))?;

    let rt = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            config.validate()?;
            let (event_tx, event_rx) = unbounded();
            let runtime = BotRuntime::bootstrap(config, event_tx)
                .context("failed to bootstrap bot runtime")?;
            rt.block_on(runtime.serve(event_rx))
        }
        Command::Once => {
            config.validate()?;
            let (event_tx, event_rx) = unbounded();
            let runtime = BotRuntime::bootstrap(config, event_tx)
                .context("failed to bootstrap bot runtime")?;
            let outcome = rt.block_on(runtime.run_once(event_rx));
            println!("{}", outcome);
            Ok(())
        }
        Command::Ask { question } => {
            config.validate_generation()?;
            let generator = standalone_generator(&config)?;
            let journal = config.activity_log_path.as_ref().map(ActivityLog::new);
            match question {
                Some(question) => {
                    rt.block_on(print_preview(&generator, &question, journal.as_ref()));
                    Ok(())
                }
                None => rt.block_on(interactive(&generator, journal.as_ref())),
            }
        }
    }
}

async fn print_preview(
    generator: &ReplyGenerator,
    question: &str,
    journal: Option<&ActivityLog>,
) {
    match preview_reply(generator, question, journal).await {
        GenerationOutcome::Reply(reply) => println!("\nReply: {}", reply),
        GenerationOutcome::NoReply(reason) => println!("\n(no reply: {:?})", reason),
    }
}

async fn interactive(generator: &ReplyGenerator, journal: Option<&ActivityLog>) -> Result<()> {
    tracing::info!("Session started");
    note(journal, "Session started").await;
    let stdin = io::stdin();
    loop {
        print!("\nQuestion > ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }
        print_preview(generator, question, journal).await;
    }
    tracing::info!("Session ended");
    note(journal, "Session ended").await;
    Ok(())
}
