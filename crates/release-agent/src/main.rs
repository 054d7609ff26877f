//! An interactive terminal front end for the release assistant.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::path::PathBuf;
use std::pin::pin;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use release_agent::core::DEFAULT_MAX_ROUND_TRIPS;
use release_agent::{
    BUNDLED_POLICY, DEFAULT_POLICY_PATH, SessionBuilder, load_policy,
    policy_prompt,
};
use release_agent_openai_model::{
    OpenAIConfig, OpenAIConfigBuilder, OpenAIProvider,
};
use tokio::io::{self, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::select;
use tokio::time::sleep;

const AZURE_API_VERSION: &str = "2024-02-01";

const SAMPLE_PROMPTS: [&str; 3] = [
    "New color for the R22 mirror cap",
    "Update the infotainment system in the X33",
    "Door hinge in D21 rattling",
];

const BAR_CHAR: &str = "▎";

/// Chat with the release process assistant.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Path to the release policy document.
    #[arg(long, default_value = DEFAULT_POLICY_PATH)]
    policy: PathBuf,

    /// Maximum number of model calls for a single message.
    #[arg(long, default_value_t = DEFAULT_MAX_ROUND_TRIPS)]
    max_round_trips: usize,

    /// Timeout of a single model request, in seconds.
    #[arg(long, default_value_t = 60)]
    timeout_secs: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let Some(config) = provider_config(args.timeout_secs) else {
        eprintln!(
            "Set AZURE_OPENAI_ENDPOINT and AZURE_OPENAI_API_KEY, or \
             OPENAI_API_KEY, to choose a model provider"
        );
        return;
    };
    debug!("provider config: {config:?}");
    let model_provider = match OpenAIProvider::new(config) {
        Ok(provider) => provider,
        Err(err) => {
            eprintln!("Failed to create the model provider: {err}");
            return;
        }
    };

    let policy = match load_policy(&args.policy) {
        Ok(policy) => policy,
        Err(err)
            if err.kind() == std::io::ErrorKind::NotFound
                && args.policy.as_os_str() == DEFAULT_POLICY_PATH =>
        {
            warn!("{DEFAULT_POLICY_PATH} not found, using the bundled policy");
            policy_prompt(BUNDLED_POLICY)
        }
        Err(err) => {
            eprintln!(
                "Failed to load policy from {}: {err}",
                args.policy.display()
            );
            return;
        }
    };

    let mut session = match SessionBuilder::with_model_provider(model_provider)
        .with_policy(policy)
        .with_max_round_trips(args.max_round_trips)
        .build()
    {
        Ok(session) => session,
        Err(err) => {
            eprintln!("Failed to create the session: {err}");
            return;
        }
    };

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    println!("{}", "Release Process assistant".bold());
    println!("Try one of these:");
    for prompt in SAMPLE_PROMPTS {
        println!("{}{}", BAR_CHAR.bright_black(), prompt.italic());
    }
    println!();

    let mut lines = BufReader::new(io::stdin()).lines();

    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line(&mut lines).await else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(progress_style.clone());
        progress_bar.set_message("🤔 Thinking...");

        let mut respond = pin!(session.respond(line));
        let result = loop {
            select! {
                result = &mut respond => break result,
                _ = sleep(Duration::from_millis(100)) => {
                    progress_bar.inc(1);
                }
            }
        };

        // Finish the progress bar before printing anything else.
        progress_bar.finish_and_clear();

        match result {
            Ok(reply) => {
                println!("{}🤖 {}", BAR_CHAR.bright_cyan(), reply.bright_white());
            }
            Err(err) => {
                error!("respond failed: {err:?}");
                println!("{}⚠️  {}", BAR_CHAR.bright_red(), err.red());
            }
        }
        println!();
    }
}

fn provider_config(timeout_secs: u64) -> Option<OpenAIConfig> {
    let builder = match (
        env::var("AZURE_OPENAI_ENDPOINT"),
        env::var("AZURE_OPENAI_API_KEY"),
    ) {
        (Ok(endpoint), Ok(api_key)) => OpenAIConfigBuilder::with_api_key(api_key)
            .with_base_url(endpoint)
            .with_azure_api_version(AZURE_API_VERSION),
        _ => {
            let api_key = env::var("OPENAI_API_KEY").ok()?;
            let builder = OpenAIConfigBuilder::with_api_key(api_key);
            match env::var("OPENAI_BASE_URL") {
                Ok(base_url) => builder.with_base_url(base_url),
                Err(_) => builder,
            }
        }
    };
    let builder = match env::var("OPENAI_MODEL") {
        Ok(model) => builder.with_model(model),
        Err(_) => builder,
    };
    Some(
        builder
            .with_timeout(Duration::from_secs(timeout_secs))
            .build(),
    )
}

async fn read_line(lines: &mut Lines<BufReader<Stdin>>) -> Option<String> {
    match lines.next_line().await {
        Ok(line) => line,
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
