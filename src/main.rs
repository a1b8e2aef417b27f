//! FusBuddy — CLI entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse CLI args
//!   3. Load runtime settings
//!   4. Resolve effective log level (CLI `-v` flags > env > settings)
//!   5. Init logger once
//!   6. Run the command: answer a question, or manage the user config

use std::fs;

use tracing::info;

use fusbuddy::config;
use fusbuddy::context::SessionContext;
use fusbuddy::credentials::{self, EnvSource};
use fusbuddy::error::AppError;
use fusbuddy::llm::{ProviderKind, Transport};
use fusbuddy::logger;
use fusbuddy::store::{ConfigStore, ProviderPreference};
use fusbuddy::Coach;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args()?;

    let settings = config::load(args.config_path.as_deref())?;

    let effective_log_level = logger::effective_level(args.verbosity, &settings.log_level)?;
    logger::init(effective_log_level)?;

    info!(
        settings = %settings.source.as_ref().map_or("<defaults>".to_string(), |p| p.display().to_string()),
        effective_log_level = %effective_log_level,
        offline = args.offline,
        "settings loaded"
    );

    let store = ConfigStore::user_default()?;

    match args.command {
        Command::Ask { question, context_path } => {
            let ctx = match context_path {
                Some(path) => {
                    let raw = fs::read_to_string(&path)
                        .map_err(|e| AppError::Context(format!("cannot read {path}: {e}")))?;
                    SessionContext::from_json(&raw)
                        .map_err(|e| AppError::Context(format!("invalid session context in {path}: {e}")))?
                }
                None => SessionContext::default(),
            };

            let transport = if args.offline {
                Transport::Offline
            } else {
                Transport::connect(settings.llm.timeout_seconds)
            };
            let coach = Coach::new(transport, settings.llm, store);
            println!("{}", coach.answer(&question, &ctx).await);
        }
        Command::SetKey { provider, key } => {
            store.set_api_key(provider, &key)?;
            println!(
                "✓ {provider} key saved to {} ({})",
                store.path().display(),
                credentials::mask_key(key.trim())
            );
        }
        Command::SetProvider(preference) => {
            store.set_provider_preference(preference)?;
            println!("✓ provider preference set to {preference}");
        }
        Command::Status => print_status(&store),
    }

    Ok(())
}

fn print_status(store: &ConfigStore) {
    println!("user config: {}", store.path().display());
    if let Err(e) = store.try_load() {
        println!("  warning: {e} (treated as empty)");
    }
    println!("preference:  {}", store.provider_preference());
    let env = EnvSource::Process;
    for kind in ProviderKind::PRIORITY {
        match credentials::lookup(kind, store, &env) {
            Some(c) => println!("{:<12} {} (from {})", format!("{kind}:"), c.masked(), c.source),
            None => println!("{:<12} not configured", format!("{kind}:")),
        }
    }
    match credentials::resolve(store, &env) {
        Ok(c) => println!("active:      {}", c.provider),
        Err(e) => println!("active:      none — {e}; answers use the built-in template"),
    }
}

// ── CLI ───────────────────────────────────────────────────────────────────────

enum Command {
    Ask { question: String, context_path: Option<String> },
    SetKey { provider: ProviderKind, key: String },
    SetProvider(ProviderPreference),
    Status,
}

struct CliArgs {
    verbosity: u8,
    config_path: Option<String>,
    offline: bool,
    command: Command,
}

fn print_help() {
    println!("Usage: fusbuddy [OPTIONS] <QUESTION>...");
    println!("       fusbuddy set-key <gemini|openai> <KEY>");
    println!("       fusbuddy set-provider <auto|gemini|openai>");
    println!("       fusbuddy status");
    println!();
    println!("Options:");
    println!("  -h, --help                 Print help");
    println!("  -c, --context <PATH>       Session context JSON captured by the add-in");
    println!("  -f, --config <PATH>        Runtime settings file (default: config/default.toml)");
    println!("      --offline              Never call a provider; answer from the template");
    println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
}

fn parse_cli_args() -> Result<CliArgs, AppError> {
    let mut verbosity = 0u8;
    let mut config_path = None;
    let mut context_path = None;
    let mut offline = false;
    let mut positional: Vec<String> = Vec::new();

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            positional.extend(iter.by_ref());
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                print_help();
                std::process::exit(0);
            }
            "-f" | "--config" => {
                config_path = Some(iter.next().ok_or_else(|| AppError::Usage("-f/--config requires a path argument".into()))?);
            }
            "-c" | "--context" => {
                context_path = Some(iter.next().ok_or_else(|| AppError::Usage("-c/--context requires a path argument".into()))?);
            }
            "--offline" => offline = true,
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            a if a.starts_with('-') && a.len() > 1 => {
                return Err(AppError::Usage(format!("unknown option '{a}' (see --help)")));
            }
            _ => positional.push(arg),
        }
    }

    let command = parse_command(positional, context_path)?;
    Ok(CliArgs { verbosity, config_path, offline, command })
}

fn parse_command(positional: Vec<String>, context_path: Option<String>) -> Result<Command, AppError> {
    let head = positional.first().cloned();
    match head.as_deref() {
        Some("set-key") => {
            let [_, provider, key] = <[String; 3]>::try_from(positional)
                .map_err(|_| AppError::Usage("set-key takes <gemini|openai> <KEY>".into()))?;
            let provider = match provider.as_str() {
                "gemini" => ProviderKind::Gemini,
                "openai" => ProviderKind::OpenAi,
                other => return Err(AppError::Usage(format!("unknown provider '{other}' (expected gemini or openai)"))),
            };
            Ok(Command::SetKey { provider, key })
        }
        Some("set-provider") => {
            let [_, preference] = <[String; 2]>::try_from(positional)
                .map_err(|_| AppError::Usage("set-provider takes <auto|gemini|openai>".into()))?;
            Ok(Command::SetProvider(preference.parse().map_err(AppError::Usage)?))
        }
        Some("status") if positional.len() == 1 => Ok(Command::Status),
        Some(_) => Ok(Command::Ask { question: positional.join(" "), context_path }),
        None => Err(AppError::Usage("missing question (see --help)".into())),
    }
}
