//! bizhub command line
//!
//! Usage:
//!   bizhub translate <text> --to <locale> [--from <locale>]
//!   bizhub clear-cache
//!   bizhub locales
//!
//! Required environment variables (translate, clear-cache):
//! - BACKEND_URL
//! - BACKEND_ANON_KEY
//!
//! Optional:
//! - BACKEND_ACCESS_TOKEN
//! - TRANSLATE_FUNCTION (defaults to translate)
//! - DEFAULT_SOURCE_LOCALE (defaults to en)
//! - CACHE_DIR (defaults to .bizhub)

use anyhow::{bail, Context, Result};
use bizhub::config::Config;
use bizhub::i18n::LocaleRegistry;
use bizhub::translation::TranslationCache;
use tracing::info;

fn print_usage() {
    println!(
        r#"
bizhub - translation cache and backend tooling

USAGE:
    bizhub <COMMAND>

COMMANDS:
    translate <text> --to <locale> [--from <locale>]
                      Translate text through the cache, calling the backend on a miss
    clear-cache       Delete all cached translations
    locales           List the interface locales
    help              Show this message

EXAMPLES:
    bizhub translate "Your order has shipped" --to fr
    bizhub translate "Bonjour" --from fr --to pt_br
"#
    );
}

/// Value following `flag`, if present
fn flag_value<'a>(args: &'a [String], flag: &str) -> Result<Option<&'a str>> {
    match args.iter().position(|arg| arg == flag) {
        Some(i) => args
            .get(i + 1)
            .map(|value| Some(value.as_str()))
            .with_context(|| format!("{} requires a locale", flag)),
        None => Ok(None),
    }
}

async fn translate_command(args: &[String]) -> Result<()> {
    let Some(text) = args.first().filter(|arg| !arg.starts_with("--")) else {
        bail!("translate requires the text to translate");
    };
    let target = flag_value(args, "--to")?.context("translate requires --to <locale>")?;
    let source = flag_value(args, "--from")?;

    let config = Config::from_env()?;
    let cache = TranslationCache::from_config(&config);
    info!(
        "Loaded {} cached translations from {}",
        cache.len(),
        config.cache_dir.display()
    );

    let translated = cache.translate(text, target, source).await;
    println!("{}", translated);

    let report = cache.metrics().report();
    info!("Metrics: {}", serde_json::to_string(&report)?);
    Ok(())
}

fn clear_cache_command() -> Result<()> {
    let config = Config::from_env()?;
    TranslationCache::from_config(&config).clear_cache();
    println!("Cleared translation cache in {}", config.cache_dir.display());
    Ok(())
}

fn locales_command() {
    for locale in LocaleRegistry::get().list_all() {
        let mut flags = Vec::new();
        if locale.is_canonical {
            flags.push("canonical");
        }
        if locale.rtl {
            flags.push("rtl");
        }
        if !locale.enabled {
            flags.push("disabled");
        }
        println!(
            "{:<4} {:<12} {:<12} {}",
            locale.code,
            locale.name,
            locale.native_name,
            flags.join(",")
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when variables come from the environment)
    let _ = dotenvy::dotenv();

    // Logs go to stderr so translated output can be piped
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("bizhub=info".parse()?),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(command) = args.get(1) else {
        print_usage();
        return Ok(());
    };

    match command.as_str() {
        "translate" => translate_command(&args[2..]).await,
        "clear-cache" => clear_cache_command(),
        "locales" => {
            locales_command();
            Ok(())
        }
        "--help" | "-h" | "help" => {
            print_usage();
            Ok(())
        }
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            std::process::exit(1);
        }
    }
}
