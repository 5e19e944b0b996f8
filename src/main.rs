// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Storefront Form Guard CLI
//!
//! Operator tool for the form guard's file-backed store: inspect and reset
//! rate limits, replay a form submission through every check, and scan text
//! for XSS patterns.
//!
//! ## Configuration
//!
//! Loaded from `--config FILE` (JSON) or from environment variables (a
//! `.env` file is read first):
//!
//! - `STOREFRONT_GUARD_STORE_PATH`: store file (default: .storefront-guard/store.json)
//! - `STOREFRONT_GUARD_KEY_PREFIX`: limiter key namespace (default: rate_limit_)
//! - `NEWSLETTER_MAX_ATTEMPTS` / `NEWSLETTER_WINDOW_MS` (default: 3 / 60000)
//! - `CHECKOUT_MAX_ATTEMPTS` / `CHECKOUT_WINDOW_MS` (default: 3 / 300000)
//! - `LOGIN_MAX_ATTEMPTS` / `LOGIN_WINDOW_MS` (default: 5 / 900000)

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storefront_guard::{
    sanitize_input, sanitize_string, Config, FileStore, FormGuard, FormKind, SystemClock,
};

#[derive(Parser)]
#[command(name = "storefront-guard", about = "Rate limits and input checks for storefront forms")]
struct Args {
    /// JSON config file (overrides environment variables)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show a form's rate limit state without consuming an attempt
    Check {
        /// newsletter, checkout or login
        form: FormKind,
    },
    /// Run a JSON form submission through every check
    Submit {
        form: FormKind,
        /// Read the submission from this file instead of stdin
        #[arg(long)]
        input: Option<PathBuf>,
        /// Value to place in the honeypot field
        #[arg(long)]
        honeypot: Option<String>,
    },
    /// Clear a form's rate limit record
    Reset { form: FormKind },
    /// Report XSS detection and both sanitizer outputs for some text
    Scan { text: String },
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let args = Args::parse();
    let config = load_config(args.config.as_ref())?;

    match args.command {
        Command::Check { form } => {
            let guard = build_guard(form, &config);
            print_json(&guard.status())?;
        }
        Command::Submit {
            form,
            input,
            honeypot,
        } => {
            let guard = build_guard(form, &config);
            let mut submission = read_submission(input.as_ref())?;
            if let (Some(value), Some(obj)) = (honeypot, submission.as_object_mut()) {
                obj.insert(guard.honeypot_field().to_string(), Value::String(value));
            }
            let outcome = guard.submit(&submission);
            print_json(&outcome)?;
        }
        Command::Reset { form } => {
            build_guard(form, &config).reset();
            info!(form = %form, "Rate limit reset");
        }
        Command::Scan { text } => {
            print_json(&json!({
                "xss": storefront_guard::detect_xss(&text),
                "sanitizeInput": sanitize_input(&text),
                "sanitizeString": sanitize_string(&text),
            }))?;
        }
    }

    Ok(())
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::from_env().context("loading config from environment")?,
    };
    info!(
        store_path = %config.store_path.display(),
        newsletter = ?config.limits.newsletter,
        checkout = ?config.limits.checkout,
        login = ?config.limits.login,
        "Configuration loaded"
    );
    Ok(config)
}

fn build_guard(form: FormKind, config: &Config) -> FormGuard {
    let store = Arc::new(FileStore::new(&config.store_path));
    FormGuard::for_form(form, config, store, Arc::new(SystemClock::new()))
}

fn read_submission(path: Option<&PathBuf>) -> anyhow::Result<Value> {
    let raw = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading submission from {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading submission from stdin")?;
            buf
        }
    };
    serde_json::from_str(&raw).context("submission is not valid JSON")
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
