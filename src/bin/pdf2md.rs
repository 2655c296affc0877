//! CLI binary for mistral-pdf2md.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig`, shows progress, and saves the result.

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use mistral_pdf2md::output::{default_output_path, write_markdown};
use mistral_pdf2md::{
    convert_stream, CancellationFlag, ConversionConfig, ConversionEvent, ConversionRequest,
    ConversionResult, CredentialStore, ExtractionSource,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

/// Exit status for a run stopped with Ctrl-C.
const EXIT_CANCELLED: i32 = 130;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert, writing report.md next to report.pdf
  pdf2md report.pdf

  # Choose the output file
  pdf2md report.pdf -o notes/report.md

  # Print to stdout instead
  pdf2md report.pdf --stdout

  # Structured JSON (markdown + route + timing)
  pdf2md report.pdf --json > report.json

  # Remember the API key for later runs
  pdf2md --api-key sk-... --save-key

HOW IT WORKS:
  1. Upload the file (POST /v1/files), get a signed URL, run OCR on it.
  2. If any of that fails, send the file directly to /v1/ocr (files up to
     5 MB by default, see --max-direct-bytes).
  3. Markdown is taken from the response's `text` field, or from the
     `markdown` of each page joined by blank lines.

  Press Ctrl-C to cancel; the request already in flight completes first.
  Press it again to abort without waiting.

ENVIRONMENT VARIABLES:
  MISTRAL_API_KEY         API key (overrides the stored key)
  MISTRAL_BASE_URL        API base URL (default https://api.mistral.ai)
  MISTRAL_PDF_CONFIG_DIR  Directory of the stored key (default ~/.mistral_pdf)
  RUST_LOG                Log filter, e.g. mistral_pdf2md=debug
"#;

/// Convert PDF files to Markdown with the Mistral OCR API.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2md",
    version,
    about = "Convert PDF files to Markdown with the Mistral OCR API",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: Option<PathBuf>,

    /// Write Markdown to this file. Default: the input path with a .md extension.
    #[arg(short, long, env = "PDF2MD_OUTPUT", conflicts_with_all = ["stdout", "json"])]
    output: Option<PathBuf>,

    /// Print Markdown to stdout instead of writing a file.
    #[arg(long)]
    stdout: bool,

    /// Print structured JSON (markdown, route, source, timing) to stdout.
    #[arg(long, conflicts_with = "stdout")]
    json: bool,

    /// Mistral API key. Falls back to the stored key.
    #[arg(long, env = "MISTRAL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Store --api-key in the per-user config file.
    #[arg(long, requires = "api_key")]
    save_key: bool,

    /// API base URL.
    #[arg(long, env = "MISTRAL_BASE_URL", default_value = mistral_pdf2md::config::DEFAULT_BASE_URL)]
    base_url: String,

    /// OCR model identifier.
    #[arg(long, env = "PDF2MD_MODEL", default_value = mistral_pdf2md::config::DEFAULT_MODEL)]
    model: String,

    /// Per-request timeout in seconds.
    #[arg(long, env = "PDF2MD_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Size ceiling in bytes for the direct-upload fallback.
    #[arg(long, env = "PDF2MD_MAX_DIRECT_BYTES", default_value_t = mistral_pdf2md::config::DEFAULT_MAX_DIRECT_UPLOAD_BYTES)]
    max_direct_bytes: u64,

    /// Disable the progress spinner.
    #[arg(long, env = "PDF2MD_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs and full error details.
    #[arg(short, long, env = "PDF2MD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2MD_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; the
    // spinner already shows every stage.
    let show_progress = !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Credentials ──────────────────────────────────────────────────────
    let store = CredentialStore::new();
    let cli_key = cli.api_key.clone().filter(|k| !k.trim().is_empty());

    if cli.save_key {
        let key = cli_key.as_deref().context("--save-key needs a non-empty --api-key")?;
        store.save(key).context("Failed to save API key")?;
        if !cli.quiet {
            eprintln!("{} API key saved to {}", green("✔"), store.path().display());
        }
    }

    let Some(input) = cli.input.clone() else {
        if cli.save_key {
            return Ok(());
        }
        bail!("No input file given. Run `pdf2md --help` for usage.");
    };

    let api_key = match cli_key {
        Some(key) => Some(key),
        None => store.load().context("Failed to read stored API key")?,
    };

    let config = build_config(&cli, api_key)?;

    // ── Run conversion on a worker task ──────────────────────────────────
    let spinner = show_progress.then(new_spinner);
    let mut handle = convert_stream(ConversionRequest::new(&input), &config);
    let cancel = handle.cancellation();

    let finished = loop {
        tokio::select! {
            event = handle.next() => match event {
                Some(ConversionEvent::Finished(result)) => break Some(result),
                Some(event) => {
                    if let Some(bar) = &spinner {
                        bar.set_message(event.message());
                    }
                }
                None => break None,
            },
            _ = tokio::signal::ctrl_c() => match on_interrupt(&cancel) {
                Interrupt::Cancel => {
                    if let Some(bar) = &spinner {
                        bar.set_message("Cancelling operation... (Ctrl-C again to abort)");
                    }
                }
                Interrupt::Abort => {
                    if let Some(bar) = &spinner {
                        bar.finish_and_clear();
                    }
                    eprintln!("{} Aborted", red("✘"));
                    std::process::exit(EXIT_CANCELLED);
                }
            },
        }
    };
    let result = match finished {
        Some(result) => result,
        None => handle.wait().await,
    };

    if let Some(bar) = &spinner {
        bar.finish_and_clear();
    }

    // ── Report ───────────────────────────────────────────────────────────
    match result {
        ConversionResult::Success(output) => {
            if output.source == ExtractionSource::Diagnostic && !cli.quiet {
                eprintln!(
                    "{} the response had no markdown; saving the raw response for inspection",
                    cyan("⚠")
                );
            }

            if cli.json {
                let json =
                    serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
                println!("{json}");
            } else if cli.stdout {
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                handle
                    .write_all(output.markdown.as_bytes())
                    .context("Failed to write to stdout")?;
                if !output.markdown.ends_with('\n') {
                    handle.write_all(b"\n").ok();
                }
            } else {
                let path = cli
                    .output
                    .clone()
                    .unwrap_or_else(|| default_output_path(&input));
                write_markdown(&path, &output.markdown)
                    .await
                    .context("Failed to save markdown")?;
                if !cli.quiet {
                    eprintln!(
                        "{}  {} chars  {}  →  {}",
                        green("✔"),
                        output.markdown.len(),
                        dim(&format!("{:?} path, {}ms", output.route, output.duration_ms)),
                        bold(&path.display().to_string()),
                    );
                }
            }
            Ok(())
        }
        ConversionResult::Cancelled => {
            if !cli.quiet {
                eprintln!("{} Conversion cancelled", cyan("⚠"));
            }
            std::process::exit(EXIT_CANCELLED);
        }
        ConversionResult::Failed(failure) => {
            eprintln!("{} {}", red("✘"), failure.user_message());
            if cli.verbose {
                eprintln!("  {}", dim(&failure.to_string()));
            } else if !cli.quiet {
                eprintln!("  {}", dim("Re-run with --verbose for details."));
            }
            std::process::exit(1);
        }
    }
}

/// What a Ctrl-C press should do.
#[derive(Debug, PartialEq, Eq)]
enum Interrupt {
    /// First press: stop at the next checkpoint.
    Cancel,
    /// Run already cancelled: stop waiting for the in-flight call.
    Abort,
}

fn on_interrupt(cancel: &CancellationFlag) -> Interrupt {
    if cancel.is_cancelled() {
        Interrupt::Abort
    } else {
        cancel.cancel();
        Interrupt::Cancel
    }
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, api_key: Option<String>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .base_url(cli.base_url.clone())
        .model(cli.model.clone())
        .request_timeout_secs(cli.timeout)
        .max_direct_upload_bytes(cli.max_direct_bytes);

    if let Some(key) = api_key {
        builder = builder.api_key(key);
    }

    builder.build().context("Invalid configuration")
}

fn new_spinner() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
    bar.set_style(style);
    bar.set_message("Initializing...");
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_interrupt_aborts() {
        let flag = CancellationFlag::new();
        assert_eq!(on_interrupt(&flag), Interrupt::Cancel);
        assert!(flag.is_cancelled());
        assert_eq!(on_interrupt(&flag), Interrupt::Abort);
    }

    #[test]
    fn cli_flags_map_to_config() {
        let cli = Cli::parse_from([
            "pdf2md",
            "doc.pdf",
            "--base-url",
            "http://localhost:8080",
            "--max-direct-bytes",
            "1024",
            "--timeout",
            "30",
        ]);
        let config = build_config(&cli, Some("sk-test".into())).unwrap();
        assert_eq!(config.base_url, "http://localhost:8080");
        assert_eq!(config.max_direct_upload_bytes, 1024);
        assert_eq!(config.request_timeout_secs, 30);
        assert_eq!(config.api_key.as_deref(), Some("sk-test"));
    }
}
