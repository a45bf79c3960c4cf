//! CLI binary for kbprep.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PrepareConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use kbprep::{
    parse_generated_at, prepare, Catalog, CoverStatus, PrepareConfig, PrepareProgressCallback,
    ProgressCallback,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar over the discovered files plus a log
/// line per document.
struct CliProgressCallback {
    bar: ProgressBar,
    skipped: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_run_start` tells us how many files there are.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Scanning");
        bar.set_message("walking input tree…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            skipped: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} files  \
             ⏱ {elapsed_precise}  {wide_msg:.dim}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Preparing");
        self.bar.reset_eta();
    }
}

impl PrepareProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total: usize) {
        self.activate_bar(total);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Preparing {total} files…"))
        ));
    }

    fn on_document_start(&self, _index: usize, _total: usize, rel: &str) {
        self.bar.set_message(rel.to_string());
    }

    fn on_document_complete(&self, _index: usize, _total: usize, rel: &str, artifacts: usize) {
        let detail = if artifacts == 1 {
            String::new()
        } else {
            dim(&format!("  {artifacts} chunks"))
        };
        self.bar.println(format!("  {} {rel}{detail}", green("✓")));
        self.bar.inc(1);
    }

    fn on_document_skipped(&self, _index: usize, _total: usize, rel: &str, reason: &str) {
        self.skipped.fetch_add(1, Ordering::SeqCst);
        self.bar
            .println(format!("  {} {rel}  {}", yellow("–"), dim(reason)));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, documents: usize, artifacts: usize) {
        self.bar.finish_and_clear();
        let skipped = self.skipped.load(Ordering::SeqCst);
        eprintln!(
            "{} {} documents → {} artifacts{}",
            if skipped == 0 { green("✔") } else { cyan("⚠") },
            bold(&documents.to_string()),
            bold(&artifacts.to_string()),
            if skipped == 0 {
                String::new()
            } else {
                format!("  ({skipped} skipped)")
            },
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Prepare the default tree (knowledgebase → knowledgebase_clean)
  kbprep prepare

  # Explicit folders, smaller PDF chunks
  kbprep prepare --input corpus --output corpus_md --chunk-pages 20

  # Reproducible run: same bytes, same ids on every machine
  kbprep prepare --generated-at 2024-05-01T12:00:00Z

  # See what would be produced without writing anything
  kbprep prepare --dry-run -v

  # Check which book covers are missing
  kbprep covers --data data/bibliotheque.json

ENVIRONMENT VARIABLES:
  KBPREP_INPUT, KBPREP_OUTPUT, KBPREP_NO_REDACT, KBPREP_CHUNK_PAGES,
  KBPREP_DRY_RUN, KBPREP_GENERATED_AT, KBPREP_PDFIUM_LIB, KBPREP_NOISE_RULES,
  KBPREP_NO_PROGRESS, KBPREP_VERBOSE, KBPREP_QUIET, KBPREP_CATALOG
  PDFIUM_LIB_PATH         Path to libpdfium, used when --pdfium-lib is unset
  RUST_LOG                Overrides the log filter

PDF SUPPORT:
  PDF text is read through pdfium, loaded at runtime. Without a pdfium
  library, PDF sources are reported as `pdf-engine-unavailable` and skipped.
"#;

/// Normalise a document corpus into a redacted Markdown knowledge base.
#[derive(Parser, Debug)]
#[command(
    name = "kbprep",
    version,
    about = "Normalise transcripts, Word documents and PDFs into a Markdown knowledge base",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "KBPREP_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "KBPREP_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert the input tree and write artifacts plus manifest.
    Prepare(PrepareArgs),

    /// Report which catalog covers are present, missing or invalid.
    Covers(CoversArgs),
}

#[derive(Args, Debug)]
struct PrepareArgs {
    /// Input folder.
    #[arg(long, env = "KBPREP_INPUT", default_value = "knowledgebase")]
    input: PathBuf,

    /// Output folder.
    #[arg(long, env = "KBPREP_OUTPUT", default_value = "knowledgebase_clean")]
    output: PathBuf,

    /// Keep e-mail addresses and phone numbers.
    #[arg(long, env = "KBPREP_NO_REDACT")]
    no_redact: bool,

    /// PDF chunk size in pages.
    #[arg(long, env = "KBPREP_CHUNK_PAGES", default_value_t = 40,
          value_parser = clap::value_parser!(u32).range(1..))]
    chunk_pages: u32,

    /// Do not write any file.
    #[arg(long, env = "KBPREP_DRY_RUN")]
    dry_run: bool,

    /// Pin the generation timestamp (RFC 3339) for reproducible output.
    #[arg(long, env = "KBPREP_GENERATED_AT")]
    generated_at: Option<String>,

    /// pdfium shared library, or the directory containing it.
    #[arg(long, env = "KBPREP_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// JSON file overriding the noise-line patterns.
    #[arg(long, env = "KBPREP_NOISE_RULES")]
    noise_rules: Option<PathBuf>,

    /// Disable the progress bar.
    #[arg(long, env = "KBPREP_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct CoversArgs {
    /// Book catalog JSON (`{"livres": [...]}`).
    #[arg(long, env = "KBPREP_CATALOG", default_value = "data/bibliotheque.json")]
    data: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar provides the feedback while it is shown; library
    // logs drop to errors unless -v asks for everything.
    let show_progress = match &cli.command {
        Command::Prepare(args) => !cli.quiet && !args.no_progress,
        Command::Covers(_) => false,
    };
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

    match &cli.command {
        Command::Prepare(args) => run_prepare(&cli, args, show_progress),
        Command::Covers(args) => run_covers(&cli, args),
    }
}

fn run_prepare(cli: &Cli, args: &PrepareArgs, show_progress: bool) -> Result<()> {
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn PrepareProgressCallback>)
    } else {
        None
    };

    let config = build_config(args, progress_cb)?;
    let output = prepare(&config).context("Preparation failed")?;

    if !cli.quiet {
        if output.dry_run {
            for line in &output.report_lines {
                eprintln!("{}", dim(line));
            }
            eprintln!("{}", dim("dry run: nothing written"));
        } else if !output.report_lines.is_empty() {
            eprintln!(
                "{} {} report lines in {}",
                yellow("⚠"),
                output.report_lines.len(),
                output.output_root.join("report.txt").display()
            );
        }
    }
    println!("{}", output.summary());
    Ok(())
}

/// Map CLI args to `PrepareConfig`.
fn build_config(args: &PrepareArgs, progress: Option<ProgressCallback>) -> Result<PrepareConfig> {
    let mut builder = PrepareConfig::builder()
        .input_root(&args.input)
        .output_root(&args.output)
        .redact(!args.no_redact)
        .chunk_pages(args.chunk_pages as usize)
        .dry_run(args.dry_run);

    if let Some(ref ts) = args.generated_at {
        builder = builder.generated_at(parse_generated_at(ts)?);
    }

    let pdfium = args
        .pdfium_lib
        .clone()
        .or_else(|| std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from));
    if let Some(path) = pdfium {
        builder = builder.pdfium_library(path);
    }

    if let Some(ref path) = args.noise_rules {
        builder = builder
            .noise_rules_file(path)
            .with_context(|| format!("Failed to load noise rules from {path:?}"))?;
    }

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn run_covers(cli: &Cli, args: &CoversArgs) -> Result<()> {
    let catalog = Catalog::load(&args.data).context("Failed to load catalog")?;
    let statuses = catalog.cover_statuses();

    if !cli.quiet {
        for (book, status) in &statuses {
            let title = book.display_title();
            match status {
                CoverStatus::Present { dest } => {
                    println!("{} {title} -> {}", green("[ok]"), dest.display());
                }
                CoverStatus::Missing {
                    dest, fallback_url, ..
                } => {
                    println!("{} {title} -> {}", yellow("[missing]"), dest.display());
                    if let Some(url) = fallback_url {
                        println!("    {}", dim(url));
                    }
                }
                CoverStatus::Invalid { image } => {
                    println!("{} {title}: invalid image field ({image:?})", red("[invalid]"));
                }
            }
        }
    }

    let summary = Catalog::summarize(&statuses);
    println!(
        "Covers: present={} missing={} invalid={}",
        summary.present, summary.missing, summary.invalid
    );
    Ok(())
}
