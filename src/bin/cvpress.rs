//! CLI binary for cvpress.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig`, runs one conversion and prints the result.

use anyhow::{Context, Result};
use clap::Parser;
use cvpress::config::{DEFAULT_FILTERS, DEFAULT_INPUT, DEFAULT_OUTPUT, DEFAULT_TEMPLATE};
use cvpress::{
    convert_to_file, converter_version, read_markdown, ConversionConfig, FilterRef, PdfEngine,
    TemplateRef,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
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

const AFTER_HELP: &str = r#"EXAMPLES:
  # Bundled demo CV with the default template and filters
  cvpress

  # Your own CV
  cvpress cv.md -o out/jane-doe.pdf

  # Harvard template, only the columns filter
  cvpress cv.md -t templates/harvard.tex -f filters/columns.lua

  # No Lua filters at all
  cvpress cv.md -f

  # See what the normaliser does to your Markdown
  cvpress cv.md --print-normalized

  # Check which Pandoc will be used
  cvpress --check

ENVIRONMENT VARIABLES:
  CVPRESS_PANDOC      Pandoc executable (default: pandoc on PATH)
  CVPRESS_PDF_ENGINE  LaTeX engine: xelatex, lualatex, pdflatex, tectonic
  CVPRESS_TIMEOUT     Kill Pandoc after this many seconds
  RUST_LOG            Override log filter (e.g. cvpress=debug)
"#;

/// Generate a PDF CV from Markdown using Pandoc and Lua filters.
#[derive(Parser, Debug)]
#[command(
    name = "cvpress",
    version,
    about = "Generate a PDF CV from Markdown using Pandoc and Lua filters",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Input Markdown CV file.
    #[arg(default_value = DEFAULT_INPUT)]
    input: PathBuf,

    /// Output PDF file.
    #[arg(short, long, env = "CVPRESS_OUTPUT", default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// LaTeX template to use.
    #[arg(short, long, env = "CVPRESS_TEMPLATE", default_value = DEFAULT_TEMPLATE)]
    template: PathBuf,

    /// Pandoc Lua filters, applied in the given order.
    #[arg(short, long, num_args = 0.., default_values = DEFAULT_FILTERS)]
    filters: Vec<PathBuf>,

    /// Disable automatic Markdown preprocessing.
    #[arg(long = "no-preprocess", action = clap::ArgAction::SetFalse)]
    preprocess: bool,

    /// Open the PDF in the default viewer after generation.
    #[arg(long)]
    preview: bool,

    /// Pandoc executable.
    #[arg(long, env = "CVPRESS_PANDOC", default_value = "pandoc")]
    pandoc: PathBuf,

    /// LaTeX engine used by Pandoc.
    #[arg(long, env = "CVPRESS_PDF_ENGINE", value_enum, default_value = "xelatex")]
    pdf_engine: EngineArg,

    /// Kill Pandoc after this many seconds (default: no limit).
    #[arg(long, env = "CVPRESS_TIMEOUT",
          value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Print the normalised Markdown to stdout and exit.
    #[arg(long)]
    print_normalized: bool,

    /// Print the detected Pandoc version and exit.
    #[arg(long)]
    check: bool,

    /// Print a JSON conversion report instead of the summary line.
    #[arg(long)]
    json: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "CVPRESS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "CVPRESS_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum EngineArg {
    Xelatex,
    Lualatex,
    Pdflatex,
    Tectonic,
}

impl From<EngineArg> for PdfEngine {
    fn from(v: EngineArg) -> Self {
        match v {
            EngineArg::Xelatex => PdfEngine::XeLaTeX,
            EngineArg::Lualatex => PdfEngine::LuaLaTeX,
            EngineArg::Pdflatex => PdfEngine::PdfLaTeX,
            EngineArg::Tectonic => PdfEngine::Tectonic,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already tells the user what is happening; library INFO
    // logs only show up with --verbose.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", red("✘ Error:"), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<()> {
    let config = build_config(cli)?;

    // ── Preflight-only mode ──────────────────────────────────────────────
    if cli.check {
        let info = converter_version(&config)
            .await
            .context("Pandoc check failed")?;
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialise converter info")?
            );
        } else {
            println!("Pandoc:      {}", info.program);
            println!("Version:     {}", info.version);
            println!("PDF engine:  {}", config.pdf_engine);
        }
        return Ok(());
    }

    // ── Normalise-only mode ──────────────────────────────────────────────
    if cli.print_normalized {
        let markdown = read_markdown(&cli.input, cli.preprocess).await?;
        io::stdout()
            .lock()
            .write_all(markdown.as_bytes())
            .context("Failed to write to stdout")?;
        return Ok(());
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let filters: Vec<FilterRef> = cli.filters.iter().map(|f| FilterRef::from(f.as_path())).collect();
    let progress = (!cli.quiet && !cli.json).then(|| spinner(&cli.input));

    let result = convert_to_file(
        &cli.input,
        &cli.output,
        TemplateRef::path(&cli.template),
        &filters,
        cli.preprocess,
        &config,
    )
    .await;

    if let Some(ref bar) = progress {
        bar.finish_and_clear();
    }
    let report = result.context("PDF generation failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{} PDF generated at {}  {}",
            green("✔"),
            bold(&report.output.display().to_string()),
            dim(&format!("{} bytes, {}ms", report.pdf_bytes, report.duration_ms)),
        );
    }

    if cli.preview {
        if let Err(e) = open_in_viewer(&report.output) {
            eprintln!("{} Failed to open PDF preview: {e:#}", yellow("⚠"));
        }
    }

    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli) -> Result<ConversionConfig> {
    ConversionConfig::builder()
        .pandoc_path(&cli.pandoc)
        .pdf_engine(cli.pdf_engine.into())
        .timeout(cli.timeout)
        .build()
        .context("Invalid configuration")
}

fn spinner(input: &Path) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix("Typesetting");
    bar.set_message(input.display().to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// Hand the PDF to the platform's default viewer without waiting for it.
fn open_in_viewer(path: &Path) -> Result<()> {
    let path = path
        .canonicalize()
        .with_context(|| format!("Cannot resolve {}", path.display()))?;

    let mut cmd = if cfg!(target_os = "macos") {
        std::process::Command::new("open")
    } else if cfg!(target_os = "windows") {
        let mut c = std::process::Command::new("cmd");
        c.args(["/C", "start", ""]);
        c
    } else {
        std::process::Command::new("xdg-open")
    };

    cmd.arg(&path)
        .spawn()
        .with_context(|| format!("Failed to launch a viewer for {}", path.display()))?;
    Ok(())
}
