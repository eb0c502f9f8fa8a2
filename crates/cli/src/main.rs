use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;
use tabex_core::{
    DEFAULT_MODEL, ExportFormat, ExtractionResult, Extractor, ExtractorConfig, FetchConfig, GroqClient, clean_html,
    fetch_file, fetch_page, fetch_stdin, html_stats, is_known_model, known_models,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod echo;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Extract tables from web pages with a language model
#[derive(Parser, Debug)]
#[command(name = "tabex")]
#[command(version)]
#[command(about = "Extract tables from web pages with a language model", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch a page and print its cleaned markup or text
    Fetch {
        #[command(flatten)]
        source: SourceArgs,

        /// Print visible text instead of cleaned HTML
        #[arg(long)]
        text: bool,

        /// Output file (default: stdout)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },

    /// Print structural statistics of a page
    Stats {
        #[command(flatten)]
        source: SourceArgs,

        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Extract a table from a page
    Extract(ExtractArgs),

    /// List the registered models and their token limits
    Models {
        /// Print the registry as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// URL to fetch, local HTML file, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Use the markup as loaded, without cleaning
    #[arg(long)]
    raw: bool,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// What to extract, e.g. "all product names and prices"
    #[arg(short, long, value_name = "QUERY")]
    query: String,

    /// Model identifier
    #[arg(short, long, default_value = DEFAULT_MODEL, value_name = "MODEL")]
    model: String,

    /// Output format (csv, json, text)
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    format: ExportFormat,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Provider API key
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true, value_name = "KEY")]
    api_key: Option<String>,

    /// OpenAI-compatible endpoint
    #[arg(long, env = "TABEX_BASE_URL", value_name = "URL")]
    base_url: Option<String>,

    /// Sampling temperature
    #[arg(long, default_value = "0.1", value_name = "TEMP")]
    temperature: f32,

    /// Print the reduced content that would be sent, without calling the model
    #[arg(long)]
    dry_run: bool,
}

/// Page markup plus where it came from.
struct Loaded {
    html: String,
    title: Option<String>,
}

async fn load_source(source: &SourceArgs, verbose: bool) -> anyhow::Result<Loaded> {
    let loaded = if source.input == "-" {
        if verbose {
            echo::print_step(1, 3, "Reading from stdin");
        }
        Loaded { html: fetch_stdin().context("Failed to read from stdin")?, title: None }
    } else if is_local(&source.input) {
        if verbose {
            echo::print_step(1, 3, &format!("Reading from file {}", source.input.bright_white()));
        }
        let html = fetch_file(&source.input).with_context(|| format!("Failed to read file: {}", source.input))?;
        Loaded { html, title: None }
    } else {
        if verbose {
            echo::print_step(1, 3, &format!("Fetching from {}", source.input.bright_white().underline()));
        }

        let mut config = FetchConfig { timeout: source.timeout, ..Default::default() };
        if let Some(user_agent) = &source.user_agent {
            config.user_agent = user_agent.clone();
        }

        let page = fetch_page(&source.input, &config).await.context("Failed to fetch URL")?;
        if verbose {
            echo::print_field("Final URL", &page.final_url);
        }
        Loaded { html: page.html, title: Some(page.title).filter(|t| !t.is_empty()) }
    };

    if verbose {
        echo::print_field("Size", &echo::format_size(loaded.html.len()));
        if let Some(title) = &loaded.title {
            echo::print_field("Title", title);
        }
        eprintln!();
    }

    if source.raw {
        return Ok(loaded);
    }

    if verbose {
        echo::print_step(2, 3, "Cleaning markup");
    }
    Ok(Loaded { html: clean_html(&loaded.html, true), ..loaded })
}

/// Anything that is not an http(s) URL and either exists on disk or looks
/// like an HTML file name is read locally.
fn is_local(input: &str) -> bool {
    if input.starts_with("http://") || input.starts_with("https://") {
        return false;
    }
    let path = Path::new(input);
    path.exists() || matches!(path.extension().and_then(|e| e.to_str()), Some("html" | "htm"))
}

fn write_output(output: Option<&Path>, content: &str) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            fs::write(path, content).with_context(|| format!("Failed to write to file: {}", path.display()))?;
            echo::print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => println!("{}", content),
    }
    Ok(())
}

async fn run_extract(args: ExtractArgs, verbose: bool) -> anyhow::Result<()> {
    if args.query.trim().is_empty() {
        bail!("Query must not be empty");
    }
    if !is_known_model(&args.model) {
        echo::print_warning(&format!("Unknown model {}, using the default token budget", args.model));
    }

    let loaded = load_source(&args.source, verbose).await?;

    let mut client = GroqClient::new(args.api_key.clone().unwrap_or_default());
    if let Some(base_url) = &args.base_url {
        client = client.with_base_url(base_url);
    }
    let config = ExtractorConfig::builder().temperature(args.temperature).build();
    let extractor = Extractor::with_config(Arc::new(client), config);

    if args.dry_run {
        let prepared = extractor.prepare(&loaded.html, &args.query, &args.model)?;
        echo::print_field("Model", &args.model);
        echo::print_field("Budget", &format!("{} chars", prepared.char_budget));
        echo::print_field("Content", &prepared.reduced.strategy.to_string());
        echo::print_field("Reduced", &format!("{} chars", prepared.reduced.char_len()));
        let user_turn = prepared.request.messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        return write_output(args.output.as_deref(), user_turn);
    }

    if args.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
        bail!("No API key: set GROQ_API_KEY or pass --api-key");
    }

    if verbose {
        echo::print_step(3, 3, &format!("Extracting with {}", args.model.bright_white()));
    }

    let start = Instant::now();
    let extraction = match extractor.extract(&loaded.html, &args.query, &args.model).await {
        ExtractionResult::Success(extraction) => extraction,
        ExtractionResult::Failure { reason } => {
            echo::print_error(&reason);
            bail!("Extraction failed");
        }
    };

    if verbose {
        echo::print_field("Duration", &format!("{:.2}s", start.elapsed().as_secs_f64()));
    }
    echo::print_extraction_details(&extraction);

    let output = extraction.table.export(args.format).context("Failed to export table")?;
    write_output(args.output.as_deref(), output.trim_end())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "warn,tabex_core=debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.verbose {
        echo::print_banner();
        echo::print_info("Debug logging enabled");
        eprintln!();
    }
    tracing::debug!(command = ?cli.command, "Parsed arguments");

    match cli.command {
        Command::Fetch { source, text, output } => {
            let loaded = load_source(&source, cli.verbose).await?;
            let content = if text { clean_html(&loaded.html, false) } else { loaded.html };
            write_output(output.as_deref(), &content)
        }
        Command::Stats { source, json } => {
            let loaded = load_source(&source, cli.verbose).await?;
            let stats = html_stats(&loaded.html);
            if json {
                println!("{}", serde_json::to_string_pretty(&stats).context("Failed to serialize statistics")?);
            } else {
                echo::print_stats(&stats);
            }
            Ok(())
        }
        Command::Extract(args) => run_extract(args, cli.verbose).await,
        Command::Models { json } => {
            if json {
                let models: Vec<_> = known_models()
                    .map(|(name, profile)| {
                        serde_json::json!({
                            "model": name,
                            "max_input_tokens": profile.max_input_tokens,
                            "tokens_per_minute": profile.tokens_per_minute,
                            "default": name == DEFAULT_MODEL,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&models).context("Failed to serialize models")?);
            } else {
                echo::print_models(known_models(), DEFAULT_MODEL);
            }
            Ok(())
        }
    }
}
