//! `triplecheck`: verify RDF statements against a web page with an LLM judge.
//!
//! Prints one report line per statement to stdout, in the order the
//! statements were given. Logs go to stderr.

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use triplecheck_core::Statement;
use triplecheck_runtime::{
    DocumentSource, FailurePolicy, FallbackSource, HttpDocumentSource, ProviderKind,
    ProviderRegistry, RunConfig, RuntimeError, VerifierBuilder,
};

#[derive(Parser, Debug)]
#[command(name = "triplecheck", version, about)]
struct Cli {
    /// Statement as `subject,predicate,object`. Repeat for several.
    #[arg(short = 's', long = "statements", required = true, action = ArgAction::Append)]
    statements: Vec<String>,

    /// Sampling temperature (0 or unset means 0.1)
    #[arg(short, long)]
    temperature: Option<f32>,

    /// Page to read passages from
    #[arg(short, long)]
    url: String,

    /// Model identifier passed to the backend
    #[arg(short, long)]
    model: String,

    /// Backend: replicate, tgi or webui
    #[arg(short, long)]
    provider: ProviderKind,

    /// Backend endpoint, required for tgi and webui
    #[arg(short = 'o', long = "openai-api-url", alias = "openai_api_url")]
    openai_api_url: Option<String>,

    /// Per-request timeout, e.g. `90s` or `2m`
    #[arg(long, value_parser = humantime::parse_duration)]
    timeout: Option<Duration>,

    /// Bound on both backend calls for one passage, e.g. `5m`
    #[arg(long, value_parser = humantime::parse_duration)]
    passage_timeout: Option<Duration>,

    /// What to do when a backend call fails: abort or record-unknown
    #[arg(long)]
    on_backend_error: Option<FailurePolicy>,

    /// YAML file with run settings (sampling, timeouts, failure policy)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Do not retry through the web archive when the page has no paragraphs
    #[arg(long)]
    no_archive_fallback: bool,

    /// More logging (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    /// File settings first, then command-line overrides.
    fn run_config(&self) -> Result<RunConfig> {
        let mut config = match &self.config {
            Some(path) => RunConfig::from_yaml_file(path)
                .with_context(|| format!("loading run config {}", path.display()))?,
            None => RunConfig::default(),
        };

        if let Some(t) = self.temperature {
            config.sampling.temperature = Some(t);
        }
        if let Some(timeout) = self.timeout {
            config.timeout = Some(timeout);
        }
        if let Some(timeout) = self.passage_timeout {
            config.passage_timeout = Some(timeout);
        }
        if let Some(policy) = self.on_backend_error {
            config.on_backend_error = policy;
        }
        if self.no_archive_fallback {
            config.archive_fallback = false;
        }
        Ok(config)
    }

    fn statements(&self) -> Result<Vec<Statement>> {
        self.statements
            .iter()
            .map(|s| Statement::parse(s).with_context(|| format!("invalid statement '{}'", s)))
            .collect()
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    dotenv::dotenv().ok();

    let statements = cli.statements()?;
    let run_config = cli.run_config()?;
    let provider_config =
        run_config.provider_config(cli.provider, cli.model.clone(), cli.openai_api_url.clone());
    provider_config.validate()?;

    let provider = ProviderRegistry::with_defaults()
        .create(&provider_config)
        .context("configuring provider")?;

    let source = FallbackSource::new(HttpDocumentSource::new()?)
        .with_archive(run_config.archive_fallback);
    let passages = source
        .fetch(&cli.url)
        .await
        .with_context(|| format!("reading passages from {}", cli.url))?;

    let verifier = VerifierBuilder::new()
        .provider(provider)
        .model(&provider_config.model)
        .run_config(&run_config)
        .build()?;

    tracing::info!(
        statements = statements.len(),
        passages = passages.len(),
        provider = %provider_config.provider,
        model = %provider_config.model,
        "Starting verification"
    );

    let stdout = std::io::stdout();
    verifier
        .verify_all(&statements, &passages, |report| {
            let line = report.serialize()?;
            let mut out = stdout.lock();
            writeln!(out, "{}", line).map_err(RuntimeError::from)?;
            out.flush().map_err(RuntimeError::from)
        })
        .await?;

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}
