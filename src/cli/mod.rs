use crate::{
    config::{resolve_targets, CrawlerConfig, OutputFormat},
    core::agent::DEFAULT_MODEL,
    error::{CrawlerError, ErrorKind},
    pipeline::{sink::write_all, FailurePolicy, JsonLinesSink, PrettySink, ResultSink, TaskTemplate},
    services::openai_client::DEFAULT_BASE_URL,
    types::Investor,
};
use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::{
    fs::File,
    io::{self, BufWriter, Write},
    path::PathBuf,
    process::ExitCode,
    time::Duration,
};
use tracing::{info, warn};

/// Every target produced a payload.
pub const EXIT_OK: u8 = 0;
/// Configuration error, nothing was extracted.
pub const EXIT_CONFIG: u8 = 1;
/// At least one target failed or was skipped.
pub const EXIT_INCOMPLETE: u8 = 2;
/// Results could not be written.
pub const EXIT_OUTPUT: u8 = 3;

/// Exit status for a run that ended in `err`.
pub fn exit_code_for(err: &anyhow::Error) -> u8 {
    let output_failed = err
        .chain()
        .filter_map(|cause| cause.downcast_ref::<CrawlerError>())
        .any(|cause| cause.kind() == ErrorKind::Output);
    if output_failed {
        EXIT_OUTPUT
    } else {
        EXIT_CONFIG
    }
}

pub fn command() -> Command {
    Command::new("investor-crawler")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Extract investor profiles and portfolio companies from investor websites with an LLM agent")
        .arg(
            Arg::new("urls")
                .help("Investor website or portfolio page URLs")
                .value_name("URL")
                .num_args(0..)
                .index(1),
        )
        .arg(
            Arg::new("targets-file")
                .long("targets-file")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("File with one target URL per line (# starts a comment)"),
        )
        .arg(
            Arg::new("model")
                .short('m')
                .long("model")
                .value_name("MODEL")
                .help("Model to use (or set MODEL env var)"),
        )
        .arg(
            Arg::new("api-key")
                .short('k')
                .long("api-key")
                .value_name("KEY")
                .help("API key (or set OPENAI_API_KEY env var)"),
        )
        .arg(
            Arg::new("base-url")
                .short('u')
                .long("base-url")
                .value_name("URL")
                .help("API base URL (or set OPENAI_BASE_URL / OPENROUTER_BASE_URL env vars)"),
        )
        .arg(
            Arg::new("timeout")
                .short('t')
                .long("timeout")
                .value_name("SECONDS")
                .value_parser(value_parser!(u64))
                .help("Deadline for one target's extraction")
                .default_value("300"),
        )
        .arg(
            Arg::new("request-timeout")
                .long("request-timeout")
                .value_name("SECONDS")
                .value_parser(value_parser!(u64))
                .help("Deadline for one completion request")
                .default_value("120"),
        )
        .arg(
            Arg::new("max-iterations")
                .short('i')
                .long("max-iterations")
                .value_name("COUNT")
                .value_parser(value_parser!(usize))
                .help("Maximum agent iterations per target")
                .default_value("12"),
        )
        .arg(
            Arg::new("max-tokens")
                .long("max-tokens")
                .value_name("COUNT")
                .value_parser(value_parser!(u32))
                .help("Completion token limit per model turn")
                .default_value("4096"),
        )
        .arg(
            Arg::new("concurrency")
                .short('c')
                .long("concurrency")
                .value_name("N")
                .value_parser(value_parser!(usize))
                .help("Targets extracted at the same time; output order is kept")
                .default_value("1"),
        )
        .arg(
            Arg::new("task-template")
                .long("task-template")
                .value_name("TEXT")
                .help("Task prompt for each target; must contain {url}"),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("FORMAT")
                .value_parser(["pretty", "json"])
                .help("Output format")
                .default_value("pretty"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("Write results to a file instead of stdout"),
        )
        .arg(
            Arg::new("fail-fast")
                .long("fail-fast")
                .action(ArgAction::SetTrue)
                .help("Stop after the first failed target; remaining targets are reported as skipped"),
        )
}

/// Build the run configuration from parsed arguments, falling back to
/// `env` for anything not given on the command line.
pub fn config_from_matches(
    matches: &ArgMatches,
    env: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<CrawlerConfig> {
    let positional: Vec<String> = matches
        .get_many::<String>("urls")
        .map(|urls| urls.cloned().collect())
        .unwrap_or_default();
    let targets = resolve_targets(
        positional,
        matches.get_one::<PathBuf>("targets-file").map(PathBuf::as_path),
        env("INVESTOR_URLS").as_deref(),
    )?;

    let api_key = matches
        .get_one::<String>("api-key")
        .cloned()
        .or_else(|| env("OPENAI_API_KEY"))
        .context("an API key is required: set OPENAI_API_KEY or pass --api-key")?;

    let mut config = CrawlerConfig::new(api_key, targets);

    config.model = matches
        .get_one::<String>("model")
        .cloned()
        .or_else(|| env("MODEL"))
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());
    config.base_url = matches
        .get_one::<String>("base-url")
        .cloned()
        .or_else(|| env("OPENAI_BASE_URL"))
        .or_else(|| env("OPENROUTER_BASE_URL"))
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    if let Some(&seconds) = matches.get_one::<u64>("timeout") {
        config.call_timeout = Duration::from_secs(seconds);
    }
    if let Some(&seconds) = matches.get_one::<u64>("request-timeout") {
        config.request_timeout = Duration::from_secs(seconds);
    }
    if let Some(&max_iterations) = matches.get_one::<usize>("max-iterations") {
        config.max_iterations = max_iterations;
    }
    config.max_tokens = matches.get_one::<u32>("max-tokens").copied();
    if let Some(&concurrency) = matches.get_one::<usize>("concurrency") {
        config.concurrency = concurrency;
    }
    if let Some(template) = matches.get_one::<String>("task-template") {
        config.task_template = TaskTemplate::new(template.as_str())?;
    }
    if let Some(format) = matches.get_one::<String>("format") {
        config.format = format.parse::<OutputFormat>()?;
    }
    config.output = matches.get_one::<PathBuf>("output").cloned();
    if matches.get_flag("fail-fast") {
        config.failure_policy = FailurePolicy::FailFast;
    }
    config.jina_api_key = env("JINA_API_KEY").filter(|key| !key.trim().is_empty());
    config.tavily_api_key = env("TAVILY_API_KEY").filter(|key| !key.trim().is_empty());

    config.validate()?;
    Ok(config)
}

fn init_tracing() {
    // Logs go to stderr; stdout carries only result records.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(io::stderr)
        .try_init();
}

fn open_output(path: Option<&PathBuf>) -> anyhow::Result<Box<dyn Write>> {
    Ok(match path {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .map_err(CrawlerError::Io)
                .with_context(|| format!("failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

/// CLI entry point for the investor crawler
pub async fn run() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    init_tracing();

    let matches = command().get_matches();
    let config = config_from_matches(&matches, |key| std::env::var(key).ok())?;
    info!(config = ?config, "configuration loaded");

    if config.targets.is_empty() {
        warn!("no target URLs given (pass URLs, --targets-file, or set INVESTOR_URLS)");
    }

    let driver = config.build_driver()?;
    let records = driver.run::<Investor>(&config.targets).await;

    let writer = open_output(config.output.as_ref())?;
    let mut sink: Box<dyn ResultSink<Investor>> = match config.format {
        OutputFormat::Pretty => Box::new(PrettySink::new(writer)),
        OutputFormat::Json => Box::new(JsonLinesSink::new(writer)),
    };
    let summary = write_all(sink.as_mut(), &records).context("failed to write results")?;

    info!(
        total = summary.total,
        extracted = summary.extracted,
        partial = summary.partial,
        failed = summary.failed,
        skipped = summary.skipped,
        "run finished"
    );

    Ok(ExitCode::from(if summary.is_complete() {
        EXIT_OK
    } else {
        EXIT_INCOMPLETE
    }))
}
