//! CLI for the Jira to GitHub migrator.
//!
//! Wraps the migration pipeline in subcommands for fetching issues,
//! generating the operator-filled map artifacts, downloading attachments
//! and running the import itself. All intermediate artifacts are plain
//! JSON files.

use clap::{ArgAction, Args, Parser, Subcommand};
use jira2github::{
    fetch_attachments, fetch_issues, generate_milestone_map, generate_user_map, plan,
    AttachmentOptions, CompileOptions, Credentials, GitHubClient, JiraQuery, MarkdownPassthrough,
    MigrationReport, MilestoneMap, RetryPolicy, Scheduler, SchedulerConfig, SourceIssue,
    SubmissionEngine, SubmitOptions, UserMap,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Migrate Jira issues, comments and attachments to GitHub.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Export Jira issues to GitHub.
    Import(ImportArgs),

    /// Generate a user map for mapping Jira user ids to GitHub accounts.
    GenerateUserMap(GenerateMapArgs),

    /// Generate a milestone map for mapping Jira versions to GitHub milestone ids.
    GenerateMilestoneMap(GenerateMilestoneArgs),

    /// Retrieve issues from Jira.
    FetchIssues(FetchIssuesArgs),

    /// Download attachments.
    FetchAttachments(FetchAttachmentsArgs),

    /// List the issue keys present in an export.
    GetKeys(GetKeysArgs),
}

#[derive(Args, Debug)]
struct ImportArgs {
    /// Path to the Jira export data file.
    #[arg(short, long)]
    file: PathBuf,

    /// Path to write the migration ledger to.
    #[arg(short, long, default_value = "output.json")]
    output: PathBuf,

    /// Path to the user map artifact.
    #[arg(long = "map")]
    user_map: Option<PathBuf>,

    /// Path to the milestone map artifact.
    #[arg(long = "vmap")]
    milestone_map: Option<PathBuf>,

    /// Owner or org of the repository to post the issues to.
    #[arg(long, env = "J2GH_OWNER")]
    owner: Option<String>,

    /// Name of the repository to post the issues to.
    #[arg(short, long, env = "J2GH_REPO")]
    repo: Option<String>,

    /// Personal access token for connecting to GitHub.
    #[arg(short, long, env = "J2GH_TOKEN")]
    token: Option<String>,

    /// App id of a GitHub App for connecting to GitHub.
    #[arg(long, env = "J2GH_APP_ID")]
    app_id: Option<u64>,

    /// Private key (PEM) of a GitHub App for connecting to GitHub.
    #[arg(long, env = "J2GH_PRIVATE_KEY")]
    private_key: Option<String>,

    /// Installation id of a GitHub App for connecting to GitHub.
    #[arg(long, env = "J2GH_INSTALLATION_ID")]
    installation_id: Option<u64>,

    /// Include the Jira key in the GitHub issue title.
    #[arg(long)]
    include_key_in_title: bool,

    /// Base URL for linking back to the original issues.
    #[arg(long)]
    issue_base_url: Option<String>,

    /// Base URL for linking to attachments hosted elsewhere.
    #[arg(long)]
    attachment_base_url: Option<String>,

    /// Path to a JSON array of issue keys to include.
    #[arg(long)]
    include: Option<PathBuf>,

    /// Path to a JSON array of issue keys to exclude. Takes precedence
    /// over --include.
    #[arg(long)]
    exclude: Option<PathBuf>,

    /// Target type for otherwise unmapped Jira issue types.
    #[arg(long)]
    fallback_type: Option<String>,

    /// Normalize Jira version labels to semantic versions.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    semver: bool,

    /// Report planned operations without creating anything.
    #[arg(long, visible_alias = "test")]
    dry_run: bool,

    #[command(flatten)]
    rate: RateArgs,
}

/// Rate-limit overrides applied to the run's scheduler.
#[derive(Args, Debug)]
struct RateArgs {
    /// Reservoir capacity.
    #[arg(long)]
    rate_capacity: Option<u32>,

    /// Budget restored per refill interval.
    #[arg(long)]
    rate_refill_amount: Option<u32>,

    /// Refill interval in seconds.
    #[arg(long)]
    rate_refill_secs: Option<u64>,

    /// Maximum concurrent operations.
    #[arg(long)]
    rate_max_concurrent: Option<usize>,

    /// Minimum milliseconds between dispatches.
    #[arg(long)]
    rate_min_time_ms: Option<u64>,
}

impl RateArgs {
    fn apply(&self, mut config: SchedulerConfig) -> SchedulerConfig {
        if let Some(capacity) = self.rate_capacity {
            config.capacity = capacity;
        }
        if let Some(amount) = self.rate_refill_amount {
            config.refill_amount = amount;
        }
        if let Some(secs) = self.rate_refill_secs {
            config.refill_interval = Duration::from_secs(secs);
        }
        if let Some(max) = self.rate_max_concurrent {
            config.max_concurrent = max;
        }
        if let Some(ms) = self.rate_min_time_ms {
            config.min_time = Duration::from_millis(ms);
        }
        config
    }
}

#[derive(Args, Debug)]
struct GenerateMapArgs {
    /// Path to the Jira export data file.
    #[arg(short, long)]
    file: PathBuf,

    /// Path to write the map to.
    #[arg(short, long, default_value = "output.json")]
    output: PathBuf,

    /// Print the map instead of writing it.
    #[arg(long, visible_alias = "test")]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct GenerateMilestoneArgs {
    #[command(flatten)]
    common: GenerateMapArgs,

    /// Normalize Jira version labels to semantic versions.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    semver: bool,
}

#[derive(Args, Debug)]
struct FetchIssuesArgs {
    /// Jira search API URL to query issues from.
    #[arg(short, long)]
    url: String,

    /// JQL selecting the issues to migrate.
    #[arg(short, long)]
    jql: String,

    /// Path to write the normalized issues to.
    #[arg(short, long, default_value = "issues.json")]
    output: PathBuf,

    #[command(flatten)]
    rate: RateArgs,
}

#[derive(Args, Debug)]
struct FetchAttachmentsArgs {
    /// Path to the Jira export data file.
    #[arg(short, long)]
    file: PathBuf,

    /// Directory to download attachments into.
    #[arg(short, long, default_value = "attachments")]
    output: PathBuf,

    /// Enumerate attachments without downloading.
    #[arg(long, visible_alias = "test")]
    dry_run: bool,

    #[command(flatten)]
    rate: RateArgs,
}

#[derive(Args, Debug)]
struct GetKeysArgs {
    /// Path to the Jira export data file.
    #[arg(short, long)]
    file: PathBuf,

    /// Path to write the key list to.
    #[arg(short, long, default_value = "output.json")]
    output: PathBuf,
}

/// CLI-level failures.
#[derive(Debug, thiserror::Error)]
enum CliError {
    /// The export or a map artifact could not be read.
    #[error("failed to read '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The export or a map artifact is not valid JSON of the expected shape.
    #[error("failed to parse '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// An output artifact could not be written.
    #[error("failed to write '{path}': {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Owner and repo are required outside dry-run.
    #[error("--owner and --repo are required unless --dry-run is given")]
    MissingTarget,

    #[error(transparent)]
    Config(#[from] jira2github::ConfigError),

    #[error(transparent)]
    Fetch(#[from] jira2github::FetchError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(failed) => {
            if failed {
                ExitCode::from(1)
            } else {
                ExitCode::from(0)
            }
        }
        Err(e) => {
            error!(error = %e, "Critical failure");
            ExitCode::from(2)
        }
    }
}

/// Initializes tracing with environment filter support.
///
/// Compact single-line output; log level filtering via `RUST_LOG`
/// (defaults to "info").
fn init_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

/// Dispatches the selected subcommand. Returns whether the run recorded
/// failures.
async fn run(cli: Cli) -> Result<bool, CliError> {
    match cli.command {
        Command::Import(args) => import(args).await,
        Command::GenerateUserMap(args) => {
            let issues = read_issues(&args.file)?;
            let map = generate_user_map(&issues);
            emit(&args.output, &map, args.dry_run)?;
            Ok(false)
        }
        Command::GenerateMilestoneMap(args) => {
            let issues = read_issues(&args.common.file)?;
            let entries = generate_milestone_map(&issues, args.semver);

            // Entries stay in resolver order in the emitted object.
            let mut object = serde_json::Map::new();
            for entry in entries {
                object.insert(entry.version, Value::String(entry.milestone));
            }
            emit(
                &args.common.output,
                &Value::Object(object),
                args.common.dry_run,
            )?;
            Ok(false)
        }
        Command::FetchIssues(args) => {
            let client = http_client()?;
            let scheduler = Scheduler::new(args.rate.apply(SchedulerConfig::default()));
            let query = JiraQuery::new(args.url, args.jql);
            let issues = fetch_issues(&client, &query, &scheduler, &MarkdownPassthrough).await?;
            emit(&args.output, &issues, false)?;
            Ok(false)
        }
        Command::FetchAttachments(args) => {
            let issues = read_issues(&args.file)?;
            let client = http_client()?;
            let mut options = AttachmentOptions::new(args.output);
            options.dry_run = args.dry_run;
            options.scheduler = args.rate.apply(options.scheduler);

            let report = fetch_attachments(&client, &issues, &options).await;
            if report.dry_run {
                print_json(&report.attachments)?;
            }
            println!(
                "Attachments: {} enumerated, {} downloaded, {} failed",
                report.attachments.len(),
                report.downloaded,
                report.failures.len()
            );
            Ok(!report.failures.is_empty())
        }
        Command::GetKeys(args) => {
            let issues = read_issues(&args.file)?;
            let keys: Vec<&str> = issues.iter().map(|issue| issue.key.as_str()).collect();
            emit(&args.output, &keys, false)?;
            Ok(false)
        }
    }
}

/// Runs the import subcommand.
async fn import(args: ImportArgs) -> Result<bool, CliError> {
    let issues = read_issues(&args.file)?;

    let user_map: UserMap = match &args.user_map {
        Some(path) => read_json(path)?,
        None => generate_user_map(&issues),
    };
    let milestone_map: MilestoneMap = match &args.milestone_map {
        Some(path) => read_json(path)?,
        None => generate_milestone_map(&issues, args.semver)
            .into_iter()
            .map(|entry| (entry.version, entry.milestone))
            .collect(),
    };

    let options = SubmitOptions {
        owner: args.owner.clone().unwrap_or_default(),
        repo: args.repo.clone().unwrap_or_default(),
        include: args.include.as_deref().map(read_json).transpose()?,
        exclude: args.exclude.as_deref().map(read_json).transpose()?,
        dry_run: args.dry_run,
        compile: CompileOptions {
            include_key_in_title: args.include_key_in_title,
            issue_base_url: args.issue_base_url.clone(),
            attachment_base_url: args.attachment_base_url.clone(),
            fallback_type: args.fallback_type.clone(),
            semantic_versions: args.semver,
        },
    };

    let report = if args.dry_run {
        plan(&issues, &user_map, &milestone_map, &options)
    } else {
        if args.owner.is_none() || args.repo.is_none() {
            return Err(CliError::MissingTarget);
        }
        let credentials = Credentials::resolve(
            args.token,
            args.app_id,
            args.private_key,
            args.installation_id,
        )?;
        let transport = GitHubClient::new(&credentials)?;
        let scheduler = Scheduler::new(args.rate.apply(SchedulerConfig::default()));
        let engine = SubmissionEngine::new(transport, scheduler, RetryPolicy::default());
        engine
            .submit(&issues, &user_map, &milestone_map, &options)
            .await
    };

    if args.dry_run {
        print_json(&report)?;
    } else {
        write_json(&args.output, &report.ledger)?;
    }
    print_summary(&report);

    Ok(report.has_failures())
}

/// Prints the final run summary.
fn print_summary(report: &MigrationReport) {
    println!("\nSummary:");
    println!("  Mode: {}", if report.dry_run { "Dry Run" } else { "Live" });

    if let Some(planned) = &report.planned {
        println!("  Issues to create: {}", planned.issues);
        println!("  Comments to post: {}", planned.comments);
        println!("  Issues to close: {}", planned.closes);
    } else {
        println!("  Issues created: {}", report.issues_created);
        println!("  Comments posted: {}", report.comments_posted);
        println!("  Issues closed: {}", report.issues_closed);
    }
    println!("  Issues failed: {}", report.issues_failed);
}

/// Builds the HTTP client used against the source tracker, with an
/// explicit request deadline.
fn http_client() -> Result<reqwest::Client, CliError> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()?)
}

fn read_issues(path: &Path) -> Result<Vec<SourceIssue>, CliError> {
    read_json(path)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let content = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| CliError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), CliError> {
    let content = serde_json::to_string_pretty(value).map_err(|source| CliError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    std::fs::write(path, content).map_err(|source| CliError::Write {
        path: path.display().to_string(),
        source,
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let content = serde_json::to_string_pretty(value).map_err(|source| CliError::Parse {
        path: "<stdout>".to_string(),
        source,
    })?;
    println!("{content}");
    Ok(())
}

/// Writes to `output` or prints when previewing.
fn emit<T: serde::Serialize>(output: &Path, value: &T, dry_run: bool) -> Result<(), CliError> {
    if dry_run {
        print_json(value)
    } else {
        write_json(output, value)
    }
}
