mod analysis;
mod chunk;
mod config;
mod pr;
mod report;

use std::collections::BTreeSet;
use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};
use tracing_subscriber::EnvFilter;

use analysis::{AnalysisOptions, SectionKind};
use chunk::FileOrder;

/// PR Review: takes a GitHub Pull Request URL, fits its diff into an LLM
/// context budget and returns a sectioned review plus a post-ready comment.
#[derive(Parser, Debug)]
#[command(name = "pr-review", version, about)]
struct Cli {
    /// GitHub Pull Request URL (e.g., https://github.com/org/repo/pull/42)
    ///
    /// Not required when --mock is used.
    pr_url: Option<String>,

    /// Optional output file path for the markdown report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Use a built-in mock PR for demo purposes (no GitHub token needed)
    #[arg(long)]
    r#mock: bool,

    /// Sections to run, comma separated (default: all, or the config file's list)
    #[arg(long, value_enum, value_delimiter = ',')]
    sections: Vec<SectionKind>,

    /// Context limit in tokens
    #[arg(long)]
    budget: Option<usize>,

    /// Tokens reserved for prompt scaffolding
    #[arg(long)]
    overhead: Option<usize>,

    /// Which files get the budget first
    #[arg(long, value_enum)]
    order: Option<FileOrder>,

    /// Per-section timeout in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Post the review comment on the pull request
    #[arg(long, conflicts_with = "mock")]
    post: bool,
}

impl Cli {
    /// Command-line flags win over the config file.
    fn apply_overrides(&self, config: &mut config::Config) {
        if !self.sections.is_empty() {
            config.analysis.sections = self.sections.clone();
        }
        if let Some(limit) = self.budget {
            config.budget.limit = limit;
        }
        if let Some(overhead) = self.overhead {
            config.budget.overhead = overhead;
        }
        if let Some(order) = self.order {
            config.budget.order = order;
        }
        if let Some(secs) = self.timeout_secs {
            config.analysis.section_timeout_secs = secs;
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    info!("loading configuration");
    let mut config = config::Config::load()?;
    cli.apply_overrides(&mut config);

    let mut pr_url = None;
    let pull_request = if cli.r#mock {
        info!("using mock PR data for demo");
        build_mock_pr()?
    } else {
        let raw_url = cli.pr_url.as_deref().ok_or(
            "PR URL is required unless --mock is used. Usage: pr-review <URL> or pr-review --mock",
        )?;

        info!(pr_url = %raw_url, "parsing PR URL");
        let parsed_url = pr::parse_pr_url(raw_url)?;
        debug!(owner = %parsed_url.owner, repo = %parsed_url.repo, pr = parsed_url.pr_number, "parsed PR URL");

        info!("fetching pull request from GitHub");
        let fetched = pr::fetch_pull_request(&parsed_url, &config).await?;
        info!(files = fetched.files.len(), additions = fetched.additions(), deletions = fetched.deletions(), "fetched PR metadata");
        pr_url = Some(parsed_url);
        fetched
    };

    let budget = config.budget.content_budget();
    let plan = chunk::plan(&pull_request.files, &budget, config.budget.order)?;
    info!(
        included = plan.entries().len(),
        files = plan.files_total(),
        tokens = plan.total_tokens(),
        usable = plan.usable_budget(),
        "planned diff content"
    );

    let sections: BTreeSet<SectionKind> = config.analysis.sections.iter().copied().collect();
    let options = AnalysisOptions {
        section_timeout: config.analysis.section_timeout(),
    };
    let backend = analysis::LlmClient::new(&config.llm)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("Ctrl-C received, cancelling in-flight sections (press again to exit)");
        on_interrupt.cancel();
        // The SIGINT handler stays installed, so a second press has to exit here.
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("second Ctrl-C received, exiting");
            std::process::exit(130);
        }
    });

    info!(sections = sections.len(), model = backend.model(), "running analysis");
    let results = analysis::run(&pull_request, &plan, &sections, &backend, &options, &cancel)
        .instrument(info_span!("analyze", pr = pull_request.number))
        .await;
    let failed = results.values().filter(|r| r.is_failure()).count();
    info!(sections = results.len(), failed, "analysis complete");

    info!("generating report");
    let built_report = report::assemble(&pull_request, report::Coverage::from(&plan), results);
    let rendered = report::render(&built_report);
    report::output(&built_report, &rendered, cli.output.as_deref())?;

    if should_post(cli.post, &cancel) {
        if let Some(url) = &pr_url {
            info!("posting review comment");
            pr::post_review_comment(url, &config, &rendered.review_comment_text).await?;
        }
    } else if cli.post {
        warn!("run was cancelled, not posting the review comment");
    }
    info!(score = ?built_report.quality_score, "done");

    Ok(())
}

/// A cancelled run only has "unavailable" sections, so it is never posted.
fn should_post(requested: bool, cancel: &CancellationToken) -> bool {
    requested && !cancel.is_cancelled()
}

/// Build a mock PullRequest from the embedded sample diff fixture.
/// This enables running the full pipeline without a GitHub token.
fn build_mock_pr() -> Result<pr::PullRequest, Box<dyn std::error::Error>> {
    let diff_text = include_str!("../tests/fixtures/sample_diff.patch");
    let files = pr::diff::parse_diff(diff_text)?;

    Ok(pr::PullRequest {
        owner: "acme".to_string(),
        repo: "webapp".to_string(),
        number: 42,
        title: "Add OAuth2 login flow".to_string(),
        description: "Adds the OAuth2 authorization-code flow and a session store.".to_string(),
        author: "alice".to_string(),
        files,
    })
}
