//! DocFetch CLI - crawl a documentation site into Markdown

use clap::{Parser, ValueEnum};
use docfetch::{
    run, CrawlConfig, LayoutMode, QueryPolicy, RunSummary, ScopeMode, DEFAULT_USER_AGENT,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// How much of the URL space to crawl
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum ScopeArg {
    /// Everything on the root's scheme, host and port
    #[default]
    Origin,
    /// Only pages under the root URL's directory
    Prefix,
}

/// Output layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum LayoutArg {
    /// Directory if the output is a directory or ends with '/', else a file
    #[default]
    Auto,
    /// One concatenated markdown file
    File,
    /// One markdown file per page
    Dir,
}

/// Format of the end-of-run summary on stderr
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum SummaryFormat {
    #[default]
    Text,
    Json,
}

/// DocFetch - fetch documentation sites as clean Markdown for LLMs
#[derive(Parser, Debug)]
#[command(name = "doc-fetch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Root URL of the documentation site
    #[arg(long)]
    url: String,

    /// Output file, or directory for one file per page
    #[arg(long, short, default_value = "docs.md")]
    output: PathBuf,

    /// Also write an llm.txt semantic index
    #[arg(long)]
    llm_txt: bool,

    /// Maximum link depth from the root (max 10)
    #[arg(long, default_value_t = 2)]
    depth: u32,

    /// Number of concurrent fetch workers (max 20)
    #[arg(long, default_value_t = 3)]
    concurrent: usize,

    /// User-Agent header
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Maximum number of pages to fetch
    #[arg(long, default_value_t = 500)]
    max_pages: usize,

    /// Minimum delay between requests to the same host, in milliseconds
    #[arg(long, default_value_t = 100)]
    delay_ms: u64,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Whole-run timeout in seconds (0 disables)
    #[arg(long, default_value_t = 600)]
    run_timeout: u64,

    /// Crawl scope
    #[arg(long, value_enum, default_value_t = ScopeArg::Origin)]
    scope: ScopeArg,

    /// Treat URLs that differ only in their query string as different pages
    #[arg(long)]
    keep_query: bool,

    /// Output layout
    #[arg(long, value_enum, default_value_t = LayoutArg::Auto)]
    layout: LayoutArg,

    /// Allow crawling localhost and private network addresses
    #[arg(long)]
    allow_private: bool,

    /// Summary format
    #[arg(long, value_enum, default_value_t = SummaryFormat::Text)]
    summary: SummaryFormat,

    /// More log output (-v debug, -vv trace)
    #[arg(long, short, action = clap::ArgAction::Count, conflicts_with = "quiet")]
    verbose: u8,

    /// Only log errors
    #[arg(long, short)]
    quiet: bool,
}

impl Cli {
    fn to_config(&self) -> CrawlConfig {
        CrawlConfig::new(self.url.clone())
            .output(self.output.clone())
            .layout(match self.layout {
                LayoutArg::Auto => LayoutMode::Auto,
                LayoutArg::File => LayoutMode::File,
                LayoutArg::Dir => LayoutMode::Dir,
            })
            .llm_txt(self.llm_txt)
            .depth(self.depth)
            .workers(self.concurrent)
            .max_pages(self.max_pages)
            .user_agent(self.user_agent.clone())
            .delay(Duration::from_millis(self.delay_ms))
            .timeout(Duration::from_secs(self.timeout))
            .run_timeout((self.run_timeout > 0).then(|| Duration::from_secs(self.run_timeout)))
            .scope(match self.scope {
                ScopeArg::Origin => ScopeMode::Origin,
                ScopeArg::Prefix => ScopeMode::Prefix,
            })
            .query(if self.keep_query {
                QueryPolicy::Keep
            } else {
                QueryPolicy::Drop
            })
            .allow_private_hosts(self.allow_private)
    }

    /// Default log filter; `RUST_LOG` takes precedence
    fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn,docfetch=info,doc_fetch=info",
            1 => "warn,docfetch=debug,doc_fetch=debug",
            _ => "trace",
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let config = cli.to_config();
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, finishing in-flight pages");
                cancel.cancel();
            }
        });
    }

    match run(&config, cancel).await {
        Ok(summary) => {
            print_summary(&summary, cli.summary);
            for file in &summary.files {
                writeln_safe(&file.display().to_string());
            }
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn print_summary(summary: &RunSummary, format: SummaryFormat) {
    eprint!("{}", format_summary(summary, format));
}

fn format_summary(summary: &RunSummary, format: SummaryFormat) -> String {
    match format {
        SummaryFormat::Text => summary.to_string(),
        SummaryFormat::Json => match serde_json::to_string_pretty(summary) {
            Ok(json) => format!("{json}\n"),
            Err(e) => format!("Error serializing summary: {e}\n"),
        },
    }
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}
