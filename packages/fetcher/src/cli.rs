//! Command-line interface for the fetcher.

use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::{validate_arxiv_id, FetcherConfig, DEFAULT_MAX_RESULTS};
use crate::error::Result;
use crate::fetcher::{ArticleSource, ArxivFetcher};
use crate::types::{FetchRequest, FetchResponse};

/// Papersift Fetcher - Retrieve article metadata from arXiv as JSON.
#[derive(Parser)]
#[command(name = "papersift-fetch")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Download each PDF and include its extracted text
    #[arg(long, global = true)]
    pub full_text: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch a single article by arXiv identifier.
    Fetch {
        /// arXiv identifier (e.g., 2301.07041)
        arxiv_id: String,
    },

    /// Search arXiv with the API's query syntax (e.g., "cat:cs.CR AND all:fhe").
    Search {
        /// Search query passed through to the arXiv API
        query: String,

        /// Maximum number of results
        #[arg(short = 'n', long, default_value_t = DEFAULT_MAX_RESULTS)]
        max_results: u32,
    },
}

impl Cli {
    /// Translate the parsed command line into a fetch request.
    pub fn to_request(&self) -> FetchRequest {
        let request = match &self.command {
            Commands::Fetch { arxiv_id } => FetchRequest::by_id(arxiv_id.clone()),
            Commands::Search { query, max_results } => {
                FetchRequest::search(query.clone(), *max_results)
            }
        };
        request.with_full_text(self.full_text)
    }
}

/// Run the CLI.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Commands::Fetch { arxiv_id } = &cli.command {
        // Validate before making HTTP requests
        validate_arxiv_id(arxiv_id)?;
    }

    let request = cli.to_request();
    let fetcher = ArxivFetcher::new(FetcherConfig::from_env())?;

    let pb = ProgressBar::new_spinner();
    #[allow(clippy::expect_used)] // Static template string that is guaranteed to be valid
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("valid template"),
    );
    pb.set_message(if request.fetch_full_text {
        "Fetching metadata and full text..."
    } else {
        "Fetching metadata..."
    });
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let response = match fetcher.fetch(&request).await {
        Ok(response) => response,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };
    pb.finish_and_clear();

    print_summary(&response);
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}

/// Human-readable summary on stderr so stdout stays valid JSON.
fn print_summary(response: &FetchResponse) {
    eprintln!(
        "{} {} article(s)",
        style("Fetched").bold(),
        style(response.total).cyan()
    );
    for article in &response.articles {
        let text_note = match article.text_length {
            Some(len) => format!(" [{len} chars of full text]"),
            None => String::new(),
        };
        eprintln!(
            "  {} {}{}",
            style(&article.arxiv_id).green(),
            article.title,
            style(text_note).yellow()
        );
    }
}
