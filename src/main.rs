use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io;
use std::path::PathBuf;

use campaign_scraper::sources::{bcorp, peta, BCorp, Peta};
use campaign_scraper::{
    run_campaign, AggregateEmitter, CampaignSummary, HttpSession, RecordSink, SourceConfig, StreamEmitter,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    /// PETA cruelty-free company search
    Peta,
    /// B Corporation community directory
    Bcorp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputMode {
    /// One JSON object per line, written as soon as it is scraped
    Stream,
    /// A single object with every company, written at the end
    Aggregate,
}

#[derive(Debug, Parser)]
#[command(name = "campaign-scraper", version, about = "Scrape company ratings into line-delimited JSON")]
struct Cli {
    /// Directory to scrape
    #[arg(value_enum)]
    source: SourceKind,

    #[arg(long, value_enum, default_value_t = OutputMode::Stream)]
    output: OutputMode,

    /// Only run these query modes (repeatable)
    #[arg(long = "mode")]
    modes: Vec<String>,

    /// TOML file replacing the built-in source configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// bcorp: walk the directory once per industry
    #[arg(long)]
    by_industry: bool,

    /// bcorp: only these industries (implies --by-industry)
    #[arg(long = "industry")]
    industries: Vec<String>,

    /// bcorp: only these business ids (last path segment of the company page)
    #[arg(long = "biz-id")]
    biz_ids: Vec<String>,

    /// Stop after this many listing pages per query mode
    #[arg(long)]
    max_pages: Option<usize>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn source_config(&self, default: fn() -> SourceConfig) -> Result<SourceConfig> {
        let mut config = match &self.config {
            Some(path) => SourceConfig::load(path)?,
            None => default(),
        };
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        Ok(config)
    }
}

async fn scrape<K: RecordSink>(cli: &Cli, session: &HttpSession, sink: &mut K) -> Result<CampaignSummary> {
    match cli.source {
        SourceKind::Peta => {
            let mut config = cli.source_config(peta::default_config)?;
            config.retain_modes(&cli.modes)?;
            run_campaign(&Peta::new(config), session, sink).await
        }
        SourceKind::Bcorp => {
            let mut config = cli.source_config(bcorp::default_config)?;
            if cli.by_industry || !cli.industries.is_empty() {
                let template = config
                    .modes
                    .first()
                    .cloned()
                    .context("No query mode to derive industries from")?;
                config.modes = bcorp::discover_industries(session, &template, &cli.industries).await?;
            }
            config.retain_modes(&cli.modes)?;

            let source = BCorp::new(config).with_biz_ids(cli.biz_ids.iter().cloned());
            run_campaign(&source, session, sink).await
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(level));

    let session = HttpSession::new()?;
    let stdout = io::stdout().lock();

    let summary = match cli.output {
        OutputMode::Stream => scrape(&cli, &session, &mut StreamEmitter::new(stdout)).await?,
        OutputMode::Aggregate => scrape(&cli, &session, &mut AggregateEmitter::new(stdout)).await?,
    };

    if !summary.is_success() {
        let failed: Vec<&str> = summary.failed_modes.iter().map(|(name, _)| name.as_str()).collect();
        anyhow::bail!("failed to scrape query modes: {}", failed.join(", "));
    }

    Ok(())
}
