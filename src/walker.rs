use anyhow::{Context, Result};
use scraper::Html;
use std::collections::HashSet;
use std::fmt;
use url::Url;

use crate::config::{QueryMode, SourceConfig};
use crate::emitter::RecordSink;
use crate::extract::{link_with_text, DetailLink};
use crate::record::Record;
use crate::session::{build_form_submission, Fetcher, Page};

/// Site-specific knowledge: where the links are and how to read a detail page
pub trait Source {
    fn config(&self) -> &SourceConfig;

    /// Detail links on one listing page, in document order
    fn detail_links(&self, document: &Html, base: &Url) -> Vec<DetailLink>;

    fn next_page(&self, document: &Html, base: &Url) -> Option<Url> {
        link_with_text(document, &self.config().next_label, base)
    }

    fn extract(&self, page: &Page, mode: &QueryMode) -> Result<Record>;
}

/// A detail page that could not be turned into a record
#[derive(Debug)]
pub struct ItemFailure {
    pub link: Url,
    pub error: anyhow::Error,
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:#}", self.link, self.error)
    }
}

/// The record sink refused a write; the output is gone, so the whole run stops
#[derive(Debug)]
pub struct SinkError(pub anyhow::Error);

impl fmt::Display for SinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Output failed: {:#}", self.0)
    }
}

impl std::error::Error for SinkError {}

/// What happened during one query mode's walk
#[derive(Debug, Default)]
pub struct WalkReport {
    pub mode: String,
    pub pages_visited: usize,
    pub delays: usize,
    pub records: usize,
    pub failures: Vec<ItemFailure>,
}

pub struct ListingWalker<'a, S, F> {
    source: &'a S,
    fetcher: &'a F,
}

impl<'a, S: Source, F: Fetcher> ListingWalker<'a, S, F> {
    pub fn new(source: &'a S, fetcher: &'a F) -> Self {
        Self { source, fetcher }
    }

    /// Walk every listing page of `mode`, sending each record to `sink`.
    ///
    /// Listing fetch failures abort the walk; detail page failures are
    /// collected in the report and the walk moves on. Sink failures come
    /// back as [`SinkError`].
    pub async fn walk<K: RecordSink>(&self, mode: &QueryMode, sink: &mut K) -> Result<WalkReport> {
        let config = self.source.config();
        let delay = config.page_delay()?;
        let mut report = WalkReport {
            mode: mode.name.clone(),
            ..Default::default()
        };
        let mut visited = HashSet::new();

        let mut page = self.open_listing(mode).await?;
        visited.insert(page.url.to_string());

        loop {
            report.pages_visited += 1;
            log::info!("[{}] Listing page {}: {}", mode.name, report.pages_visited, page.url);

            let (links, next) = {
                let document = page.document();
                (
                    self.source.detail_links(&document, &page.url),
                    self.source.next_page(&document, &page.url),
                )
            };
            log::debug!("[{}] {} detail links", mode.name, links.len());

            for link in links {
                match self.visit(&link, mode).await {
                    Ok(record) => {
                        sink.record(&record).map_err(SinkError)?;
                        report.records += 1;
                    }
                    Err(failure) => {
                        log::error!("[{}] Skipping {}: {:?}", mode.name, failure.link, failure.error);
                        report.failures.push(failure);
                    }
                }
            }

            let Some(next) = next else {
                break;
            };

            if config.max_pages > 0 && report.pages_visited >= config.max_pages {
                log::warn!("[{}] Reached maximum page limit: {}", mode.name, config.max_pages);
                break;
            }
            if !visited.insert(next.to_string()) {
                log::warn!("[{}] Next page {} was already visited, stopping", mode.name, next);
                break;
            }

            delay.wait().await;
            report.delays += 1;

            page = self
                .fetcher
                .get(&next)
                .await
                .with_context(|| format!("Failed to fetch listing page {}", next))?;
        }

        log::info!(
            "[{}] Done: {} pages, {} records, {} failures",
            mode.name,
            report.pages_visited,
            report.records,
            report.failures.len()
        );

        Ok(report)
    }

    async fn open_listing(&self, mode: &QueryMode) -> Result<Page> {
        let url = Url::parse(&mode.url).with_context(|| format!("Invalid listing URL '{}'", mode.url))?;
        let page = self
            .fetcher
            .get(&url)
            .await
            .with_context(|| format!("Failed to fetch listing {}", url))?;

        match &mode.form {
            Some(form) => {
                let submission = build_form_submission(&page, form.index, &form.fields)?;
                self.fetcher
                    .submit(&submission)
                    .await
                    .with_context(|| format!("Failed to submit search form on {}", url))
            }
            None => Ok(page),
        }
    }

    async fn visit(&self, link: &DetailLink, mode: &QueryMode) -> Result<Record, ItemFailure> {
        log::debug!("Detail page: {}", link.href);

        let failure = |error: anyhow::Error| ItemFailure {
            link: link.href.clone(),
            error,
        };
        let page = self.fetcher.get(&link.href).await.map_err(failure)?;
        self.source.extract(&page, mode).map_err(failure)
    }
}
