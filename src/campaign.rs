use anyhow::Result;

use crate::emitter::RecordSink;
use crate::session::Fetcher;
use crate::walker::{ListingWalker, SinkError, Source, WalkReport};

/// Outcome of running every query mode of a source
#[derive(Debug, Default)]
pub struct CampaignSummary {
    pub reports: Vec<WalkReport>,
    pub failed_modes: Vec<(String, anyhow::Error)>,
}

impl CampaignSummary {
    pub fn records(&self) -> usize {
        self.reports.iter().map(|r| r.records).sum()
    }

    pub fn item_failures(&self) -> usize {
        self.reports.iter().map(|r| r.failures.len()).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failed_modes.is_empty()
    }
}

/// Emit the campaign header, then walk each query mode in turn.
///
/// A mode whose listing cannot be fetched is logged and recorded in the
/// summary; the remaining modes still run. A failing sink ends the run.
pub async fn run_campaign<S, F, K>(source: &S, fetcher: &F, sink: &mut K) -> Result<CampaignSummary>
where
    S: Source,
    F: Fetcher,
    K: RecordSink,
{
    let config = source.config();
    let walker = ListingWalker::new(source, fetcher);
    let mut summary = CampaignSummary::default();

    sink.header(&config.header)?;
    log::info!("Scraping campaign: {} ({} query modes)", config.header.campaign, config.modes.len());

    for mode in &config.modes {
        match walker.walk(mode, sink).await {
            Ok(report) => summary.reports.push(report),
            Err(e) if e.is::<SinkError>() => {
                log::error!("Query mode '{}' stopped, output is gone: {:#}", mode.name, e);
                return Err(e);
            }
            Err(e) => {
                log::error!("Query mode '{}' failed: {:?}", mode.name, e);
                summary.failed_modes.push((mode.name.clone(), e));
            }
        }
    }

    sink.finish()?;

    log::info!(
        "Finished {}: {} records, {} skipped items, {} failed modes",
        config.header.campaign,
        summary.records(),
        summary.item_failures(),
        summary.failed_modes.len()
    );

    Ok(summary)
}
