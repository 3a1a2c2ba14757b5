// Campaign Scraper Library
//
// Walks paginated company directories, extracts one rating record per
// company page and writes them out as line-delimited JSON.

pub mod campaign;
pub mod config;
pub mod emitter;
pub mod extract;
pub mod record;
pub mod session;
pub mod sources;
pub mod utils;
pub mod walker;

// Re-export main types for convenience
pub use campaign::{run_campaign, CampaignSummary};
pub use config::{CampaignHeader, FormOverride, QueryMode, SourceConfig};
pub use emitter::{AggregateEmitter, RecordSink, StreamEmitter};
pub use extract::DetailLink;
pub use record::{CertificationRecord, CertifiedCompany, CompanySummary, CrueltyFreeCompany, CrueltyFreeRecord, Record};
pub use session::{Fetcher, FormSubmission, HttpSession, Page};
pub use utils::{get_random_user_agent, normalize_domain, split_brands, PageDelay, USER_AGENTS};
pub use walker::{ItemFailure, ListingWalker, SinkError, Source, WalkReport};
