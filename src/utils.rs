use anyhow::Result;
use rand::Rng;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

/// User agent rotation for avoiding detection
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:122.0) Gecko/20100101 Firefox/122.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/121.0.0.0 Safari/537.36",
];

pub fn get_random_user_agent() -> &'static str {
    let mut rng = rand::rng();
    let index = rng.random_range(0..USER_AGENTS.len());
    USER_AGENTS[index]
}

/// Fixed pause between listing pages
#[derive(Debug, Clone, Copy)]
pub struct PageDelay {
    delay: Duration,
}

impl PageDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Fails on negative, infinite or out of range values
    pub fn try_from_secs_f64(secs: f64) -> Result<Self> {
        let delay = Duration::try_from_secs_f64(secs)
            .map_err(|e| anyhow::anyhow!("Invalid page delay {} seconds: {}", secs, e))?;
        Ok(Self::new(delay))
    }

    pub fn duration(&self) -> Duration {
        self.delay
    }

    pub async fn wait(&self) {
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }
    }
}

impl Default for PageDelay {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

static HTTP_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^https?://").unwrap());

/// Reduce a homepage link to scheme, host and first path segment.
///
/// `https://example.com/path/extra?x=1` becomes `https://example.com/path`.
/// Returns `None` for anything that is not an absolute http(s) link.
pub fn normalize_domain(homepage: &str) -> Option<String> {
    let homepage = homepage.trim();
    if homepage.len() <= 5 || !HTTP_PREFIX.is_match(homepage) {
        return None;
    }

    let domain = homepage.split('/').take(4).collect::<Vec<_>>().join("/");
    Some(domain.split(['?', '#']).next().unwrap_or_default().to_string())
}

/// Split a comma separated brand field. Empty entries are kept.
pub fn split_brands(text: &str) -> Vec<String> {
    text.split(',').map(|brand| brand.trim().to_string()).collect()
}

/// Drop everything after the first `&` of a page URL; the search pages
/// append session and paging parameters after the company id.
pub fn strip_tracking_params(url: &Url) -> String {
    url.as_str().split('&').next().unwrap_or_default().to_string()
}

/// Last path segment of a detail URL, used as the business id.
pub fn last_path_segment(url: &Url) -> Option<&str> {
    url.path_segments()?.filter(|s| !s.is_empty()).last()
}
