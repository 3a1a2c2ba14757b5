use anyhow::{Context, Result};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::form_urlencoded::byte_serialize;
use url::Url;

use crate::config::{CampaignHeader, QueryMode, SourceConfig, DEFAULT_NEXT_LABEL};
use crate::extract::{first_attr, first_href_containing, first_text, links_matching, DetailLink};
use crate::record::{CertificationRecord, CertifiedCompany, Record};
use crate::session::{Fetcher, Page};
use crate::utils::{last_path_segment, normalize_domain};
use crate::walker::Source;

pub const DIRECTORY_URL: &str = "http://www.bcorporation.net/community/find-a-b-corp";

pub const MAX_SCORE: u32 = 200;

const DESCRIPTION: &str = "Certified B Corporation";

const COMPANY_LINKS: &str = "h6.field-content a";
const PAGE_TITLE: &str = "h1#page-title";
const SOCIAL_BOX: &str = "div.company-rightbox-inner div.field-item";
const HOMEPAGE: &str = r#".company-desc-inner a[title="Visit Website"]"#;
const CATEGORY: &str = ".company-desc-inner h3";
const SCORE: &str = "div.field-name-field-overall-b-score";
const LOGO: &str = "img.image-style-company-logo-full";
const INDUSTRY_SELECT: &str = "select#edit-field-industry";

pub fn default_config() -> SourceConfig {
    SourceConfig {
        header: CampaignHeader {
            goal: "Redefine success in business".to_string(),
            campaign: "B Corporation List".to_string(),
            author: "B Labs".to_string(),
            url: "http://www.bcorporation.net/".to_string(),
            donate_url: None,
        },
        modes: vec![QueryMode {
            name: "all".to_string(),
            url: DIRECTORY_URL.to_string(),
            description: DESCRIPTION.to_string(),
            judgment: 1,
            form: None,
            category: None,
        }],
        page_delay_secs: 1.0,
        max_pages: 0,
        next_label: DEFAULT_NEXT_LABEL.to_string(),
    }
}

/// B Corporation community directory
pub struct BCorp {
    config: SourceConfig,
    biz_ids: Option<HashSet<String>>,
}

impl BCorp {
    pub fn new(config: SourceConfig) -> Self {
        Self {
            config,
            biz_ids: None,
        }
    }

    /// Only visit businesses whose directory slug is listed
    pub fn with_biz_ids<I: IntoIterator<Item = String>>(mut self, ids: I) -> Self {
        let ids: HashSet<String> = ids.into_iter().collect();
        self.biz_ids = if ids.is_empty() { None } else { Some(ids) };
        self
    }

    fn wanted(&self, link: &DetailLink) -> bool {
        let Some(ids) = &self.biz_ids else {
            return true;
        };
        match last_path_segment(&link.href) {
            Some(id) if ids.contains(id) => true,
            _ => {
                log::debug!("Skipping business not in whitelist: {}", link.href);
                false
            }
        }
    }
}

impl Default for BCorp {
    fn default() -> Self {
        Self::new(default_config())
    }
}

impl Source for BCorp {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn detail_links(&self, document: &Html, base: &Url) -> Vec<DetailLink> {
        links_matching(document, COMPANY_LINKS, base)
            .into_iter()
            .filter(|link| self.wanted(link))
            .collect()
    }

    fn extract(&self, page: &Page, mode: &QueryMode) -> Result<Record> {
        let document = page.document();

        // some pages have no score at all
        let score = match first_text(&document, SCORE) {
            Some(text) => Some(
                text.parse::<u32>()
                    .with_context(|| format!("Unreadable B score '{}'", text))?,
            ),
            None => None,
        };

        let mut categories: Vec<String> = mode.category.iter().cloned().collect();
        if let Some(category) = first_text(&document, CATEGORY) {
            categories.push(category);
        }

        let logo_url = first_attr(&document, LOGO, "src")
            .and_then(|src| page.url.join(&src).ok())
            .map(|url| url.to_string());

        let company = CertifiedCompany {
            company: first_text(&document, PAGE_TITLE).unwrap_or_default(),
            domain: first_attr(&document, HOMEPAGE, "href").and_then(|href| normalize_domain(&href)),
            brands: Vec::new(),
            facebook: first_href_containing(&document, SOCIAL_BOX, "facebook"),
            twitter: first_href_containing(&document, SOCIAL_BOX, "twitter"),
            categories,
            logo_url,
        };

        Ok(Record::Certification(CertificationRecord {
            url: page.url.to_string(),
            description: mode.description.clone(),
            judgment: mode.judgment,
            score,
            max_score: score.map(|_| MAX_SCORE),
            company,
        }))
    }
}

/// One query mode per industry in the directory's industry filter.
///
/// `whitelist` restricts the result to the named industries when non-empty.
pub async fn discover_industries<F: Fetcher>(
    fetcher: &F,
    template: &QueryMode,
    whitelist: &[String],
) -> Result<Vec<QueryMode>> {
    let url = Url::parse(&template.url).with_context(|| format!("Invalid directory URL '{}'", template.url))?;
    let page = fetcher
        .get(&url)
        .await
        .with_context(|| format!("Failed to fetch directory {}", url))?;

    let industries = industry_options(&page.document())?;
    log::info!("Found {} industries", industries.len());

    Ok(industries
        .into_iter()
        .filter(|(_, industry)| whitelist.is_empty() || whitelist.contains(industry))
        .map(|(field, industry)| {
            let value: String = byte_serialize(industry.as_bytes()).collect();
            QueryMode {
                name: industry.clone(),
                url: format!("{}?{}={}", template.url, field, value),
                description: template.description.clone(),
                judgment: template.judgment,
                form: None,
                category: Some(industry),
            }
        })
        .collect())
}

/// `(select name, option value)` for every non-empty industry option
fn industry_options(document: &Html) -> Result<Vec<(String, String)>> {
    let select_selector = Selector::parse(INDUSTRY_SELECT)
        .map_err(|e| anyhow::anyhow!("Failed to parse selector: {:?}", e))?;
    let option = Selector::parse("option").map_err(|e| anyhow::anyhow!("Failed to parse selector: {:?}", e))?;

    let select = document
        .select(&select_selector)
        .next()
        .context("Industry filter not found on directory page")?;
    let field = select.value().attr("name").unwrap_or("field_industry").to_string();

    Ok(select
        .select(&option)
        .filter_map(|o| o.value().attr("value"))
        .filter(|value| !value.is_empty())
        .map(|value| (field.clone(), value.to_string()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::FormSubmission;
    use async_trait::async_trait;

    const COMPANY_PAGE: &str = r#"
<html><body>
  <h1 id="page-title">
    Atayne LLC
  </h1>
  <div class="company-desc-inner">
    <h3>Apparel, Footwear &amp; Accessories</h3>
    <p>Outdoor and performance apparel.</p>
    <a href=" https://www.atayne.com/pages/about?utm_source=bcorp " title="Visit Website">atayne.com</a>
  </div>
  <div class="company-rightbox-inner">
    <div class="field-item"><a href="https://twitter.com/atayne">@atayne</a></div>
    <div class="field-item"><a href="https://www.facebook.com/atayne">Facebook</a></div>
  </div>
  <div class="field-name-field-overall-b-score">97</div>
  <img class="image-style-company-logo-full" src="/sites/default/files/logos/atayne.png">
</body></html>
"#;

    const DIRECTORY_PAGE: &str = r#"
<html><body>
  <form>
    <select id="edit-field-industry" name="field_industry_value">
      <option value="">- Any -</option>
      <option value="Apparel, Footwear &amp; Accessories">Apparel, Footwear &amp; Accessories</option>
      <option value="Food &amp; Beverage">Food &amp; Beverage</option>
    </select>
  </form>
</body></html>
"#;

    fn company_page() -> Page {
        Page::new(
            Url::parse("http://www.bcorporation.net/community/atayne-llc").unwrap(),
            COMPANY_PAGE,
        )
    }

    fn industry_mode() -> QueryMode {
        let mut mode = default_config().modes.remove(0);
        mode.category = Some("Apparel, Footwear & Accessories".to_string());
        mode
    }

    #[test]
    fn test_extract_company() {
        let Record::Certification(record) = BCorp::default().extract(&company_page(), &industry_mode()).unwrap()
        else {
            panic!("expected a certification record");
        };

        assert_eq!(record.url, "http://www.bcorporation.net/community/atayne-llc");
        assert_eq!(record.judgment, 1);
        assert_eq!(record.score, Some(97));
        assert_eq!(record.max_score, Some(MAX_SCORE));

        let company = record.company;
        assert_eq!(company.company, "Atayne LLC");
        assert_eq!(company.domain.as_deref(), Some("https://www.atayne.com/pages"));
        assert_eq!(company.twitter.as_deref(), Some("https://twitter.com/atayne"));
        assert_eq!(company.facebook.as_deref(), Some("https://www.facebook.com/atayne"));
        assert_eq!(company.categories, vec![
            "Apparel, Footwear & Accessories",
            "Apparel, Footwear & Accessories"
        ]);
        assert_eq!(
            company.logo_url.as_deref(),
            Some("http://www.bcorporation.net/sites/default/files/logos/atayne.png")
        );
    }

    #[test]
    fn test_extract_sparse_page() {
        let page = Page::new(
            Url::parse("http://www.bcorporation.net/community/nazori").unwrap(),
            r#"<html><body><h1 id="page-title">Nazori</h1>
               <div class="company-desc-inner"><a href="nazori" title="Visit Website">site</a></div>
               </body></html>"#,
        );
        let mode = default_config().modes.remove(0);

        let Record::Certification(record) = BCorp::default().extract(&page, &mode).unwrap() else {
            panic!("expected a certification record");
        };
        assert_eq!(record.score, None);
        assert_eq!(record.max_score, None);
        assert_eq!(record.company.company, "Nazori");
        assert_eq!(record.company.domain, None);
        assert_eq!(record.company.facebook, None);
        assert!(record.company.categories.is_empty());

        let json = serde_json::to_value(Record::Certification(record)).unwrap();
        assert!(json.get("score").is_none());
        assert!(json["company"].get("url").is_none());
        assert_eq!(json["company"]["brands"], serde_json::json!([]));
    }

    #[test]
    fn test_unreadable_score_fails_item() {
        let page = Page::new(
            Url::parse("http://www.bcorporation.net/community/farm-capital-services-llc-0").unwrap(),
            r#"<html><body><h1 id="page-title">Farm Capital</h1>
               <div class="field-name-field-overall-b-score">pending</div></body></html>"#,
        );
        let err = BCorp::default().extract(&page, &industry_mode()).unwrap_err();
        assert!(err.to_string().contains("Unreadable B score"));
    }

    #[test]
    fn test_biz_id_whitelist() {
        let document = Html::parse_document(
            r#"<h6 class="field-content"><a href="/community/atayne-llc">Atayne</a></h6>
               <h6 class="field-content"><a href="/community/nazori">Nazori</a></h6>"#,
        );
        let base = Url::parse(DIRECTORY_URL).unwrap();

        let all = BCorp::default().detail_links(&document, &base);
        assert_eq!(all.len(), 2);

        let some = BCorp::default()
            .with_biz_ids(vec!["nazori".to_string()])
            .detail_links(&document, &base);
        assert_eq!(some.len(), 1);
        assert_eq!(some[0].label, "Nazori");
    }

    struct DirectoryFetcher;

    #[async_trait]
    impl Fetcher for DirectoryFetcher {
        async fn get(&self, url: &Url) -> Result<Page> {
            Ok(Page::new(url.clone(), DIRECTORY_PAGE))
        }

        async fn submit(&self, _form: &FormSubmission) -> Result<Page> {
            anyhow::bail!("no forms here")
        }
    }

    #[tokio::test]
    async fn test_discover_industries() {
        let template = default_config().modes.remove(0);
        let modes = discover_industries(&DirectoryFetcher, &template, &[]).await.unwrap();

        assert_eq!(modes.len(), 2);
        assert_eq!(modes[1].name, "Food & Beverage");
        assert_eq!(modes[1].category.as_deref(), Some("Food & Beverage"));
        assert_eq!(
            modes[1].url,
            "http://www.bcorporation.net/community/find-a-b-corp?field_industry_value=Food+%26+Beverage"
        );

        let whitelist = vec!["Food & Beverage".to_string()];
        let modes = discover_industries(&DirectoryFetcher, &template, &whitelist).await.unwrap();
        assert_eq!(modes.len(), 1);
    }
}
