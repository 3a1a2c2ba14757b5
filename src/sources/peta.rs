use anyhow::Result;
use regex::Regex;
use scraper::Html;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use url::Url;

use crate::config::{CampaignHeader, FormOverride, QueryMode, SourceConfig, DEFAULT_NEXT_LABEL};
use crate::extract::{first_text, links_with_href, DetailLink};
use crate::record::{CrueltyFreeCompany, CrueltyFreeRecord, Record};
use crate::session::Page;
use crate::utils::{split_brands, strip_tracking_params};
use crate::walker::Source;

const SEARCH_URL: &str = "http://features.peta.org/cruelty-free-company-search/cruelty_free_companies_search.aspx";

const COMPANY_NAME: &str = "span#ctl00_ContentPlaceHolder1_l_CompanyName";
const WEBSITE: &str = "span#ctl00_ContentPlaceHolder1_l_Website";
const BRANDS: &str = "span#ctl00_ContentPlaceHolder1_l_Brands";

/// Results per page dropdown; "0" lists everything on one page
const RESULT_COUNT_FIELD: &str = "ctl00$ContentPlaceHolder1$ddlResultCount";

static COMPANY_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"cruelty_free_companies_company\.aspx").unwrap());

fn search_mode(name: &str, query: &str, description: &str, judgment: i8) -> QueryMode {
    let mut fields = BTreeMap::new();
    fields.insert(RESULT_COUNT_FIELD.to_string(), "0".to_string());

    QueryMode {
        name: name.to_string(),
        url: format!("{}?{}", SEARCH_URL, query),
        description: description.to_string(),
        judgment,
        form: Some(FormOverride { index: 1, fields }),
        category: None,
    }
}

/// Built-in configuration for PETA's cruelty-free company search.
/// Descriptions match the capitalization used on the site.
pub fn default_config() -> SourceConfig {
    SourceConfig {
        header: CampaignHeader {
            goal: "Stop animal testing".to_string(),
            campaign: "Beauty Without Bunnies".to_string(),
            author: "People For the Ethical Treatment of Animals".to_string(),
            url: "http://features.peta.org/cruelty-free-company-search/index.aspx".to_string(),
            donate_url: Some("https://secure.peta.org/site/Donation2".to_string()),
        },
        modes: vec![
            search_mode("safe", "Donottest=8&Product=0&Dotest=-1&Regchange=-1&Country=-1&Keyword=", "Does Not Test on Animals", 1),
            search_mode("consider", "Donottest=-1&Product=0&Dotest=-1&Regchange=8&Country=-1&Keyword=", "Working for Regulatory Change", 0),
            search_mode("avoid", "Donottest=-1&Product=0&Dotest=8&Regchange=-1&Country=-1&Keyword=", "Tests on Animals", -1),
        ],
        page_delay_secs: 1.0,
        max_pages: 0,
        next_label: DEFAULT_NEXT_LABEL.to_string(),
    }
}

pub struct Peta {
    config: SourceConfig,
}

impl Peta {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }
}

impl Default for Peta {
    fn default() -> Self {
        Self::new(default_config())
    }
}

impl Source for Peta {
    fn config(&self) -> &SourceConfig {
        &self.config
    }

    fn detail_links(&self, document: &Html, base: &Url) -> Vec<DetailLink> {
        links_with_href(document, &COMPANY_LINK, base)
    }

    fn extract(&self, page: &Page, mode: &QueryMode) -> Result<Record> {
        let document = page.document();

        // TODO: split off the parent company in parens, e.g. "Acure (Better Planet Brands)"
        let company = CrueltyFreeCompany {
            company: first_text(&document, COMPANY_NAME).unwrap_or_default(),
            url: first_text(&document, WEBSITE).unwrap_or_default(),
            brands: first_text(&document, BRANDS)
                .map(|text| split_brands(&text))
                .unwrap_or_default(),
        };

        Ok(Record::CrueltyFree(CrueltyFreeRecord {
            url: strip_tracking_params(&page.url),
            description: mode.description.clone(),
            judgment: mode.judgment,
            company,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COMPANY_PAGE: &str = r#"
<html><body>
  <div id="content">
    <span id="ctl00_ContentPlaceHolder1_l_CompanyName"> Acure (Better Planet Brands) </span>
    <span id="ctl00_ContentPlaceHolder1_l_Website">www.acureorganics.com </span>
    <span id="ctl00_ContentPlaceHolder1_l_Brands">Acure, Better Planet Brands ,  Foo</span>
  </div>
</body></html>
"#;

    const RESULTS_PAGE: &str = r#"
<html><body>
  <table id="results">
    <tr><td><a href="cruelty_free_companies_company.aspx?Param=101&amp;Type=Donottest">Acure</a></td></tr>
    <tr><td><a href="/about.aspx">About</a></td></tr>
    <tr><td><a href="cruelty_free_companies_company.aspx?Param=102&amp;Type=Donottest">Alba Botanica</a></td></tr>
  </table>
</body></html>
"#;

    fn company_page() -> Page {
        let url = Url::parse(
            "http://features.peta.org/cruelty-free-company-search/cruelty_free_companies_company.aspx?Param=101&Type=Donottest&Tracking=abc",
        )
        .unwrap();
        Page::new(url, COMPANY_PAGE)
    }

    fn safe() -> QueryMode {
        default_config().modes.remove(0)
    }

    #[test]
    fn test_default_config_modes() {
        let config = default_config();
        let judgments: Vec<_> = config.modes.iter().map(|m| (m.name.as_str(), m.judgment)).collect();
        assert_eq!(judgments, vec![("safe", 1), ("consider", 0), ("avoid", -1)]);

        let form = config.modes[2].form.as_ref().unwrap();
        assert_eq!(form.index, 1);
        assert_eq!(form.fields[RESULT_COUNT_FIELD], "0");
        assert!(config.modes[2].url.contains("Dotest=8"));
    }

    #[test]
    fn test_detail_links_match_company_pages() {
        let document = Html::parse_document(RESULTS_PAGE);
        let base = Url::parse(&safe().url).unwrap();
        let links = Peta::default().detail_links(&document, &base);

        assert_eq!(links.len(), 2);
        assert_eq!(links[0].label, "Acure");
        assert_eq!(
            links[1].href.as_str(),
            "http://features.peta.org/cruelty-free-company-search/cruelty_free_companies_company.aspx?Param=102&Type=Donottest"
        );
    }

    #[test]
    fn test_extract_company() {
        let record = Peta::default().extract(&company_page(), &safe()).unwrap();
        let Record::CrueltyFree(record) = record else {
            panic!("expected a cruelty-free record");
        };

        assert_eq!(
            record.url,
            "http://features.peta.org/cruelty-free-company-search/cruelty_free_companies_company.aspx?Param=101"
        );
        assert_eq!(record.description, "Does Not Test on Animals");
        assert_eq!(record.judgment, 1);
        assert_eq!(record.company.company, "Acure (Better Planet Brands)");
        assert_eq!(record.company.url, "www.acureorganics.com");
        assert_eq!(record.company.brands, vec!["Acure", "Better Planet Brands", "Foo"]);
    }

    #[test]
    fn test_extract_is_repeatable() {
        let peta = Peta::default();
        let first = serde_json::to_string(&peta.extract(&company_page(), &safe()).unwrap()).unwrap();
        let second = serde_json::to_string(&peta.extract(&company_page(), &safe()).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_extract_tolerates_missing_fields() {
        let url = Url::parse("http://features.peta.org/cruelty_free_companies_company.aspx?Param=7").unwrap();
        let page = Page::new(url, "<html><body><p>Company not found</p></body></html>");

        let Record::CrueltyFree(record) = Peta::default().extract(&page, &safe()).unwrap() else {
            panic!("expected a cruelty-free record");
        };
        assert_eq!(record.company.company, "");
        assert_eq!(record.company.url, "");
        assert!(record.company.brands.is_empty());
    }
}
