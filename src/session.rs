use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

use crate::utils::get_random_user_agent;

/// A fetched document together with the URL it was finally served from
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub url: Url,
    pub body: String,
}

impl Page {
    pub fn new(url: Url, body: impl Into<String>) -> Self {
        Self {
            url,
            body: body.into(),
        }
    }

    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMethod {
    Get,
    Post,
}

/// Everything needed to replay a form submit
#[derive(Debug, Clone, PartialEq)]
pub struct FormSubmission {
    pub method: FormMethod,
    pub action: Url,
    pub fields: Vec<(String, String)>,
}

impl FormSubmission {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Network capabilities the listing walker needs
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn get(&self, url: &Url) -> Result<Page>;

    async fn submit(&self, form: &FormSubmission) -> Result<Page>;
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow::anyhow!("Failed to parse selector '{}': {:?}", css, e))
}

/// Build the submission for the `index`-th form of `page` with `overrides`
/// applied on top of the form's own successful controls.
pub fn build_form_submission(
    page: &Page,
    index: usize,
    overrides: &BTreeMap<String, String>,
) -> Result<FormSubmission> {
    let document = page.document();
    let form = document
        .select(&selector("form")?)
        .nth(index)
        .with_context(|| format!("Form #{} not found on {}", index, page.url))?;

    let method = match form.value().attr("method") {
        Some(m) if m.eq_ignore_ascii_case("post") => FormMethod::Post,
        _ => FormMethod::Get,
    };

    let mut action = match form.value().attr("action").map(str::trim) {
        Some(action) if !action.is_empty() => page
            .url
            .join(action)
            .with_context(|| format!("Invalid form action '{}'", action))?,
        _ => page.url.clone(),
    };

    // GET submissions replace the action's query string with the fields
    if method == FormMethod::Get {
        action.set_query(None);
    }

    let mut fields = form_controls(form)?;
    for (name, value) in overrides {
        match fields.iter_mut().find(|(key, _)| key == name) {
            Some(field) => field.1 = value.clone(),
            None => fields.push((name.clone(), value.clone())),
        }
    }

    Ok(FormSubmission {
        method,
        action,
        fields,
    })
}

fn form_controls(form: ElementRef<'_>) -> Result<Vec<(String, String)>> {
    let controls = selector("input[name], select[name], textarea[name]")?;
    let options = selector("option")?;
    let mut fields = Vec::new();

    for control in form.select(&controls) {
        let element = control.value();
        let Some(name) = element.attr("name") else {
            continue;
        };
        if element.attr("disabled").is_some() {
            continue;
        }

        match element.name() {
            "input" => {
                let kind = element.attr("type").unwrap_or("text").to_ascii_lowercase();
                match kind.as_str() {
                    "submit" | "button" | "image" | "reset" | "file" => continue,
                    "checkbox" | "radio" if element.attr("checked").is_none() => continue,
                    "checkbox" | "radio" => {
                        fields.push((name.to_string(), element.attr("value").unwrap_or("on").to_string()))
                    }
                    _ => fields.push((name.to_string(), element.attr("value").unwrap_or_default().to_string())),
                }
            }
            "select" => {
                let chosen = control
                    .select(&options)
                    .find(|o| o.value().attr("selected").is_some())
                    .or_else(|| control.select(&options).next());
                if let Some(option) = chosen {
                    let value = match option.value().attr("value") {
                        Some(v) => v.to_string(),
                        None => option.text().collect::<String>().trim().to_string(),
                    };
                    fields.push((name.to_string(), value));
                }
            }
            "textarea" => fields.push((name.to_string(), control.text().collect())),
            _ => {}
        }
    }

    Ok(fields)
}

/// Cookie-keeping HTTP session backed by reqwest
pub struct HttpSession {
    client: reqwest::Client,
}

impl HttpSession {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }

    async fn into_page(response: reqwest::Response) -> Result<Page> {
        if !response.status().is_success() {
            anyhow::bail!("HTTP error: {} for {}", response.status(), response.url());
        }

        let url = response.url().clone();
        let body = response.text().await.context("Failed to read response body")?;
        Ok(Page { url, body })
    }
}

#[async_trait]
impl Fetcher for HttpSession {
    async fn get(&self, url: &Url) -> Result<Page> {
        log::debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .header("User-Agent", get_random_user_agent())
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.5")
            .send()
            .await
            .with_context(|| format!("Failed to fetch {}", url))?;

        Self::into_page(response).await
    }

    async fn submit(&self, form: &FormSubmission) -> Result<Page> {
        log::debug!("{:?} {} ({} fields)", form.method, form.action, form.fields.len());

        let request = match form.method {
            FormMethod::Post => self.client.post(form.action.clone()).form(&form.fields),
            FormMethod::Get => self.client.get(form.action.clone()).query(&form.fields),
        };

        let response = request
            .header("User-Agent", get_random_user_agent())
            .header("Referer", form.action.as_str())
            .send()
            .await
            .with_context(|| format!("Failed to submit form to {}", form.action))?;

        Self::into_page(response).await
    }
}
