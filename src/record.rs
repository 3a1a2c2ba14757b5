use serde::{Deserialize, Serialize};

/// Company as listed in the cruelty-free directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrueltyFreeCompany {
    pub company: String,
    pub url: String,
    pub brands: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrueltyFreeRecord {
    /// Detail page, without tracking parameters
    pub url: String,
    pub description: String,
    pub judgment: i8,
    pub company: CrueltyFreeCompany,
}

/// Company as listed in the certification directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertifiedCompany {
    pub company: String,
    /// Homepage reduced to scheme, host and first path segment
    #[serde(rename = "url", default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// The directory lists no brands; always serialized, usually empty
    #[serde(default)]
    pub brands: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificationRecord {
    pub url: String,
    pub description: String,
    pub judgment: i8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_score: Option<u32>,
    pub company: CertifiedCompany,
}

/// One extracted entity, ready to be emitted
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Record {
    Certification(CertificationRecord),
    CrueltyFree(CrueltyFreeRecord),
}

/// Flattened view used by the aggregate output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanySummary {
    pub name: String,
    pub url: String,
    pub brands: Vec<String>,
    pub rating: String,
}

impl Record {
    pub fn company_name(&self) -> &str {
        match self {
            Record::Certification(r) => &r.company.company,
            Record::CrueltyFree(r) => &r.company.company,
        }
    }

    pub fn judgment(&self) -> i8 {
        match self {
            Record::Certification(r) => r.judgment,
            Record::CrueltyFree(r) => r.judgment,
        }
    }

    pub fn summary(&self) -> CompanySummary {
        match self {
            Record::Certification(r) => CompanySummary {
                name: r.company.company.clone(),
                url: r.company.domain.clone().unwrap_or_else(|| r.url.clone()),
                brands: r.company.brands.clone(),
                rating: r.description.clone(),
            },
            Record::CrueltyFree(r) => CompanySummary {
                name: r.company.company.clone(),
                url: r.company.url.clone(),
                brands: r.company.brands.clone(),
                rating: r.description.clone(),
            },
        }
    }
}

impl From<CertificationRecord> for Record {
    fn from(record: CertificationRecord) -> Self {
        Record::Certification(record)
    }
}

impl From<CrueltyFreeRecord> for Record {
    fn from(record: CrueltyFreeRecord) -> Self {
        Record::CrueltyFree(record)
    }
}
