use serde::Deserialize;
use tracing::warn;

use crate::config::RegistryConfig;
use crate::error::AppError;

use super::normalize::{normalize_study, Study, StudyListing};

/// Page size used when the filtered query comes back empty and the search
/// is retried without the status filter.
const FALLBACK_PAGE_SIZE: u16 = 5;

#[derive(Debug, Default, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    studies: Vec<Study>,
}

/// Client for the ClinicalTrials.gov v2 search API.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: reqwest::Client,
    base_url: String,
    page_size: u16,
    status_filter: Option<String>,
}

impl RegistryClient {
    pub fn new(config: &RegistryConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            page_size: config.page_size,
            status_filter: config.status_filter.clone(),
        })
    }

    /// Searches the registry for studies matching a condition term.
    ///
    /// Search never fails: a filtered query that errors or returns nothing
    /// is retried without the status filter at a reduced page size, and if
    /// that also yields nothing the result is an empty list.
    pub async fn search(&self, term: &str) -> Vec<StudyListing> {
        if self.status_filter.is_some() {
            match self.query(term, self.status_filter.as_deref(), self.page_size).await {
                Ok(studies) if !studies.is_empty() => {
                    return studies.iter().map(normalize_study).collect();
                }
                Ok(_) => {
                    warn!(term, "filtered registry search returned no studies, retrying unfiltered");
                }
                Err(error) => {
                    warn!(term, %error, "filtered registry search failed, retrying unfiltered");
                }
            }
        }

        let fallback_size = if self.status_filter.is_some() {
            FALLBACK_PAGE_SIZE
        } else {
            self.page_size
        };

        match self.query(term, None, fallback_size).await {
            Ok(studies) => studies.iter().map(normalize_study).collect(),
            Err(error) => {
                warn!(term, %error, "registry search failed");
                Vec::new()
            }
        }
    }

    async fn query(
        &self,
        term: &str,
        status: Option<&str>,
        page_size: u16,
    ) -> Result<Vec<Study>, reqwest::Error> {
        let url = format!("{}/studies", self.base_url);
        let page_size = page_size.to_string();

        let response = self
            .http
            .get(&url)
            .query(&search_params(term, status, &page_size))
            .send()
            .await?
            .error_for_status()?;

        let body: SearchResponse = response.json().await?;
        Ok(body.studies)
    }
}

fn search_params<'a>(
    term: &'a str,
    status: Option<&'a str>,
    page_size: &'a str,
) -> Vec<(&'static str, &'a str)> {
    let mut params = vec![
        ("query.term", term),
        ("pageSize", page_size),
        ("format", "json"),
    ];
    if let Some(status) = status {
        params.push(("filter.overallStatus", status));
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;

    fn config() -> RegistryConfig {
        RegistryConfig {
            base_url: "https://registry.example/api/v2/".to_string(),
            page_size: 20,
            status_filter: Some("RECRUITING".to_string()),
            timeout_secs: 30,
        }
    }

    #[test]
    fn trims_trailing_slash_from_base_url() {
        let client = RegistryClient::new(&config()).expect("client builds");
        assert_eq!(client.base_url, "https://registry.example/api/v2");
    }

    #[test]
    fn carries_status_filter_from_config() {
        let client = RegistryClient::new(&config()).expect("client builds");
        assert_eq!(client.status_filter.as_deref(), Some("RECRUITING"));
        assert_eq!(client.page_size, 20);
    }

    #[test]
    fn searches_by_term_with_optional_status_filter() {
        let filtered = search_params("lung cancer", Some("RECRUITING"), "20");
        assert!(filtered.contains(&("query.term", "lung cancer")));
        assert!(filtered.contains(&("filter.overallStatus", "RECRUITING")));

        let unfiltered = search_params("lung cancer", None, "5");
        assert!(unfiltered.contains(&("query.term", "lung cancer")));
        assert!(!unfiltered
            .iter()
            .any(|(key, _)| *key == "filter.overallStatus"));
    }

    #[test]
    fn search_response_tolerates_missing_studies_key() {
        let body: SearchResponse = serde_json::from_str("{}").expect("deserializes");
        assert!(body.studies.is_empty());
    }
}
