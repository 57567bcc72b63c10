use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info, warn};
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::Client;
use scraper::{Html, Selector};
use serde_json::json;
use url::Url;

use crate::error::{ExtractionError, PipelineError};
use crate::extractor::Extractor;
use crate::model::{ExtractedRecord, WorkItem};

const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0",
];

/// Fetches a listing page and returns one record per matching place link.
pub struct HttpExtractor {
    client: Client,
    link_selector: Selector,
}

impl HttpExtractor {
    pub fn new(link_selector: &str) -> Result<Self, PipelineError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("fr-FR,fr;q=0.9,en;q=0.8"));

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .default_headers(headers)
            .cookie_store(true)
            .build()
            .map_err(|e| PipelineError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        let link_selector = Selector::parse(link_selector).map_err(|e| {
            PipelineError::Configuration(format!("invalid link selector '{}': {}", link_selector, e))
        })?;

        Ok(HttpExtractor {
            client,
            link_selector,
        })
    }

    fn random_user_agent(&self) -> &'static str {
        let mut rng = rand::thread_rng();
        USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())]
    }

    /// Place links on the page, absolute, first occurrence only.
    pub fn extract_links(&self, html: &str, base_url: &Url) -> Vec<ExtractedRecord> {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        let mut records = Vec::new();

        for element in document.select(&self.link_selector) {
            let Some(href) = element.value().attr("href") else {
                continue;
            };
            let Ok(joined) = base_url.join(href) else {
                debug!("Ignoring unparsable link {}", href);
                continue;
            };
            let link = joined.to_string();
            if !seen.insert(link.clone()) {
                continue;
            }

            let mut record = ExtractedRecord::new();
            record.insert("url".into(), json!(link));
            if let Some(label) = element.value().attr("aria-label") {
                record.insert("label".into(), json!(label.trim()));
            }
            records.push(record);
        }
        records
    }
}

#[async_trait]
impl Extractor for HttpExtractor {
    async fn run(&self, item: &WorkItem) -> Result<Vec<ExtractedRecord>, ExtractionError> {
        let base_url = Url::parse(&item.payload)
            .map_err(|e| ExtractionError::Failed(format!("invalid URL {}: {}", item.payload, e)))?;

        info!("Visiting: {}", item.payload);
        let resp = self
            .client
            .get(base_url.clone())
            .header(USER_AGENT, self.random_user_agent())
            .send()
            .await
            .map_err(|e| ExtractionError::Failed(format!("request failed: {}", e)))?;

        let status = resp.status();
        if status.as_u16() == 403 || status.as_u16() == 429 {
            warn!("Blocked at {}: {}", item.payload, status);
            return Err(ExtractionError::Blocked(status.as_u16()));
        }
        if !status.is_success() {
            return Err(ExtractionError::Failed(format!("HTTP {}", status)));
        }

        let html = resp
            .text()
            .await
            .map_err(|e| ExtractionError::Failed(format!("failed to read body: {}", e)))?;

        let records = self.extract_links(&html, &base_url);
        info!("{} place link(s) found at {}", records.len(), item.payload);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_LINK_SELECTOR;

    #[test]
    fn test_extract_links_resolves_and_dedupes() {
        let extractor = HttpExtractor::new(DEFAULT_LINK_SELECTOR).unwrap();
        let html = r#"
            <div role="feed">
              <a class="hfpxzc" aria-label=" Chez Paul " href="/maps/place/chez-paul"></a>
              <a class="hfpxzc" href="https://www.google.com/maps/place/le-bistrot"></a>
              <a class="hfpxzc" href="/maps/place/chez-paul"></a>
              <a class="other" href="/maps/place/ignored"></a>
              <a class="hfpxzc"></a>
            </div>"#;
        let base = Url::parse("https://www.google.com/maps/search/brasserie/@47.99,0.19,16z").unwrap();

        let records = extractor.extract_links(html, &base);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["url"], "https://www.google.com/maps/place/chez-paul");
        assert_eq!(records[0]["label"], "Chez Paul");
        assert_eq!(records[1]["url"], "https://www.google.com/maps/place/le-bistrot");
        assert!(records[1].get("label").is_none());
    }

    #[test]
    fn test_invalid_selector_is_a_configuration_error() {
        let err = HttpExtractor::new("a[").err().unwrap();
        assert!(matches!(err, PipelineError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_invalid_payload_fails_without_network() {
        let extractor = HttpExtractor::new(DEFAULT_LINK_SELECTOR).unwrap();
        let item = WorkItem {
            category: "restaurant".into(),
            index: 0,
            payload: "not a url".into(),
        };
        let err = extractor.run(&item).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Failed(_)));
    }
}
