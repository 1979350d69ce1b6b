use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::error::KbError;
use crate::http::JsonFetcher;
use crate::retry::RetryPolicy;
use crate::wikidata::{WikidataSettings, is_entity_id};

/// Source of encyclopedia article text for an entity.
#[async_trait]
pub trait ArticleSource: Send + Sync {
    /// Plain text of the article linked to `entity`, `None` when the entity
    /// has no article in the configured language.
    async fn article_text(&self, entity: &str) -> Result<Option<String>, KbError>;
}

/// Articles from the Wikipedia edition matching the configured language,
/// resolved through the entity's Wikidata sitelink.
#[derive(Clone)]
pub struct WikipediaClient {
    http: JsonFetcher,
    entity_data_url: String,
    language: String,
}

impl WikipediaClient {
    pub fn new(settings: &WikidataSettings, retry: RetryPolicy) -> Result<Self, KbError> {
        let http = JsonFetcher::new(&settings.user_agent, settings.request_timeout_secs, retry)?;
        Ok(Self {
            http,
            entity_data_url: settings.entity_data_url.clone(),
            language: settings.language.clone(),
        })
    }

    fn api_url(&self) -> String {
        format!("https://{}.wikipedia.org/w/api.php", self.language)
    }
}

#[async_trait]
impl ArticleSource for WikipediaClient {
    async fn article_text(&self, entity: &str) -> Result<Option<String>, KbError> {
        if !is_entity_id(entity) {
            return Ok(None);
        }

        let url = format!("{}/{}.json", self.entity_data_url, entity);
        let Some(doc) = self.http.get_json("wikidata.sitelinks", &url, &[]).await? else {
            return Ok(None);
        };
        let Some(title) = parse_sitelink_title(&doc, entity, &self.language) else {
            debug!(entity, "No article sitelink");
            return Ok(None);
        };

        let api_url = self.api_url();
        let page = self
            .http
            .get_json(
                "wikipedia.extract",
                &api_url,
                &[
                    ("action", "query"),
                    ("prop", "extracts"),
                    ("explaintext", "1"),
                    ("redirects", "1"),
                    ("format", "json"),
                    ("titles", title.as_str()),
                ],
            )
            .await?;

        Ok(page.as_ref().and_then(parse_extract))
    }
}

pub fn parse_sitelink_title(doc: &Value, entity: &str, language: &str) -> Option<String> {
    let entities = doc.get("entities")?.as_object()?;
    let data = entities.get(entity).or_else(|| entities.values().next())?;
    data.get("sitelinks")?
        .get(format!("{}wiki", language))?
        .get("title")?
        .as_str()
        .map(String::from)
}

pub fn parse_extract(doc: &Value) -> Option<String> {
    doc.pointer("/query/pages")?
        .as_object()?
        .values()
        .find_map(|page| page.get("extract").and_then(Value::as_str))
        .map(String::from)
}
