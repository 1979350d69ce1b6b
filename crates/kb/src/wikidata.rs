use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::KbError;
use crate::http::JsonFetcher;
use crate::retry::RetryPolicy;
use crate::{EntityId, KnowledgeBaseApi, is_queryable};

/// "instance of"
pub const ID_INSTANCE_OF: &str = "P31";
/// "subclass of"
pub const ID_SUBCLASS_OF: &str = "P279";
/// "facet of"
pub const ID_FACET_OF: &str = "P1269";

pub const PARENT_PROPERTIES: [&str; 3] = [ID_INSTANCE_OF, ID_SUBCLASS_OF, ID_FACET_OF];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WikidataSettings {
    pub entity_data_url: String,
    pub sparql_url: String,
    pub language: String,
    pub results_limit: usize,
    pub user_agent: String,
    pub request_timeout_secs: u64,
}

impl Default for WikidataSettings {
    fn default() -> Self {
        Self {
            entity_data_url: "https://www.wikidata.org/wiki/Special:EntityData".to_string(),
            sparql_url: "https://query.wikidata.org/sparql".to_string(),
            language: "pl".to_string(),
            results_limit: 5,
            user_agent: "EntityLinking/1.0 (entity linking research; Rust reqwest)".to_string(),
            request_timeout_secs: 60,
        }
    }
}

/// Knowledge base backed directly by the public Wikidata endpoints.
#[derive(Clone)]
pub struct WikidataClient {
    http: JsonFetcher,
    settings: WikidataSettings,
}

impl WikidataClient {
    pub fn new(settings: WikidataSettings, retry: RetryPolicy) -> Result<Self, KbError> {
        let http = JsonFetcher::new(&settings.user_agent, settings.request_timeout_secs, retry)?;
        Ok(Self { http, settings })
    }

    /// Raw `Special:EntityData` document for `entity`, `None` if unknown.
    pub(crate) async fn entity_document(&self, entity: &str) -> Result<Option<Value>, KbError> {
        let url = format!("{}/{}.json", self.settings.entity_data_url, entity);
        self.http.get_json("wikidata.entity_data", &url, &[]).await
    }
}

#[async_trait]
impl KnowledgeBaseApi for WikidataClient {
    async fn parent_types(&self, entity: &str) -> Result<Vec<EntityId>, KbError> {
        if !is_entity_id(entity) {
            return Ok(Vec::new());
        }

        let parents = match self.entity_document(entity).await? {
            Some(doc) => parse_parent_types(&doc, entity)?,
            None => Vec::new(),
        };
        debug!(entity, parents = parents.len(), "Fetched parent types");
        Ok(parents)
    }

    async fn candidate_entities(&self, text: &str) -> Result<Vec<EntityId>, KbError> {
        if !is_queryable(text) {
            return Ok(Vec::new());
        }

        let query = build_search_query(text, &self.settings.language, self.settings.results_limit);
        let doc = self
            .http
            .get_json(
                "wikidata.entity_search",
                &self.settings.sparql_url,
                &[("format", "json"), ("query", query.as_str())],
            )
            .await?;

        match doc {
            Some(doc) => parse_search_bindings(&doc),
            None => Ok(Vec::new()),
        }
    }
}

/// `Q123` / `P31` style identifiers.
pub fn is_entity_id(id: &str) -> bool {
    let mut chars = id.chars();
    matches!(chars.next(), Some('Q' | 'P'))
        && id.len() > 1
        && chars.all(|c| c.is_ascii_digit())
}

/// SPARQL query running the MWAPI `EntitySearch` service, ranked by the
/// service's own ordinal.
pub fn build_search_query(text: &str, language: &str, limit: usize) -> String {
    format!(
        "SELECT * WHERE {{ \
            SERVICE wikibase:mwapi {{ \
                bd:serviceParam wikibase:api \"EntitySearch\" . \
                bd:serviceParam wikibase:endpoint \"www.wikidata.org\" . \
                bd:serviceParam mwapi:search \"{text}\" . \
                bd:serviceParam mwapi:language \"{language}\" . \
                ?item wikibase:apiOutputItem mwapi:item . \
                ?num wikibase:apiOrdinal true . \
            }} \
        }} ORDER BY ASC(?num) LIMIT {limit}"
    )
}

/// Targets of P31, P279 and P1269 claims, in that order. Claims without a
/// concrete value (`novalue`, `somevalue`) are ignored.
pub fn parse_parent_types(doc: &Value, entity: &str) -> Result<Vec<EntityId>, KbError> {
    let entities = doc
        .get("entities")
        .and_then(Value::as_object)
        .ok_or_else(|| KbError::MalformedResponse(format!("no entities for {}", entity)))?;

    // redirected ids come back under their new key
    let Some(data) = entities.get(entity).or_else(|| entities.values().next()) else {
        return Ok(Vec::new());
    };

    let mut parents = Vec::new();
    for property in PARENT_PROPERTIES {
        let Some(claims) = data.pointer(&format!("/claims/{}", property)).and_then(Value::as_array) else {
            continue;
        };

        for claim in claims {
            let mainsnak = &claim["mainsnak"];
            if mainsnak["snaktype"].as_str() != Some("value") {
                continue;
            }
            if let Some(id) = mainsnak.pointer("/datavalue/value/id").and_then(Value::as_str) {
                parents.push(id.to_string());
            }
        }
    }

    Ok(parents)
}

pub fn parse_search_bindings(doc: &Value) -> Result<Vec<EntityId>, KbError> {
    let bindings = doc
        .pointer("/results/bindings")
        .and_then(Value::as_array)
        .ok_or_else(|| KbError::MalformedResponse("missing results.bindings".to_string()))?;

    Ok(bindings
        .iter()
        .filter_map(|b| b.pointer("/item/value").and_then(Value::as_str))
        .filter_map(|uri| uri.rsplit('/').next())
        .map(String::from)
        .collect())
}
