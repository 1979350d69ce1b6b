use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

use crate::error::KbError;
use crate::retry::RetryPolicy;

/// Shared JSON-over-HTTP plumbing for the Wikimedia clients.
#[derive(Clone)]
pub(crate) struct JsonFetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl JsonFetcher {
    pub(crate) fn new(user_agent: &str, timeout_secs: u64, retry: RetryPolicy) -> Result<Self, KbError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client, retry })
    }

    /// GET `url` and decode JSON, retrying transient failures.
    /// A 404 is an answer, not a failure: it yields `None`.
    pub(crate) async fn get_json(
        &self,
        operation: &str,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<Value>, KbError> {
        self.retry
            .retry(operation, || self.get_once(url, query))
            .await
    }

    async fn get_once(&self, url: &str, query: &[(&str, &str)]) -> Result<Option<Value>, KbError> {
        let response = self.client.get(url).query(query).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(KbError::Status {
                status: response.status().as_u16(),
                url: url.to_string(),
            });
        }

        let body: Value = response.json().await?;
        Ok(Some(body))
    }
}
