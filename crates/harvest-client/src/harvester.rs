//! HTTP harvester.
//!
//! Talks JSON to a harvesting gateway that fronts the upstream repository.
//! Each target's `harvest_url` is the gateway base for that target:
//! - `POST {base}/harvest` starts a response at a cursor
//! - `POST {base}/harvest/more` continues it with a resumption token
//! - `GET {base}/records/{id}` fetches one full record

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use harvest_sync::{Harvester, SyncError};
use harvest_types::{Cursor, HarvestMode, HarvestPage, HarvesterSettings, Target, UpdateRecord};

use crate::error::{check_status, parse_json, ClientError};

/// Configuration for [`HttpHarvester`].
#[derive(Debug, Clone)]
pub struct HttpHarvesterConfig {
    /// Request timeout
    pub timeout: Duration,

    /// Basic-auth user, if the gateway requires one
    pub username: Option<String>,

    /// Basic-auth password
    pub password: Option<SecretString>,
}

impl Default for HttpHarvesterConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            username: None,
            password: None,
        }
    }
}

impl HttpHarvesterConfig {
    pub fn from_settings(settings: &HarvesterSettings) -> Self {
        Self {
            timeout: Duration::from_secs(settings.timeout_secs),
            username: settings.username.clone(),
            password: settings.password.clone(),
        }
    }
}

#[derive(Serialize)]
struct HarvestRequest<'a> {
    cursor: &'a Cursor,
    mode: HarvestMode,
    batch_size: usize,
}

#[derive(Serialize)]
struct ContinueRequest<'a> {
    resumption_token: &'a str,
    batch_size: usize,
}

#[derive(Deserialize)]
struct RecordsResponse {
    #[serde(default)]
    records: Vec<UpdateRecord>,
}

/// [`Harvester`] over HTTP.
pub struct HttpHarvester {
    client: Client,
    config: HttpHarvesterConfig,
}

impl HttpHarvester {
    pub fn new(config: HttpHarvesterConfig) -> Result<Self, ClientError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.username {
            Some(user) => request.basic_auth(
                user,
                self.config
                    .password
                    .as_ref()
                    .map(|p| p.expose_secret().to_string()),
            ),
            None => request,
        }
    }

    fn url(target: &Target, path: &str) -> String {
        format!("{}/{}", target.harvest_url.trim_end_matches('/'), path)
    }

    async fn post_page<B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<HarvestPage, ClientError> {
        let response = self
            .authorize(self.client.post(url))
            .json(body)
            .send()
            .await?;
        parse_json(check_status(response).await?).await
    }

    async fn get_record(&self, url: &str) -> Result<Vec<UpdateRecord>, ClientError> {
        let response = self.authorize(self.client.get(url)).send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        let body: RecordsResponse = parse_json(check_status(response).await?).await?;
        Ok(body.records)
    }
}

#[async_trait]
impl Harvester for HttpHarvester {
    async fn fetch(
        &self,
        target: &Target,
        cursor: &Cursor,
        mode: HarvestMode,
        batch_size: usize,
    ) -> Result<HarvestPage, SyncError> {
        let url = Self::url(target, "harvest");
        debug!(url = %url, cursor = %cursor, "POST harvest");
        self.post_page(
            &url,
            &HarvestRequest {
                cursor,
                mode,
                batch_size,
            },
        )
        .await
        .map_err(ClientError::into_harvest)
    }

    async fn fetch_more(
        &self,
        target: &Target,
        resumption_token: &str,
        batch_size: usize,
    ) -> Result<HarvestPage, SyncError> {
        let url = Self::url(target, "harvest/more");
        self.post_page(
            &url,
            &ContinueRequest {
                resumption_token,
                batch_size,
            },
        )
        .await
        .map_err(ClientError::into_harvest)
    }

    async fn fetch_one(
        &self,
        target: &Target,
        record_id: &str,
    ) -> Result<Vec<UpdateRecord>, SyncError> {
        let mut url = reqwest::Url::parse(&Self::url(target, "records"))
            .map_err(|e| ClientError::InvalidEndpoint(e.to_string()).into_harvest())?;
        url.path_segments_mut()
            .map_err(|_| {
                ClientError::InvalidEndpoint(target.harvest_url.clone()).into_harvest()
            })?
            .push(record_id);
        self.get_record(url.as_str())
            .await
            .map_err(ClientError::into_harvest)
    }

    fn name(&self) -> &str {
        "http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harvest_types::ResponseCursor;
    use serde_json::json;
    use wiremock::matchers::{basic_auth, body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn target(server: &MockServer) -> Target {
        Target::new("enwiki", format!("{}/enwiki", server.uri()), "idx1")
    }

    #[tokio::test]
    async fn test_fetch_sends_cursor_and_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/enwiki/harvest"))
            .and(basic_auth("harvester", "s3cret"))
            .and(body_json(json!({
                "cursor": {"kind": "timestamp", "value": "2001-01-01"},
                "mode": "unknown",
                "batch_size": 50
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "records": [{"record_id": "1", "content": "text"}],
                "resumption_token": "abc",
                "cursor": {"timestamp": "2024-01-01T00:00:00", "sequence": "12"},
                "supports_sequence": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let harvester = HttpHarvester::new(HttpHarvesterConfig {
            username: Some("harvester".into()),
            password: Some(SecretString::from("s3cret".to_string())),
            ..Default::default()
        })
        .unwrap();

        let page = harvester
            .fetch(
                &target(&server),
                &Cursor::Timestamp("2001-01-01".into()),
                HarvestMode::Unknown,
                50,
            )
            .await
            .unwrap();

        assert_eq!(page.records.len(), 1);
        assert!(page.has_more());
        assert!(page.supports_sequence);
        assert_eq!(
            page.cursor,
            ResponseCursor {
                timestamp: Some("2024-01-01T00:00:00".into()),
                sequence: Some("12".into()),
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_more_and_fetch_one() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/enwiki/harvest/more"))
            .and(body_json(json!({"resumption_token": "abc", "batch_size": 10})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"records": []})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/enwiki/records/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "records": [{"record_id": "42", "title": "Answer", "content": "full"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/enwiki/records/43"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let harvester = HttpHarvester::new(HttpHarvesterConfig::default()).unwrap();
        let target = target(&server);

        let page = harvester.fetch_more(&target, "abc", 10).await.unwrap();
        assert!(page.records.is_empty());
        assert!(!page.has_more());

        let records = harvester.fetch_one(&target, "42").await.unwrap();
        assert_eq!(records[0].title.as_deref(), Some("Answer"));
        assert!(harvester.fetch_one(&target, "43").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_server_error_is_harvest_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/enwiki/harvest"))
            .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
            .mount(&server)
            .await;

        let harvester = HttpHarvester::new(HttpHarvesterConfig::default()).unwrap();
        let result = harvester
            .fetch(
                &target(&server),
                &Cursor::Sequence("5".into()),
                HarvestMode::Sequence,
                50,
            )
            .await;

        match result {
            Err(SyncError::Harvest(message)) => assert!(message.contains("503")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
