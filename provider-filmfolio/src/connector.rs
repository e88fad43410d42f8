//! Filmfolio API connector
//!
//! Typed operations over the service's JSON:API surface. Every JSON call
//! is routed through the resilient [`ApiTransport`]; the one exception is
//! [`upload_bytes`](FilmfolioConnector::upload_bytes), a raw PUT straight
//! to object storage with no auth, no retry and no JSON error parsing.

use crate::error::{FilmfolioError, Result};
use crate::transport::{ApiRequest, ApiTransport};
use crate::types::{
    Document, ListDocument, NewPhotographAttributes, PhotographMetadata, Resource, Roll,
    RollAttributes, UploadTarget, UploadTargetAttributes,
};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
use bytes::Bytes;
use core_auth::TokenSource;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Upload PUTs get a longer leash than JSON calls.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(300);

pub struct FilmfolioConnector {
    transport: ApiTransport,
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl FilmfolioConnector {
    pub fn new(http: Arc<dyn HttpClient>, auth: Arc<dyn TokenSource>, base_url: &str) -> Self {
        Self {
            transport: ApiTransport::new(http.clone(), auth),
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Obtain a pre-signed upload target and the pre-issued photograph id.
    #[instrument(skip(self))]
    pub async fn request_upload_target(
        &self,
        roll_id: &str,
        filename: &str,
        content_type: &str,
    ) -> Result<UploadTarget> {
        let body = json!({
            "data": {
                "type": "upload-urls",
                "attributes": {
                    "roll_id": roll_id,
                    "filename": filename,
                    "content_type": content_type,
                }
            }
        });

        let value = self
            .transport
            .send(&ApiRequest::post(self.url("/photographs/upload-url"), body))
            .await?
            .ok_or_else(|| FilmfolioError::InvalidResponse("empty upload-url response".into()))?;

        let document: Document<UploadTargetAttributes> = serde_json::from_value(value)
            .map_err(|e| FilmfolioError::InvalidResponse(e.to_string()))?;

        debug!(photograph_id = %document.data.id, "Upload target issued");
        Ok(UploadTarget {
            photograph_id: document.data.id,
            upload_url: document.data.attributes.upload_url,
            upload_headers: document.data.attributes.upload_headers,
            storage_key: document.data.attributes.storage_key,
        })
    }

    /// Raw unauthenticated PUT of file content to a pre-signed URL.
    ///
    /// Success is status 200 or 204; anything else fails. Deliberately
    /// outside the retry policy, which is scoped to the JSON API.
    #[instrument(skip(self, content, upload_headers), fields(bytes = content.len()))]
    pub async fn upload_bytes(
        &self,
        upload_url: &str,
        upload_headers: &HashMap<String, String>,
        content: Bytes,
    ) -> Result<()> {
        let mut request =
            HttpRequest::new(HttpMethod::Put, upload_url).timeout(UPLOAD_TIMEOUT);
        for (name, value) in upload_headers {
            request = request.header(name, value);
        }
        request = request.body(content);

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| FilmfolioError::Network {
                attempts: 1,
                message: e.to_string(),
            })?;

        match response.status {
            200 | 204 => {
                debug!("Upload accepted");
                Ok(())
            }
            status => {
                warn!(status, "Object storage rejected upload");
                Err(FilmfolioError::UploadFailed { status })
            }
        }
    }

    /// Create (upsert) a photograph record under its pre-issued id.
    ///
    /// Returns the server-confirmed id, normally identical to the one
    /// submitted.
    #[instrument(skip(self))]
    pub async fn create_photograph(
        &self,
        photograph_id: &str,
        roll_id: &str,
        storage_key: &str,
        filename: &str,
        position: u32,
    ) -> Result<String> {
        let body = serde_json::to_value(Document {
            data: Resource {
                id: photograph_id.to_string(),
                kind: "photographs".to_string(),
                attributes: NewPhotographAttributes {
                    roll_id: roll_id.to_string(),
                    storage_key: storage_key.to_string(),
                    filename: filename.to_string(),
                    position,
                },
            },
        })
        .map_err(|e| FilmfolioError::InvalidResponse(e.to_string()))?;

        let value = self
            .transport
            .send(&ApiRequest::post(self.url("/photographs"), body))
            .await?
            .ok_or_else(|| FilmfolioError::InvalidResponse("empty create response".into()))?;

        let id = value
            .pointer("/data/id")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| FilmfolioError::InvalidResponse("create response lacks data.id".into()))?
            .to_string();

        info!(photograph_id = %id, "Photograph record created");
        Ok(id)
    }

    /// Partial update of descriptive metadata only.
    ///
    /// Never touches the storage key or roll membership.
    #[instrument(skip(self, metadata))]
    pub async fn update_photograph(
        &self,
        photograph_id: &str,
        metadata: &PhotographMetadata,
    ) -> Result<()> {
        let body = json!({
            "data": {
                "id": photograph_id,
                "type": "photographs",
                "attributes": metadata,
            }
        });

        self.transport
            .send(&ApiRequest::patch(
                self.url(&format!("/photographs/{photograph_id}")),
                body,
            ))
            .await?;

        debug!(photograph_id, "Photograph metadata updated");
        Ok(())
    }

    /// Delete a photograph record. Callers treat failure as non-fatal.
    #[instrument(skip(self))]
    pub async fn delete_photograph(&self, photograph_id: &str) -> Result<()> {
        self.transport
            .send(&ApiRequest::delete(
                self.url(&format!("/photographs/{photograph_id}")),
            ))
            .await?;
        debug!(photograph_id, "Photograph record deleted");
        Ok(())
    }

    /// All rolls, following the `links.next` cursor until exhausted.
    ///
    /// Pages are concatenated in server order.
    #[instrument(skip(self))]
    pub async fn list_rolls(&self) -> Result<Vec<Roll>> {
        let mut rolls = Vec::new();
        let mut next_url = Some(self.url("/rolls"));

        while let Some(url) = next_url {
            let value = self
                .transport
                .send(&ApiRequest::get(url))
                .await?
                .ok_or_else(|| FilmfolioError::InvalidResponse("empty roll listing".into()))?;

            let page: ListDocument<RollAttributes> = serde_json::from_value(value)
                .map_err(|e| FilmfolioError::InvalidResponse(e.to_string()))?;

            rolls.extend(page.data.into_iter().map(Roll::from));
            next_url = page.links.and_then(|links| links.next);
        }

        debug!(count = rolls.len(), "Listed rolls");
        Ok(rolls)
    }

    /// Create a roll under a client-generated id.
    ///
    /// The id is minted locally so callers can reference the roll before
    /// the round-trip completes.
    #[instrument(skip(self))]
    pub async fn create_roll(&self, name: &str, date: Option<&str>) -> Result<Roll> {
        let id = Uuid::new_v4().to_string();
        let body = serde_json::to_value(Document {
            data: Resource {
                id: id.clone(),
                kind: "rolls".to_string(),
                attributes: RollAttributes {
                    name: Some(name.to_string()),
                    date: date.map(str::to_string),
                },
            },
        })
        .map_err(|e| FilmfolioError::InvalidResponse(e.to_string()))?;

        self.transport
            .send(&ApiRequest::post(self.url("/rolls"), body))
            .await?;

        info!(roll_id = %id, "Roll created");
        Ok(Roll {
            id,
            name: Some(name.to_string()),
            date: date.map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::HttpResponse;
    use mockall::mock;
    use std::sync::atomic::{AtomicU32, Ordering};

    mock! {
        pub Http {}

        #[async_trait::async_trait]
        impl HttpClient for Http {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    struct StaticToken;

    #[async_trait::async_trait]
    impl TokenSource for StaticToken {
        async fn access_token(&self) -> core_auth::Result<String> {
            Ok("t1".to_string())
        }

        async fn refresh(&self) -> core_auth::Result<bool> {
            Ok(false)
        }
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: HashMap::new(),
            body: Bytes::from(body.to_string()),
        }
    }

    fn connector(http: MockHttp) -> FilmfolioConnector {
        FilmfolioConnector::new(Arc::new(http), Arc::new(StaticToken), "https://api.test/")
    }

    #[tokio::test]
    async fn test_request_upload_target_parses_envelope() {
        let mut http = MockHttp::new();
        http.expect_execute().times(1).returning(|request| {
            assert_eq!(request.url, "https://api.test/photographs/upload-url");
            Ok(response(
                200,
                r#"{"data": {"id": "p7", "type": "upload-urls", "attributes": {
                    "upload_url": "https://storage.test/k7",
                    "upload_headers": {"x-amz-acl": "private"},
                    "storage_key": "k7"
                }}}"#,
            ))
        });

        let target = connector(http)
            .request_upload_target("r1", "img_0001.jpg", "image/jpeg")
            .await
            .unwrap();

        assert_eq!(target.photograph_id, "p7");
        assert_eq!(target.storage_key, "k7");
        assert_eq!(
            target.upload_headers.get("x-amz-acl").map(String::as_str),
            Some("private")
        );
    }

    #[tokio::test]
    async fn test_request_upload_target_rejects_malformed_body() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(response(200, r#"{"data": {"id": "p7"}}"#)));

        let err = connector(http)
            .request_upload_target("r1", "img.jpg", "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, FilmfolioError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_upload_bytes_is_raw_unauthenticated_put() {
        let mut http = MockHttp::new();
        http.expect_execute().times(1).returning(|request| {
            assert_eq!(request.method, HttpMethod::Put);
            assert_eq!(request.url, "https://storage.test/k7");
            assert!(!request.headers.contains_key("Authorization"));
            assert_eq!(
                request.headers.get("x-amz-acl").map(String::as_str),
                Some("private")
            );
            Ok(response(200, ""))
        });

        let mut headers = HashMap::new();
        headers.insert("x-amz-acl".to_string(), "private".to_string());
        connector(http)
            .upload_bytes("https://storage.test/k7", &headers, Bytes::from_static(b"jpeg"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_upload_bytes_rejects_other_statuses() {
        let mut http = MockHttp::new();
        http.expect_execute()
            .times(1)
            .returning(|_| Ok(response(403, "denied")));

        let err = connector(http)
            .upload_bytes("https://storage.test/k7", &HashMap::new(), Bytes::new())
            .await
            .unwrap_err();
        assert!(matches!(err, FilmfolioError::UploadFailed { status: 403 }));
    }

    #[tokio::test]
    async fn test_create_photograph_returns_server_id() {
        let mut http = MockHttp::new();
        http.expect_execute().times(1).returning(|request| {
            let body: serde_json::Value =
                serde_json::from_slice(request.body.as_ref().unwrap()).unwrap();
            assert_eq!(body["data"]["id"], "p7");
            assert_eq!(body["data"]["attributes"]["roll_id"], "r1");
            assert_eq!(body["data"]["attributes"]["position"], 3);
            Ok(response(
                201,
                r#"{"data": {"id": "p7", "type": "photographs", "attributes": {}}}"#,
            ))
        });

        let id = connector(http)
            .create_photograph("p7", "r1", "k7", "img.jpg", 3)
            .await
            .unwrap();
        assert_eq!(id, "p7");
    }

    #[tokio::test]
    async fn test_list_rolls_follows_next_links_in_order() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut http = MockHttp::new();
        let counter = calls.clone();
        http.expect_execute().times(2).returning(move |request| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                assert_eq!(request.url, "https://api.test/rolls");
                Ok(response(
                    200,
                    r#"{"data": [{"id": "r1", "type": "rolls", "attributes": {"name": "A"}}],
                        "links": {"next": "https://api.test/rolls?page=2"}}"#,
                ))
            } else {
                assert_eq!(request.url, "https://api.test/rolls?page=2");
                Ok(response(
                    200,
                    r#"{"data": [{"id": "r2", "type": "rolls", "attributes": {"name": "B"}}]}"#,
                ))
            }
        });

        let rolls = connector(http).list_rolls().await.unwrap();
        assert_eq!(
            rolls.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
            vec!["r1", "r2"]
        );
    }

    #[tokio::test]
    async fn test_create_roll_submits_client_generated_id() {
        let mut http = MockHttp::new();
        http.expect_execute().times(1).returning(|request| {
            let body: serde_json::Value =
                serde_json::from_slice(request.body.as_ref().unwrap()).unwrap();
            let id = body["data"]["id"].as_str().unwrap();
            assert!(Uuid::parse_str(id).is_ok());
            assert_eq!(body["data"]["attributes"]["name"], "Summer 2024");
            assert_eq!(body["data"]["attributes"]["date"], "2024-07-01");
            Ok(response(201, ""))
        });

        let roll = connector(http)
            .create_roll("Summer 2024", Some("2024-07-01"))
            .await
            .unwrap();
        assert!(Uuid::parse_str(&roll.id).is_ok());
        assert_eq!(roll.name.as_deref(), Some("Summer 2024"));
    }

    #[tokio::test]
    async fn test_update_photograph_targets_record_url() {
        let mut http = MockHttp::new();
        http.expect_execute().times(1).returning(|request| {
            assert_eq!(request.url, "https://api.test/photographs/p7");
            assert_eq!(
                request.headers.get("X-HTTP-Method-Override").map(String::as_str),
                Some("PATCH")
            );
            Ok(response(200, r#"{"data": {"id": "p7", "type": "photographs", "attributes": {}}}"#))
        });

        let metadata = PhotographMetadata {
            rating: Some(5),
            selected: true,
            ..Default::default()
        };
        connector(http).update_photograph("p7", &metadata).await.unwrap();
    }
}
