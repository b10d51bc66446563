//! Document-store provider implementation.
//!
//! The provider consumes an externally operated document database over a
//! conventional REST surface: `POST` a document to a database's
//! collection and the store answers with the identifier it assigned
//! (`events/1-A` style); `PUT` and `GET` address existing documents by
//! identifier. The wire protocol belongs to the backend; this layer only
//! maps it onto the store contract.

use crate::config::{DocStoreAuth, DocStoreConfig};
use async_trait::async_trait;
use mnemosyne_core::{
    AuditEvent, AuditStore, EventId, JsonCodec, ReplacePolicy, Result, StoreError, StoreResolver,
    StoreTarget,
};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, IF_MATCH};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;
use uuid::{Timestamp, Uuid};

/// Identifier assignment answer for an inserted document.
#[derive(Debug, Deserialize)]
struct InsertedDocument {
    id: String,
}

/// Audit store backed by an HTTP document database.
#[derive(Debug)]
pub struct DocStore {
    config: DocStoreConfig,
    base: String,
    http: reqwest::Client,
    codec: JsonCodec,
    resolver: StoreResolver,
    replace_policy: ReplacePolicy,
}

impl DocStore {
    /// Creates a provider, building an HTTP client from the
    /// configuration.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the URL is invalid or the HTTP
    /// client cannot be built.
    pub fn new(config: DocStoreConfig) -> Result<Self> {
        let http = build_http_client(&config)?;
        Self::from_client(config, http)
    }

    /// Creates a provider around a pre-built HTTP client.
    ///
    /// The client's connection handling is taken as-is; only the URL,
    /// authentication and database settings of `config` apply.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Config`] if the URL is invalid.
    pub fn from_client(config: DocStoreConfig, http: reqwest::Client) -> Result<Self> {
        let base = url::Url::parse(&config.url)
            .map_err(|e| StoreError::Config {
                message: format!("invalid document-store URL '{}': {e}", config.url),
            })?
            .to_string();
        let base = base.trim_end_matches('/').to_string();
        let resolver = StoreResolver::fixed(config.default_database.clone());

        Ok(Self {
            config,
            base,
            http,
            codec: JsonCodec::new(),
            resolver,
            replace_policy: ReplacePolicy::Upsert,
        })
    }

    /// Sets the codec.
    #[must_use]
    pub fn with_codec(mut self, codec: JsonCodec) -> Self {
        self.codec = codec;
        self
    }

    /// Sets the store resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: StoreResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Sets the replace policy. The default upserts, matching document
    /// database semantics.
    #[must_use]
    pub const fn with_replace_policy(mut self, policy: ReplacePolicy) -> Self {
        self.replace_policy = policy;
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &DocStoreConfig {
        &self.config
    }

    /// Collection URL for a database.
    fn collection_url(&self, database: &StoreTarget) -> String {
        format!("{}/databases/{database}/documents", self.base)
    }

    /// Creates authentication headers from the configuration.
    fn auth_headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();

        match &self.config.auth {
            DocStoreAuth::None => {}
            DocStoreAuth::Basic { username, password } => {
                let credentials = base64::Engine::encode(
                    &base64::engine::general_purpose::STANDARD,
                    format!("{username}:{password}"),
                );
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Basic {credentials}")).map_err(|_| {
                        StoreError::Config {
                            message: "invalid basic credentials".to_string(),
                        }
                    })?,
                );
            }
            DocStoreAuth::Bearer { token } => {
                headers.insert(
                    AUTHORIZATION,
                    HeaderValue::from_str(&format!("Bearer {token}")).map_err(|_| {
                        StoreError::Config {
                            message: "invalid bearer token".to_string(),
                        }
                    })?,
                );
            }
        }

        Ok(headers)
    }

    /// Maps a non-success status that is not a missing document.
    async fn status_failure(target: &StoreTarget, response: reqwest::Response) -> StoreError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        StoreError::Unavailable {
            target: target.clone(),
            message: format!("HTTP {status}: {body}"),
        }
    }
}

#[async_trait]
impl AuditStore for DocStore {
    fn codec(&self) -> &JsonCodec {
        &self.codec
    }

    async fn insert(&self, event: &AuditEvent) -> Result<EventId> {
        let encoded = self.codec.encode(event)?;
        let target = self.resolver.resolve(event);
        let session = DocSession::open(target);

        let response = self
            .http
            .post(self.collection_url(session.target()))
            .headers(self.auth_headers()?)
            .header("x-request-id", session.request_id())
            .header(CONTENT_TYPE, "application/json")
            .body(encoded.into_bytes())
            .send()
            .await
            .map_err(|e| unavailable(session.target(), &e))?;

        if !response.status().is_success() {
            return Err(Self::status_failure(session.target(), response).await);
        }

        let inserted: InsertedDocument =
            response
                .json()
                .await
                .map_err(|e| StoreError::Unavailable {
                    target: session.target().clone(),
                    message: format!("malformed insert answer: {e}"),
                })?;

        debug!(target = %session.target(), id = %inserted.id, kind = %event.kind, "Inserted document");
        Ok(EventId::new(inserted.id))
    }

    async fn replace(&self, id: &EventId, event: &AuditEvent) -> Result<()> {
        let encoded = self.codec.encode(event)?;
        let target = self.resolver.resolve(event);
        let session = DocSession::open(target);

        let mut request = self
            .http
            .put(self.collection_url(session.target()))
            .query(&[("id", id.as_str())])
            .headers(self.auth_headers()?)
            .header("x-request-id", session.request_id())
            .header(CONTENT_TYPE, "application/json")
            .body(encoded.into_bytes());
        if self.replace_policy == ReplacePolicy::RequireExisting {
            // `If-Match: *` only succeeds against an existing document.
            request = request.header(IF_MATCH, "*");
        }

        let response = request
            .send()
            .await
            .map_err(|e| unavailable(session.target(), &e))?;

        match response.status() {
            status if status.is_success() => {
                debug!(target = %session.target(), %id, "Replaced document");
                Ok(())
            }
            StatusCode::NOT_FOUND | StatusCode::PRECONDITION_FAILED => {
                Err(StoreError::NotFound {
                    target: session.target().clone(),
                    id: id.clone(),
                })
            }
            _ => Err(Self::status_failure(session.target(), response).await),
        }
    }

    async fn get(&self, id: &EventId) -> Result<AuditEvent> {
        self.get_from(self.resolver.default_target(), id).await
    }

    async fn get_from(&self, target: &StoreTarget, id: &EventId) -> Result<AuditEvent> {
        let session = DocSession::open(target.clone());

        let response = self
            .http
            .get(self.collection_url(session.target()))
            .query(&[("id", id.as_str())])
            .headers(self.auth_headers()?)
            .header("x-request-id", session.request_id())
            .send()
            .await
            .map_err(|e| unavailable(session.target(), &e))?;

        match response.status() {
            status if status.is_success() => {
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| unavailable(session.target(), &e))?;
                // The backend's writer is not this codec; bring the bytes
                // into canonical form before decoding.
                let normalized = self.codec.normalize(&body)?;
                self.codec
                    .decode(normalized.as_bytes())
                    .map_err(StoreError::from)
            }
            StatusCode::NOT_FOUND => Err(StoreError::NotFound {
                target: target.clone(),
                id: id.clone(),
            }),
            _ => Err(Self::status_failure(session.target(), response).await),
        }
    }
}

/// Scoped handle for one operation against one database.
///
/// Opened at the start of an operation, closed by `Drop` on every exit
/// path. Carries the request ID attached to the operation's HTTP call.
struct DocSession {
    target: StoreTarget,
    request_id: String,
}

impl DocSession {
    fn open(target: StoreTarget) -> Self {
        let request_id = Uuid::new_v7(Timestamp::now(uuid::NoContext)).to_string();
        debug!(%target, %request_id, "Opened session");
        Self { target, request_id }
    }

    const fn target(&self) -> &StoreTarget {
        &self.target
    }

    fn request_id(&self) -> &str {
        &self.request_id
    }
}

impl Drop for DocSession {
    fn drop(&mut self) {
        debug!(target = %self.target, request_id = %self.request_id, "Closed session");
    }
}

/// Maps transport failures to an availability error.
fn unavailable(target: &StoreTarget, err: &reqwest::Error) -> StoreError {
    StoreError::Unavailable {
        target: target.clone(),
        message: err.to_string(),
    }
}

/// Builds the HTTP client from the configuration.
fn build_http_client(config: &DocStoreConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(&config.user_agent);

    if let Some(ref tls) = config.tls {
        if tls.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ref ca_cert) = tls.ca_cert {
            let cert_pem = std::fs::read(ca_cert).map_err(|source| StoreError::Io {
                path: ca_cert.clone(),
                source,
            })?;
            let cert = reqwest::Certificate::from_pem(&cert_pem).map_err(|e| {
                StoreError::Config {
                    message: format!("invalid CA certificate: {e}"),
                }
            })?;
            builder = builder.add_root_certificate(cert);
        }

        if let (Some(ref cert_path), Some(ref key_path)) = (&tls.client_cert, &tls.client_key) {
            let mut cert_pem = std::fs::read(cert_path).map_err(|source| StoreError::Io {
                path: cert_path.clone(),
                source,
            })?;
            let key_pem = std::fs::read(key_path).map_err(|source| StoreError::Io {
                path: key_path.clone(),
                source,
            })?;
            cert_pem.extend_from_slice(&key_pem);

            let identity =
                reqwest::Identity::from_pem(&cert_pem).map_err(|e| StoreError::Config {
                    message: format!("invalid client certificate: {e}"),
                })?;
            builder = builder.identity(identity);
        }
    }

    builder.build().map_err(|e| StoreError::Config {
        message: format!("failed to build HTTP client: {e}"),
    })
}
