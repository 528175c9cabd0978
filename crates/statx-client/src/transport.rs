//! Transport over the schema and table endpoints.
//!
//! [`Transport`] is the seam between the traversal/lookup logic and the
//! network. [`HttpTransport`] talks to the real service; [`StaticTransport`]
//! serves canned responses from memory for tests and offline runs.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::credentials::{Credentials, Endpoints};
use crate::error::{Error, Result};
use crate::schema::SchemaResponse;
use crate::table::{TableRequest, TableResponse};

/// Header carrying the API key on every request.
pub const API_KEY_HEADER: &str = "APIKey";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Access to the schema and table endpoints.
///
/// Requests are issued one at a time; implementations do not need to
/// support concurrent callers beyond being `Send + Sync`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch one schema document by URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the service answers with a
    /// non-success status, or the body is not a schema document.
    async fn fetch_schema(&self, url: &str) -> Result<SchemaResponse>;

    /// Submit a table request to the data endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the service answers with a
    /// non-success status, or the body is not a table response.
    async fn submit_table(&self, request: &TableRequest) -> Result<TableResponse>;
}

/// HTTP transport against a live service.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoints: Endpoints,
    credentials: Credentials,
}

impl HttpTransport {
    /// Create a transport for the given endpoints and credentials.
    #[must_use]
    pub fn new(endpoints: Endpoints, credentials: Credentials) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            endpoints,
            credentials,
        }
    }

    /// The endpoints this transport talks to.
    #[must_use]
    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch_schema(&self, url: &str) -> Result<SchemaResponse> {
        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, self.credentials.api_key())
            .send()
            .await
            .map_err(|e| Error::Request {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                status,
                url: url.to_string(),
            });
        }

        response
            .json::<SchemaResponse>()
            .await
            .map_err(|e| Error::decode(url, e.to_string()))
    }

    async fn submit_table(&self, request: &TableRequest) -> Result<TableResponse> {
        let url = self.endpoints.table();
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, self.credentials.api_key())
            .json(request)
            .send()
            .await
            .map_err(|e| Error::Request {
                url: url.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                status,
                url: url.to_string(),
            });
        }

        response
            .json::<TableResponse>()
            .await
            .map_err(|e| Error::decode(url, e.to_string()))
    }
}

/// In-memory transport serving canned responses.
///
/// Unknown URLs answer with 404 and injected failures with 500, so error
/// paths behave the same as against a live service. Every schema fetch is
/// logged and can be inspected with [`StaticTransport::fetched_urls`].
#[derive(Debug, Default)]
pub struct StaticTransport {
    nodes: HashMap<String, SchemaResponse>,
    failures: HashSet<String>,
    table: Option<TableResponse>,
    fetch_log: Mutex<Vec<String>>,
}

impl StaticTransport {
    /// Create an empty transport. Every fetch answers 404.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `response` for schema fetches of `url`.
    pub fn insert(&mut self, url: impl Into<String>, response: SchemaResponse) {
        self.nodes.insert(url.into(), response);
    }

    /// Answer schema fetches of `url` with status 500.
    pub fn fail(&mut self, url: impl Into<String>) {
        self.failures.insert(url.into());
    }

    /// Serve `response` for table submissions.
    pub fn set_table(&mut self, response: TableResponse) {
        self.table = Some(response);
    }

    /// Every schema URL fetched so far, in order.
    #[must_use]
    pub fn fetched_urls(&self) -> Vec<String> {
        self.fetch_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Transport for StaticTransport {
    async fn fetch_schema(&self, url: &str) -> Result<SchemaResponse> {
        self.fetch_log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());

        if self.failures.contains(url) {
            return Err(Error::Http {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                url: url.to_string(),
            });
        }
        self.nodes.get(url).cloned().ok_or_else(|| Error::Http {
            status: StatusCode::NOT_FOUND,
            url: url.to_string(),
        })
    }

    async fn submit_table(&self, _request: &TableRequest) -> Result<TableResponse> {
        self.table.clone().ok_or_else(|| Error::Http {
            status: StatusCode::NOT_FOUND,
            url: "static transport table endpoint".to_string(),
        })
    }
}
