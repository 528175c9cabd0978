//! API credentials and endpoint addresses.

use std::fmt;

/// Base URL of the production Stat-Xplore REST service.
pub const DEFAULT_BASE_URL: &str = "https://stat-xplore.dwp.gov.uk/webapi/rest/v1";

/// An API key, passed explicitly to every request.
///
/// The key is a secret. `Debug` redacts it so it never leaks into logs.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
}

impl Credentials {
    /// Create credentials from an API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// The raw API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Schema and table endpoint URLs derived from one base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    schema_url: String,
    table_url: String,
}

impl Endpoints {
    /// Derive the endpoint URLs from a base URL.
    ///
    /// A trailing slash on the base URL is tolerated.
    #[must_use]
    pub fn for_base(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            schema_url: format!("{base}/schema"),
            table_url: format!("{base}/table"),
        }
    }

    /// URL of the schema tree root.
    #[must_use]
    pub fn schema(&self) -> &str {
        &self.schema_url
    }

    /// URL table requests are posted to.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table_url
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::for_base(DEFAULT_BASE_URL)
    }
}
