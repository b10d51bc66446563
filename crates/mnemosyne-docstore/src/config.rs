//! Configuration for the document-store provider.

use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the document-store provider.
#[derive(Debug, Clone)]
pub struct DocStoreConfig {
    /// Document-store URL (e.g. `https://docs.example.com`).
    pub url: String,

    /// Database written to when the resolver yields no other target.
    pub default_database: String,

    /// Authentication configuration.
    pub auth: DocStoreAuth,

    /// Request timeout.
    pub timeout: Duration,

    /// TLS configuration for mTLS.
    pub tls: Option<TlsConfig>,

    /// User agent string.
    pub user_agent: String,
}

impl DocStoreConfig {
    /// Creates a configuration for the given store URL.
    ///
    /// # Examples
    ///
    /// ```
    /// use mnemosyne_docstore::DocStoreConfig;
    ///
    /// let config = DocStoreConfig::new("https://docs.example.com");
    /// assert_eq!(config.default_database, "events");
    /// ```
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            default_database: "events".to_string(),
            auth: DocStoreAuth::None,
            timeout: Duration::from_secs(30),
            tls: None,
            user_agent: format!("mnemosyne-docstore/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Sets the default database.
    #[must_use]
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.default_database = database.into();
        self
    }

    /// Sets the authentication method.
    #[must_use]
    pub fn with_auth(mut self, auth: DocStoreAuth) -> Self {
        self.auth = auth;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the TLS configuration.
    #[must_use]
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }
}

/// Authentication methods for document-store access.
#[derive(Debug, Clone)]
pub enum DocStoreAuth {
    /// No authentication (for local development).
    None,

    /// Basic authentication.
    Basic {
        /// Username.
        username: String,
        /// Password or token.
        password: String,
    },

    /// Bearer token authentication.
    Bearer {
        /// Token value.
        token: String,
    },
}

impl DocStoreAuth {
    /// Creates basic authentication.
    #[must_use]
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Creates bearer token authentication.
    #[must_use]
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer {
            token: token.into(),
        }
    }
}

/// TLS configuration for mTLS connections.
#[derive(Debug, Clone, Default)]
pub struct TlsConfig {
    /// Path to a CA certificate file.
    pub ca_cert: Option<PathBuf>,

    /// Path to a client certificate file.
    pub client_cert: Option<PathBuf>,

    /// Path to a client private key file.
    pub client_key: Option<PathBuf>,

    /// Whether to skip certificate verification. Testing only.
    pub insecure_skip_verify: bool,
}

impl TlsConfig {
    /// Creates an empty TLS configuration.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ca_cert: None,
            client_cert: None,
            client_key: None,
            insecure_skip_verify: false,
        }
    }

    /// Sets the CA certificate path.
    #[must_use]
    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert = Some(path.into());
        self
    }

    /// Sets client certificate and key paths for mTLS.
    #[must_use]
    pub fn with_client_cert(mut self, cert: impl Into<PathBuf>, key: impl Into<PathBuf>) -> Self {
        self.client_cert = Some(cert.into());
        self.client_key = Some(key.into());
        self
    }

    /// Skips certificate verification. Never use in production.
    #[must_use]
    pub const fn insecure(mut self) -> Self {
        self.insecure_skip_verify = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = DocStoreConfig::new("https://docs.example.com");
        assert_eq!(config.url, "https://docs.example.com");
        assert_eq!(config.default_database, "events");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.tls.is_none());
    }

    #[test]
    fn test_config_with_database() {
        let config = DocStoreConfig::new("https://docs.example.com").with_database("audit");
        assert_eq!(config.default_database, "audit");
    }

    #[test]
    fn test_basic_auth() {
        let auth = DocStoreAuth::basic("user", "pass");
        assert!(matches!(
            auth,
            DocStoreAuth::Basic { username, password }
            if username == "user" && password == "pass"
        ));
    }

    #[test]
    fn test_bearer_auth() {
        let auth = DocStoreAuth::bearer("token123");
        assert!(matches!(
            auth,
            DocStoreAuth::Bearer { token } if token == "token123"
        ));
    }

    #[test]
    fn test_tls_config() {
        let tls = TlsConfig::new()
            .with_ca_cert("/pki/ca.crt")
            .with_client_cert("/pki/client.crt", "/pki/client.key");

        assert_eq!(tls.ca_cert, Some(PathBuf::from("/pki/ca.crt")));
        assert_eq!(tls.client_cert, Some(PathBuf::from("/pki/client.crt")));
        assert_eq!(tls.client_key, Some(PathBuf::from("/pki/client.key")));
        assert!(!tls.insecure_skip_verify);
    }
}
