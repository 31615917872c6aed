//! Configuration for registry and cluster endpoints
//!
//! Values come from command-line arguments first and fall back to the
//! environment (`REGISTRY_ADDRESS`, `REGISTRY_USERNAME`, `REGISTRY_PASSWORD`,
//! `REGISTRY_TOKEN`, `LIVY_URL`, `LIVY_USERNAME`, `LIVY_PASSWORD`, `SKIP_TLS`).

use crate::error::handlers::ValidationErrorHandler;
use crate::error::{Result, ToolkitError};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub const DEFAULT_PAGE_SIZE: usize = 30;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthConfig {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl AuthConfig {
    pub fn new(username: Option<String>, password: Option<String>) -> Result<Self> {
        ValidationErrorHandler::validate_credentials(&username, &password)?;
        Ok(Self { username, password })
    }

    pub fn has_auth(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

/// Transport settings shared by both endpoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HttpConfig {
    pub skip_tls: bool,
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            skip_tls: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl HttpConfig {
    pub fn new(skip_tls: bool, timeout_secs: u64) -> Result<Self> {
        ValidationErrorHandler::validate_timeout(timeout_secs)?;
        Ok(Self {
            skip_tls,
            timeout_secs,
        })
    }

    pub fn build_client(&self) -> Result<Client> {
        let builder = Client::builder().timeout(Duration::from_secs(self.timeout_secs));
        let builder = if self.skip_tls {
            builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
        } else {
            builder
        };

        builder
            .build()
            .map_err(|e| ToolkitError::Config(format!("Failed to create HTTP client: {}", e)))
    }
}

/// Container registry endpoint (e.g. `https://myacr.azurecr.io`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegistryConfig {
    pub url: String,
    pub auth: AuthConfig,
    pub page_size: usize,
    pub http: HttpConfig,
}

impl RegistryConfig {
    pub fn new(url: &str, auth: AuthConfig, page_size: usize, http: HttpConfig) -> Result<Self> {
        let url = normalize_url(url);
        ValidationErrorHandler::validate_endpoint_url(&url, "Registry")?;
        ValidationErrorHandler::validate_page_size(page_size)?;
        Ok(Self {
            url,
            auth,
            page_size,
            http,
        })
    }

    /// Fill missing values from `REGISTRY_*` environment variables.
    pub fn resolve(
        url: Option<String>,
        username: Option<String>,
        password: Option<String>,
        page_size: usize,
        http: HttpConfig,
    ) -> Result<Self> {
        let url = url
            .or_else(|| env::var("REGISTRY_ADDRESS").ok())
            .ok_or_else(|| {
                ToolkitError::Config("Registry URL not given and REGISTRY_ADDRESS not set".to_string())
            })?;
        let auth = AuthConfig::new(
            username.or_else(|| env::var("REGISTRY_USERNAME").ok()),
            password.or_else(|| env::var("REGISTRY_PASSWORD").ok()),
        )?;
        Self::new(&url, auth, page_size, http)
    }

    /// Host name used as the registry's display name
    pub fn host(&self) -> String {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| self.url.clone())
    }
}

/// HDInsight Spark cluster endpoint (e.g. `https://mycluster.azurehdinsight.net`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterConfig {
    pub url: String,
    pub auth: AuthConfig,
    pub http: HttpConfig,
}

impl ClusterConfig {
    pub fn new(url: &str, auth: AuthConfig, http: HttpConfig) -> Result<Self> {
        let url = normalize_url(url);
        ValidationErrorHandler::validate_endpoint_url(&url, "Cluster")?;
        Ok(Self { url, auth, http })
    }

    /// Fill missing values from `LIVY_*` environment variables.
    pub fn resolve(
        url: Option<String>,
        username: Option<String>,
        password: Option<String>,
        http: HttpConfig,
    ) -> Result<Self> {
        let url = url.or_else(|| env::var("LIVY_URL").ok()).ok_or_else(|| {
            ToolkitError::Config("Cluster URL not given and LIVY_URL not set".to_string())
        })?;
        let auth = AuthConfig::new(
            username.or_else(|| env::var("LIVY_USERNAME").ok()),
            password.or_else(|| env::var("LIVY_PASSWORD").ok()),
        )?;
        Self::new(&url, auth, http)
    }

    /// Base of the Livy batch API on this cluster
    pub fn batches_url(&self) -> String {
        format!("{}/livy/batches", self.url)
    }
}

/// `SKIP_TLS=true` in the environment turns on skip-TLS even without the flag.
pub fn skip_tls_from_env(flag: bool) -> bool {
    flag || env::var("SKIP_TLS").map_or(false, |v| v == "true")
}

/// Registry bearer token from the flag, else `REGISTRY_TOKEN`. Blank values count as unset.
pub fn registry_token_from_env(token: Option<String>) -> Option<String> {
    token
        .or_else(|| env::var("REGISTRY_TOKEN").ok())
        .filter(|t| !t.trim().is_empty())
}

fn normalize_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}
