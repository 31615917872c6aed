//! Docker Registry HTTP API v2 listing client
//!
//! Implements the two paged listings the browser needs:
//! - Repository catalog (GET /v2/_catalog)
//! - Tag listing (GET /v2/{name}/tags/list)

use crate::config::RegistryConfig;
use crate::error::handlers::{HttpErrorHandler, NetworkErrorHandler};
use crate::error::{Result, ToolkitError};
use crate::logging::Logger;
use crate::registry::pagination::PageQuery;
use async_trait::async_trait;
use reqwest::header::LINK;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

/// One page of a listing plus the raw `Link` header that came with it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub items: Vec<String>,
    pub link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    repositories: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Paged listings offered by a registry
#[async_trait]
pub trait RegistryApi: Send + Sync {
    /// One page of the repository catalog
    async fn list_repositories(&self, query: &PageQuery) -> Result<Page>;

    /// One page of the tags of `repository`
    async fn list_tags(&self, repository: &str, query: &PageQuery) -> Result<Page>;
}

#[async_trait]
impl<T: RegistryApi + ?Sized> RegistryApi for Arc<T> {
    async fn list_repositories(&self, query: &PageQuery) -> Result<Page> {
        (**self).list_repositories(query).await
    }

    async fn list_tags(&self, repository: &str, query: &PageQuery) -> Result<Page> {
        (**self).list_tags(repository, query).await
    }
}

pub struct RegistryClientBuilder {
    config: RegistryConfig,
    auth_token: Option<String>,
    output: Logger,
}

impl RegistryClientBuilder {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            auth_token: None,
            output: Logger::default(),
        }
    }

    /// Bearer token used when no username/password is configured
    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token;
        self
    }

    pub fn with_output(mut self, output: Logger) -> Self {
        self.output = output;
        self
    }

    pub fn build(self) -> Result<RegistryClient> {
        let client = self.config.http.build_client()?;
        Ok(RegistryClient {
            client,
            config: self.config,
            auth_token: self.auth_token,
            output: self.output,
        })
    }
}

#[derive(Clone)]
pub struct RegistryClient {
    client: Client,
    config: RegistryConfig,
    auth_token: Option<String>,
    output: Logger,
}

impl RegistryClient {
    pub fn builder(config: RegistryConfig) -> RegistryClientBuilder {
        RegistryClientBuilder::new(config)
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn endpoint(&self, path: &str, query: &PageQuery) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{}", self.config.url, path))?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query.to_pairs() {
                pairs.append_pair(key, &value);
            }
        }
        Ok(url)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match (&self.config.auth.username, &self.config.auth.password) {
            (Some(username), Some(password)) => request.basic_auth(username, Some(password)),
            _ => match &self.auth_token {
                Some(token) => request.bearer_auth(token),
                None => request,
            },
        }
    }

    /// GET `url`, returning the body text and `Link` header
    async fn fetch_page(&self, url: Url, operation: &str) -> Result<(String, Option<String>)> {
        self.output.verbose(&format!("GET {}", url));

        let response = self
            .authorize(self.client.get(url.clone()))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                self.output.error(&format!("Failed {}: {}", operation, e));
                NetworkErrorHandler::handle_network_error(&e, operation)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error response".to_string());
            return Err(HttpErrorHandler::handle_registry_error(
                status,
                &error_text,
                operation,
            ));
        }

        let link = response
            .headers()
            .get(LINK)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let body = response
            .text()
            .await
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, operation))?;

        Ok((body, link))
    }
}

#[async_trait]
impl RegistryApi for RegistryClient {
    async fn list_repositories(&self, query: &PageQuery) -> Result<Page> {
        let url = self.endpoint("/v2/_catalog", query)?;
        let (body, link) = self.fetch_page(url, "catalog listing").await?;

        let catalog: CatalogResponse = serde_json::from_str(&body).map_err(|e| {
            ToolkitError::Parse(format!("Failed to parse catalog response: {}", e))
        })?;
        let items = catalog.repositories.unwrap_or_default();

        self.output.verbose(&format!(
            "Catalog page returned {} repositories{}",
            items.len(),
            if link.is_some() { " (more available)" } else { "" }
        ));

        Ok(Page { items, link })
    }

    async fn list_tags(&self, repository: &str, query: &PageQuery) -> Result<Page> {
        if repository.is_empty() {
            return Err(ToolkitError::Validation(
                "Repository name cannot be empty".to_string(),
            ));
        }

        let url = self.endpoint(&format!("/v2/{}/tags/list", repository), query)?;
        let operation = format!("tag listing for {}", repository);
        let (body, link) = self.fetch_page(url, &operation).await?;

        let tags: TagsResponse = serde_json::from_str(&body).map_err(|e| {
            ToolkitError::Parse(format!("Failed to parse tags response: {}", e))
        })?;
        let items = tags.tags.unwrap_or_default();

        self.output.verbose(&format!(
            "Tag page for {} returned {} tags",
            repository,
            items.len()
        ));

        Ok(Page { items, link })
    }
}
