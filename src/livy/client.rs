//! Livy batch client for HDInsight Spark clusters
//!
//! Implements the batch endpoints used by job submission and log tailing:
//! - Full log fetch (GET /livy/batches/{id}/log)
//! - Batch status (GET /livy/batches/{id})
//! - Submission (POST /livy/batches)
//! - Kill (DELETE /livy/batches/{id})

use crate::config::ClusterConfig;
use crate::error::handlers::{HttpErrorHandler, NetworkErrorHandler};
use crate::error::{Result, ToolkitError};
use crate::livy::models::{BatchLog, BatchState, SubmissionParameters};
use crate::logging::Logger;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Livy rejects mutating requests without this header (CSRF protection)
pub const REQUESTED_BY_HEADER: &str = "X-Requested-By";
pub const REQUESTED_BY_VALUE: &str = "ambari";

/// Line window asked for when fetching the whole log
pub const FULL_LOG_SIZE: i64 = i32::MAX as i64;

/// Batch endpoints the log tailer polls
#[async_trait]
pub trait LivyApi: Send + Sync {
    /// Whole log of the batch, from line 0
    async fn fetch_log(&self, batch_id: i64) -> Result<BatchLog>;

    /// Current state of the batch
    async fn fetch_state(&self, batch_id: i64) -> Result<BatchState>;
}

#[async_trait]
impl<T: LivyApi + ?Sized> LivyApi for Arc<T> {
    async fn fetch_log(&self, batch_id: i64) -> Result<BatchLog> {
        (**self).fetch_log(batch_id).await
    }

    async fn fetch_state(&self, batch_id: i64) -> Result<BatchState> {
        (**self).fetch_state(batch_id).await
    }
}

#[derive(Clone)]
pub struct LivyClient {
    client: Client,
    config: ClusterConfig,
    output: Logger,
}

impl LivyClient {
    pub fn new(config: ClusterConfig, output: Logger) -> Result<Self> {
        let client = config.http.build_client()?;
        Ok(Self {
            client,
            config,
            output,
        })
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let request = self
            .client
            .request(method, url)
            .header(REQUESTED_BY_HEADER, REQUESTED_BY_VALUE);

        match (&self.config.auth.username, &self.config.auth.password) {
            (Some(username), Some(password)) => request.basic_auth(username, Some(password)),
            _ => request,
        }
    }

    async fn send(&self, request: RequestBuilder, operation: &str) -> Result<Response> {
        let response = request
            .send()
            .await
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, operation))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string());
        Err(HttpErrorHandler::handle_livy_error(status, &error_text, operation))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, operation: &str) -> Result<T> {
        self.output.debug(&format!("GET {}", url));
        let response = self.send(self.request(Method::GET, url), operation).await?;
        let body = response
            .text()
            .await
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, operation))?;

        serde_json::from_str(&body)
            .map_err(|e| ToolkitError::Parse(format!("Failed to parse {} response: {}", operation, e)))
    }

    /// Submit a batch job. Returns the new batch with its id and initial state.
    pub async fn submit_batch(&self, params: &SubmissionParameters) -> Result<BatchState> {
        params.validate()?;

        let url = self.config.batches_url();
        self.output.verbose(&format!("POST {}", url));

        let response = self
            .send(self.request(Method::POST, &url).json(params), "batch submission")
            .await?;
        let batch: BatchState = response
            .json()
            .await
            .map_err(|e| NetworkErrorHandler::handle_network_error(&e, "batch submission"))?;

        if batch.id.is_none() {
            return Err(ToolkitError::Livy(
                "Submission response carried no batch id".to_string(),
            ));
        }

        Ok(batch)
    }

    /// Kill (delete) a batch job
    pub async fn kill_batch(&self, batch_id: i64) -> Result<()> {
        let url = format!("{}/{}", self.config.batches_url(), batch_id);
        self.output.verbose(&format!("DELETE {}", url));

        self.send(
            self.request(Method::DELETE, &url),
            &format!("kill of batch {}", batch_id),
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl LivyApi for LivyClient {
    async fn fetch_log(&self, batch_id: i64) -> Result<BatchLog> {
        let url = format!(
            "{}/{}/log?from=0&size={}",
            self.config.batches_url(),
            batch_id,
            FULL_LOG_SIZE
        );
        self.get_json(&url, &format!("log fetch of batch {}", batch_id))
            .await
    }

    async fn fetch_state(&self, batch_id: i64) -> Result<BatchState> {
        let url = format!("{}/{}", self.config.batches_url(), batch_id);
        self.get_json(&url, &format!("status of batch {}", batch_id))
            .await
    }
}
