//! Livy batch REST payloads

use crate::error::{Result, ToolkitError};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Response of `GET /livy/batches/{id}/log`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BatchLog {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub from: Option<i64>,
    #[serde(default)]
    pub total: usize,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub log: Vec<String>,
}

/// Response of `GET /livy/batches/{id}` and `POST /livy/batches`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BatchState {
    #[serde(default)]
    pub id: Option<i64>,
    pub state: String,
    #[serde(default, rename = "appId")]
    pub app_id: Option<String>,
}

impl BatchState {
    /// `Some(succeeded)` when the state ends the job, `None` while it may still run.
    ///
    /// Only `success`, `error` and `dead` count; anything else keeps polling.
    pub fn terminal_outcome(&self) -> Option<bool> {
        match self.state.to_lowercase().as_str() {
            "success" => Some(true),
            "error" | "dead" => Some(false),
            _ => None,
        }
    }
}

/// Body of `POST /livy/batches`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionParameters {
    /// Artifact to run (jar or python file), as a cluster-visible path
    pub file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub jars: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub py_files: Vec<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub conf: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_memory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver_cores: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor_memory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executor_cores: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_executors: Option<u32>,
}

impl SubmissionParameters {
    pub fn validate(&self) -> Result<()> {
        if self.file.trim().is_empty() {
            return Err(ToolkitError::Validation(
                "Submission needs an artifact file".to_string(),
            ));
        }

        if self.file.ends_with(".jar") && self.class_name.as_deref().map_or(true, str::is_empty) {
            return Err(ToolkitError::Validation(format!(
                "Main class name is required for jar artifact {}",
                self.file
            )));
        }

        Ok(())
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}
