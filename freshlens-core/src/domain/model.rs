//! Applied model inventory from the metadata (GraphQL) API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::manifest::FreshnessConfig;

/// One model in an environment's applied state
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedModel {
    pub name: String,
    #[serde(default)]
    pub package_name: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
    /// Raw config: a JSON object, or a string holding one
    #[serde(default)]
    pub config: Option<serde_json::Value>,
    #[serde(default)]
    pub execution_info: Option<ExecutionInfo>,
}

/// Latest execution of an applied model
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionInfo {
    #[serde(default)]
    pub last_run_generated_at: Option<DateTime<Utc>>,
    /// e.g. `success`, `error`, `reused`, `skipped`
    #[serde(default)]
    pub last_run_status: Option<String>,
    #[serde(default)]
    pub last_success_job_definition_id: Option<i64>,
    #[serde(default)]
    pub last_success_run_id: Option<i64>,
    #[serde(default)]
    pub last_run_error: Option<String>,
    #[serde(default)]
    pub execute_completed_at: Option<DateTime<Utc>>,
}

/// The parts of a model config the analysis reads
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub freshness: Option<FreshnessConfig>,
    #[serde(default)]
    pub materialized: Option<String>,
}

impl AppliedModel {
    pub fn last_run_status(&self) -> Option<&str> {
        self.execution_info.as_ref()?.last_run_status.as_deref()
    }

    /// Decodes the config, which the API may return as an encoded string
    ///
    /// Strings holding single-quoted dict literals are normalized before
    /// decoding. Undecodable configs yield `None`.
    pub fn parsed_config(&self) -> Option<ModelConfig> {
        match self.config.as_ref()? {
            serde_json::Value::String(raw) => parse_config_string(raw),
            value => serde_json::from_value(value.clone()).ok(),
        }
    }
}

fn parse_config_string(raw: &str) -> Option<ModelConfig> {
    if let Ok(config) = serde_json::from_str(raw) {
        return Some(config);
    }
    // A JSON document encoded as a string literal
    if let Ok(serde_json::Value::String(inner)) = serde_json::from_str::<serde_json::Value>(raw) {
        return serde_json::from_str(&inner).ok();
    }
    serde_json::from_str(&dict_literal_to_json(raw)).ok()
}

/// Rewrites a Python-style dict literal into JSON
fn dict_literal_to_json(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut token = String::new();

    let flush = |token: &mut String, out: &mut String| {
        match token.as_str() {
            "None" => out.push_str("null"),
            "True" => out.push_str("true"),
            "False" => out.push_str("false"),
            other => out.push_str(other),
        }
        token.clear();
    };

    for ch in raw.chars() {
        if in_string {
            match ch {
                '\'' => {
                    in_string = false;
                    out.push('"');
                }
                '"' => out.push_str("\\\""),
                _ => out.push(ch),
            }
            continue;
        }
        match ch {
            '\'' => {
                flush(&mut token, &mut out);
                in_string = true;
                out.push('"');
            }
            c if c.is_alphanumeric() || c == '_' => token.push(c),
            c => {
                flush(&mut token, &mut out);
                out.push(c);
            }
        }
    }
    flush(&mut token, &mut out);
    out
}
