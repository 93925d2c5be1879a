use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response of `/query`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult<T> {
    pub total_size: u64,
    pub done: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_records_url: Option<String>,
    pub records: Vec<T>,
}

/// Response of `POST /sobjects/{Type}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateResult {
    pub id: String,
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub errors: Vec<Value>,
}
