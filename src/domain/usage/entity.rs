use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::api_key::ApiKeyId;

/// Usage log entry identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageLogEntryId(String);

impl UsageLogEntryId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UsageLogEntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single request made with an API key
///
/// Entries are write-once; nothing in the crate mutates one after append.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageLogEntry {
    id: UsageLogEntryId,
    api_key_id: ApiKeyId,
    endpoint: String,
    method: String,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    caller_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    caller_agent: Option<String>,
    response_code: u16,
}

impl UsageLogEntry {
    /// Create a new entry stamped with the current time
    pub fn new(
        api_key_id: ApiKeyId,
        endpoint: impl Into<String>,
        method: impl Into<String>,
        response_code: u16,
    ) -> Self {
        Self {
            id: UsageLogEntryId::generate(),
            api_key_id,
            endpoint: endpoint.into(),
            method: method.into(),
            timestamp: Utc::now(),
            caller_ip: None,
            caller_agent: None,
            response_code,
        }
    }

    /// Set the caller's IP address
    pub fn with_caller_ip(mut self, ip: impl Into<String>) -> Self {
        self.caller_ip = Some(ip.into());
        self
    }

    /// Set the caller's user agent
    pub fn with_caller_agent(mut self, agent: impl Into<String>) -> Self {
        self.caller_agent = Some(agent.into());
        self
    }

    pub fn id(&self) -> &UsageLogEntryId {
        &self.id
    }

    pub fn api_key_id(&self) -> &ApiKeyId {
        &self.api_key_id
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn caller_ip(&self) -> Option<&str> {
        self.caller_ip.as_deref()
    }

    pub fn caller_agent(&self) -> Option<&str> {
        self.caller_agent.as_deref()
    }

    pub fn response_code(&self) -> u16 {
        self.response_code
    }
}
