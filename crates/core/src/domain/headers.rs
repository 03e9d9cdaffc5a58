// Message Header Envelope
//
// Every broker message carries a string-keyed header block; downstream
// consumers dispatch exclusively on these fields. The envelope is ephemeral:
// built at every publish point, parsed once at every consume point.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Wire keys of the header block (case-preserving, contractual)
pub const KEY_SENDER_ID: &str = "senderId";
pub const KEY_JOB_TYPE: &str = "jobType";
pub const KEY_JOB_ID: &str = "jobId";
pub const KEY_MESSAGE_CATEGORY: &str = "messageCategory";
pub const KEY_TRANSACTION_STATE: &str = "transactionState";
pub const KEY_TRANSACTION_ID: &str = "transactionId";
pub const KEY_TIMESTAMP: &str = "timestamp";

/// Admission mode discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobType {
    Partial,
    Full,
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobType::Partial => write!(f, "PARTIAL"),
            JobType::Full => write!(f, "FULL"),
        }
    }
}

impl JobType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PARTIAL" => Some(JobType::Partial),
            "FULL" => Some(JobType::Full),
            _ => None,
        }
    }
}

/// Consumer dispatch discriminator
///
/// Unknown wire values deserialize to `Unknown`; consumers ignore those
/// messages instead of rejecting them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageCategory {
    TransactionEvent,
    SedexEvent,
    Unknown,
}

impl std::fmt::Display for MessageCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageCategory::TransactionEvent => write!(f, "TRANSACTION_EVENT"),
            MessageCategory::SedexEvent => write!(f, "SEDEX_EVENT"),
            MessageCategory::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl MessageCategory {
    pub fn parse(s: &str) -> Self {
        match s {
            "TRANSACTION_EVENT" => MessageCategory::TransactionEvent,
            "SEDEX_EVENT" => MessageCategory::SedexEvent,
            _ => MessageCategory::Unknown,
        }
    }
}

/// Per-record transaction state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionState {
    New,
    Processed,
    Sent,
    Failed,
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionState::New => write!(f, "NEW"),
            TransactionState::Processed => write!(f, "PROCESSED"),
            TransactionState::Sent => write!(f, "SENT"),
            TransactionState::Failed => write!(f, "FAILED"),
        }
    }
}

impl TransactionState {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "NEW" => Some(TransactionState::New),
            "PROCESSED" => Some(TransactionState::Processed),
            "SENT" => Some(TransactionState::Sent),
            "FAILED" => Some(TransactionState::Failed),
            _ => None,
        }
    }

    /// Pipeline rank used for monotonic advancement. FAILED is the terminal
    /// sink and outranks everything.
    pub(crate) fn rank(self) -> u8 {
        match self {
            TransactionState::New => 0,
            TransactionState::Processed => 1,
            TransactionState::Sent => 2,
            TransactionState::Failed => 3,
        }
    }
}

/// Record payload carried on the `lwgs` exchange. The core never inspects
/// `payload`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonDataRecord {
    pub transaction_id: String,
    pub payload: String,
}

/// Typed view of the header block. All fields are optional on the wire;
/// which ones are required depends on the message kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageHeaders {
    pub sender_id: Option<String>,
    pub job_type: Option<JobType>,
    pub job_id: Option<String>,
    pub category: Option<MessageCategory>,
    pub transaction_state: Option<TransactionState>,
    pub transaction_id: Option<String>,
    /// Event time, epoch milliseconds
    pub timestamp: Option<i64>,
}

impl MessageHeaders {
    pub fn builder() -> MessageHeadersBuilder {
        MessageHeadersBuilder::default()
    }

    /// Broker correlation id: transaction id when present, else job id.
    pub fn correlation_id(&self) -> Option<String> {
        self.transaction_id
            .clone()
            .or_else(|| self.job_id.clone())
    }

    /// Render the wire form written onto an outbound message.
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        if let Some(v) = &self.sender_id {
            map.insert(KEY_SENDER_ID.to_string(), v.clone());
        }
        if let Some(v) = &self.job_type {
            map.insert(KEY_JOB_TYPE.to_string(), v.to_string());
        }
        if let Some(v) = &self.job_id {
            map.insert(KEY_JOB_ID.to_string(), v.clone());
        }
        if let Some(v) = &self.category {
            map.insert(KEY_MESSAGE_CATEGORY.to_string(), v.to_string());
        }
        if let Some(v) = &self.transaction_state {
            map.insert(KEY_TRANSACTION_STATE.to_string(), v.to_string());
        }
        if let Some(v) = &self.transaction_id {
            map.insert(KEY_TRANSACTION_ID.to_string(), v.clone());
        }
        if let Some(v) = &self.timestamp {
            map.insert(KEY_TIMESTAMP.to_string(), v.to_string());
        }
        map
    }

    /// Parse an untyped string-keyed mapping into typed optional fields.
    ///
    /// Unknown category values parse to `Unknown`; unknown job-type or
    /// transaction-state values and malformed timestamps parse to `None`.
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        Self {
            sender_id: map.get(KEY_SENDER_ID).cloned(),
            job_type: map.get(KEY_JOB_TYPE).and_then(|v| JobType::parse(v)),
            job_id: map.get(KEY_JOB_ID).cloned(),
            category: map
                .get(KEY_MESSAGE_CATEGORY)
                .map(|v| MessageCategory::parse(v)),
            transaction_state: map
                .get(KEY_TRANSACTION_STATE)
                .and_then(|v| TransactionState::parse(v)),
            transaction_id: map.get(KEY_TRANSACTION_ID).cloned(),
            timestamp: map.get(KEY_TIMESTAMP).and_then(|v| v.parse().ok()),
        }
    }
}

/// Builder accepting any subset of header fields
#[derive(Debug, Default)]
pub struct MessageHeadersBuilder {
    headers: MessageHeaders,
}

impl MessageHeadersBuilder {
    pub fn sender_id(mut self, sender_id: impl Into<String>) -> Self {
        self.headers.sender_id = Some(sender_id.into());
        self
    }

    pub fn job_type(mut self, job_type: JobType) -> Self {
        self.headers.job_type = Some(job_type);
        self
    }

    pub fn job_id(mut self, job_id: impl Into<String>) -> Self {
        self.headers.job_id = Some(job_id.into());
        self
    }

    pub fn category(mut self, category: MessageCategory) -> Self {
        self.headers.category = Some(category);
        self
    }

    pub fn transaction_state(mut self, state: TransactionState) -> Self {
        self.headers.transaction_state = Some(state);
        self
    }

    pub fn transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.headers.transaction_id = Some(transaction_id.into());
        self
    }

    pub fn timestamp(mut self, epoch_millis: i64) -> Self {
        self.headers.timestamp = Some(epoch_millis);
        self
    }

    /// Finish the builder. A timestamp not set explicitly defaults to the
    /// current wall clock.
    pub fn build(mut self) -> MessageHeaders {
        if self.headers.timestamp.is_none() {
            self.headers.timestamp = Some(chrono::Utc::now().timestamp_millis());
        }
        self.headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_round_trip() {
        let headers = MessageHeaders::builder()
            .sender_id("S1")
            .job_type(JobType::Full)
            .job_id("job-1")
            .category(MessageCategory::TransactionEvent)
            .transaction_state(TransactionState::New)
            .transaction_id("tx-1")
            .timestamp(1_700_000_000_123)
            .build();

        let map = headers.to_map();
        assert_eq!(map.get("senderId").unwrap(), "S1");
        assert_eq!(map.get("jobType").unwrap(), "FULL");
        assert_eq!(map.get("messageCategory").unwrap(), "TRANSACTION_EVENT");
        assert_eq!(map.get("transactionState").unwrap(), "NEW");
        assert_eq!(map.get("timestamp").unwrap(), "1700000000123");

        let parsed = MessageHeaders::from_map(&map);
        assert_eq!(parsed, headers);
    }

    #[test]
    fn test_correlation_id_prefers_transaction_id() {
        let headers = MessageHeaders::builder()
            .job_id("job-1")
            .transaction_id("tx-1")
            .build();
        assert_eq!(headers.correlation_id().unwrap(), "tx-1");

        let headers = MessageHeaders::builder().job_id("job-1").build();
        assert_eq!(headers.correlation_id().unwrap(), "job-1");

        let headers = MessageHeaders::builder().sender_id("S1").build();
        assert!(headers.correlation_id().is_none());
    }

    #[test]
    fn test_unknown_category_parses_to_unknown() {
        let mut map = HashMap::new();
        map.insert("messageCategory".to_string(), "SOMETHING_ELSE".to_string());
        let parsed = MessageHeaders::from_map(&map);
        assert_eq!(parsed.category, Some(MessageCategory::Unknown));
    }

    #[test]
    fn test_missing_job_id_is_legal() {
        let mut map = HashMap::new();
        map.insert("jobType".to_string(), "PARTIAL".to_string());
        map.insert("timestamp".to_string(), "not-a-number".to_string());
        let parsed = MessageHeaders::from_map(&map);
        assert_eq!(parsed.job_type, Some(JobType::Partial));
        assert!(parsed.job_id.is_none());
        assert!(parsed.timestamp.is_none());
    }

    #[test]
    fn test_build_defaults_timestamp() {
        let headers = MessageHeaders::builder().sender_id("S1").build();
        assert!(headers.timestamp.is_some());
    }
}
