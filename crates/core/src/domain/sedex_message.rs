// SedexMessage Entity
//
// One row per outbound transport message produced by the external batcher.
// The batcher owns the writes; the core only aggregates over them.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SedexMessageState {
    Created,
    Sent,
    Successful,
    Failed,
}

impl std::fmt::Display for SedexMessageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SedexMessageState::Created => write!(f, "CREATED"),
            SedexMessageState::Sent => write!(f, "SENT"),
            SedexMessageState::Successful => write!(f, "SUCCESSFUL"),
            SedexMessageState::Failed => write!(f, "FAILED"),
        }
    }
}

impl SedexMessageState {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATED" => Some(SedexMessageState::Created),
            "SENT" => Some(SedexMessageState::Sent),
            "SUCCESSFUL" => Some(SedexMessageState::Successful),
            "FAILED" => Some(SedexMessageState::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, SedexMessageState::Successful | SedexMessageState::Failed)
    }

    fn rank(self) -> u8 {
        match self {
            SedexMessageState::Created => 0,
            SedexMessageState::Sent => 1,
            SedexMessageState::Successful => 2,
            SedexMessageState::Failed => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SedexMessage {
    pub message_id: String,
    /// Present for FULL jobs
    pub job_id: Option<String>,
    pub state: SedexMessageState,
    pub created_at: i64,
    pub updated_at: i64,
}

impl SedexMessage {
    pub fn new(message_id: impl Into<String>, job_id: Option<String>, created_at: i64) -> Self {
        Self {
            message_id: message_id.into(),
            job_id,
            state: SedexMessageState::Created,
            created_at,
            updated_at: created_at,
        }
    }

    /// Monotonic state application; terminal states never regress.
    pub fn apply_state(&mut self, state: SedexMessageState, now_millis: i64) -> bool {
        if self.state.is_terminal() || state.rank() <= self.state.rank() {
            return false;
        }
        self.state = state;
        self.updated_at = now_millis;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_application() {
        let mut msg = SedexMessage::new("m1", Some("j1".to_string()), 1000);
        assert!(msg.apply_state(SedexMessageState::Sent, 2000));
        assert!(!msg.apply_state(SedexMessageState::Created, 3000));
        assert!(msg.apply_state(SedexMessageState::Successful, 4000));
        assert!(!msg.apply_state(SedexMessageState::Failed, 5000));
        assert_eq!(msg.state, SedexMessageState::Successful);
    }
}
