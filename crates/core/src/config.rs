// Sender Configuration
//
// Multi-tenant admission identity: either a single configured sender id or
// a set of accepted ids in multi-sender mode.

use std::collections::HashSet;

use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct SedexConfig {
    /// The single sender id when multi-sender mode is off
    pub sender_id: String,
    pub multi_sender: bool,
    /// Accepted sender ids in multi-sender mode
    pub sender_ids: HashSet<String>,
}

impl SedexConfig {
    pub fn single(sender_id: impl Into<String>) -> Self {
        Self {
            sender_id: sender_id.into(),
            multi_sender: false,
            sender_ids: HashSet::new(),
        }
    }

    pub fn multi(sender_ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            sender_id: String::new(),
            multi_sender: true,
            sender_ids: sender_ids.into_iter().collect(),
        }
    }

    fn is_valid(&self, sender_id: &str) -> bool {
        if self.multi_sender {
            self.sender_ids.contains(sender_id)
        } else {
            self.sender_id == sender_id
        }
    }

    /// Resolve the effective sender identity for an admission request.
    ///
    /// A missing id defaults to the configured id in single-sender mode;
    /// multi-sender mode requires an explicit id. Anything outside the valid
    /// set is rejected.
    pub fn resolve_sender(&self, candidate: Option<&str>) -> Result<String> {
        match candidate {
            None if !self.multi_sender => Ok(self.sender_id.clone()),
            None => Err(AppError::SenderIdValidation(
                "sender id is required in multi-sender mode".to_string(),
            )),
            Some(id) if self.is_valid(id) => Ok(id.to_string()),
            Some(id) => Err(AppError::SenderIdValidation(format!(
                "sender id {} is not in the configured set",
                id
            ))),
        }
    }
}
