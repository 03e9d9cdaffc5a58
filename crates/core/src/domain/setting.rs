// Setting Entity
//
// Key/value configuration persisted across restarts. Created on first
// write, mutable, never deleted by the core.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    /// Unique string key
    pub key: String,
    /// Opaque string value
    pub value: String,
}

impl Setting {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}
