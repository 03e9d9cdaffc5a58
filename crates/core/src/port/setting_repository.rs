// Setting Repository Port (Interface)

use crate::domain::Setting;
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for persisted key/value settings
#[async_trait]
pub trait SettingRepository: Send + Sync {
    /// Find a setting by its unique key
    async fn find_by_key(&self, key: &str) -> Result<Option<Setting>>;

    /// Insert or update a setting
    async fn upsert(&self, setting: &Setting) -> Result<()>;
}

pub mod mocks {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// In-memory setting store for tests
    pub struct InMemorySettingRepository {
        settings: Mutex<HashMap<String, String>>,
    }

    impl InMemorySettingRepository {
        pub fn new() -> Self {
            Self {
                settings: Mutex::new(HashMap::new()),
            }
        }
    }

    impl Default for InMemorySettingRepository {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl SettingRepository for InMemorySettingRepository {
        async fn find_by_key(&self, key: &str) -> Result<Option<Setting>> {
            let settings = self.settings.lock().unwrap();
            Ok(settings.get(key).map(|v| Setting::new(key, v.clone())))
        }

        async fn upsert(&self, setting: &Setting) -> Result<()> {
            let mut settings = self.settings.lock().unwrap();
            settings.insert(setting.key.clone(), setting.value.clone());
            Ok(())
        }
    }
}
