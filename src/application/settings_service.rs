// Settings service - Retention settings passed through to the backend
use crate::application::error::SettingsError;
use crate::application::tank_repository::SettingsStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct SettingsService {
    store: Arc<dyn SettingsStore>,
}

fn positive(name: &'static str, value: i64) -> Result<u32, SettingsError> {
    match u32::try_from(value) {
        Ok(v) if v >= 1 => Ok(v),
        _ => Err(SettingsError::Invalid { name, value }),
    }
}

impl SettingsService {
    pub fn new(store: Arc<dyn SettingsStore>) -> Self {
        Self { store }
    }

    pub async fn storage_days(&self) -> Result<u32, SettingsError> {
        Ok(self.store.storage_days().await?)
    }

    pub async fn set_storage_days(&self, days: i64) -> Result<u32, SettingsError> {
        let days = positive("storage days", days)?;
        Ok(self.store.set_storage_days(days).await?)
    }

    pub async fn history_points(&self) -> Result<u32, SettingsError> {
        Ok(self.store.history_points().await?)
    }

    pub async fn set_history_points(&self, points: i64) -> Result<u32, SettingsError> {
        let points = positive("history points", points)?;
        Ok(self.store.set_history_points(points).await?)
    }
}
