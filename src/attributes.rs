use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::alexa::Attributes;

pub const SPREADSHEET_ID_KEY: &str = "spreadsheetId";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("attribute store query failed: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("stored attributes are not a JSON object: {0}")]
    Json(#[from] serde_json::Error),
}

/// Cross-session key-value state per user id.
#[async_trait]
pub trait AttributeStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<Attributes>, StoreError>;

    async fn set(&self, user_id: &str, attributes: &Attributes) -> Result<(), StoreError>;
}

/// Holds the session attributes of one request and buffers persistent
/// attribute writes until [`AttributesManager::save_persistent_attributes`].
pub struct AttributesManager {
    user_id: String,
    session: Attributes,
    store: Arc<dyn AttributeStore>,
    persistent: Option<Attributes>,
    dirty: bool,
}

impl AttributesManager {
    pub fn new(
        user_id: impl Into<String>,
        session: Attributes,
        store: Arc<dyn AttributeStore>,
    ) -> Self {
        AttributesManager {
            user_id: user_id.into(),
            session,
            store,
            persistent: None,
            dirty: false,
        }
    }

    pub fn session_attributes(&self) -> &Attributes {
        &self.session
    }

    pub fn set_session_attributes(&mut self, attributes: Attributes) {
        self.session = attributes;
    }

    pub fn into_session_attributes(self) -> Attributes {
        self.session
    }

    /// Loads once per request; later calls return the buffered copy.
    pub async fn persistent_attributes(&mut self) -> Result<&Attributes, StoreError> {
        if self.persistent.is_none() {
            let loaded = self
                .store
                .get(&self.user_id)
                .await
                .inspect_err(|err| {
                    tracing::error!(
                        "Failed to load persistent attributes for user_id={}: {}",
                        &self.user_id,
                        err
                    )
                })?
                .unwrap_or_default();
            tracing::debug!(
                "Retrieved persistent attributes for user_id={}: {}",
                &self.user_id,
                serde_json::Value::Object(loaded.clone())
            );
            self.persistent = Some(loaded);
        }

        Ok(self.persistent.get_or_insert_with(Attributes::new))
    }

    pub fn set_persistent_attributes(&mut self, attributes: Attributes) {
        self.persistent = Some(attributes);
        self.dirty = true;
    }

    pub async fn save_persistent_attributes(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }

        let attributes = self.persistent.clone().unwrap_or_default();
        self.store
            .set(&self.user_id, &attributes)
            .await
            .inspect_err(|err| {
                tracing::error!(
                    "Failed to save persistent attributes for user_id={}: {}",
                    &self.user_id,
                    err
                )
            })?;
        self.dirty = false;

        tracing::debug!(
            "Persisted attributes for user_id={}: {}",
            &self.user_id,
            serde_json::Value::Object(attributes)
        );

        Ok(())
    }
}

pub fn spreadsheet_id(attributes: &Attributes) -> Option<&str> {
    attributes
        .get(SPREADSHEET_ID_KEY)
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}

/// Copy of `attributes` with the spreadsheet id replaced, or removed when
/// `spreadsheet_id` is `None`. Other keys are kept.
pub fn with_spreadsheet_id(attributes: &Attributes, spreadsheet_id: Option<&str>) -> Attributes {
    let mut updated = attributes.clone();
    match spreadsheet_id {
        Some(id) => {
            updated.insert(SPREADSHEET_ID_KEY.to_string(), Value::String(id.to_string()));
        }
        None => {
            updated.remove(SPREADSHEET_ID_KEY);
        }
    }
    updated
}

#[cfg(test)]
pub mod testing {
    use std::{collections::HashMap, sync::Mutex};

    use super::*;

    /// Attribute store backed by a map, recording every write.
    #[derive(Default)]
    pub struct MemoryAttributeStore {
        entries: Mutex<HashMap<String, Attributes>>,
        pub writes: Mutex<Vec<(String, Attributes)>>,
        pub fail: bool,
    }

    impl MemoryAttributeStore {
        pub fn with_entry(user_id: &str, attributes: Attributes) -> Self {
            let store = MemoryAttributeStore::default();
            store
                .entries
                .lock()
                .unwrap()
                .insert(user_id.to_string(), attributes);
            store
        }

        pub fn failing() -> Self {
            MemoryAttributeStore {
                fail: true,
                ..Default::default()
            }
        }

        pub fn entry(&self, user_id: &str) -> Option<Attributes> {
            self.entries.lock().unwrap().get(user_id).cloned()
        }

        pub fn write_count(&self) -> usize {
            self.writes.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AttributeStore for MemoryAttributeStore {
        async fn get(&self, user_id: &str) -> Result<Option<Attributes>, StoreError> {
            if self.fail {
                return Err(StoreError::Sqlx(sqlx::Error::PoolTimedOut));
            }
            Ok(self.entry(user_id))
        }

        async fn set(&self, user_id: &str, attributes: &Attributes) -> Result<(), StoreError> {
            if self.fail {
                return Err(StoreError::Sqlx(sqlx::Error::PoolTimedOut));
            }
            self.writes
                .lock()
                .unwrap()
                .push((user_id.to_string(), attributes.clone()));
            self.entries
                .lock()
                .unwrap()
                .insert(user_id.to_string(), attributes.clone());
            Ok(())
        }
    }
}
