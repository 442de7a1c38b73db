use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::{
    alexa::Attributes,
    attributes::{AttributeStore, AttributesManager, spreadsheet_id, with_spreadsheet_id},
    config::HEADER_ROW,
    domain::UserSpreadsheetBinding,
    error::SkillError,
    sheets::SpreadsheetGateway,
};

/// Where a request's spreadsheet comes from.
pub enum SpreadsheetSource {
    /// One spreadsheet per user, created on first use and remembered in the
    /// attribute store.
    PerUser(Arc<dyn AttributeStore>),
    /// Every receipt goes to this pre-existing spreadsheet.
    Fixed(String),
}

pub struct ReceiptProvisioner {
    gateway: Arc<dyn SpreadsheetGateway>,
    source: SpreadsheetSource,
    title: String,
}

impl ReceiptProvisioner {
    pub fn new(
        gateway: Arc<dyn SpreadsheetGateway>,
        source: SpreadsheetSource,
        title: impl Into<String>,
    ) -> Self {
        ReceiptProvisioner {
            gateway,
            source,
            title: title.into(),
        }
    }

    pub fn gateway(&self) -> &dyn SpreadsheetGateway {
        self.gateway.as_ref()
    }

    /// Resolves the spreadsheet of `user_id`, creating it when none is
    /// cached. `session` is updated in place with the cached id.
    pub async fn resolve_spreadsheet(
        &self,
        access_token: Option<&str>,
        user_id: &str,
        session: &mut Attributes,
    ) -> Result<UserSpreadsheetBinding, SkillError> {
        let access_token = access_token.ok_or(SkillError::MissingAccountLinking)?;

        match &self.source {
            SpreadsheetSource::Fixed(spreadsheet_id) => {
                Ok(UserSpreadsheetBinding::existing(spreadsheet_id.as_str()))
            }
            SpreadsheetSource::PerUser(store) => {
                let mut attributes =
                    AttributesManager::new(user_id, std::mem::take(session), store.clone());
                let result = self.resolve_per_user(access_token, &mut attributes).await;
                *session = attributes.into_session_attributes();
                result
            }
        }
    }

    async fn resolve_per_user(
        &self,
        access_token: &str,
        attributes: &mut AttributesManager,
    ) -> Result<UserSpreadsheetBinding, SkillError> {
        if let Some(id) = spreadsheet_id(attributes.session_attributes()) {
            tracing::debug!("Found session spreadsheet_id={}", id);
            return Ok(UserSpreadsheetBinding::existing(id));
        }

        match self.retrieve_attributes(access_token, attributes).await {
            Err(SkillError::ValidationFailure {
                spreadsheet_id,
                source,
            }) => {
                tracing::warn!(
                    "Validation of spreadsheet_id={} failed, provisioning a new one: {}",
                    &spreadsheet_id,
                    source
                );
                self.forget_spreadsheet(attributes).await?;
                // A second validation failure is not retried again.
                self.retrieve_attributes(access_token, attributes)
                    .await
                    .map_err(|err| match err {
                        SkillError::ValidationFailure { source, .. } => SkillError::Gateway(source),
                        other => other,
                    })
            }
            result => result,
        }
    }

    async fn retrieve_attributes(
        &self,
        access_token: &str,
        attributes: &mut AttributesManager,
    ) -> Result<UserSpreadsheetBinding, SkillError> {
        let persistent = attributes.persistent_attributes().await?.clone();

        if let Some(id) = spreadsheet_id(&persistent) {
            tracing::info!("Validating persisted spreadsheet_id={}", id);
            self.gateway
                .read_header_row(access_token, id)
                .await
                .map_err(|source| SkillError::ValidationFailure {
                    spreadsheet_id: id.to_string(),
                    source,
                })?;

            let session = with_spreadsheet_id(attributes.session_attributes(), Some(id));
            attributes.set_session_attributes(session);
            return Ok(UserSpreadsheetBinding::existing(id));
        }

        tracing::info!("No spreadsheet_id found, building a new spreadsheet");

        let title = format!("{} {}", self.title, Utc::now().format("%Y-%m-%d"));
        let id = self.build_spreadsheet(access_token, &title).await?;

        let session = with_spreadsheet_id(attributes.session_attributes(), Some(&id));
        attributes.set_session_attributes(session);
        attributes.set_persistent_attributes(with_spreadsheet_id(&persistent, Some(&id)));
        attributes.save_persistent_attributes().await?;

        tracing::info!("Persisted new spreadsheet_id={}", &id);

        Ok(UserSpreadsheetBinding {
            spreadsheet_id: id,
            spreadsheet_title: Some(title),
        })
    }

    async fn build_spreadsheet(&self, access_token: &str, title: &str) -> Result<String, SkillError> {
        let id = self.gateway.create_spreadsheet(access_token, title).await?;
        self.gateway
            .append_row(access_token, &id, header_row())
            .await?;
        tracing::info!("Header row written to spreadsheet_id={}", &id);
        Ok(id)
    }

    async fn forget_spreadsheet(&self, attributes: &mut AttributesManager) -> Result<(), SkillError> {
        let session = with_spreadsheet_id(attributes.session_attributes(), None);
        attributes.set_session_attributes(session);

        let persistent = with_spreadsheet_id(attributes.persistent_attributes().await?, None);
        attributes.set_persistent_attributes(persistent);
        attributes.save_persistent_attributes().await?;

        Ok(())
    }
}

pub fn header_row() -> Vec<Value> {
    HEADER_ROW
        .iter()
        .map(|column| Value::String(column.to_string()))
        .collect()
}
