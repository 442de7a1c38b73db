use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{
    AppState,
    alexa::{RequestEnvelope, ResponseEnvelope},
};

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::BadRequest(msg) => {
                tracing::info!("Bad request: {}", &msg);
                (StatusCode::BAD_REQUEST, msg)
            }
        };

        (
            status,
            Json(serde_json::json!({ "message": error_message })),
        )
            .into_response()
    }
}

fn verify_skill_id(expected: Option<&str>, envelope: &RequestEnvelope) -> Result<(), AppError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    match envelope.application_id() {
        Some(application_id) if application_id == expected => Ok(()),
        other => Err(AppError::BadRequest(format!(
            "Request for skill id {:?} does not match this endpoint",
            other.unwrap_or("<missing>")
        ))),
    }
}

#[axum::debug_handler]
pub async fn skill_request(
    State(state): State<Arc<AppState>>,
    Json(envelope): Json<RequestEnvelope>,
) -> Result<Json<ResponseEnvelope>, AppError> {
    verify_skill_id(state.skill_id.as_deref(), &envelope)?;

    let response = state.dispatcher.dispatch(&envelope).await;

    Ok(Json(response))
}

pub async fn health(State(state): State<Arc<AppState>>) -> String {
    format!("{} is running", state.dispatcher.config().skill_name)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        attributes::testing::MemoryAttributeStore,
        config::SkillConfig,
        dispatcher::Dispatcher,
        provisioning::{ReceiptProvisioner, SpreadsheetSource, testing::FakeGateway},
    };

    fn state(skill_id: Option<&str>) -> Arc<AppState> {
        let config = SkillConfig::new("Receipts List");
        let provisioner = ReceiptProvisioner::new(
            Arc::new(FakeGateway::default()),
            SpreadsheetSource::PerUser(Arc::new(MemoryAttributeStore::default())),
            config.spreadsheet_title.clone(),
        );
        Arc::new(AppState {
            dispatcher: Dispatcher::new(config, provisioner),
            skill_id: skill_id.map(String::from),
        })
    }

    fn stop_request(application_id: &str) -> RequestEnvelope {
        serde_json::from_value(json!({
            "version": "1.0",
            "session": {
                "sessionId": "amzn1.echo-api.session.test",
                "application": { "applicationId": application_id },
                "user": { "userId": "amzn1.ask.account.test" }
            },
            "request": {
                "type": "IntentRequest",
                "requestId": "amzn1.echo-api.request.test",
                "intent": { "name": "AMAZON.StopIntent" }
            }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn answers_request_for_configured_skill() {
        let Json(response) = skill_request(
            State(state(Some("amzn1.ask.skill.receipts"))),
            Json(stop_request("amzn1.ask.skill.receipts")),
        )
        .await
        .unwrap();

        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({
                "version": "1.0",
                "response": {
                    "outputSpeech": { "type": "PlainText", "text": "Bis zum nächsten Mal!" },
                    "shouldEndSession": true
                }
            })
        );
    }

    #[tokio::test]
    async fn rejects_request_for_other_skill() {
        let result = skill_request(
            State(state(Some("amzn1.ask.skill.receipts"))),
            Json(stop_request("amzn1.ask.skill.other")),
        )
        .await;

        let response = result.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn any_skill_is_accepted_without_configured_id() {
        let result = skill_request(State(state(None)), Json(stop_request("amzn1.ask.skill.other"))).await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn health_names_the_skill() {
        assert_eq!(health(State(state(None))).await, "Receipts List is running");
    }
}
