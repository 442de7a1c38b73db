//! Request and response envelopes of the Alexa custom skill JSON interface.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type Attributes = Map<String, Value>;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope {
    pub version: String,
    pub session: Option<Session>,
    pub context: Option<Context>,
    pub request: Request,
}

impl RequestEnvelope {
    /// Skill id from the session, falling back to the system context.
    pub fn application_id(&self) -> Option<&str> {
        self.session
            .as_ref()
            .and_then(|session| session.application.as_ref())
            .or_else(|| {
                self.context
                    .as_ref()
                    .and_then(|context| context.system.application.as_ref())
            })
            .map(|application| application.application_id.as_str())
    }

    pub fn user(&self) -> Option<&User> {
        self.session
            .as_ref()
            .and_then(|session| session.user.as_ref())
            .or_else(|| self.context.as_ref().and_then(|context| context.system.user.as_ref()))
    }

    pub fn access_token(&self) -> Option<&str> {
        self.user()
            .and_then(|user| user.access_token.as_deref())
            .filter(|token| !token.is_empty())
    }

    pub fn session_attributes(&self) -> Attributes {
        self.session
            .as_ref()
            .and_then(|session| session.attributes.clone())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(default)]
    pub new: bool,
    pub session_id: String,
    pub application: Option<Application>,
    pub attributes: Option<Attributes>,
    pub user: Option<User>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub application_id: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: String,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Context {
    #[serde(rename = "System")]
    pub system: SystemState,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SystemState {
    pub application: Option<Application>,
    pub user: Option<User>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum Request {
    LaunchRequest(RequestCommon),
    IntentRequest(IntentRequest),
    SessionEndedRequest(SessionEndedRequest),
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestCommon {
    pub request_id: String,
    pub timestamp: Option<String>,
    pub locale: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentRequest {
    #[serde(flatten)]
    pub common: RequestCommon,
    pub dialog_state: Option<String>,
    pub intent: Intent,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionEndedRequest {
    #[serde(flatten)]
    pub common: RequestCommon,
    pub reason: Option<String>,
    pub error: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Intent {
    pub name: String,
    #[serde(default)]
    pub slots: HashMap<String, Slot>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub name: String,
    pub value: Option<String>,
    pub resolutions: Option<Resolutions>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolutions {
    #[serde(default)]
    pub resolutions_per_authority: Vec<Resolution>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub authority: String,
    pub status: Option<ResolutionStatus>,
    pub values: Option<Vec<ResolutionValueWrapper>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolutionStatus {
    pub code: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolutionValueWrapper {
    pub value: ResolutionValue,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolutionValue {
    pub name: String,
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub version: String,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub session_attributes: Attributes,
    pub response: Response,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_speech: Option<OutputSpeech>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reprompt: Option<Reprompt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub should_end_session: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum OutputSpeech {
    PlainText { text: String },
}

impl OutputSpeech {
    pub fn text(&self) -> &str {
        match self {
            OutputSpeech::PlainText { text } => text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reprompt {
    pub output_speech: OutputSpeech,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Card {
    LinkAccount,
}

#[derive(Debug, Default)]
pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn speak(mut self, text: impl Into<String>) -> Self {
        self.response.output_speech = Some(OutputSpeech::PlainText { text: text.into() });
        self
    }

    /// Also keeps the session open unless told otherwise.
    pub fn reprompt(mut self, text: impl Into<String>) -> Self {
        self.response.reprompt = Some(Reprompt {
            output_speech: OutputSpeech::PlainText { text: text.into() },
        });
        if self.response.should_end_session.is_none() {
            self.response.should_end_session = Some(false);
        }
        self
    }

    pub fn with_link_account_card(mut self) -> Self {
        self.response.card = Some(Card::LinkAccount);
        self
    }

    pub fn with_should_end_session(mut self, should_end_session: bool) -> Self {
        self.response.should_end_session = Some(should_end_session);
        self
    }

    pub fn build(self) -> Response {
        self.response
    }
}
