use crate::{
    alexa::{
        Attributes, IntentRequest, OutputSpeech, Request, RequestEnvelope, Response,
        ResponseBuilder, ResponseEnvelope,
    },
    config::SkillConfig,
    domain::UserSpreadsheetBinding,
    error::SkillError,
    provisioning::ReceiptProvisioner,
    slots::build_receipt,
};

const RESPONSE_VERSION: &str = "1.0";

/// The requests the skill knows how to answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    Launch,
    SaveReceipt,
    Yes,
    No,
    Stop,
    Help,
    Fallback,
    SessionEnded { reason: Option<String> },
    Unrecognized(String),
}

impl RequestKind {
    pub fn classify(request: &Request) -> RequestKind {
        match request {
            Request::LaunchRequest(_) => RequestKind::Launch,
            Request::IntentRequest(IntentRequest { intent, .. }) => match intent.name.as_str() {
                "SaveReceipt" => RequestKind::SaveReceipt,
                "Yes" | "AMAZON.YesIntent" => RequestKind::Yes,
                "No" | "AMAZON.NoIntent" => RequestKind::No,
                "AMAZON.StopIntent" | "AMAZON.CancelIntent" => RequestKind::Stop,
                "AMAZON.HelpIntent" => RequestKind::Help,
                "AMAZON.FallbackIntent" => RequestKind::Fallback,
                other => RequestKind::Unrecognized(format!("IntentRequest/{}", other)),
            },
            Request::SessionEndedRequest(ended) => RequestKind::SessionEnded {
                reason: ended.reason.clone(),
            },
            Request::Unsupported => {
                RequestKind::Unrecognized(String::from("unsupported request type"))
            }
        }
    }
}

pub struct Dispatcher {
    config: SkillConfig,
    provisioner: ReceiptProvisioner,
}

impl Dispatcher {
    pub fn new(config: SkillConfig, provisioner: ReceiptProvisioner) -> Self {
        Dispatcher {
            config,
            provisioner,
        }
    }

    pub fn config(&self) -> &SkillConfig {
        &self.config
    }

    pub async fn dispatch(&self, envelope: &RequestEnvelope) -> ResponseEnvelope {
        let kind = RequestKind::classify(&envelope.request);
        let mut session = envelope.session_attributes();

        tracing::info!("Dispatching {:?}", &kind);

        let response = match self.handle(&kind, envelope, &mut session).await {
            Ok(response) => response,
            Err(SkillError::MissingAccountLinking) => {
                tracing::info!("No access token present, asking for account linking");
                ResponseBuilder::new()
                    .speak(self.config.link_account())
                    .with_link_account_card()
                    .with_should_end_session(false)
                    .build()
            }
            Err(err) => self.render_error(&err, envelope),
        };

        tracing::debug!(
            "Responding with speech={:?} should_end_session={:?}",
            response.output_speech.as_ref().map(OutputSpeech::text),
            response.should_end_session
        );

        ResponseEnvelope {
            version: String::from(RESPONSE_VERSION),
            session_attributes: session,
            response,
        }
    }

    async fn handle(
        &self,
        kind: &RequestKind,
        envelope: &RequestEnvelope,
        session: &mut Attributes,
    ) -> Result<Response, SkillError> {
        match kind {
            RequestKind::Launch => self.launch(envelope, session).await,
            RequestKind::SaveReceipt => self.save_receipt(envelope, session).await,
            RequestKind::Yes => Ok(ResponseBuilder::new().with_should_end_session(false).build()),
            RequestKind::No | RequestKind::Stop => Ok(ResponseBuilder::new()
                .speak(self.config.goodbye())
                .with_should_end_session(true)
                .build()),
            RequestKind::Help => Ok(ResponseBuilder::new()
                .speak(self.config.help())
                .with_should_end_session(false)
                .build()),
            RequestKind::Fallback => Ok(ResponseBuilder::new()
                .speak(self.config.not_understood())
                .with_should_end_session(false)
                .build()),
            RequestKind::SessionEnded { reason } => {
                tracing::info!("Session ended with reason={:?}", reason);
                Ok(ResponseBuilder::new().build())
            }
            RequestKind::Unrecognized(description) => {
                Err(SkillError::UnrecognizedIntent(description.clone()))
            }
        }
    }

    async fn launch(
        &self,
        envelope: &RequestEnvelope,
        session: &mut Attributes,
    ) -> Result<Response, SkillError> {
        let binding = self.resolve(envelope, session).await?;

        Ok(ResponseBuilder::new()
            .speak(self.config.welcome(binding.spreadsheet_title.as_deref()))
            .reprompt(self.config.reprompt())
            .build())
    }

    async fn save_receipt(
        &self,
        envelope: &RequestEnvelope,
        session: &mut Attributes,
    ) -> Result<Response, SkillError> {
        let Request::IntentRequest(request) = &envelope.request else {
            return Err(SkillError::UnrecognizedIntent(String::from(
                "SaveReceipt without intent",
            )));
        };
        tracing::info!("SaveReceipt dialog_state={:?}", &request.dialog_state);

        let access_token = envelope
            .access_token()
            .ok_or(SkillError::MissingAccountLinking)?;
        let binding = self.resolve(envelope, session).await?;
        let receipt = build_receipt(&request.intent);

        self.provisioner
            .gateway()
            .append_row(access_token, &binding.spreadsheet_id, receipt.to_row())
            .await?;

        tracing::info!("Receipt saved to spreadsheet_id={}", &binding.spreadsheet_id);

        Ok(ResponseBuilder::new()
            .speak(
                self.config
                    .receipt_saved(binding.spreadsheet_title.as_deref(), &receipt),
            )
            .with_should_end_session(false)
            .build())
    }

    async fn resolve(
        &self,
        envelope: &RequestEnvelope,
        session: &mut Attributes,
    ) -> Result<UserSpreadsheetBinding, SkillError> {
        let user_id = envelope
            .user()
            .map(|user| user.user_id.as_str())
            .unwrap_or_default();

        let binding = self
            .provisioner
            .resolve_spreadsheet(envelope.access_token(), user_id, session)
            .await?;
        tracing::info!("Resolved spreadsheet_id={}", &binding.spreadsheet_id);

        Ok(binding)
    }

    fn render_error(&self, err: &SkillError, envelope: &RequestEnvelope) -> Response {
        tracing::error!("Error handled: {}", err);
        tracing::error!(
            "Original request was {}",
            serde_json::to_string_pretty(&envelope.request).unwrap_or(String::from("<invalid json>"))
        );

        let builder = ResponseBuilder::new().speak(self.config.apology());
        if self.config.keep_session_on_error {
            builder.reprompt(self.config.reprompt()).build()
        } else {
            builder.with_should_end_session(true).build()
        }
    }
}
