use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::collaborators::{
    ApprovalNotificationRequest, Collaborator, CollaboratorError, CreditCalculationResponse,
    DecisionServices, FailureBody, RiskScoreResponse,
};
use super::domain::{FinancialFigures, RiskAnswers};
use crate::config::CollaboratorConfig;

/// [`DecisionServices`] backed by JSON-over-HTTP collaborator endpoints.
#[derive(Debug, Clone)]
pub struct HttpDecisionServices {
    client: Client,
    endpoints: CollaboratorConfig,
}

impl HttpDecisionServices {
    pub fn new(endpoints: CollaboratorConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(endpoints.timeout()).build()?;
        Ok(Self::with_client(client, endpoints))
    }

    pub fn with_client(client: Client, endpoints: CollaboratorConfig) -> Self {
        Self { client, endpoints }
    }

    pub fn endpoints(&self) -> &CollaboratorConfig {
        &self.endpoints
    }

    fn url_for(&self, collaborator: Collaborator) -> &str {
        match collaborator {
            Collaborator::RiskScoring => &self.endpoints.risk_scoring_url,
            Collaborator::CreditCalculation => &self.endpoints.credit_calculation_url,
            Collaborator::Notification => &self.endpoints.notification_url,
        }
    }

    async fn post<B>(
        &self,
        collaborator: Collaborator,
        body: &B,
    ) -> Result<reqwest::Response, CollaboratorError>
    where
        B: Serialize + ?Sized + Sync,
    {
        let url = self.url_for(collaborator);
        debug!(%collaborator, url, "calling collaborator");

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|err| transport_error(collaborator, err))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = failure_message(response).await;
        warn!(%collaborator, status = status.as_u16(), ?message, "collaborator rejected request");
        Err(CollaboratorError::Rejected {
            collaborator,
            status: status.as_u16(),
            message,
        })
    }

    async fn post_json<B, R>(
        &self,
        collaborator: Collaborator,
        body: &B,
    ) -> Result<R, CollaboratorError>
    where
        B: Serialize + ?Sized + Sync,
        R: DeserializeOwned,
    {
        self.post(collaborator, body)
            .await?
            .json::<R>()
            .await
            .map_err(|err| CollaboratorError::InvalidResponse {
                collaborator,
                detail: err.to_string(),
            })
    }
}

#[async_trait]
impl DecisionServices for HttpDecisionServices {
    async fn assess_risk(
        &self,
        answers: &RiskAnswers,
    ) -> Result<RiskScoreResponse, CollaboratorError> {
        self.post_json(Collaborator::RiskScoring, answers).await
    }

    async fn calculate_credit(
        &self,
        figures: &FinancialFigures,
    ) -> Result<CreditCalculationResponse, CollaboratorError> {
        self.post_json(Collaborator::CreditCalculation, figures).await
    }

    async fn send_approval(
        &self,
        request: &ApprovalNotificationRequest,
    ) -> Result<(), CollaboratorError> {
        self.post(Collaborator::Notification, request).await?;
        Ok(())
    }
}

fn transport_error(collaborator: Collaborator, err: reqwest::Error) -> CollaboratorError {
    let detail = if err.is_timeout() {
        "request timed out".to_string()
    } else {
        err.to_string()
    };
    CollaboratorError::Transport {
        collaborator,
        detail,
    }
}

/// Pull the optional `error` field out of a failure body. Non-JSON bodies carry no
/// message.
async fn failure_message(response: reqwest::Response) -> Option<String> {
    let bytes = response.bytes().await.ok()?;
    serde_json::from_slice::<FailureBody>(&bytes)
        .ok()
        .and_then(|body| body.error)
}
