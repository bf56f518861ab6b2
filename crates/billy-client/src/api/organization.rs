use crate::envelope;
use crate::error::BillyError;
use crate::models::Organization;
use crate::request::ApiRequest;
use crate::BillyClient;
use tracing::warn;

impl BillyClient {
    /// The organization the access token belongs to.
    pub async fn get_organization(&self) -> Result<Organization, BillyError> {
        let endpoint = "/organization";
        let response = self.send(ApiRequest::get(endpoint)).await?;
        envelope::entity(endpoint, &response.body, "organization", "organizations")
    }

    /// Checks the access token against `/user`.
    ///
    /// Returns `Ok(false)` when the API rejects the token and an error for
    /// anything that says nothing about the token itself.
    pub async fn validate_auth(&self) -> Result<bool, BillyError> {
        match self.send(ApiRequest::get("/user")).await {
            Ok(_) => Ok(true),
            Err(err) if matches!(err.status(), Some(401 | 403)) => {
                warn!(status = ?err.status(), "Billy API rejected the access token");
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }
}
