use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::ClientApp;
use crate::services::IssuedClientApp;

/// POST /client-apps
#[derive(Debug, Deserialize)]
pub struct CreateClientAppRequest {
    pub name: String,
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub is_confidential: bool,
}

#[derive(Debug, Serialize)]
pub struct ClientAppResponse {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub client_id: String,
    pub is_confidential: bool,
    pub redirect_uris: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ClientApp> for ClientAppResponse {
    fn from(app: ClientApp) -> Self {
        Self {
            id: app.id,
            organization_id: app.organization_id,
            name: app.name,
            client_id: app.client_id,
            is_confidential: app.is_confidential,
            redirect_uris: app.redirect_uris,
            is_active: app.is_active,
            created_at: app.created_at,
        }
    }
}

/// Client registration response; `client_secret` is returned only once, and
/// only for confidential clients.
#[derive(Debug, Serialize)]
pub struct ClientAppWithSecretResponse {
    #[serde(flatten)]
    pub client: ClientAppResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
}

impl From<IssuedClientApp> for ClientAppWithSecretResponse {
    fn from(issued: IssuedClientApp) -> Self {
        Self {
            client: issued.record.into(),
            client_secret: issued.plaintext_secret,
        }
    }
}
