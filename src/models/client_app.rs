use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// An OAuth2 client registered by an organization. Confidential clients
/// hold a hashed secret and can use it at the token endpoint; public
/// clients (mobile/SPA) rely on PKCE alone and carry no secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientApp {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret_hash: Option<String>,
    pub is_confidential: bool,
    pub redirect_uris: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct ClientAppRow {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    pub client_id: String,
    pub client_secret_hash: Option<String>,
    pub is_confidential: bool,
    pub redirect_uris: serde_json::Value,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ClientAppRow> for ClientApp {
    fn from(row: ClientAppRow) -> Self {
        let redirect_uris: Vec<String> = serde_json::from_value(row.redirect_uris).unwrap_or_default();
        Self {
            id: Uuid::parse_str(&row.id).unwrap_or_default(),
            organization_id: Uuid::parse_str(&row.organization_id).unwrap_or_default(),
            name: row.name,
            client_id: row.client_id,
            client_secret_hash: row.client_secret_hash,
            is_confidential: row.is_confidential,
            redirect_uris,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::mysql::MySqlRow> for ClientApp {
    fn from_row(row: &'r sqlx::mysql::MySqlRow) -> Result<Self, sqlx::Error> {
        let client_row = ClientAppRow::from_row(row)?;
        Ok(ClientApp::from(client_row))
    }
}

impl ClientApp {
    pub fn has_redirect_uri(&self, uri: &str) -> bool {
        self.redirect_uris.iter().any(|u| u == uri)
    }
}
