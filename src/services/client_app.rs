//! Registration of OAuth2 clients. Confidential clients (server-side apps)
//! get a bcrypt-hashed secret returned once; public clients (SPA/mobile)
//! rely on PKCE alone and carry no secret.

use sqlx::MySqlPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::ClientApp;
use crate::repositories::ClientAppRepository;
use crate::utils::secret::{generate_secret, hash_secret};

const CLIENT_ID_LENGTH: usize = 24;

#[derive(Clone)]
pub struct ClientAppService {
    repo: ClientAppRepository,
}

/// The plaintext secret is returned exactly once, at creation time.
pub struct IssuedClientApp {
    pub record: ClientApp,
    pub plaintext_secret: Option<String>,
}

impl ClientAppService {
    pub fn new(pool: MySqlPool) -> Self {
        Self { repo: ClientAppRepository::new(pool) }
    }

    pub async fn create(
        &self,
        organization_id: Uuid,
        name: &str,
        is_confidential: bool,
        redirect_uris: &[String],
    ) -> Result<IssuedClientApp, AppError> {
        if redirect_uris.is_empty() {
            return Err(AppError::Validation {
                field: Some("redirect_uris".to_string()),
                message: "at least one redirect_uri is required".to_string(),
            });
        }

        let client_id = generate_secret_id();
        let (secret_hash, plaintext_secret) = if is_confidential {
            let secret = generate_secret();
            (Some(hash_secret(&secret)?), Some(secret))
        } else {
            (None, None)
        };

        let record = self
            .repo
            .create(organization_id, name, &client_id, secret_hash.as_deref(), is_confidential, redirect_uris)
            .await?;

        Ok(IssuedClientApp { record, plaintext_secret })
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<ClientApp>, AppError> {
        self.repo.find_by_id(id).await
    }

    pub async fn list_for_organization(&self, organization_id: Uuid) -> Result<Vec<ClientApp>, AppError> {
        self.repo.list_for_organization(organization_id).await
    }
}

fn generate_secret_id() -> String {
    crate::utils::secret::generate_secret_with_length(CLIENT_ID_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_id_is_generated_at_the_expected_length() {
        assert!(generate_secret_id().len() >= CLIENT_ID_LENGTH);
    }
}
