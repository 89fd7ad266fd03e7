use sqlx::MySqlPool;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::AuditRecord;
use crate::repositories::AuditRepository;

/// Immutable security-event log. Writes are fire-and-forget: the caller's
/// request path never blocks on (or fails because of) an audit write, so
/// `record` spawns the insert and discards failures after logging them.
#[derive(Clone)]
pub struct AuditService {
    repo: AuditRepository,
}

impl AuditService {
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            repo: AuditRepository::new(pool),
        }
    }

    pub fn record(
        &self,
        organization_id: Option<Uuid>,
        actor_user_id: Option<Uuid>,
        action: impl Into<String>,
        target_type: impl Into<String>,
        target_id: impl Into<String>,
        metadata: serde_json::Value,
    ) {
        let repo = self.repo.clone();
        let action = action.into();
        let target_type = target_type.into();
        let target_id = target_id.into();

        tokio::spawn(async move {
            if let Err(e) = repo
                .record(organization_id, actor_user_id, &action, &target_type, &target_id, metadata)
                .await
            {
                tracing::warn!(error = %e, action = %action, "failed to write audit record");
            }
        });
    }

    pub async fn list_for_organization(&self, organization_id: Uuid, page: i64, limit: i64) -> Result<Vec<AuditRecord>, AppError> {
        self.repo.list_for_organization(organization_id, page, limit).await
    }

    pub async fn list_for_actor(&self, actor_user_id: Uuid, page: i64, limit: i64) -> Result<Vec<AuditRecord>, AppError> {
        self.repo.list_for_actor(actor_user_id, page, limit).await
    }
}
