use sqlx::{MySql, MySqlPool, Transaction};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Membership, MembershipStatus, OrganizationSummary};

#[derive(Clone)]
pub struct MembershipRepository {
    pool: MySqlPool,
}

impl MembershipRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: Uuid, organization_id: Uuid) -> Result<Membership, AppError> {
        let id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO memberships (id, user_id, organization_id, status) VALUES (?, ?, ?, 'active')",
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(organization_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().map(|c| c == "23000").unwrap_or(false) {
                    return AppError::Conflict { resource: "membership" };
                }
            }
            AppError::Internal(e.into())
        })?;

        Ok(Membership {
            id,
            user_id,
            organization_id,
            status: MembershipStatus::Active,
            created_at: chrono::Utc::now(),
        })
    }

    /// Same as [`Self::create`] but runs inside the caller's transaction, so
    /// invitation acceptance commits the membership and role grant as one
    /// atomic unit alongside the CAS on `invitations.accepted`. A
    /// previously `removed` membership is reactivated rather than left
    /// shadowed by the `ON DUPLICATE KEY` no-op.
    pub async fn create_tx(
        &self,
        tx: &mut Transaction<'_, MySql>,
        user_id: Uuid,
        organization_id: Uuid,
    ) -> Result<Uuid, AppError> {
        let id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO memberships (id, user_id, organization_id, status) VALUES (?, ?, ?, 'active') \
             ON DUPLICATE KEY UPDATE status = 'active'",
        )
        .bind(id.to_string())
        .bind(user_id.to_string())
        .bind(organization_id.to_string())
        .execute(&mut **tx)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

        Ok(id)
    }

    /// Whether the user has an `active` membership in the organization —
    /// `invited`/`removed` rows do not count.
    pub async fn exists(&self, user_id: Uuid, organization_id: Uuid) -> Result<bool, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM memberships WHERE user_id = ? AND organization_id = ? AND status = 'active'",
        )
        .bind(user_id.to_string())
        .bind(organization_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
        Ok(count > 0)
    }

    /// Soft-removes a membership; past role grants and audit history stay
    /// in place. `rows_affected() == 0` means it was already removed or
    /// never existed.
    pub async fn remove(&self, user_id: Uuid, organization_id: Uuid) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE memberships SET status = 'removed' WHERE user_id = ? AND organization_id = ? AND status = 'active'",
        )
        .bind(user_id.to_string())
        .bind(organization_id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;
        Ok(result.rows_affected())
    }

    /// Organizations a user belongs to, each annotated with the roles they
    /// hold there — the payload the global-login organization picker needs.
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<OrganizationSummary>, AppError> {
        let rows = sqlx::query_as::<_, (String, String, String)>(
            r#"
            SELECT o.id, o.name, o.slug
            FROM memberships m
            INNER JOIN organizations o ON o.id = m.organization_id
            WHERE m.user_id = ? AND m.status = 'active'
            ORDER BY o.name
            "#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

        let mut summaries = Vec::with_capacity(rows.len());
        for (org_id, name, slug) in rows {
            let organization_id = Uuid::parse_str(&org_id).unwrap_or_default();
            let roles = sqlx::query_scalar::<_, String>(
                r#"
                SELECT r.name
                FROM user_roles ur
                INNER JOIN roles r ON r.id = ur.role_id
                WHERE ur.user_id = ? AND ur.organization_id = ?
                ORDER BY r.name
                "#,
            )
            .bind(user_id.to_string())
            .bind(org_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::Internal(e.into()))?;

            summaries.push(OrganizationSummary {
                organization_id,
                name,
                slug,
                roles,
            });
        }
        Ok(summaries)
    }

    /// Every member of an organization, joined against `users` for the
    /// fields the member-listing endpoint needs. Roles are resolved
    /// separately per member by the caller.
    pub async fn list_for_organization(
        &self,
        organization_id: Uuid,
    ) -> Result<Vec<(Membership, String, String)>, AppError> {
        let rows = sqlx::query_as::<_, (String, String, String, String, chrono::DateTime<chrono::Utc>, String, String)>(
            r#"
            SELECT m.id, m.user_id, m.organization_id, m.status, m.created_at, u.email, u.name
            FROM memberships m
            INNER JOIN users u ON u.id = m.user_id
            WHERE m.organization_id = ? AND m.status = 'active'
            ORDER BY m.created_at
            "#,
        )
        .bind(organization_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Internal(e.into()))?;

        Ok(rows
            .into_iter()
            .map(|(id, user_id, organization_id, status, created_at, email, name)| {
                let membership = Membership {
                    id: Uuid::parse_str(&id).unwrap_or_default(),
                    user_id: Uuid::parse_str(&user_id).unwrap_or_default(),
                    organization_id: Uuid::parse_str(&organization_id).unwrap_or_default(),
                    status: status.parse().unwrap_or(MembershipStatus::Active),
                    created_at,
                };
                (membership, email, name)
            })
            .collect())
    }
}
