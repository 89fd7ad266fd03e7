use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Membership, Organization};

#[derive(Debug, Serialize)]
pub struct OrganizationResponse {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl From<Organization> for OrganizationResponse {
    fn from(org: Organization) -> Self {
        Self { id: org.id, name: org.name, slug: org.slug, created_at: org.created_at }
    }
}

/// A member row as listed by `GET /organizations/:orgId/members`.
#[derive(Debug, Serialize)]
pub struct MemberResponse {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub roles: Vec<String>,
    pub joined_at: DateTime<Utc>,
}

impl MemberResponse {
    pub fn new(membership: &Membership, email: String, name: String, roles: Vec<String>) -> Self {
        Self {
            user_id: membership.user_id,
            email,
            name,
            roles,
            joined_at: membership.created_at,
        }
    }
}
