use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::error::{Result, TrackerError};
use crate::models::Role;

pub const ANY_ROLE: &[Role] = &[Role::Owner, Role::Editor, Role::Viewer];
pub const WRITE_ROLES: &[Role] = &[Role::Owner, Role::Editor];
pub const OWNER_ONLY: &[Role] = &[Role::Owner];

pub fn membership_role(conn: &Connection, user_id: Uuid, company_id: Uuid) -> Result<Option<Role>> {
    conn.query_row(
        "SELECT role FROM memberships WHERE user_id = ?1 AND company_id = ?2",
        params![user_id.to_string(), company_id.to_string()],
        |row| row.get(0),
    )
    .optional()
    .map_err(TrackerError::from)
}

/// Fails closed unless the actor holds one of `allowed` in the company.
pub fn ensure_company_role(
    conn: &Connection,
    actor_id: Uuid,
    company_id: Uuid,
    allowed: &[Role],
) -> Result<Role> {
    match membership_role(conn, actor_id, company_id)? {
        Some(role) if allowed.contains(&role) => Ok(role),
        role => {
            tracing::warn!(
                actor = %actor_id,
                company = %company_id,
                role = ?role,
                "company role check denied"
            );
            Err(TrackerError::Forbidden(
                "Insufficient role for this company".to_string(),
            ))
        }
    }
}
