use rusqlite::params;
use serde_json::json;
use uuid::Uuid;

use crate::audit::{self, ActivityAction, ActivityEntry, EntityType};
use crate::auth;
use crate::db::{self, Database};
use crate::error::{Result, TrackerError};
use crate::models::{Company, Identity, Membership, Role};
use crate::rbac;
use crate::validate;

/// Companies where the actor holds any membership, newest first.
pub fn companies(db: &Database, actor: &Identity) -> Result<Vec<Company>> {
    let mut stmt = db.conn().prepare(
        "SELECT c.id, c.name, c.website, c.created_at
         FROM companies c
         JOIN memberships m ON m.company_id = c.id
         WHERE m.user_id = ?1
         ORDER BY c.created_at DESC, c.id DESC",
    )?;
    let rows = stmt.query_map([actor.user_id.to_string()], |row| {
        Database::row_to_company(row, 0)
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(TrackerError::from)
}

/// Creates a company and makes the actor its OWNER.
pub fn create_company(
    db: &Database,
    actor: &Identity,
    name: &str,
    website: Option<&str>,
) -> Result<Company> {
    let company = Company {
        id: Uuid::new_v4(),
        name: validate::required_name("Company name", name)?,
        website: validate::optional_url("website", website)?,
        created_at: db::now(),
    };

    db.transaction(|conn| {
        conn.execute(
            "INSERT INTO companies (id, name, website, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                company.id.to_string(),
                company.name,
                company.website,
                db::format_timestamp(&company.created_at),
            ],
        )?;
        conn.execute(
            "INSERT INTO memberships (user_id, company_id, role) VALUES (?1, ?2, ?3)",
            params![actor.user_id.to_string(), company.id.to_string(), Role::Owner],
        )?;
        audit::append(
            conn,
            &ActivityEntry::new(
                actor.user_id,
                ActivityAction::CompanyCreated,
                EntityType::Company,
                company.id,
            )
            .with_metadata(json!({ "name": company.name })),
        )?;
        Ok::<_, TrackerError>(())
    })?;

    tracing::info!(actor = %actor.user_id, company = %company.id, "company created");
    Ok(company)
}

/// Grants `role` in the company to the user registered as `email`. OWNER only.
pub fn grant_membership(
    db: &Database,
    actor: &Identity,
    company_id: Uuid,
    email: &str,
    role: Role,
) -> Result<Membership> {
    if db.find_company(company_id)?.is_none() {
        return Err(TrackerError::NotFound("Company".to_string()));
    }
    rbac::ensure_company_role(db.conn(), actor.user_id, company_id, rbac::OWNER_ONLY)?;

    let target = auth::find_user_by_email(db, &email.trim().to_lowercase())?
        .ok_or_else(|| TrackerError::NotFound("User".to_string()))?;
    if target.id == actor.user_id {
        return Err(TrackerError::invalid("cannot change your own role"));
    }

    db.transaction(|conn| {
        conn.execute(
            "INSERT INTO memberships (user_id, company_id, role) VALUES (?1, ?2, ?3)
             ON CONFLICT (user_id, company_id) DO UPDATE SET role = excluded.role",
            params![target.id.to_string(), company_id.to_string(), role],
        )?;
        audit::append(
            conn,
            &ActivityEntry::new(
                actor.user_id,
                ActivityAction::MembershipGranted,
                EntityType::Membership,
                company_id,
            )
            .with_metadata(json!({ "userId": target.id, "role": role })),
        )?;
        Ok::<_, TrackerError>(())
    })?;

    tracing::info!(actor = %actor.user_id, company = %company_id, user = %target.id, %role, "membership granted");
    Ok(Membership {
        user_id: target.id,
        company_id,
        role,
        email: Some(target.email),
    })
}

/// Memberships of a company. Any member may list them.
pub fn members(db: &Database, actor: &Identity, company_id: Uuid) -> Result<Vec<Membership>> {
    rbac::ensure_company_role(db.conn(), actor.user_id, company_id, rbac::ANY_ROLE)?;

    let mut stmt = db.conn().prepare(
        "SELECT m.user_id, m.company_id, m.role, u.email
         FROM memberships m
         JOIN users u ON u.id = m.user_id
         WHERE m.company_id = ?1
         ORDER BY u.email",
    )?;
    let rows = stmt.query_map([company_id.to_string()], |row| {
        Ok(Membership {
            user_id: db::get_uuid(row, 0)?,
            company_id: db::get_uuid(row, 1)?,
            role: row.get(2)?,
            email: row.get(3)?,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(TrackerError::from)
}
