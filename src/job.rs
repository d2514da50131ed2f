use rusqlite::params;
use serde_json::json;
use uuid::Uuid;

use crate::audit::{self, ActivityAction, ActivityEntry, EntityType};
use crate::db::{self, Database, JOB_COLUMNS};
use crate::error::{Result, TrackerError};
use crate::models::{Identity, Job, JobWithCompany, NewJob};
use crate::rbac;
use crate::validate;

/// Jobs of one company (any role required), or of every company the actor
/// belongs to when `company_id` is absent. Newest first.
pub fn jobs(db: &Database, actor: &Identity, company_id: Option<Uuid>) -> Result<Vec<JobWithCompany>> {
    let (filter, param) = match company_id {
        Some(company_id) => {
            rbac::ensure_company_role(db.conn(), actor.user_id, company_id, rbac::ANY_ROLE)?;
            ("j.company_id = ?1", company_id.to_string())
        }
        None => (
            "EXISTS (SELECT 1 FROM memberships m WHERE m.company_id = j.company_id AND m.user_id = ?1)",
            actor.user_id.to_string(),
        ),
    };

    let sql = format!(
        "SELECT {JOB_COLUMNS}
         FROM jobs j
         JOIN companies c ON c.id = j.company_id
         WHERE {filter}
         ORDER BY j.created_at DESC, j.id DESC"
    );
    let mut stmt = db.conn().prepare(&sql)?;
    let rows = stmt.query_map([param], Database::row_to_job_with_company)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(TrackerError::from)
}

/// Posts a job. Requires OWNER or EDITOR in the company.
pub fn create_job(db: &Database, actor: &Identity, input: NewJob) -> Result<JobWithCompany> {
    let company = db
        .find_company(input.company_id)?
        .ok_or_else(|| TrackerError::NotFound("Company".to_string()))?;
    rbac::ensure_company_role(db.conn(), actor.user_id, company.id, rbac::WRITE_ROLES)?;

    let job = Job {
        id: Uuid::new_v4(),
        company_id: company.id,
        title: validate::required_name("Job title", &input.title)?,
        description: validate::optional_text(input.description.as_deref()),
        location: validate::optional_text(input.location.as_deref()),
        created_at: db::now(),
    };

    db.transaction(|conn| {
        conn.execute(
            "INSERT INTO jobs (id, company_id, title, description, location, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                job.id.to_string(),
                job.company_id.to_string(),
                job.title,
                job.description,
                job.location,
                db::format_timestamp(&job.created_at),
            ],
        )?;
        audit::append(
            conn,
            &ActivityEntry::new(actor.user_id, ActivityAction::JobCreated, EntityType::Job, job.id)
                .with_metadata(json!({ "companyId": job.company_id, "title": job.title })),
        )?;
        Ok::<_, TrackerError>(())
    })?;

    tracing::info!(actor = %actor.user_id, job = %job.id, company = %company.id, "job created");
    Ok(JobWithCompany { job, company })
}
