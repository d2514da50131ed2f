use rusqlite::{Connection, params};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::db::{self, Database};
use crate::error::{Result, TrackerError};
use crate::models::{ActivityLog, Identity};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityAction {
    CompanyCreated,
    MembershipGranted,
    JobCreated,
    ApplicationCreated,
    ApplicationStatusChanged,
    NoteAdded,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityAction::CompanyCreated => "COMPANY_CREATED",
            ActivityAction::MembershipGranted => "MEMBERSHIP_GRANTED",
            ActivityAction::JobCreated => "JOB_CREATED",
            ActivityAction::ApplicationCreated => "APPLICATION_CREATED",
            ActivityAction::ApplicationStatusChanged => "APPLICATION_STATUS_CHANGED",
            ActivityAction::NoteAdded => "NOTE_ADDED",
        }
    }
}

impl fmt::Display for ActivityAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityType {
    Company,
    Membership,
    Job,
    Application,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Company => "Company",
            EntityType::Membership => "Membership",
            EntityType::Job => "Job",
            EntityType::Application => "Application",
        }
    }
}

/// One audit row waiting to be written.
#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub actor_id: Uuid,
    pub action: ActivityAction,
    pub entity_type: EntityType,
    pub entity_id: Uuid,
    pub application_id: Option<Uuid>,
    pub metadata: Value,
}

impl ActivityEntry {
    pub fn new(actor_id: Uuid, action: ActivityAction, entity_type: EntityType, entity_id: Uuid) -> Self {
        Self {
            actor_id,
            action,
            entity_type,
            entity_id,
            application_id: None,
            metadata: Value::Object(Default::default()),
        }
    }

    pub fn for_application(mut self, application_id: Uuid) -> Self {
        self.application_id = Some(application_id);
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Appends one row to the activity log. Call inside the same transaction
/// as the change it records.
pub fn append(conn: &Connection, entry: &ActivityEntry) -> Result<Uuid> {
    let id = Uuid::new_v4();
    let metadata = serde_json::to_string(&entry.metadata)?;
    conn.execute(
        "INSERT INTO activity_logs
            (id, actor_id, action, entity_type, entity_id, application_id, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            id.to_string(),
            entry.actor_id.to_string(),
            entry.action.as_str(),
            entry.entity_type.as_str(),
            entry.entity_id.to_string(),
            entry.application_id.map(|a| a.to_string()),
            metadata,
            db::format_timestamp(&db::now()),
        ],
    )?;
    tracing::debug!(action = %entry.action, entity = %entry.entity_id, "activity recorded");
    Ok(id)
}

/// Audit trail of one application, oldest first. Only the applicant may read it.
pub fn activity_for_application(
    db: &Database,
    actor: &Identity,
    application_id: Uuid,
) -> Result<Vec<ActivityLog>> {
    let application = db
        .find_application(application_id)?
        .ok_or_else(|| TrackerError::NotFound("Application".to_string()))?;
    if application.user_id != actor.user_id {
        tracing::warn!(actor = %actor.user_id, application = %application_id, "activity read denied");
        return Err(TrackerError::Forbidden("not the applicant".to_string()));
    }

    let mut stmt = db.conn().prepare(
        "SELECT id, actor_id, action, entity_type, entity_id, application_id, metadata, created_at
         FROM activity_logs WHERE application_id = ?1
         ORDER BY rowid ASC",
    )?;
    let rows = stmt.query_map([application_id.to_string()], row_to_activity)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(TrackerError::from)
}

fn row_to_activity(row: &rusqlite::Row) -> rusqlite::Result<ActivityLog> {
    let metadata: String = row.get(6)?;
    Ok(ActivityLog {
        id: db::get_uuid(row, 0)?,
        actor_id: db::get_uuid(row, 1)?,
        action: row.get(2)?,
        entity_type: row.get(3)?,
        entity_id: db::get_uuid(row, 4)?,
        application_id: db::get_optional_uuid(row, 5)?,
        metadata: serde_json::from_str(&metadata).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?,
        created_at: db::get_timestamp(row, 7)?,
    })
}
