use anyhow::anyhow;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{Result, TrackerError};
use crate::models::{Application, ApplicationDetail, Company, Job, JobWithCompany, Note};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    name TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS companies (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    website TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS memberships (
    user_id TEXT NOT NULL REFERENCES users(id),
    company_id TEXT NOT NULL REFERENCES companies(id),
    role TEXT NOT NULL CHECK (role IN ('OWNER', 'EDITOR', 'VIEWER')),
    PRIMARY KEY (user_id, company_id)
);

CREATE TABLE IF NOT EXISTS jobs (
    id TEXT PRIMARY KEY,
    company_id TEXT NOT NULL REFERENCES companies(id),
    title TEXT NOT NULL,
    description TEXT,
    location TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS applications (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL REFERENCES users(id),
    job_id TEXT NOT NULL REFERENCES jobs(id),
    source_url TEXT,
    status TEXT NOT NULL DEFAULT 'APPLIED' CHECK (status IN (
        'APPLIED', 'RECRUITER_SCREEN', 'INTERVIEW_1', 'INTERVIEW_2',
        'ONSITE', 'OFFER', 'REJECTED', 'WITHDRAWN'
    )),
    applied_at TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS notes (
    id TEXT PRIMARY KEY,
    application_id TEXT NOT NULL REFERENCES applications(id),
    created_by_id TEXT NOT NULL REFERENCES users(id),
    body TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS activity_logs (
    id TEXT PRIMARY KEY,
    actor_id TEXT NOT NULL REFERENCES users(id),
    action TEXT NOT NULL,
    entity_type TEXT NOT NULL,
    entity_id TEXT NOT NULL,
    application_id TEXT REFERENCES applications(id),
    metadata TEXT NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_applications_user_order ON applications(user_id, created_at, id);
CREATE INDEX IF NOT EXISTS idx_jobs_company ON jobs(company_id);
CREATE INDEX IF NOT EXISTS idx_notes_application ON notes(application_id);
CREATE INDEX IF NOT EXISTS idx_activity_application ON activity_logs(application_id);
"#;

pub const JOB_COLUMNS: &str = "j.id, j.company_id, j.title, j.description, j.location, j.created_at,
     c.id, c.name, c.website, c.created_at";

pub const APPLICATION_COLUMNS: &str =
    "a.id, a.user_id, a.job_id, a.source_url, a.status, a.applied_at, a.created_at, a.updated_at";

pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        tracing::debug!(path = %path.display(), "opening database");
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Private database with the schema already applied.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let db = Self { conn, path: None };
        db.init()?;
        Ok(db)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> anyhow::Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='applications'",
            [],
            |row| row.get(0),
        )?;
        if tables == 0 {
            return Err(anyhow!("Database not initialized. Run 'jobtrack init' first."));
        }
        Ok(())
    }

    /// Runs `f` in a single transaction, committing only when it succeeds.
    pub fn transaction<T, E>(&self, f: impl FnOnce(&Connection) -> std::result::Result<T, E>) -> std::result::Result<T, E>
    where
        E: From<rusqlite::Error>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    // --- Shared lookups ---

    pub fn find_company(&self, id: Uuid) -> Result<Option<Company>> {
        self.conn
            .query_row(
                "SELECT id, name, website, created_at FROM companies WHERE id = ?1",
                [id.to_string()],
                |row| Self::row_to_company(row, 0),
            )
            .optional()
            .map_err(TrackerError::from)
    }

    pub fn find_job(&self, id: Uuid) -> Result<Option<JobWithCompany>> {
        let sql = format!(
            "SELECT {JOB_COLUMNS} FROM jobs j JOIN companies c ON c.id = j.company_id WHERE j.id = ?1"
        );
        self.conn
            .query_row(&sql, [id.to_string()], Self::row_to_job_with_company)
            .optional()
            .map_err(TrackerError::from)
    }

    pub fn find_application(&self, id: Uuid) -> Result<Option<Application>> {
        let sql = format!("SELECT {APPLICATION_COLUMNS} FROM applications a WHERE a.id = ?1");
        self.conn
            .query_row(&sql, [id.to_string()], |row| Self::row_to_application(row, 0))
            .optional()
            .map_err(TrackerError::from)
    }

    pub fn notes_for_application(&self, application_id: Uuid) -> Result<Vec<Note>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, application_id, created_by_id, body, created_at
             FROM notes WHERE application_id = ?1
             ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt.query_map([application_id.to_string()], Self::row_to_note)?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(TrackerError::from)
    }

    /// Attaches job, company and notes to an application row.
    pub fn application_detail(&self, application: Application) -> Result<ApplicationDetail> {
        let job = self
            .find_job(application.job_id)?
            .ok_or_else(|| TrackerError::NotFound("Job".to_string()))?;
        let notes = self.notes_for_application(application.id)?;
        Ok(ApplicationDetail {
            application,
            job,
            notes,
        })
    }

    // --- Row mappers ---

    pub fn row_to_company(row: &Row, offset: usize) -> rusqlite::Result<Company> {
        Ok(Company {
            id: get_uuid(row, offset)?,
            name: row.get(offset + 1)?,
            website: row.get(offset + 2)?,
            created_at: get_timestamp(row, offset + 3)?,
        })
    }

    pub fn row_to_job_with_company(row: &Row) -> rusqlite::Result<JobWithCompany> {
        Ok(JobWithCompany {
            job: Job {
                id: get_uuid(row, 0)?,
                company_id: get_uuid(row, 1)?,
                title: row.get(2)?,
                description: row.get(3)?,
                location: row.get(4)?,
                created_at: get_timestamp(row, 5)?,
            },
            company: Self::row_to_company(row, 6)?,
        })
    }

    pub fn row_to_application(row: &Row, offset: usize) -> rusqlite::Result<Application> {
        Ok(Application {
            id: get_uuid(row, offset)?,
            user_id: get_uuid(row, offset + 1)?,
            job_id: get_uuid(row, offset + 2)?,
            source_url: row.get(offset + 3)?,
            status: row.get(offset + 4)?,
            applied_at: get_timestamp(row, offset + 5)?,
            created_at: get_timestamp(row, offset + 6)?,
            updated_at: get_timestamp(row, offset + 7)?,
        })
    }

    fn row_to_note(row: &Row) -> rusqlite::Result<Note> {
        Ok(Note {
            id: get_uuid(row, 0)?,
            application_id: get_uuid(row, 1)?,
            created_by_id: get_uuid(row, 2)?,
            body: row.get(3)?,
            created_at: get_timestamp(row, 4)?,
        })
    }
}

// --- Column encoding ---

/// Current time at the precision the store keeps.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width RFC 3339, so TEXT ordering matches time ordering.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn get_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub fn get_uuid(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub fn get_optional_uuid(row: &Row, idx: usize) -> rusqlite::Result<Option<Uuid>> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        Uuid::parse_str(&s)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    })
    .transpose()
}
