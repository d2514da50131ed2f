//! Applications: creation, the status workflow, notes, and the paginated
//! per-user listing.

use rusqlite::params_from_iter;
use rusqlite::types::Value;
use serde_json::json;
use uuid::Uuid;

use crate::audit::{self, ActivityAction, ActivityEntry, EntityType};
use crate::cursor::{self, Cursor};
use crate::db::{self, APPLICATION_COLUMNS, Database};
use crate::error::{Result, TrackerError};
use crate::models::{
    Application, ApplicationConnection, ApplicationDetail, ApplicationEdge, ApplicationsFilter,
    Identity, Note, PageInfo,
};
use crate::status::ApplicationStatus;
use crate::validate;

pub const MAX_PAGE_SIZE: i64 = 50;

pub fn create_application(
    db: &Database,
    actor: &Identity,
    job_id: Uuid,
    source_url: Option<&str>,
) -> Result<ApplicationDetail> {
    let source_url = validate::optional_url("sourceUrl", source_url)?;
    if db.find_job(job_id)?.is_none() {
        return Err(TrackerError::NotFound("Job".to_string()));
    }

    let now = db::now();
    let application = Application {
        id: Uuid::new_v4(),
        user_id: actor.user_id,
        job_id,
        source_url,
        status: ApplicationStatus::Applied,
        applied_at: now,
        created_at: now,
        updated_at: now,
    };

    db.transaction(|conn| {
        let ts = db::format_timestamp(&now);
        conn.execute(
            "INSERT INTO applications
                (id, user_id, job_id, source_url, status, applied_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6, ?6)",
            rusqlite::params![
                application.id.to_string(),
                application.user_id.to_string(),
                application.job_id.to_string(),
                application.source_url,
                application.status,
                ts,
            ],
        )?;
        audit::append(
            conn,
            &ActivityEntry::new(
                actor.user_id,
                ActivityAction::ApplicationCreated,
                EntityType::Application,
                application.id,
            )
            .for_application(application.id)
            .with_metadata(json!({ "jobId": job_id })),
        )?;
        Ok::<_, TrackerError>(())
    })?;

    tracing::info!(actor = %actor.user_id, application = %application.id, job = %job_id, "application created");
    db.application_detail(application)
}

/// One of the actor's own applications. Other users' applications read as missing.
pub fn get_application(db: &Database, actor: &Identity, id: Uuid) -> Result<ApplicationDetail> {
    match db.find_application(id)? {
        Some(application) if application.user_id == actor.user_id => db.application_detail(application),
        _ => Err(TrackerError::NotFound("Application".to_string())),
    }
}

/// Moves an application one step along the pipeline.
pub fn move_status(
    db: &Database,
    actor: &Identity,
    application_id: Uuid,
    next: ApplicationStatus,
) -> Result<ApplicationDetail> {
    let updated = db.transaction(|conn| -> Result<Application> {
        let mut application = load_owned(db, actor, application_id)?;
        let from = application.status;
        if !from.can_transition_to(next) {
            return Err(TrackerError::InvalidTransition { from, to: next });
        }

        application.status = next;
        application.updated_at = db::now();
        conn.execute(
            "UPDATE applications SET status = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![
                application.status,
                db::format_timestamp(&application.updated_at),
                application.id.to_string(),
            ],
        )?;
        audit::append(
            conn,
            &ActivityEntry::new(
                actor.user_id,
                ActivityAction::ApplicationStatusChanged,
                EntityType::Application,
                application.id,
            )
            .for_application(application.id)
            .with_metadata(json!({ "from": from, "to": next })),
        )?;

        tracing::info!(
            actor = %actor.user_id,
            application = %application.id,
            %from,
            to = %next,
            "application status changed"
        );
        Ok(application)
    })?;

    db.application_detail(updated)
}

pub fn add_note(db: &Database, actor: &Identity, application_id: Uuid, body: &str) -> Result<Note> {
    let body = validate::optional_text(Some(body))
        .ok_or_else(|| TrackerError::invalid("Note body is required"))?;

    let note = db.transaction(|conn| {
        let application = load_owned(db, actor, application_id)?;
        let note = Note {
            id: Uuid::new_v4(),
            application_id: application.id,
            created_by_id: actor.user_id,
            body,
            created_at: db::now(),
        };
        conn.execute(
            "INSERT INTO notes (id, application_id, created_by_id, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![
                note.id.to_string(),
                note.application_id.to_string(),
                note.created_by_id.to_string(),
                note.body,
                db::format_timestamp(&note.created_at),
            ],
        )?;
        audit::append(
            conn,
            &ActivityEntry::new(
                actor.user_id,
                ActivityAction::NoteAdded,
                EntityType::Application,
                application.id,
            )
            .for_application(application.id)
            .with_metadata(json!({ "noteId": note.id })),
        )?;
        Ok::<_, TrackerError>(note)
    })?;

    tracing::info!(actor = %actor.user_id, application = %application_id, note = %note.id, "note added");
    Ok(note)
}

/// A page of the actor's applications in `(created_at DESC, id DESC)` order.
pub fn applications_connection(
    db: &Database,
    actor: &Identity,
    first: i64,
    after: Option<&str>,
    filter: &ApplicationsFilter,
) -> Result<ApplicationConnection> {
    if !(1..=MAX_PAGE_SIZE).contains(&first) {
        return Err(TrackerError::invalid(format!("first must be 1..{}", MAX_PAGE_SIZE)));
    }

    let mut query = PageQuery::for_user(actor.user_id);
    query.filter(filter);
    if let Some(after) = after.filter(|a| !a.trim().is_empty()) {
        query.after(&cursor::decode(after)?);
    }

    let mut rows = query.fetch(db, first + 1)?;
    let has_next_page = rows.len() as i64 > first;
    rows.truncate(first as usize);

    let edges = rows
        .into_iter()
        .map(|application| {
            let cursor = cursor::encode(&application.created_at, application.id);
            Ok(ApplicationEdge {
                cursor,
                node: db.application_detail(application)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let end_cursor = edges.last().map(|edge| edge.cursor.clone());
    tracing::debug!(actor = %actor.user_id, returned = edges.len(), has_next_page, "applications page");

    Ok(ApplicationConnection {
        edges,
        page_info: PageInfo {
            end_cursor,
            has_next_page,
        },
    })
}

fn load_owned(db: &Database, actor: &Identity, application_id: Uuid) -> Result<Application> {
    let application = db
        .find_application(application_id)?
        .ok_or_else(|| TrackerError::NotFound("Application".to_string()))?;
    if application.user_id != actor.user_id {
        tracing::warn!(actor = %actor.user_id, application = %application_id, "not the applicant");
        return Err(TrackerError::Forbidden("not the applicant".to_string()));
    }
    Ok(application)
}

/// AND-combined predicates over `applications a`, `jobs j` and `companies c`.
struct PageQuery {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl PageQuery {
    fn for_user(user_id: Uuid) -> Self {
        let mut query = Self {
            clauses: Vec::new(),
            params: Vec::new(),
        };
        query.push("a.user_id = ?", [Value::Text(user_id.to_string())]);
        query
    }

    fn push(&mut self, clause: impl Into<String>, params: impl IntoIterator<Item = Value>) {
        self.clauses.push(clause.into());
        self.params.extend(params);
    }

    fn filter(&mut self, filter: &ApplicationsFilter) {
        if !filter.statuses.is_empty() {
            let placeholders = vec!["?"; filter.statuses.len()].join(", ");
            self.push(
                format!("a.status IN ({})", placeholders),
                filter
                    .statuses
                    .iter()
                    .map(|status| Value::Text(status.as_str().to_string())),
            );
        }

        if let Some(job_id) = filter.job_id {
            self.push("a.job_id = ?", [Value::Text(job_id.to_string())]);
        }

        if let Some(company_id) = filter.company_id {
            self.push("j.company_id = ?", [Value::Text(company_id.to_string())]);
        }

        if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            self.push(
                "(instr(lower(j.title), ?) > 0 OR instr(lower(c.name), ?) > 0)",
                [Value::Text(needle.clone()), Value::Text(needle)],
            );
        }
    }

    /// Strictly after `cursor` in `(created_at DESC, id DESC)` order.
    fn after(&mut self, cursor: &Cursor) {
        let created_at = db::format_timestamp(&cursor.created_at);
        self.push(
            "(a.created_at < ? OR (a.created_at = ? AND a.id < ?))",
            [
                Value::Text(created_at.clone()),
                Value::Text(created_at),
                Value::Text(cursor.id.to_string()),
            ],
        );
    }

    fn fetch(mut self, db: &Database, limit: i64) -> Result<Vec<Application>> {
        let sql = format!(
            "SELECT {APPLICATION_COLUMNS}
             FROM applications a
             JOIN jobs j ON j.id = a.job_id
             JOIN companies c ON c.id = j.company_id
             WHERE {}
             ORDER BY a.created_at DESC, a.id DESC
             LIMIT ?",
            self.clauses.join(" AND ")
        );
        self.params.push(Value::Integer(limit));

        let mut stmt = db.conn().prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(self.params.iter()), |row| {
            Database::row_to_application(row, 0)
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(TrackerError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::activity_for_application;
    use crate::auth::tests::register;
    use crate::company::{create_company, grant_membership};
    use crate::error::ErrorKind;
    use crate::job::create_job;
    use crate::job::tests::new_job;
    use crate::models::{JobWithCompany, Role};
    use chrono::{Duration, TimeZone, Utc};
    use std::collections::HashSet;

    struct Fixture {
        db: Database,
        ada: Identity,
        bob: Identity,
        job: JobWithCompany,
    }

    fn fixture() -> Fixture {
        let db = Database::open_in_memory().unwrap();
        let ada = register(&db, "ada@example.com");
        let bob = register(&db, "bob@example.com");
        let acme = create_company(&db, &ada, "Acme", None).unwrap();
        let job = create_job(&db, &ada, new_job(acme.id, "Platform Engineer")).unwrap();
        Fixture { db, ada, bob, job }
    }

    fn set_created_at(db: &Database, id: Uuid, ts: chrono::DateTime<Utc>) {
        db.conn()
            .execute(
                "UPDATE applications SET created_at = ?1 WHERE id = ?2",
                rusqlite::params![db::format_timestamp(&ts), id.to_string()],
            )
            .unwrap();
    }

    fn collect_all(db: &Database, actor: &Identity, first: i64, filter: &ApplicationsFilter) -> Vec<Vec<ApplicationEdge>> {
        let mut pages = Vec::new();
        let mut after: Option<String> = None;
        loop {
            let page = applications_connection(db, actor, first, after.as_deref(), filter).unwrap();
            let has_next = page.page_info.has_next_page;
            after = page.page_info.end_cursor.clone();
            pages.push(page.edges);
            if !has_next {
                return pages;
            }
        }
    }

    #[test]
    fn test_create_application_starts_applied() {
        let f = fixture();
        let detail = create_application(&f.db, &f.bob, f.job.job.id, Some("https://jobs.example/1")).unwrap();
        assert_eq!(detail.application.status, ApplicationStatus::Applied);
        assert_eq!(detail.application.user_id, f.bob.user_id);
        assert_eq!(detail.job.company.name, "Acme");
        assert!(detail.notes.is_empty());

        let trail = activity_for_application(&f.db, &f.bob, detail.application.id).unwrap();
        assert_eq!(trail.len(), 1);
        assert_eq!(trail[0].action, "APPLICATION_CREATED");
        assert_eq!(trail[0].metadata, json!({ "jobId": f.job.job.id }));
    }

    #[test]
    fn test_create_application_missing_job() {
        let f = fixture();
        let err = create_application(&f.db, &f.bob, Uuid::new_v4(), None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        let err = create_application(&f.db, &f.bob, f.job.job.id, Some("nope")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_get_application_hides_other_users() {
        let f = fixture();
        let detail = create_application(&f.db, &f.bob, f.job.job.id, None).unwrap();
        assert!(get_application(&f.db, &f.bob, detail.application.id).is_ok());
        let err = get_application(&f.db, &f.ada, detail.application.id).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_pipeline_walkthrough() {
        let db = Database::open_in_memory().unwrap();
        let u1 = register(&db, "u1@example.com");
        let u2 = register(&db, "u2@example.com");
        let company = create_company(&db, &u1, "C", None).unwrap();
        grant_membership(&db, &u1, company.id, "u2@example.com", Role::Editor).unwrap();
        let job = create_job(&db, &u2, new_job(company.id, "J")).unwrap();
        let app = create_application(&db, &u1, job.job.id, None).unwrap();

        let err = move_status(&db, &u1, app.application.id, ApplicationStatus::Interview1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(err.to_string(), "Invalid transition: APPLIED -> INTERVIEW_1");

        let moved = move_status(&db, &u1, app.application.id, ApplicationStatus::RecruiterScreen).unwrap();
        assert_eq!(moved.application.status, ApplicationStatus::RecruiterScreen);
        assert_eq!(moved.job.job.id, job.job.id);
        assert!(moved.application.updated_at >= app.application.updated_at);

        let trail = activity_for_application(&db, &u1, app.application.id).unwrap();
        let last = trail.last().unwrap();
        assert_eq!(last.action, "APPLICATION_STATUS_CHANGED");
        assert_eq!(last.metadata, json!({ "from": "APPLIED", "to": "RECRUITER_SCREEN" }));
        assert_eq!(trail.len(), 2);
    }

    #[test]
    fn test_move_status_follows_transition_table() {
        let f = fixture();
        for from in ApplicationStatus::ALL {
            for to in ApplicationStatus::ALL {
                let app = create_application(&f.db, &f.bob, f.job.job.id, None).unwrap();
                f.db.conn()
                    .execute(
                        "UPDATE applications SET status = ?1 WHERE id = ?2",
                        rusqlite::params![from, app.application.id.to_string()],
                    )
                    .unwrap();

                let result = move_status(&f.db, &f.bob, app.application.id, to);
                assert_eq!(result.is_ok(), from.can_transition_to(to), "{} -> {}", from, to);

                let stored = f.db.find_application(app.application.id).unwrap().unwrap();
                let expected = if result.is_ok() { to } else { from };
                assert_eq!(stored.status, expected);
            }
        }
    }

    #[test]
    fn test_rejected_move_writes_no_activity() {
        let f = fixture();
        let app = create_application(&f.db, &f.bob, f.job.job.id, None).unwrap();
        move_status(&f.db, &f.bob, app.application.id, ApplicationStatus::Withdrawn).unwrap();
        assert!(move_status(&f.db, &f.bob, app.application.id, ApplicationStatus::RecruiterScreen).is_err());

        let trail = activity_for_application(&f.db, &f.bob, app.application.id).unwrap();
        assert_eq!(trail.len(), 2);
    }

    #[test]
    fn test_failed_audit_write_rolls_back_the_change() {
        let f = fixture();
        let app = create_application(&f.db, &f.bob, f.job.job.id, None).unwrap();
        f.db.conn()
            .execute_batch(
                "CREATE TRIGGER reject_activity BEFORE INSERT ON activity_logs
                 BEGIN SELECT RAISE(ABORT, 'activity log unavailable'); END;",
            )
            .unwrap();

        let err = move_status(&f.db, &f.bob, app.application.id, ApplicationStatus::RecruiterScreen).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(add_note(&f.db, &f.bob, app.application.id, "Phone screen booked").is_err());

        let current = get_application(&f.db, &f.bob, app.application.id).unwrap();
        assert_eq!(current.application.status, ApplicationStatus::Applied);
        assert_eq!(current.application.updated_at, app.application.updated_at);
        assert!(current.notes.is_empty());

        let trail = activity_for_application(&f.db, &f.bob, app.application.id).unwrap();
        assert_eq!(trail.len(), 1);
    }

    #[test]
    fn test_move_status_ownership() {
        let f = fixture();
        let app = create_application(&f.db, &f.bob, f.job.job.id, None).unwrap();
        let err = move_status(&f.db, &f.ada, app.application.id, ApplicationStatus::RecruiterScreen).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        let err = move_status(&f.db, &f.bob, Uuid::new_v4(), ApplicationStatus::RecruiterScreen).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_notes_are_newest_first() {
        let f = fixture();
        let app = create_application(&f.db, &f.bob, f.job.job.id, None).unwrap();
        let first = add_note(&f.db, &f.bob, app.application.id, "Sent thank-you email").unwrap();
        let second = add_note(&f.db, &f.bob, app.application.id, "  Recruiter replied  ").unwrap();
        assert_eq!(second.body, "Recruiter replied");

        let detail = get_application(&f.db, &f.bob, app.application.id).unwrap();
        let ids: Vec<Uuid> = detail.notes.iter().map(|n| n.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);

        let trail = activity_for_application(&f.db, &f.bob, app.application.id).unwrap();
        assert_eq!(trail.last().unwrap().metadata, json!({ "noteId": second.id }));
    }

    #[test]
    fn test_add_note_checks() {
        let f = fixture();
        let app = create_application(&f.db, &f.bob, f.job.job.id, None).unwrap();
        let err = add_note(&f.db, &f.ada, app.application.id, "hi").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Forbidden);
        let err = add_note(&f.db, &f.bob, app.application.id, "   ").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        let err = add_note(&f.db, &f.bob, Uuid::new_v4(), "hi").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_first_must_be_in_range() {
        let f = fixture();
        let filter = ApplicationsFilter::default();
        for first in [0, -1, 51] {
            let err = applications_connection(&f.db, &f.bob, first, None, &filter).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
            assert_eq!(err.to_string(), "first must be 1..50");
        }
        assert!(applications_connection(&f.db, &f.bob, 50, None, &filter).is_ok());
    }

    #[test]
    fn test_invalid_cursor() {
        let f = fixture();
        let err = applications_connection(&f.db, &f.bob, 10, Some("bogus"), &ApplicationsFilter::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid cursor");
    }

    #[test]
    fn test_sub_microsecond_cursor_is_rejected() {
        use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};

        let f = fixture();
        let app = create_application(&f.db, &f.bob, f.job.job.id, None).unwrap();
        let stored = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::microseconds(123_456);
        set_created_at(&f.db, app.application.id, stored);
        let filter = ApplicationsFilter::default();
        let low_id = "00000000-0000-4000-8000-000000000000";

        let finer = URL_SAFE_NO_PAD.encode(format!("2026-01-01T00:00:00.123456789Z::{}", low_id));
        let err = applications_connection(&f.db, &f.bob, 10, Some(&finer), &filter).unwrap_err();
        assert_eq!(err.to_string(), "Invalid cursor");

        let next_micro = URL_SAFE_NO_PAD.encode(format!("2026-01-01T00:00:00.123457Z::{}", low_id));
        let page = applications_connection(&f.db, &f.bob, 10, Some(&next_micro), &filter).unwrap();
        assert_eq!(page.edges.len(), 1);
        assert_eq!(page.edges[0].node.application.id, app.application.id);
    }

    #[test]
    fn test_empty_page() {
        let f = fixture();
        let page = applications_connection(&f.db, &f.bob, 10, None, &ApplicationsFilter::default()).unwrap();
        assert!(page.edges.is_empty());
        assert!(!page.page_info.has_next_page);
        assert_eq!(page.page_info.end_cursor, None);
    }

    #[test]
    fn test_pagination_is_complete_with_shared_timestamps() {
        let f = fixture();
        let base = Utc.with_ymd_and_hms(2026, 1, 5, 9, 0, 0).unwrap();
        let mut ids = Vec::new();
        for i in 0..23 {
            let app = create_application(&f.db, &f.bob, f.job.job.id, None).unwrap();
            // groups of three share a timestamp
            set_created_at(&f.db, app.application.id, base + Duration::seconds(i / 3));
            ids.push(app.application.id);
        }

        let k = 5;
        let pages = collect_all(&f.db, &f.bob, k, &ApplicationsFilter::default());
        assert_eq!(pages.len(), 23usize.div_ceil(k as usize));
        assert!(pages.iter().all(|p| p.len() <= k as usize));

        let edges: Vec<&ApplicationEdge> = pages.iter().flatten().collect();
        assert_eq!(edges.len(), 23);
        let unique: HashSet<Uuid> = edges.iter().map(|e| e.node.application.id).collect();
        assert_eq!(unique.len(), 23);
        assert_eq!(unique, ids.into_iter().collect());

        for pair in edges.windows(2) {
            let a = &pair[0].node.application;
            let b = &pair[1].node.application;
            assert!((a.created_at, a.id) > (b.created_at, b.id));
        }
    }

    #[test]
    fn test_edges_carry_their_own_cursor() {
        let f = fixture();
        for _ in 0..4 {
            create_application(&f.db, &f.bob, f.job.job.id, None).unwrap();
        }
        let filter = ApplicationsFilter::default();
        let page = applications_connection(&f.db, &f.bob, 4, None, &filter).unwrap();
        assert!(!page.page_info.has_next_page);
        assert_eq!(page.page_info.end_cursor.as_ref(), Some(&page.edges[3].cursor));

        let resumed = applications_connection(&f.db, &f.bob, 4, Some(&page.edges[1].cursor), &filter).unwrap();
        let expected: Vec<Uuid> = page.edges[2..].iter().map(|e| e.node.application.id).collect();
        let got: Vec<Uuid> = resumed.edges.iter().map(|e| e.node.application.id).collect();
        assert_eq!(got, expected);

        let decoded = cursor::decode(&page.edges[0].cursor).unwrap();
        assert_eq!(decoded.id, page.edges[0].node.application.id);
        assert_eq!(decoded.created_at, page.edges[0].node.application.created_at);
    }

    #[test]
    fn test_users_only_see_their_own_applications() {
        let f = fixture();
        create_application(&f.db, &f.ada, f.job.job.id, None).unwrap();
        let bobs = create_application(&f.db, &f.bob, f.job.job.id, None).unwrap();

        let filters = [
            ApplicationsFilter::default(),
            ApplicationsFilter {
                job_id: Some(f.job.job.id),
                ..Default::default()
            },
            ApplicationsFilter {
                company_id: Some(f.job.company.id),
                search: Some("acme".to_string()),
                statuses: vec![ApplicationStatus::Applied],
                ..Default::default()
            },
        ];
        for filter in &filters {
            let page = applications_connection(&f.db, &f.bob, 50, None, filter).unwrap();
            assert_eq!(page.edges.len(), 1);
            assert_eq!(page.edges[0].node.application.id, bobs.application.id);
        }
    }

    #[test]
    fn test_filters() {
        let f = fixture();
        let globex = create_company(&f.db, &f.ada, "Globex Corporation", None).unwrap();
        let other_job = create_job(&f.db, &f.ada, new_job(globex.id, "Data Scientist")).unwrap();

        let a1 = create_application(&f.db, &f.bob, f.job.job.id, None).unwrap();
        let a2 = create_application(&f.db, &f.bob, other_job.job.id, None).unwrap();
        move_status(&f.db, &f.bob, a2.application.id, ApplicationStatus::Rejected).unwrap();

        let ids = |filter: ApplicationsFilter| -> Vec<Uuid> {
            applications_connection(&f.db, &f.bob, 50, None, &filter)
                .unwrap()
                .edges
                .into_iter()
                .map(|e| e.node.application.id)
                .collect()
        };

        assert_eq!(
            ids(ApplicationsFilter {
                statuses: vec![ApplicationStatus::Rejected, ApplicationStatus::Offer],
                ..Default::default()
            }),
            vec![a2.application.id]
        );
        assert_eq!(
            ids(ApplicationsFilter {
                company_id: Some(f.job.company.id),
                ..Default::default()
            }),
            vec![a1.application.id]
        );
        assert_eq!(
            ids(ApplicationsFilter {
                job_id: Some(other_job.job.id),
                ..Default::default()
            }),
            vec![a2.application.id]
        );
        // title match
        assert_eq!(
            ids(ApplicationsFilter {
                search: Some("  PLATFORM ".to_string()),
                ..Default::default()
            }),
            vec![a1.application.id]
        );
        // company name match
        assert_eq!(
            ids(ApplicationsFilter {
                search: Some("globex".to_string()),
                ..Default::default()
            }),
            vec![a2.application.id]
        );
        assert_eq!(
            ids(ApplicationsFilter {
                search: Some("   ".to_string()),
                ..Default::default()
            })
            .len(),
            2
        );
        assert!(
            ids(ApplicationsFilter {
                search: Some("globex".to_string()),
                statuses: vec![ApplicationStatus::Applied],
                ..Default::default()
            })
            .is_empty()
        );
        assert!(
            ids(ApplicationsFilter {
                search: Some("100%".to_string()),
                ..Default::default()
            })
            .is_empty()
        );
    }

    #[test]
    fn test_filters_combine_with_cursor() {
        let f = fixture();
        let base = Utc.with_ymd_and_hms(2026, 2, 1, 12, 0, 0).unwrap();
        for i in 0..6 {
            let app = create_application(&f.db, &f.bob, f.job.job.id, None).unwrap();
            set_created_at(&f.db, app.application.id, base + Duration::minutes(i));
            if i % 2 == 0 {
                move_status(&f.db, &f.bob, app.application.id, ApplicationStatus::Withdrawn).unwrap();
            }
        }
        let filter = ApplicationsFilter {
            statuses: vec![ApplicationStatus::Withdrawn],
            ..Default::default()
        };
        let pages = collect_all(&f.db, &f.bob, 2, &filter);
        assert_eq!(pages.len(), 2);
        let all: Vec<ApplicationStatus> = pages
            .iter()
            .flatten()
            .map(|e| e.node.application.status)
            .collect();
        assert_eq!(all, vec![ApplicationStatus::Withdrawn; 3]);
    }
}
