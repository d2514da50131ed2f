use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Hiring pipeline stage of an application.
///
/// `Applied` is the only initial state. `Rejected` and `Withdrawn` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    #[serde(rename = "APPLIED")]
    Applied,
    #[serde(rename = "RECRUITER_SCREEN")]
    RecruiterScreen,
    #[serde(rename = "INTERVIEW_1")]
    Interview1,
    #[serde(rename = "INTERVIEW_2")]
    Interview2,
    #[serde(rename = "ONSITE")]
    Onsite,
    #[serde(rename = "OFFER")]
    Offer,
    #[serde(rename = "REJECTED")]
    Rejected,
    #[serde(rename = "WITHDRAWN")]
    Withdrawn,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 8] = [
        ApplicationStatus::Applied,
        ApplicationStatus::RecruiterScreen,
        ApplicationStatus::Interview1,
        ApplicationStatus::Interview2,
        ApplicationStatus::Onsite,
        ApplicationStatus::Offer,
        ApplicationStatus::Rejected,
        ApplicationStatus::Withdrawn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Applied => "APPLIED",
            ApplicationStatus::RecruiterScreen => "RECRUITER_SCREEN",
            ApplicationStatus::Interview1 => "INTERVIEW_1",
            ApplicationStatus::Interview2 => "INTERVIEW_2",
            ApplicationStatus::Onsite => "ONSITE",
            ApplicationStatus::Offer => "OFFER",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::Withdrawn => "WITHDRAWN",
        }
    }

    /// Statuses reachable from `self` in one step.
    pub fn allowed_transitions(&self) -> &'static [ApplicationStatus] {
        use ApplicationStatus::*;
        match self {
            Applied => &[RecruiterScreen, Withdrawn, Rejected],
            RecruiterScreen => &[Interview1, Rejected, Withdrawn],
            Interview1 => &[Interview2, Rejected, Withdrawn],
            Interview2 => &[Onsite, Offer, Rejected, Withdrawn],
            Onsite => &[Offer, Rejected, Withdrawn],
            Offer => &[Withdrawn],
            Rejected | Withdrawn => &[],
        }
    }

    pub fn can_transition_to(&self, next: ApplicationStatus) -> bool {
        self.allowed_transitions().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('-', "_");
        ApplicationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| format!("Unknown application status: {}", s))
    }
}

impl ToSql for ApplicationStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for ApplicationStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let s = value.as_str()?;
        s.parse().map_err(|e: String| FromSqlError::Other(e.into()))
    }
}
