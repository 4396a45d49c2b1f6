use core::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use quartermaster_core::{
    AssetId, AssignmentId, BaseId, ConflictKind, DomainError, DomainResult, UserId,
};

/// Assignment lifecycle. `returned` and `lost` are final; `lost` is set only
/// by external intervention, never by a workflow here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Active,
    Returned,
    Lost,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Active => "active",
            AssignmentStatus::Returned => "returned",
            AssignmentStatus::Lost => "lost",
        }
    }
}

impl core::fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssignmentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AssignmentStatus::Active),
            "returned" => Ok(AssignmentStatus::Returned),
            "lost" => Ok(AssignmentStatus::Lost),
            other => Err(DomainError::validation(format!(
                "unknown assignment status '{other}'"
            ))),
        }
    }
}

/// An asset handed to personnel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: AssignmentId,
    pub asset: AssetId,
    pub assigned_to: UserId,
    /// The asset's base at assignment time.
    pub base: BaseId,
    pub assigned_by: UserId,
    pub assignment_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: AssignmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Input for assigning an asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAssignment {
    pub asset: AssetId,
    pub assigned_to: UserId,
    pub assignment_date: NaiveDate,
    pub notes: Option<String>,
}

impl Assignment {
    /// Open an active assignment for an asset sitting at `base`.
    pub fn create(input: NewAssignment, base: BaseId, assigned_by: UserId) -> Assignment {
        Assignment {
            id: AssignmentId::new(),
            asset: input.asset,
            assigned_to: input.assigned_to,
            base,
            assigned_by,
            assignment_date: input.assignment_date,
            return_date: None,
            status: AssignmentStatus::Active,
            notes: input.notes,
            created_at: Utc::now(),
        }
    }

    /// Close an active assignment. Anything else (already returned, lost,
    /// or raced by a concurrent return) yields the already-returned
    /// conflict.
    pub fn mark_returned(&mut self, on: NaiveDate) -> DomainResult<()> {
        if self.status != AssignmentStatus::Active {
            return Err(DomainError::conflict(
                ConflictKind::AssignmentAlreadyReturned,
            ));
        }
        self.status = AssignmentStatus::Returned;
        self.return_date = Some(on);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_assignment() -> Assignment {
        Assignment::create(
            NewAssignment {
                asset: AssetId::new(),
                assigned_to: UserId::new(),
                assignment_date: NaiveDate::from_ymd_opt(2025, 5, 20).unwrap(),
                notes: None,
            },
            BaseId::new(),
            UserId::new(),
        )
    }

    #[test]
    fn create_opens_active_with_no_return_date() {
        let assignment = test_assignment();
        assert_eq!(assignment.status, AssignmentStatus::Active);
        assert_eq!(assignment.return_date, None);
    }

    #[test]
    fn mark_returned_sets_status_and_date() {
        let mut assignment = test_assignment();
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

        assignment.mark_returned(today).unwrap();

        assert_eq!(assignment.status, AssignmentStatus::Returned);
        assert_eq!(assignment.return_date, Some(today));
    }

    #[test]
    fn second_return_reports_already_returned() {
        let mut assignment = test_assignment();
        let today = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        assignment.mark_returned(today).unwrap();

        let err = assignment.mark_returned(today).unwrap_err();
        assert_eq!(
            err,
            DomainError::Conflict(ConflictKind::AssignmentAlreadyReturned)
        );
    }

    #[test]
    fn lost_assignments_cannot_be_returned() {
        let mut assignment = test_assignment();
        assignment.status = AssignmentStatus::Lost;

        let err = assignment
            .mark_returned(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::Conflict(ConflictKind::AssignmentAlreadyReturned)
        );
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            AssignmentStatus::Active,
            AssignmentStatus::Returned,
            AssignmentStatus::Lost,
        ] {
            assert_eq!(status.as_str().parse::<AssignmentStatus>().unwrap(), status);
        }
    }
}
