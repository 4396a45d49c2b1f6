use core::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use quartermaster_core::{
    AssetId, BaseId, ConflictKind, DomainError, DomainResult, TransferId, UserId,
};

/// Transfer lifecycle. `completed` and `cancelled` are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStatus {
    Pending,
    Completed,
    Cancelled,
}

impl TransferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransferStatus::Pending => "pending",
            TransferStatus::Completed => "completed",
            TransferStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_final(&self) -> bool {
        !matches!(self, TransferStatus::Pending)
    }
}

impl core::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransferStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransferStatus::Pending),
            "completed" => Ok(TransferStatus::Completed),
            "cancelled" => Ok(TransferStatus::Cancelled),
            other => Err(DomainError::validation(format!(
                "unknown transfer status '{other}'"
            ))),
        }
    }
}

/// Relocation of one asset between bases.
///
/// Requested on the sending side, approved on the receiving side. The asset
/// stays put until approval; approval moves it in the same transaction that
/// completes the transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: TransferId,
    pub asset: AssetId,
    pub from_base: BaseId,
    pub to_base: BaseId,
    /// Always 1 in the current model; kept as a field because the movement
    /// reports sum it.
    pub quantity: u32,
    pub status: TransferStatus,
    pub transfer_date: NaiveDate,
    pub requested_by: UserId,
    pub approved_by: Option<UserId>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Input for requesting a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransfer {
    pub asset: AssetId,
    pub from_base: BaseId,
    pub to_base: BaseId,
    pub quantity: u32,
    pub transfer_date: NaiveDate,
    pub notes: Option<String>,
}

impl NewTransfer {
    pub fn validate(&self) -> DomainResult<()> {
        if self.from_base == self.to_base {
            return Err(DomainError::validation(
                "source and destination base must differ",
            ));
        }
        if self.quantity == 0 {
            return Err(DomainError::validation(
                "quantity must be greater than zero",
            ));
        }
        Ok(())
    }
}

impl Transfer {
    /// Validate the input and open the transfer in `pending`.
    pub fn request(input: NewTransfer, requested_by: UserId) -> DomainResult<Transfer> {
        input.validate()?;
        Ok(Transfer {
            id: TransferId::new(),
            asset: input.asset,
            from_base: input.from_base,
            to_base: input.to_base,
            quantity: input.quantity,
            status: TransferStatus::Pending,
            transfer_date: input.transfer_date,
            requested_by,
            approved_by: None,
            notes: input.notes,
            created_at: Utc::now(),
            completed_at: None,
        })
    }

    /// Complete a pending transfer. Any other state (including one already
    /// completed by a concurrent approver) yields the already-processed
    /// conflict.
    pub fn complete(&mut self, approved_by: UserId, at: DateTime<Utc>) -> DomainResult<()> {
        if self.status != TransferStatus::Pending {
            return Err(DomainError::conflict(ConflictKind::TransferAlreadyProcessed));
        }
        self.status = TransferStatus::Completed;
        self.approved_by = Some(approved_by);
        self.completed_at = Some(at);
        Ok(())
    }

    /// Cancel a pending transfer. Same conflict as [`Transfer::complete`]
    /// once the record left `pending`.
    pub fn cancel(&mut self) -> DomainResult<()> {
        if self.status != TransferStatus::Pending {
            return Err(DomainError::conflict(ConflictKind::TransferAlreadyProcessed));
        }
        self.status = TransferStatus::Cancelled;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_input() -> NewTransfer {
        NewTransfer {
            asset: AssetId::new(),
            from_base: BaseId::new(),
            to_base: BaseId::new(),
            quantity: 1,
            transfer_date: NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(),
            notes: None,
        }
    }

    #[test]
    fn request_opens_pending() {
        let transfer = Transfer::request(test_input(), UserId::new()).unwrap();
        assert_eq!(transfer.status, TransferStatus::Pending);
        assert_eq!(transfer.approved_by, None);
        assert_eq!(transfer.completed_at, None);
    }

    #[test]
    fn same_base_transfer_is_rejected() {
        let mut input = test_input();
        input.to_base = input.from_base;
        let err = Transfer::request(input, UserId::new()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let mut input = test_input();
        input.quantity = 0;
        assert!(Transfer::request(input, UserId::new()).is_err());
    }

    #[test]
    fn complete_records_approver_and_time() {
        let mut transfer = Transfer::request(test_input(), UserId::new()).unwrap();
        let approver = UserId::new();
        let now = Utc::now();

        transfer.complete(approver, now).unwrap();

        assert_eq!(transfer.status, TransferStatus::Completed);
        assert_eq!(transfer.approved_by, Some(approver));
        assert_eq!(transfer.completed_at, Some(now));
    }

    #[test]
    fn second_completion_reports_already_processed() {
        let mut transfer = Transfer::request(test_input(), UserId::new()).unwrap();
        transfer.complete(UserId::new(), Utc::now()).unwrap();

        let err = transfer.complete(UserId::new(), Utc::now()).unwrap_err();
        assert_eq!(
            err,
            DomainError::Conflict(ConflictKind::TransferAlreadyProcessed)
        );
    }

    #[test]
    fn cancel_after_completion_reports_already_processed() {
        let mut transfer = Transfer::request(test_input(), UserId::new()).unwrap();
        transfer.complete(UserId::new(), Utc::now()).unwrap();

        let err = transfer.cancel().unwrap_err();
        assert_eq!(
            err,
            DomainError::Conflict(ConflictKind::TransferAlreadyProcessed)
        );
    }

    #[test]
    fn cancelled_transfer_cannot_complete() {
        let mut transfer = Transfer::request(test_input(), UserId::new()).unwrap();
        transfer.cancel().unwrap();
        assert!(transfer.complete(UserId::new(), Utc::now()).is_err());
        assert_eq!(transfer.status, TransferStatus::Cancelled);
    }

    #[test]
    fn status_round_trips_through_strings() {
        for status in [
            TransferStatus::Pending,
            TransferStatus::Completed,
            TransferStatus::Cancelled,
        ] {
            assert_eq!(status.as_str().parse::<TransferStatus>().unwrap(), status);
        }
    }
}
