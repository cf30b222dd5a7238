use serde::{Deserialize, Serialize};
use strum::Display;

use super::document::Header;

/// Completion/approval state of a header, derived from its flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
pub enum ApprovalState {
    Open,
    /// Completed without an approval step.
    Completed,
    PendingApproval,
    Approved,
    Rejected,
}

impl ApprovalState {
    pub fn of(header: &Header) -> Self {
        if !header.is_completed {
            return Self::Open;
        }
        match header.approval_status {
            Some(true) => Self::Approved,
            Some(false) => Self::Rejected,
            None if header.is_pending_approval => Self::PendingApproval,
            None => Self::Completed,
        }
    }

    /// Approve/reject is only legal from `PendingApproval`.
    pub fn can_decide(&self) -> bool {
        matches!(self, Self::PendingApproval)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Approved | Self::Rejected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rstest::rstest;

    fn header(completed: bool, pending: bool, status: Option<bool>) -> Header {
        Header {
            id: 1,
            branch_code: "01".into(),
            document_no: None,
            customer_code: None,
            source_warehouse_code: None,
            target_warehouse_code: None,
            planned_date: None,
            description: None,
            is_completed: completed,
            completion_date: None,
            is_pending_approval: pending,
            approval_status: status,
            approved_by_user_id: None,
            approval_date: None,
            is_erp_integrated: false,
            created_by: None,
            created_at: Utc::now(),
            is_deleted: false,
            deleted_at: None,
            deleted_by: None,
        }
    }

    #[rstest]
    #[case(false, false, None, ApprovalState::Open)]
    #[case(false, true, None, ApprovalState::Open)]
    #[case(true, false, None, ApprovalState::Completed)]
    #[case(true, true, None, ApprovalState::PendingApproval)]
    #[case(true, false, Some(true), ApprovalState::Approved)]
    #[case(true, false, Some(false), ApprovalState::Rejected)]
    fn derives_state_from_flags(
        #[case] completed: bool,
        #[case] pending: bool,
        #[case] status: Option<bool>,
        #[case] expected: ApprovalState,
    ) {
        assert_eq!(ApprovalState::of(&header(completed, pending, status)), expected);
    }

    #[test]
    fn only_pending_headers_accept_a_decision() {
        assert!(ApprovalState::PendingApproval.can_decide());
        assert!(!ApprovalState::Open.can_decide());
        assert!(!ApprovalState::Approved.can_decide());
        assert!(ApprovalState::Rejected.is_terminal());
        assert!(!ApprovalState::PendingApproval.is_terminal());
    }
}
