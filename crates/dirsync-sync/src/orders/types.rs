//! Order types and outcomes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Closed set of order kinds the processor routes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    AccountRegister,
    PasswordRetrieve,
    AccountDisable,
    AccountRenew,
    AuthorityGrant,
}

impl OrderType {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderType::AccountRegister => "account_register",
            OrderType::PasswordRetrieve => "password_retrieve",
            OrderType::AccountDisable => "account_disable",
            OrderType::AccountRenew => "account_renew",
            OrderType::AuthorityGrant => "authority_grant",
        }
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one processing trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OrderOutcome {
    /// A handler ran; the ledger now reflects `success`.
    Executed { success: bool, message: String },
    /// The order had already succeeded; nothing ran.
    AlreadyHandled,
    /// Another trigger for the same order is running in this process.
    InProgress,
}

impl OrderOutcome {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            OrderOutcome::Executed { success: true, .. } | OrderOutcome::AlreadyHandled
        )
    }
}

/// One person an account-register order is filed for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Applicant {
    pub name: String,
    pub employee_id: String,
    pub company: String,
    pub department: String,
    pub email: String,
    pub phone: String,
    pub title: String,
    /// Requested platform names, as entered.
    pub platforms: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_type_serde_names() {
        for t in [
            OrderType::AccountRegister,
            OrderType::PasswordRetrieve,
            OrderType::AccountDisable,
            OrderType::AccountRenew,
            OrderType::AuthorityGrant,
        ] {
            let json = serde_json::to_value(t).unwrap();
            assert_eq!(json, serde_json::json!(t.as_str()));
        }
    }

    #[test]
    fn test_outcome_success() {
        assert!(OrderOutcome::AlreadyHandled.is_success());
        assert!(!OrderOutcome::InProgress.is_success());
        assert!(!OrderOutcome::Executed {
            success: false,
            message: "boom".into()
        }
        .is_success());
    }
}
