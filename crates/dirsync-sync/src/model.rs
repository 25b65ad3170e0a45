//! Shared directory-attribute model.
//!
//! [`DirectoryUser`] is materialized either from an HR record (desired state)
//! or from a search result (actual state).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use dirsync_connector::dn;
use dirsync_connector::operation::AttributeSet;
use dirsync_connector_ldap::ad::UserAccountControl;

use crate::error::{SyncError, SyncResult};

/// Active Directory attribute names.
pub mod attr {
    pub const DN: &str = "distinguishedName";
    pub const OBJECT_CLASS: &str = "objectClass";
    pub const CN: &str = "cn";
    pub const OU: &str = "ou";
    pub const EMPLOYEE_ID: &str = "employeeID";
    pub const LOGIN: &str = "sAMAccountName";
    pub const UPN: &str = "userPrincipalName";
    pub const ACCOUNT_CONTROL: &str = "userAccountControl";
    pub const ACCOUNT_EXPIRES: &str = "accountExpires";
    pub const DISPLAY_NAME: &str = "displayName";
    pub const MAIL: &str = "mail";
    pub const PHONE: &str = "telephoneNumber";
    pub const COMPANY: &str = "company";
    pub const DEPARTMENT: &str = "department";
    pub const TITLE: &str = "title";
    pub const PWD_LAST_SET: &str = "pwdLastSet";
    pub const UNICODE_PWD: &str = "unicodePwd";
    pub const LOCKOUT_TIME: &str = "lockoutTime";
}

/// Attributes fetched for every user lookup.
pub const USER_ATTRIBUTES: &[&str] = &[
    attr::DN,
    attr::EMPLOYEE_ID,
    attr::LOGIN,
    attr::UPN,
    attr::ACCOUNT_CONTROL,
    attr::ACCOUNT_EXPIRES,
    attr::DISPLAY_NAME,
    attr::MAIL,
    attr::PHONE,
    attr::COMPANY,
    attr::DEPARTMENT,
    attr::TITLE,
    attr::PWD_LAST_SET,
];

/// Account state derived from `userAccountControl`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Enabled,
    Disabled,
    Locked,
}

impl AccountStatus {
    /// Disabled wins over locked.
    pub fn from_control(code: u32) -> Self {
        let uac = UserAccountControl::from(code);
        if uac.is_disabled() {
            AccountStatus::Disabled
        } else if uac.is_locked() {
            AccountStatus::Locked
        } else {
            AccountStatus::Enabled
        }
    }
}

impl fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountStatus::Enabled => write!(f, "enabled"),
            AccountStatus::Disabled => write!(f, "disabled"),
            AccountStatus::Locked => write!(f, "locked"),
        }
    }
}

/// HR status string meaning the employee has left.
pub const DEPARTED_STATUS: &str = "离职";

/// Employment state from the HR feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EmploymentStatus {
    #[default]
    Active,
    Departed,
}

impl FromStr for EmploymentStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s.trim() == DEPARTED_STATUS {
            EmploymentStatus::Departed
        } else {
            EmploymentStatus::Active
        })
    }
}

impl fmt::Display for EmploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmploymentStatus::Active => write!(f, "在职"),
            EmploymentStatus::Departed => write!(f, "{DEPARTED_STATUS}"),
        }
    }
}

impl Serialize for EmploymentStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for EmploymentStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        Ok(raw
            .parse::<EmploymentStatus>()
            .unwrap_or(EmploymentStatus::Active))
    }
}

/// One record of the HR feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HrRecord {
    #[serde(default)]
    pub company_code: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub display_name: String,
    /// Dotted department path, top level first: `Eng.Backend`.
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub employee_id: String,
    #[serde(default)]
    pub status: EmploymentStatus,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub title: String,
}

/// A user entry as read from the directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryUser {
    pub dn: String,
    pub employee_id: String,
    pub login: String,
    pub upn: String,
    pub account_control: Option<u32>,
    pub account_expires: Option<i64>,
    pub display_name: String,
    pub mail: String,
    pub phone: String,
    pub company: String,
    pub department: String,
    pub title: String,
    pub pwd_last_set: Option<i64>,
}

impl DirectoryUser {
    /// Build from a search result; the entry must carry its DN.
    pub fn from_attributes(attrs: &AttributeSet) -> SyncResult<Self> {
        let dn = attrs
            .get_string(attr::DN)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| SyncError::deserialization("directory entry without distinguishedName"))?;

        let text = |name: &str| attrs.get_string(name).unwrap_or_default().to_string();

        Ok(Self {
            dn: dn.to_string(),
            employee_id: text(attr::EMPLOYEE_ID),
            login: text(attr::LOGIN),
            upn: text(attr::UPN),
            account_control: attrs
                .get_string(attr::ACCOUNT_CONTROL)
                .and_then(UserAccountControl::parse)
                .map(u32::from)
                .or_else(|| attrs.get_i64(attr::ACCOUNT_CONTROL).map(|v| v as u32)),
            account_expires: attrs.get_i64(attr::ACCOUNT_EXPIRES),
            display_name: text(attr::DISPLAY_NAME),
            mail: text(attr::MAIL),
            phone: text(attr::PHONE),
            company: text(attr::COMPANY),
            department: text(attr::DEPARTMENT),
            title: text(attr::TITLE),
            pwd_last_set: attrs.get_i64(attr::PWD_LAST_SET),
        })
    }

    /// Account state; an entry without a control code counts as enabled.
    pub fn status(&self) -> AccountStatus {
        self.account_control
            .map(AccountStatus::from_control)
            .unwrap_or(AccountStatus::Enabled)
    }

    /// `userAccountControl`, defaulting to a normal enabled account.
    pub fn control(&self) -> UserAccountControl {
        UserAccountControl::from(self.account_control.unwrap_or(UserAccountControl::ENABLED))
    }

    /// Container holding the entry.
    pub fn container(&self) -> Option<&str> {
        dn::parent(&self.dn)
    }

    /// Leftmost RDN, e.g. `CN=Zhang San`.
    pub fn rdn(&self) -> Option<&str> {
        dn::first_rdn(&self.dn)
    }

    /// The name to address the user by in notifications.
    pub fn recipient(&self) -> &str {
        if self.login.is_empty() {
            &self.mail
        } else {
            &self.login
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_status_from_control() {
        assert_eq!(AccountStatus::from_control(512), AccountStatus::Enabled);
        assert_eq!(AccountStatus::from_control(514), AccountStatus::Disabled);
        assert_eq!(AccountStatus::from_control(0x210), AccountStatus::Locked);
        assert_eq!(AccountStatus::from_control(0x212), AccountStatus::Disabled);
    }

    #[test]
    fn test_employment_status_parse() {
        assert_eq!("离职".parse::<EmploymentStatus>(), Ok(EmploymentStatus::Departed));
        assert_eq!(" 离职 ".parse::<EmploymentStatus>(), Ok(EmploymentStatus::Departed));
        assert_eq!("在职".parse::<EmploymentStatus>(), Ok(EmploymentStatus::Active));
        assert_eq!("".parse::<EmploymentStatus>(), Ok(EmploymentStatus::Active));
    }

    #[test]
    fn test_hr_record_deserialize() {
        let record: HrRecord = serde_json::from_value(serde_json::json!({
            "display_name": "Zhang San",
            "employee_id": "E100",
            "department": "Eng.Backend",
            "status": "离职"
        }))
        .unwrap();
        assert_eq!(record.status, EmploymentStatus::Departed);
        assert_eq!(record.email, "");

        let record: HrRecord =
            serde_json::from_value(serde_json::json!({ "employee_id": "E2", "status": null }))
                .unwrap();
        assert_eq!(record.status, EmploymentStatus::Active);

        let record: HrRecord =
            serde_json::from_value(serde_json::json!({ "employee_id": "E3" })).unwrap();
        assert_eq!(record.status, EmploymentStatus::Active);
    }

    #[test]
    fn test_directory_user_from_attributes() {
        let attrs = AttributeSet::new()
            .with(attr::DN, "CN=Zhang San,OU=Backend,OU=Eng,DC=corp")
            .with(attr::EMPLOYEE_ID, "E100")
            .with(attr::LOGIN, "zhangsan")
            .with(attr::ACCOUNT_CONTROL, "514")
            .with(attr::ACCOUNT_EXPIRES, "0")
            .with(attr::PWD_LAST_SET, "0");

        let user = DirectoryUser::from_attributes(&attrs).unwrap();
        assert_eq!(user.status(), AccountStatus::Disabled);
        assert_eq!(user.account_expires, Some(0));
        assert_eq!(user.container(), Some("OU=Backend,OU=Eng,DC=corp"));
        assert_eq!(user.rdn(), Some("CN=Zhang San"));
        assert_eq!(user.pwd_last_set, Some(0));
        assert_eq!(user.recipient(), "zhangsan");
    }

    #[test]
    fn test_directory_user_requires_dn() {
        let attrs = AttributeSet::new().with(attr::EMPLOYEE_ID, "E100");
        assert!(DirectoryUser::from_attributes(&attrs).is_err());
    }
}
