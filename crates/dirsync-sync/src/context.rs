//! Sync settings and the validated context shared by every component.
//!
//! [`SyncSettings`] is the raw `sync:` section of the config file.
//! [`SyncContext::new`] validates it once at startup; the result is passed
//! by `Arc` to the reconciler, the expiry sweep, and the order processor.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use dirsync_connector::dn;

use crate::company::{CompanyType, CompanyTypeMap};
use crate::error::{SyncError, SyncResult};
use crate::orders::types::OrderType;
use crate::platforms::PlatformSpec;
use crate::reconciliation::calendar::{HolidayPeriod, WorkCalendar};

/// Raw sync settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Directory base DN, e.g. `DC=corp,DC=example,DC=com`.
    pub base_dn: String,

    /// Container for departed employees.
    pub disabled_dn: String,

    /// Container for internal hires without a department.
    pub default_ou: String,

    /// RDN(s) of the external partner subtree, relative to `base_dn`.
    #[serde(default = "default_partner_root")]
    pub partner_root: String,

    #[serde(default)]
    pub companies: HashMap<String, CompanyType>,

    /// Maximum concurrent per-record reconciliations.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Lifetime of external accounts and default renewal period.
    #[serde(default = "default_external_account_days")]
    pub external_account_days: i64,

    #[serde(default = "default_external_login_prefix")]
    pub external_login_prefix: String,

    /// Suffix for `userPrincipalName`; empty disables UPN assignment.
    #[serde(default)]
    pub upn_suffix: String,

    /// Platform name that stands for the directory account itself.
    #[serde(default = "default_directory_platform")]
    pub directory_platform: String,

    /// Downstream platforms that accounts can be requested on.
    #[serde(default)]
    pub platforms: Vec<PlatformSpec>,

    /// Approval template code to order type.
    #[serde(default)]
    pub order_templates: HashMap<String, OrderType>,

    #[serde(default = "default_password_length")]
    pub password_length: usize,

    /// Local time zone used for digest windows and renewal dates.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,

    #[serde(default)]
    pub expiry: ExpirySettings,

    #[serde(default)]
    pub digest: DigestSettings,
}

/// Expiry sweep settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpirySettings {
    /// Smallest day offset scanned (inclusive).
    #[serde(default = "default_window_start")]
    pub window_start: i64,
    /// Largest day offset scanned (inclusive).
    #[serde(default = "default_window_end")]
    pub window_end: i64,
}

impl Default for ExpirySettings {
    fn default() -> Self {
        Self {
            window_start: default_window_start(),
            window_end: default_window_end(),
        }
    }
}

/// Daily department-change digest settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestSettings {
    /// Chat recipient of the digest; empty disables it.
    #[serde(default)]
    pub recipient: String,

    #[serde(default = "default_max_message_bytes")]
    pub max_message_bytes: usize,

    #[serde(default)]
    pub holidays: Vec<HolidayPeriod>,

    /// Weekend days that are working days.
    #[serde(default)]
    pub adjusted_workdays: Vec<NaiveDate>,
}

impl Default for DigestSettings {
    fn default() -> Self {
        Self {
            recipient: String::new(),
            max_message_bytes: default_max_message_bytes(),
            holidays: Vec::new(),
            adjusted_workdays: Vec::new(),
        }
    }
}

fn default_partner_root() -> String {
    "OU=Partners".to_string()
}

fn default_concurrency() -> usize {
    20
}

fn default_external_account_days() -> i64 {
    90
}

fn default_external_login_prefix() -> String {
    "ext_".to_string()
}

fn default_directory_platform() -> String {
    "UUAP".to_string()
}

fn default_password_length() -> usize {
    16
}

fn default_utc_offset_hours() -> i32 {
    8
}

fn default_window_start() -> i64 {
    -7
}

fn default_window_end() -> i64 {
    14
}

fn default_max_message_bytes() -> usize {
    4000
}

/// Validated, immutable sync context.
#[derive(Debug, Clone)]
pub struct SyncContext {
    settings: SyncSettings,
    partner_root_dn: String,
    companies: CompanyTypeMap,
    calendar: WorkCalendar,
    offset: FixedOffset,
}

impl SyncContext {
    /// Validate settings. Any failure here is fatal at startup.
    pub fn new(settings: SyncSettings) -> SyncResult<Self> {
        let base = settings.base_dn.trim();
        if base.is_empty() {
            return Err(SyncError::configuration("sync.base_dn is empty"));
        }
        let base_rdns = dn::parse(base).map_err(|e| {
            SyncError::configuration(format!("sync.base_dn is not a DN: {e}"))
        })?;
        if base_rdns.is_empty() {
            return Err(SyncError::configuration("sync.base_dn is empty"));
        }

        for (name, value) in [
            ("sync.disabled_dn", &settings.disabled_dn),
            ("sync.default_ou", &settings.default_ou),
        ] {
            dn::parse(value)
                .map_err(|e| SyncError::configuration(format!("{name} is not a DN: {e}")))?;
            if !dn::is_descendant_of(value, base) {
                return Err(SyncError::configuration(format!(
                    "{name} '{value}' is outside base DN '{base}'"
                )));
            }
        }

        let partner_rdns = dn::parse(&settings.partner_root).map_err(|e| {
            SyncError::configuration(format!("sync.partner_root is not a DN: {e}"))
        })?;
        if partner_rdns.is_empty() {
            return Err(SyncError::configuration("sync.partner_root is empty"));
        }
        let partner_root_dn = format!("{},{}", settings.partner_root.trim(), base);

        if settings.concurrency == 0 {
            return Err(SyncError::configuration("sync.concurrency must be at least 1"));
        }
        if settings.external_account_days <= 0 {
            return Err(SyncError::configuration(
                "sync.external_account_days must be positive",
            ));
        }
        if settings.expiry.window_start > settings.expiry.window_end {
            return Err(SyncError::configuration(
                "sync.expiry.window_start is after window_end",
            ));
        }
        if settings.digest.max_message_bytes == 0 {
            return Err(SyncError::configuration(
                "sync.digest.max_message_bytes must be positive",
            ));
        }
        if settings.directory_platform.trim().is_empty() {
            return Err(SyncError::configuration("sync.directory_platform is empty"));
        }

        let offset = FixedOffset::east_opt(settings.utc_offset_hours * 3600).ok_or_else(|| {
            SyncError::configuration(format!(
                "sync.utc_offset_hours {} is out of range",
                settings.utc_offset_hours
            ))
        })?;

        let companies = CompanyTypeMap::new(settings.companies.clone());
        let calendar = WorkCalendar::new(
            settings.digest.holidays.clone(),
            settings.digest.adjusted_workdays.clone(),
        );

        Ok(Self {
            settings,
            partner_root_dn,
            companies,
            calendar,
            offset,
        })
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn base_dn(&self) -> &str {
        self.settings.base_dn.trim()
    }

    pub fn disabled_dn(&self) -> &str {
        &self.settings.disabled_dn
    }

    pub fn default_ou(&self) -> &str {
        &self.settings.default_ou
    }

    /// Full DN of the external partner subtree.
    pub fn partner_root_dn(&self) -> &str {
        &self.partner_root_dn
    }

    pub fn companies(&self) -> &CompanyTypeMap {
        &self.companies
    }

    pub fn calendar(&self) -> &WorkCalendar {
        &self.calendar
    }

    pub fn concurrency(&self) -> usize {
        self.settings.concurrency
    }

    pub fn order_type(&self, template_code: &str) -> Option<OrderType> {
        self.settings.order_templates.get(template_code.trim()).copied()
    }

    /// Downstream platform spec by name (case-insensitive).
    pub fn platform(&self, name: &str) -> Option<&PlatformSpec> {
        self.settings
            .platforms
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Whether `name` is the directory account pseudo-platform.
    pub fn is_directory_platform(&self, name: &str) -> bool {
        self.settings
            .directory_platform
            .eq_ignore_ascii_case(name.trim())
    }

    /// Calendar date of `now` in the configured zone.
    pub fn local_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    /// UTC instant of local midnight starting `date`.
    pub fn local_midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        self.local_time(date, NaiveTime::MIN)
    }

    /// UTC instant of `date` at local wall-clock `time`.
    pub fn local_time(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        let naive = date.and_time(time);
        match self.offset.from_local_datetime(&naive).single() {
            Some(at) => at.with_timezone(&Utc),
            None => Utc.from_utc_datetime(&naive),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn settings() -> SyncSettings {
        let mut companies = HashMap::new();
        companies.insert(
            "Acme".to_string(),
            CompanyType {
                is_external: true,
                dn_prefix: "OU=Acme".to_string(),
            },
        );
        SyncSettings {
            base_dn: "DC=corp,DC=example,DC=com".to_string(),
            disabled_dn: "OU=Disabled,DC=corp,DC=example,DC=com".to_string(),
            default_ou: "OU=Unassigned,DC=corp,DC=example,DC=com".to_string(),
            partner_root: default_partner_root(),
            companies,
            concurrency: 4,
            external_account_days: 90,
            external_login_prefix: "ext_".to_string(),
            upn_suffix: "corp.example.com".to_string(),
            directory_platform: "UUAP".to_string(),
            platforms: vec![],
            order_templates: HashMap::new(),
            password_length: 16,
            utc_offset_hours: 8,
            expiry: ExpirySettings::default(),
            digest: DigestSettings::default(),
        }
    }

    pub(crate) fn context() -> SyncContext {
        SyncContext::new(settings()).unwrap()
    }

    #[test]
    fn test_valid_context() {
        let ctx = context();
        assert_eq!(ctx.partner_root_dn(), "OU=Partners,DC=corp,DC=example,DC=com");
        assert!(ctx.companies().is_external("acme"));
        assert!(ctx.is_directory_platform("uuap"));
    }

    #[test]
    fn test_empty_base_dn_is_fatal() {
        let mut s = settings();
        s.base_dn = "  ".to_string();
        let err = SyncContext::new(s).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn test_disabled_dn_outside_base_is_fatal() {
        let mut s = settings();
        s.disabled_dn = "OU=Disabled,DC=other,DC=com".to_string();
        assert!(SyncContext::new(s).is_err());
    }

    #[test]
    fn test_unparseable_base_dn_is_fatal() {
        let mut s = settings();
        s.base_dn = "corp.example.com".to_string();
        assert!(SyncContext::new(s).is_err());
    }

    #[test]
    fn test_local_date_uses_offset() {
        let ctx = context();
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 17, 0, 0).unwrap();
        assert_eq!(ctx.local_date(now), NaiveDate::from_ymd_opt(2026, 3, 2).unwrap());
        assert_eq!(
            ctx.local_midnight(NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()),
            Utc.with_ymd_and_hms(2026, 3, 1, 16, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_settings_defaults_from_yaml_like_json() {
        let s: SyncSettings = serde_json::from_value(serde_json::json!({
            "base_dn": "DC=corp,DC=example,DC=com",
            "disabled_dn": "OU=Disabled,DC=corp,DC=example,DC=com",
            "default_ou": "OU=Unassigned,DC=corp,DC=example,DC=com",
            "order_templates": { "TPL-REG": "account_register" }
        }))
        .unwrap();
        assert_eq!(s.concurrency, 20);
        assert_eq!(s.expiry.window_start, -7);
        assert_eq!(s.expiry.window_end, 14);
        assert_eq!(s.digest.max_message_bytes, 4000);
        let ctx = SyncContext::new(s).unwrap();
        assert_eq!(ctx.order_type("TPL-REG"), Some(OrderType::AccountRegister));
        assert_eq!(ctx.order_type("TPL-X"), None);
    }
}
