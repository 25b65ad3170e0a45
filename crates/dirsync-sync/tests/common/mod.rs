//! In-memory collaborators for dirsync-sync integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

use dirsync_connector::dn;
use dirsync_connector::error::{ConnectorError, ConnectorResult};
use dirsync_connector::operation::{
    AttributeDelta, AttributeSet, AttributeValue, Filter, SearchScope,
};
use dirsync_connector::traits::{Connector, DirectoryOps};
use dirsync_db::{CreateDepartmentChange, DepartmentChangeRecord};
use dirsync_sync::approval::ApprovalClient;
use dirsync_sync::audit::DepartmentAudit;
use dirsync_sync::company::CompanyType;
use dirsync_sync::context::{SyncContext, SyncSettings};
use dirsync_sync::error::{SyncError, SyncResult};
use dirsync_sync::model::attr;
use dirsync_sync::notify::Notifier;
use dirsync_sync::orders::types::{Applicant, OrderType};
use dirsync_sync::orders::{LedgerEntry, OrderLedger, OrderServices};
use dirsync_sync::platforms::{PlatformProvisioner, PlatformSpec};

pub const BASE_DN: &str = "DC=corp,DC=example,DC=com";
pub const DISABLED_DN: &str = "OU=Disabled,DC=corp,DC=example,DC=com";
pub const DEFAULT_OU: &str = "OU=Unassigned,DC=corp,DC=example,DC=com";

pub fn settings() -> SyncSettings {
    let mut companies = HashMap::new();
    companies.insert(
        "Acme".to_string(),
        CompanyType {
            is_external: true,
            dn_prefix: "OU=Acme".to_string(),
        },
    );

    let mut order_templates = HashMap::new();
    order_templates.insert("TPL-REG".to_string(), OrderType::AccountRegister);
    order_templates.insert("TPL-PWD".to_string(), OrderType::PasswordRetrieve);
    order_templates.insert("TPL-DISABLE".to_string(), OrderType::AccountDisable);
    order_templates.insert("TPL-RENEW".to_string(), OrderType::AccountRenew);
    order_templates.insert("TPL-GRANT".to_string(), OrderType::AuthorityGrant);

    serde_json::from_value::<SyncSettings>(serde_json::json!({
        "base_dn": BASE_DN,
        "disabled_dn": DISABLED_DN,
        "default_ou": DEFAULT_OU,
        "concurrency": 4,
        "upn_suffix": "corp.example.com",
    }))
    .map(|mut s| {
        s.companies = companies;
        s.order_templates = order_templates;
        s.platforms = vec![
            PlatformSpec {
                name: "Wiki".into(),
                requires_directory: true,
            },
            PlatformSpec {
                name: "Mail".into(),
                requires_directory: false,
            },
        ];
        s
    })
    .unwrap()
}

pub fn context() -> Arc<SyncContext> {
    Arc::new(SyncContext::new(settings()).unwrap())
}

/// A directory call, in the order it was made.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Add { dn: String },
    Modify { dn: String, delta: AttributeDelta },
    Move { dn: String, new_rdn: String, new_parent: String },
}

#[derive(Debug, Clone)]
struct Entry {
    dn: String,
    attrs: AttributeSet,
}

/// Directory held in memory. Adds require the parent to exist.
pub struct FakeDirectory {
    entries: Mutex<BTreeMap<String, Entry>>,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

fn value_strings(value: &AttributeValue) -> Vec<String> {
    match value {
        AttributeValue::Null | AttributeValue::Binary(_) => vec![],
        AttributeValue::String(s) => vec![s.clone()],
        AttributeValue::Integer(i) => vec![i.to_string()],
        AttributeValue::Boolean(b) => vec![if *b { "TRUE" } else { "FALSE" }.to_string()],
        AttributeValue::Array(items) => items.iter().flat_map(value_strings).collect(),
    }
}

fn matches(filter: &Filter, attrs: &AttributeSet) -> bool {
    let values = |name: &str| attrs.get(name).map(value_strings).unwrap_or_default();
    match filter {
        Filter::Equals { attribute, value } => values(attribute)
            .iter()
            .any(|v| v.eq_ignore_ascii_case(value)),
        Filter::Present { attribute } => !values(attribute).is_empty(),
        Filter::And { filters } => filters.iter().all(|f| matches(f, attrs)),
        Filter::Not { filter } => !matches(filter, attrs),
    }
}

impl FakeDirectory {
    /// An empty tree holding only the base entry.
    pub fn new() -> Arc<Self> {
        let dir = Self {
            entries: Mutex::new(BTreeMap::new()),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        };
        dir.seed(BASE_DN, AttributeSet::new().with(attr::OBJECT_CLASS, "domain"));
        Arc::new(dir)
    }

    /// Insert an entry without recording a call.
    pub fn seed(&self, entry_dn: &str, attrs: AttributeSet) {
        let mut attrs = attrs;
        attrs.set(attr::DN, entry_dn);
        self.entries.lock().unwrap().insert(
            dn::normalize(entry_dn),
            Entry {
                dn: entry_dn.to_string(),
                attrs,
            },
        );
    }

    /// Seed an OU and all its missing ancestors.
    pub fn seed_ou_path(&self, container: &str) {
        let rdns = dn::parse(container).unwrap();
        let base_len = dn::parse(BASE_DN).unwrap().len();
        for depth in (0..rdns.len() - base_len).rev() {
            let ancestor = dn::join(&rdns[depth..]);
            if !self.contains(&ancestor) {
                self.seed(
                    &ancestor,
                    AttributeSet::new()
                        .with(attr::OBJECT_CLASS, vec!["top", "organizationalUnit"])
                        .with(attr::OU, rdns[depth].value.clone()),
                );
            }
        }
    }

    /// Seed an enabled user under `container`, creating the OU path.
    pub fn seed_user(&self, container: &str, name: &str, employee_id: &str, login: &str) -> String {
        self.seed_ou_path(container);
        let entry_dn = format!("CN={name},{container}");
        self.seed(
            &entry_dn,
            AttributeSet::new()
                .with(attr::OBJECT_CLASS, vec!["top", "person", "organizationalPerson", "user"])
                .with(attr::CN, name)
                .with(attr::DISPLAY_NAME, name)
                .with(attr::EMPLOYEE_ID, employee_id)
                .with(attr::LOGIN, login)
                .with(attr::ACCOUNT_CONTROL, "512")
                .with(attr::ACCOUNT_EXPIRES, i64::MAX.to_string()),
        );
        entry_dn
    }

    pub fn set_attribute(&self, entry_dn: &str, name: &str, value: impl Into<AttributeValue>) {
        let mut entries = self.entries.lock().unwrap();
        let entry = entries.get_mut(&dn::normalize(entry_dn)).unwrap();
        entry.attrs.set(name, value);
    }

    pub fn contains(&self, entry_dn: &str) -> bool {
        self.entries.lock().unwrap().contains_key(&dn::normalize(entry_dn))
    }

    pub fn get(&self, entry_dn: &str) -> Option<AttributeSet> {
        self.entries
            .lock()
            .unwrap()
            .get(&dn::normalize(entry_dn))
            .map(|e| e.attrs.clone())
    }

    /// DN of the entry holding `employee_id`.
    pub fn dn_of(&self, employee_id: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap()
            .values()
            .find(|e| e.attrs.get_string(attr::EMPLOYEE_ID) == Some(employee_id))
            .map(|e| e.dn.clone())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn adds(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Add { dn } => Some(dn),
                _ => None,
            })
            .collect()
    }

    pub fn modifies(&self) -> Vec<(String, AttributeDelta)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Modify { dn, delta } => Some((dn, delta)),
                _ => None,
            })
            .collect()
    }

    pub fn moves(&self) -> Vec<(String, String)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Move {
                    dn, new_parent, ..
                } => Some((dn, new_parent)),
                _ => None,
            })
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FakeDirectory {
    fn display_name(&self) -> &str {
        "fake-directory"
    }

    async fn test_connection(&self) -> ConnectorResult<()> {
        Ok(())
    }

    async fn dispose(&self) -> ConnectorResult<()> {
        Ok(())
    }
}

#[async_trait]
impl DirectoryOps for FakeDirectory {
    async fn search(
        &self,
        base_dn: &str,
        scope: SearchScope,
        filter: &Filter,
        _attributes: &[&str],
    ) -> ConnectorResult<Vec<AttributeSet>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::task::yield_now().await;

        let result = {
            let entries = self.entries.lock().unwrap();
            if !entries.contains_key(&dn::normalize(base_dn)) {
                Err(ConnectorError::not_found(base_dn))
            } else {
                Ok(entries
                    .values()
                    .filter(|e| match scope {
                        SearchScope::Base => dn::dn_eq(&e.dn, base_dn),
                        SearchScope::OneLevel => {
                            dn::parent(&e.dn).is_some_and(|p| dn::dn_eq(p, base_dn))
                        }
                        SearchScope::Subtree => {
                            dn::dn_eq(&e.dn, base_dn) || dn::is_descendant_of(&e.dn, base_dn)
                        }
                    })
                    .filter(|e| matches(filter, &e.attrs))
                    .map(|e| e.attrs.clone())
                    .collect())
            }
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn add(&self, entry_dn: &str, attributes: AttributeSet) -> ConnectorResult<()> {
        self.calls.lock().unwrap().push(Call::Add {
            dn: entry_dn.to_string(),
        });
        let mut entries = self.entries.lock().unwrap();
        let key = dn::normalize(entry_dn);
        if entries.contains_key(&key) {
            return Err(ConnectorError::already_exists(entry_dn));
        }
        let parent = dn::parent(entry_dn).map(dn::normalize).unwrap_or_default();
        if !entries.contains_key(&parent) {
            return Err(ConnectorError::not_found(parent));
        }
        let mut attrs = attributes;
        attrs.set(attr::DN, entry_dn);
        entries.insert(
            key,
            Entry {
                dn: entry_dn.to_string(),
                attrs,
            },
        );
        Ok(())
    }

    async fn modify(&self, entry_dn: &str, changes: AttributeDelta) -> ConnectorResult<()> {
        self.calls.lock().unwrap().push(Call::Modify {
            dn: entry_dn.to_string(),
            delta: changes.clone(),
        });
        let mut entries = self.entries.lock().unwrap();
        let entry = entries
            .get_mut(&dn::normalize(entry_dn))
            .ok_or_else(|| ConnectorError::not_found(entry_dn))?;
        for (name, value) in changes.replace {
            if name.eq_ignore_ascii_case(attr::UNICODE_PWD) {
                continue;
            }
            entry.attrs.set(name, value);
        }
        Ok(())
    }

    async fn move_dn(&self, entry_dn: &str, new_rdn: &str, new_parent: &str) -> ConnectorResult<()> {
        self.calls.lock().unwrap().push(Call::Move {
            dn: entry_dn.to_string(),
            new_rdn: new_rdn.to_string(),
            new_parent: new_parent.to_string(),
        });
        let mut entries = self.entries.lock().unwrap();
        if !entries.contains_key(&dn::normalize(new_parent)) {
            return Err(ConnectorError::not_found(new_parent));
        }
        let mut entry = entries
            .remove(&dn::normalize(entry_dn))
            .ok_or_else(|| ConnectorError::not_found(entry_dn))?;
        let new_dn = format!("{new_rdn},{new_parent}");
        entry.dn = new_dn.clone();
        entry.attrs.set(attr::DN, new_dn.as_str());
        entries.insert(dn::normalize(&new_dn), entry);
        Ok(())
    }
}

/// Audit log in memory.
#[derive(Default)]
pub struct MemoryAudit {
    records: Mutex<Vec<DepartmentChangeRecord>>,
    clock: Mutex<Option<DateTime<Utc>>>,
}

impl MemoryAudit {
    /// Stamp appended records with `at` instead of the wall clock.
    pub fn with_clock(at: DateTime<Utc>) -> Self {
        let audit = Self::default();
        *audit.clock.lock().unwrap() = Some(at);
        audit
    }

    pub fn records(&self) -> Vec<DepartmentChangeRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl DepartmentAudit for MemoryAudit {
    async fn append(&self, change: CreateDepartmentChange) -> SyncResult<()> {
        self.records.lock().unwrap().push(DepartmentChangeRecord {
            id: uuid::Uuid::new_v4(),
            employee_name: change.employee_name,
            employee_id: change.employee_id,
            old_department: change.old_department,
            new_department: change.new_department,
            change_level: change.change_level.to_string(),
            created_at: (*self.clock.lock().unwrap()).unwrap_or_else(Utc::now),
        });
        Ok(())
    }

    async fn list_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> SyncResult<Vec<DepartmentChangeRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.created_at >= from && r.created_at < to)
            .cloned()
            .collect())
    }
}

/// Ledger in memory with the same conditional-upsert rule as the database.
#[derive(Default)]
pub struct MemoryLedger {
    rows: Mutex<HashMap<String, LedgerEntry>>,
    writes: AtomicUsize,
}

impl MemoryLedger {
    pub fn rows(&self) -> Vec<LedgerEntry> {
        self.rows.lock().unwrap().values().cloned().collect()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OrderLedger for MemoryLedger {
    async fn find(&self, order_id: &str) -> SyncResult<Option<LedgerEntry>> {
        Ok(self.rows.lock().unwrap().get(order_id).cloned())
    }

    async fn record_outcome(
        &self,
        order_id: &str,
        _order_type: &str,
        success: bool,
        message: &str,
    ) -> SyncResult<bool> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(order_id) {
            Some(row) if row.status => Ok(false),
            Some(row) => {
                row.status = success;
                row.message = message.to_string();
                Ok(true)
            }
            None => {
                rows.insert(
                    order_id.to_string(),
                    LedgerEntry {
                        order_id: order_id.to_string(),
                        status: success,
                        message: message.to_string(),
                    },
                );
                Ok(true)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SentMarkdown {
    pub recipient: String,
    pub template: String,
    pub args: Value,
}

#[derive(Default)]
pub struct RecordingNotifier {
    markdown: Mutex<Vec<SentMarkdown>>,
    emails: Mutex<Vec<(Vec<String>, String, String)>>,
    fail: AtomicBool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.fail.store(true, Ordering::SeqCst);
        notifier
    }

    pub fn markdown(&self) -> Vec<SentMarkdown> {
        self.markdown.lock().unwrap().clone()
    }

    pub fn with_template(&self, template: &str) -> Vec<SentMarkdown> {
        self.markdown()
            .into_iter()
            .filter(|m| m.template == template)
            .collect()
    }

    pub fn emails(&self) -> Vec<(Vec<String>, String, String)> {
        self.emails.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_markdown(&self, recipient: &str, template: &str, args: Value) -> SyncResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SyncError::http("notify", "unavailable"));
        }
        self.markdown.lock().unwrap().push(SentMarkdown {
            recipient: recipient.to_string(),
            template: template.to_string(),
            args,
        });
        Ok(())
    }

    async fn send_email(&self, addresses: &[String], subject: &str, html: &str) -> SyncResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SyncError::http("notify", "unavailable"));
        }
        self.emails
            .lock()
            .unwrap()
            .push((addresses.to_vec(), subject.to_string(), html.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingProvisioner {
    calls: Mutex<Vec<(String, String)>>,
}

impl RecordingProvisioner {
    /// `(platform, applicant name)` pairs.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PlatformProvisioner for RecordingProvisioner {
    async fn provision(&self, platform: &PlatformSpec, applicant: &Applicant) -> SyncResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push((platform.name.clone(), applicant.name.clone()));
        Ok(())
    }
}

/// Approval service serving canned order payloads.
#[derive(Default)]
pub struct StaticApproval {
    orders: Mutex<HashMap<String, Value>>,
    fetches: AtomicUsize,
}

impl StaticApproval {
    pub fn insert(&self, order_id: &str, payload: Value) {
        self.orders
            .lock()
            .unwrap()
            .insert(order_id.to_string(), payload);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ApprovalClient for StaticApproval {
    async fn get_order_detail(&self, order_id: &str) -> SyncResult<Value> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.orders
            .lock()
            .unwrap()
            .get(order_id)
            .cloned()
            .ok_or_else(|| SyncError::http("approval", format!("order {order_id} not found")))
    }
}

pub struct Harness {
    pub ctx: Arc<SyncContext>,
    pub directory: Arc<FakeDirectory>,
    pub notifier: Arc<RecordingNotifier>,
    pub platforms: Arc<RecordingProvisioner>,
    pub audit: Arc<MemoryAudit>,
    pub ledger: Arc<MemoryLedger>,
    pub approval: Arc<StaticApproval>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_context(context())
    }

    pub fn with_context(ctx: Arc<SyncContext>) -> Self {
        Self::build(ctx, MemoryAudit::default())
    }

    /// Harness whose audit log stamps records at `at`.
    pub fn at(ctx: Arc<SyncContext>, at: DateTime<Utc>) -> Self {
        Self::build(ctx, MemoryAudit::with_clock(at))
    }

    fn build(ctx: Arc<SyncContext>, audit: MemoryAudit) -> Self {
        Self {
            ctx,
            directory: FakeDirectory::new(),
            notifier: Arc::new(RecordingNotifier::default()),
            platforms: Arc::new(RecordingProvisioner::default()),
            audit: Arc::new(audit),
            ledger: Arc::new(MemoryLedger::default()),
            approval: Arc::new(StaticApproval::default()),
        }
    }

    pub fn services(&self) -> OrderServices {
        OrderServices {
            ctx: self.ctx.clone(),
            directory: self.directory.clone(),
            notifier: self.notifier.clone(),
            platforms: self.platforms.clone(),
        }
    }
}
