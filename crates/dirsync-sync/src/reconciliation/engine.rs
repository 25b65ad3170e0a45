//! HR snapshot reconciliation.
//!
//! Each record is reconciled in its own task. Tasks wait on a shared
//! semaphore before touching the directory, so at most `concurrency`
//! records are in flight. [`Reconciler::reconcile`] returns only after every
//! task has finished, which the digest step relies on.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument, warn};

use dirsync_connector::dn;
use dirsync_connector::operation::AttributeDelta;
use dirsync_connector::traits::DirectoryOps;
use dirsync_connector_ldap::ad::NEVER_EXPIRES;
use dirsync_db::{ChangeLevel, CreateDepartmentChange};

use super::digest::{self, DigestOutcome};
use crate::account;
use crate::audit::DepartmentAudit;
use crate::context::SyncContext;
use crate::error::{ErrorKind, SyncError, SyncResult};
use crate::model::{attr, DirectoryUser, EmploymentStatus, HrRecord};
use crate::notify::Notifier;
use crate::ou_path;

/// Totals of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub total: usize,
    /// Records that received at least one write.
    pub applied: usize,
    pub unchanged: usize,
    /// Records without a matching directory entry.
    pub skipped: usize,
    pub failed: usize,
    pub modifications: usize,
    pub moves: usize,
    pub department_changes: usize,
}

impl ReconcileReport {
    fn add(&mut self, outcome: RecordOutcome) {
        self.total += 1;
        match outcome {
            RecordOutcome::Applied { modified, moved } => {
                self.applied += 1;
                self.modifications += usize::from(modified);
                if moved.is_some() {
                    self.moves += 1;
                    self.department_changes += 1;
                }
            }
            RecordOutcome::Unchanged => self.unchanged += 1,
            RecordOutcome::Skipped => self.skipped += 1,
            RecordOutcome::Failed => self.failed += 1,
        }
    }
}

/// Reconciliation followed by the digest.
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileRun {
    pub report: ReconcileReport,
    pub digest: DigestOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordOutcome {
    Applied {
        modified: bool,
        moved: Option<ChangeLevel>,
    },
    Unchanged,
    Skipped,
    Failed,
}

/// Desired directory state for one HR record.
#[derive(Debug, Clone, PartialEq)]
pub struct DesiredState {
    /// Target container; `None` leaves the entry where it is.
    pub container: Option<String>,
    /// Attributes that differ from the actual entry.
    pub changes: AttributeDelta,
}

#[derive(Clone)]
pub struct Reconciler {
    ctx: Arc<SyncContext>,
    directory: Arc<dyn DirectoryOps>,
    audit: Arc<dyn DepartmentAudit>,
    notifier: Arc<dyn Notifier>,
}

impl Reconciler {
    pub fn new(
        ctx: Arc<SyncContext>,
        directory: Arc<dyn DirectoryOps>,
        audit: Arc<dyn DepartmentAudit>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            ctx,
            directory,
            audit,
            notifier,
        }
    }

    /// Reconcile, then send the department-change digest for `now`.
    pub async fn run(&self, snapshot: Vec<HrRecord>, now: DateTime<Utc>) -> SyncResult<ReconcileRun> {
        let report = self.reconcile(snapshot).await;
        let digest =
            digest::send_digest(&self.ctx, self.audit.as_ref(), self.notifier.as_ref(), now).await?;
        Ok(ReconcileRun { report, digest })
    }

    /// Reconcile every record; per-record failures are logged and counted.
    #[instrument(skip_all, fields(records = snapshot.len()))]
    pub async fn reconcile(&self, snapshot: Vec<HrRecord>) -> ReconcileReport {
        let semaphore = Arc::new(Semaphore::new(self.ctx.concurrency()));
        let mut tasks = JoinSet::new();

        for record in snapshot {
            let semaphore = Arc::clone(&semaphore);
            let worker = self.clone();
            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return RecordOutcome::Failed;
                };
                worker.reconcile_one(&record).await
            });
        }

        let mut report = ReconcileReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.add(outcome),
                Err(e) => {
                    error!(error = %e, "Reconciliation task aborted");
                    report.add(RecordOutcome::Failed);
                }
            }
        }

        info!(
            total = report.total,
            applied = report.applied,
            unchanged = report.unchanged,
            skipped = report.skipped,
            failed = report.failed,
            department_changes = report.department_changes,
            "Reconciliation finished"
        );
        report
    }

    async fn reconcile_one(&self, record: &HrRecord) -> RecordOutcome {
        match self.apply(record).await {
            Ok(outcome) => outcome,
            Err(e) if e.kind() == ErrorKind::LookupMiss => {
                debug!(employee_id = %record.employee_id, error = %e, "No directory entry, skipped");
                RecordOutcome::Skipped
            }
            Err(e) => {
                warn!(
                    employee_id = %record.employee_id,
                    kind = ?e.kind(),
                    error = %e,
                    "Failed to reconcile record"
                );
                RecordOutcome::Failed
            }
        }
    }

    /// Desired state of `actual` given its HR record.
    pub fn desired_state(&self, record: &HrRecord, actual: &DirectoryUser) -> DesiredState {
        let ctx = self.ctx.as_ref();
        let mut changes = AttributeDelta::new();

        let department = ou_path::normalize_department(&record.department);
        for (name, want, have) in [
            (attr::DISPLAY_NAME, record.display_name.trim(), actual.display_name.as_str()),
            (attr::MAIL, record.email.trim(), actual.mail.as_str()),
            (attr::PHONE, record.phone.trim(), actual.phone.as_str()),
            (attr::COMPANY, record.company.trim(), actual.company.as_str()),
            (attr::DEPARTMENT, department.as_str(), actual.department.as_str()),
            (attr::TITLE, record.title.trim(), actual.title.as_str()),
        ] {
            if !want.is_empty() && want != have {
                changes.replace(name, want);
            }
        }

        let container = match record.status {
            EmploymentStatus::Departed => {
                let control = u32::from(actual.control().disable());
                if actual.account_control != Some(control) {
                    changes.replace(attr::ACCOUNT_CONTROL, control);
                }
                if actual.account_expires != Some(0) {
                    changes.replace(attr::ACCOUNT_EXPIRES, 0i64);
                }
                Some(ctx.disabled_dn().to_string())
            }
            EmploymentStatus::Active => {
                // External accounts keep the expiry they were given.
                let external = ctx.companies().is_external(&record.company);
                if !external && actual.account_expires != Some(NEVER_EXPIRES) {
                    changes.replace(attr::ACCOUNT_EXPIRES, NEVER_EXPIRES);
                }
                (!department.is_empty()).then(|| ou_path::department_to_dn(ctx, &department))
            }
        };

        DesiredState { container, changes }
    }

    async fn apply(&self, record: &HrRecord) -> SyncResult<RecordOutcome> {
        let ctx = self.ctx.as_ref();
        let directory = self.directory.as_ref();

        let actual =
            account::find_by_key(directory, ctx, &record.display_name, &record.employee_id).await?;
        let desired = self.desired_state(record, &actual);

        let modified = !desired.changes.is_empty();
        if modified {
            let attributes = desired.changes.affected_attributes().join(",");
            directory.modify(&actual.dn, desired.changes).await?;
            info!(dn = %actual.dn, employee_id = %record.employee_id, %attributes, "Updated entry");
        }

        let current = actual.container().unwrap_or_default();
        let moved = match desired.container {
            Some(target) if !dn::dn_eq(current, &target) => {
                Some(self.relocate(record, &actual, current, &target).await?)
            }
            _ => None,
        };

        Ok(if modified || moved.is_some() {
            RecordOutcome::Applied { modified, moved }
        } else {
            RecordOutcome::Unchanged
        })
    }

    async fn relocate(
        &self,
        record: &HrRecord,
        actual: &DirectoryUser,
        current: &str,
        target: &str,
    ) -> SyncResult<ChangeLevel> {
        let ctx = self.ctx.as_ref();
        let directory = self.directory.as_ref();

        let rdn = actual
            .rdn()
            .ok_or_else(|| SyncError::validation("dn", format!("'{}' has no RDN", actual.dn)))?;

        ou_path::ensure_ou_path(directory, ctx, target).await?;

        directory.move_dn(&actual.dn, rdn, target).await?;

        let level = ou_path::classify_change(ctx, current, target);
        let department_of = |container: &str| {
            ou_path::dn_to_department(ctx, container).unwrap_or_else(|| container.to_string())
        };
        self.audit
            .append(CreateDepartmentChange {
                employee_name: record.display_name.trim().to_string(),
                employee_id: record.employee_id.trim().to_string(),
                old_department: department_of(current),
                new_department: department_of(target),
                change_level: level,
            })
            .await?;

        info!(
            employee_id = %record.employee_id,
            from = %current,
            to = %target,
            level = %level,
            "Moved entry"
        );
        Ok(level)
    }
}
