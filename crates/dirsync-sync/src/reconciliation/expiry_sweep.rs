//! Expiry reminder sweep.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use dirsync_connector::operation::{Filter, SearchScope};
use dirsync_connector::traits::DirectoryOps;
use dirsync_connector_ldap::ad::{filetime_to_datetime, NEVER_EXPIRES};

use crate::context::SyncContext;
use crate::error::SyncResult;
use crate::expiry::{classify_offset, day_offset, ExpiryTier};
use crate::model::{attr, DirectoryUser, USER_ATTRIBUTES};
use crate::notify::Notifier;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExpirySweepReport {
    pub scanned: usize,
    pub in_window: usize,
    pub notified: usize,
    pub failed: usize,
    pub by_tier: BTreeMap<ExpiryTier, usize>,
}

pub struct ExpirySweep {
    ctx: Arc<SyncContext>,
    directory: Arc<dyn DirectoryOps>,
    notifier: Arc<dyn Notifier>,
}

impl ExpirySweep {
    pub fn new(
        ctx: Arc<SyncContext>,
        directory: Arc<dyn DirectoryOps>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            ctx,
            directory,
            notifier,
        }
    }

    /// User accounts carrying a finite expiry.
    pub fn search_filter() -> Filter {
        Filter::and(vec![
            Filter::eq(attr::OBJECT_CLASS, "user"),
            Filter::present(attr::ACCOUNT_EXPIRES),
            Filter::negate(Filter::eq(attr::ACCOUNT_EXPIRES, NEVER_EXPIRES.to_string())),
            Filter::negate(Filter::eq(attr::ACCOUNT_EXPIRES, "0")),
        ])
    }

    #[instrument(skip(self))]
    pub async fn run(&self, now: DateTime<Utc>) -> SyncResult<ExpirySweepReport> {
        let ctx = self.ctx.as_ref();
        let window = &ctx.settings().expiry;

        let entries = self
            .directory
            .search(ctx.base_dn(), SearchScope::Subtree, &Self::search_filter(), USER_ATTRIBUTES)
            .await?;

        let mut report = ExpirySweepReport::default();

        for entry in &entries {
            let user = match DirectoryUser::from_attributes(entry) {
                Ok(user) => user,
                Err(e) => {
                    warn!(error = %e, "Skipping undecodable entry");
                    report.failed += 1;
                    continue;
                }
            };
            let Some(native) = user.account_expires else {
                continue;
            };
            report.scanned += 1;

            let offset = day_offset(native, now);
            if offset < window.window_start || offset > window.window_end {
                continue;
            }
            report.in_window += 1;

            let tier = classify_offset(offset);
            let Some(template) = tier.template() else {
                continue;
            };
            *report.by_tier.entry(tier).or_default() += 1;

            let expires_at = filetime_to_datetime(native)
                .map(|at| ctx.local_date(at).to_string())
                .unwrap_or_default();
            let args = json!({
                "login": user.login,
                "display_name": user.display_name,
                "expires_at": expires_at,
                "day_offset": offset,
            });

            match self.notifier.send_markdown(user.recipient(), template, args).await {
                Ok(()) => report.notified += 1,
                Err(e) => {
                    warn!(dn = %user.dn, %tier, error = %e, "Failed to send expiry reminder");
                    report.failed += 1;
                }
            }
        }

        info!(
            scanned = report.scanned,
            in_window = report.in_window,
            notified = report.notified,
            failed = report.failed,
            "Expiry sweep finished"
        );
        Ok(report)
    }
}
