//! Daily department-change digest.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use dirsync_db::DepartmentChangeRecord;

use crate::audit::DepartmentAudit;
use crate::context::SyncContext;
use crate::error::SyncResult;
use crate::notify::Notifier;

pub const DIGEST_TEMPLATE: &str = "department_change_digest";
pub const GREETING_TEMPLATE: &str = "holiday_greeting";

/// Days the window may reach back over non-working days.
const MAX_LOOKBACK_DAYS: i64 = 31;

/// What the digest step did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "digest", rename_all = "snake_case")]
pub enum DigestOutcome {
    /// No recipient configured.
    Disabled,
    HolidayGreeting { holiday: String },
    NonWorkday,
    NoChanges,
    Sent { records: usize, messages: usize, failed: usize },
}

/// Local-midnight bounds `[from, to)` of the digest covering `today`.
///
/// The window ends at the end of `today` and starts at the first day after
/// the previous working day, so Monday's digest also covers the weekend.
pub fn digest_window(ctx: &SyncContext, today: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let calendar = ctx.calendar();
    let mut start = today;
    for _ in 0..MAX_LOOKBACK_DAYS {
        let previous = start - Duration::days(1);
        if calendar.is_workday(previous) {
            break;
        }
        start = previous;
    }
    (
        ctx.local_midnight(start),
        ctx.local_midnight(today + Duration::days(1)),
    )
}

/// One paragraph per record.
pub fn format_record(record: &DepartmentChangeRecord) -> String {
    format!(
        "**{}** ({})\n{} → {}\nlevel: {}",
        record.employee_name,
        record.employee_id,
        display_department(&record.old_department),
        display_department(&record.new_department),
        record.level(),
    )
}

fn display_department(department: &str) -> &str {
    if department.is_empty() {
        "-"
    } else {
        department
    }
}

/// Join paragraphs into messages of at most `max_bytes`, breaking only
/// between paragraphs. An oversized paragraph becomes a message of its own.
pub fn chunk_paragraphs(paragraphs: &[String], max_bytes: usize) -> Vec<String> {
    const SEPARATOR: &str = "\n\n";
    let mut chunks = Vec::new();
    let mut current = String::new();

    for paragraph in paragraphs {
        let needed = if current.is_empty() {
            paragraph.len()
        } else {
            current.len() + SEPARATOR.len() + paragraph.len()
        };
        if needed > max_bytes && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push_str(SEPARATOR);
        }
        current.push_str(paragraph);
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Send the digest for the local day of `now`.
///
/// Must run after the reconciliation pass has fully drained.
#[instrument(skip_all)]
pub async fn send_digest(
    ctx: &SyncContext,
    audit: &dyn DepartmentAudit,
    notifier: &dyn Notifier,
    now: DateTime<Utc>,
) -> SyncResult<DigestOutcome> {
    let settings = &ctx.settings().digest;
    let recipient = settings.recipient.trim();
    if recipient.is_empty() {
        return Ok(DigestOutcome::Disabled);
    }

    let today = ctx.local_date(now);
    let calendar = ctx.calendar();

    if let Some(holiday) = calendar.holiday_starting(today) {
        if !calendar.is_workday(today) {
            let name = holiday.name.clone();
            if let Err(e) = notifier
                .send_markdown(recipient, GREETING_TEMPLATE, json!({ "holiday": name }))
                .await
            {
                warn!(error = %e, "Failed to send holiday greeting");
            }
            return Ok(DigestOutcome::HolidayGreeting { holiday: name });
        }
    }
    if !calendar.is_workday(today) {
        info!(%today, "Not a working day, digest suppressed");
        return Ok(DigestOutcome::NonWorkday);
    }

    let (from, to) = digest_window(ctx, today);
    let records = audit.list_between(from, to).await?;
    if records.is_empty() {
        return Ok(DigestOutcome::NoChanges);
    }

    let paragraphs: Vec<String> = records.iter().map(format_record).collect();
    let chunks = chunk_paragraphs(&paragraphs, settings.max_message_bytes);
    let parts = chunks.len();
    let mut failed = 0;

    for (index, content) in chunks.into_iter().enumerate() {
        let args = json!({
            "date": today.to_string(),
            "part": index + 1,
            "parts": parts,
            "content": content,
        });
        if let Err(e) = notifier.send_markdown(recipient, DIGEST_TEMPLATE, args).await {
            warn!(part = index + 1, error = %e, "Failed to send digest message");
            failed += 1;
        }
    }

    info!(records = records.len(), messages = parts, failed, "Digest sent");
    Ok(DigestOutcome::Sent {
        records: records.len(),
        messages: parts,
        failed,
    })
}
