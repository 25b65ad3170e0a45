//! Department path to OU mapping and OU tree materialization.

use dirsync_connector::dn::{self, Rdn};
use dirsync_connector::operation::AttributeSet;
use dirsync_connector::traits::DirectoryOps;
use dirsync_db::ChangeLevel;
use tracing::{debug, info, instrument};

use crate::context::SyncContext;
use crate::error::{SyncError, SyncResult};
use crate::model::attr;

/// Non-empty, trimmed tokens of a dotted department path.
pub fn department_tokens(department: &str) -> Vec<&str> {
    department
        .split('.')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Canonical spelling of a department path.
pub fn normalize_department(department: &str) -> String {
    department_tokens(department).join(".")
}

/// Map `Eng.Backend` to `OU=Backend,OU=Eng,<base>`.
///
/// When the top-level token is an external company the path is placed under
/// the partner root instead of directly under the base DN. An empty path maps
/// to the base DN.
pub fn department_to_dn(ctx: &SyncContext, department: &str) -> String {
    let tokens = department_tokens(department);
    let Some(top) = tokens.first() else {
        return ctx.base_dn().to_string();
    };

    let root = if ctx.companies().is_external(top) {
        ctx.partner_root_dn()
    } else {
        ctx.base_dn()
    };

    department_under(root, department)
}

/// Place the OUs of a dotted department path below `parent`.
pub fn department_under(parent: &str, department: &str) -> String {
    let rdns: Vec<Rdn> = department_tokens(department)
        .iter()
        .rev()
        .map(|t| Rdn::new("OU", *t))
        .collect();
    if rdns.is_empty() {
        parent.to_string()
    } else {
        format!("{},{}", dn::join(&rdns), parent)
    }
}

/// Inverse of [`department_to_dn`]. A leading `CN=` component is ignored so
/// user DNs map to their container's department. `None` outside the base DN.
pub fn dn_to_department(ctx: &SyncContext, entry_dn: &str) -> Option<String> {
    let base = ctx.base_dn();
    if !(dn::dn_eq(entry_dn, base) || dn::is_descendant_of(entry_dn, base)) {
        return None;
    }

    let rdns = dn::parse(entry_dn).ok()?;
    let base_len = dn::parse(base).ok()?.len();
    let mut local = &rdns[..rdns.len().saturating_sub(base_len)];

    if is_partner_dn(ctx, entry_dn) {
        let root_len = dn::parse(ctx.partner_root_dn()).ok()?.len() - base_len;
        local = &local[..local.len().saturating_sub(root_len)];
    }

    let labels: Vec<&str> = local
        .iter()
        .rev()
        .filter(|r| r.is("OU"))
        .map(|r| r.value.as_str())
        .collect();
    Some(labels.join("."))
}

/// Whether `entry_dn` is the partner root or lies below it.
pub fn is_partner_dn(ctx: &SyncContext, entry_dn: &str) -> bool {
    let root = ctx.partner_root_dn();
    dn::dn_eq(entry_dn, root) || dn::is_descendant_of(entry_dn, root)
}

fn deepest_ou(container: &str) -> Option<String> {
    dn::parse(container)
        .ok()?
        .into_iter()
        .find(|r| r.is("OU"))
        .map(|r| r.value.to_lowercase())
}

/// Classify a move between two containers.
pub fn classify_change(ctx: &SyncContext, old_container: &str, new_container: &str) -> ChangeLevel {
    if is_partner_dn(ctx, old_container) != is_partner_dn(ctx, new_container) {
        ChangeLevel::Company
    } else if deepest_ou(old_container) != deepest_ou(new_container) {
        ChangeLevel::Department
    } else {
        ChangeLevel::Structural
    }
}

/// Create every missing OU on the way from the base DN down to `container`.
///
/// Ancestors are checked shallowest first. Once one is missing, every deeper
/// level is created without further checks. An add that races with another
/// writer and reports "already exists" counts as present. Returns the number
/// of OUs created; an existing tree yields zero writes.
#[instrument(skip(directory, ctx))]
pub async fn ensure_ou_path(
    directory: &dyn DirectoryOps,
    ctx: &SyncContext,
    container: &str,
) -> SyncResult<usize> {
    let base = ctx.base_dn();
    if !(dn::dn_eq(container, base) || dn::is_descendant_of(container, base)) {
        return Err(SyncError::validation(
            "dn",
            format!("'{container}' is outside base DN '{base}'"),
        ));
    }

    let rdns = dn::parse(container).map_err(|e| SyncError::validation("dn", e.to_string()))?;
    let base_len = dn::parse(base)
        .map_err(|e| SyncError::configuration(e.to_string()))?
        .len();
    let local_len = rdns.len() - base_len;

    let mut created = 0;
    let mut missing = false;

    for depth in (0..local_len).rev() {
        let ancestor = dn::join(&rdns[depth..]);

        if !missing {
            if directory.exists(&ancestor).await? {
                continue;
            }
            missing = true;
        }

        let rdn = &rdns[depth];
        if !rdn.is("OU") {
            return Err(SyncError::validation(
                "dn",
                format!("missing container '{ancestor}' is not an organizational unit"),
            ));
        }

        let attrs = AttributeSet::new()
            .with(attr::OBJECT_CLASS, vec!["top", "organizationalUnit"])
            .with(attr::OU, rdn.value.clone());

        match directory.add(&ancestor, attrs).await {
            Ok(()) => {
                created += 1;
                info!(dn = %ancestor, "Created organizational unit");
            }
            Err(e) if e.is_already_exists() => {
                debug!(dn = %ancestor, "Organizational unit created concurrently");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(created)
}
