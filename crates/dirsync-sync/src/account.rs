//! Directory user lookups.

use dirsync_connector::operation::{Filter, SearchScope};
use dirsync_connector::traits::DirectoryOps;
use dirsync_connector_ldap::filter::to_ldap;
use tracing::{debug, instrument};

use crate::context::SyncContext;
use crate::error::{SyncError, SyncResult};
use crate::model::{attr, DirectoryUser, USER_ATTRIBUTES};

fn user_filter(keys: &[(&str, &str)]) -> Option<Filter> {
    let mut parts = vec![Filter::eq(attr::OBJECT_CLASS, "user")];
    for (name, value) in keys {
        let value = value.trim();
        if !value.is_empty() {
            parts.push(Filter::eq(*name, value));
        }
    }
    (parts.len() > 1).then(|| Filter::and(parts))
}

async fn find_unique(
    directory: &dyn DirectoryOps,
    ctx: &SyncContext,
    filter: Filter,
) -> SyncResult<DirectoryUser> {
    let entries = directory
        .search(ctx.base_dn(), SearchScope::Subtree, &filter, USER_ATTRIBUTES)
        .await?;

    match entries.as_slice() {
        [] => Err(SyncError::not_found(format!("user matching {}", to_ldap(&filter)))),
        [entry] => DirectoryUser::from_attributes(entry),
        many => Err(SyncError::AmbiguousLookup {
            filter: to_ldap(&filter),
            count: many.len(),
        }),
    }
}

/// Look up a user by display name and employee id.
///
/// Empty key parts are left out of the filter. With both parts empty the
/// lookup fails as not found instead of matching an arbitrary entry.
#[instrument(skip(directory, ctx))]
pub async fn find_by_key(
    directory: &dyn DirectoryOps,
    ctx: &SyncContext,
    display_name: &str,
    employee_id: &str,
) -> SyncResult<DirectoryUser> {
    let Some(filter) = user_filter(&[
        (attr::DISPLAY_NAME, display_name),
        (attr::EMPLOYEE_ID, employee_id),
    ]) else {
        debug!("Lookup without display name or employee id");
        return Err(SyncError::not_found("user lookup without a discriminating key"));
    };
    find_unique(directory, ctx, filter).await
}

/// Look up a user by `sAMAccountName`.
pub async fn find_by_login(
    directory: &dyn DirectoryOps,
    ctx: &SyncContext,
    login: &str,
) -> SyncResult<DirectoryUser> {
    let filter = user_filter(&[(attr::LOGIN, login)])
        .ok_or_else(|| SyncError::not_found("user lookup without a login"))?;
    find_unique(directory, ctx, filter).await
}

/// Look up a user by employee id alone.
pub async fn find_by_employee_id(
    directory: &dyn DirectoryOps,
    ctx: &SyncContext,
    employee_id: &str,
) -> SyncResult<DirectoryUser> {
    let filter = user_filter(&[(attr::EMPLOYEE_ID, employee_id)])
        .ok_or_else(|| SyncError::not_found("user lookup without an employee id"))?;
    find_unique(directory, ctx, filter).await
}

/// Whether a login name is already taken.
pub async fn login_exists(
    directory: &dyn DirectoryOps,
    ctx: &SyncContext,
    login: &str,
) -> SyncResult<bool> {
    match find_by_login(directory, ctx, login).await {
        Ok(_) | Err(SyncError::AmbiguousLookup { .. }) => Ok(true),
        Err(e) if e.is_lookup_miss() => Ok(false),
        Err(e) => Err(e),
    }
}
