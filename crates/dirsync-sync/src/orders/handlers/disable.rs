//! Account disable: set the disable bit, expire now, move to the disabled container.

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use dirsync_connector::dn;
use dirsync_connector::operation::AttributeDelta;

use super::{resolve_account, OrderServices};
use crate::error::{SyncError, SyncResult};
use crate::model::attr;
use crate::orders::form::OrderDetail;
use crate::ou_path;

#[instrument(skip(services, order, _now), fields(order_id = %order.order_id))]
pub async fn handle(
    services: &OrderServices,
    order: &OrderDetail,
    _now: DateTime<Utc>,
) -> SyncResult<()> {
    let ctx = services.ctx.as_ref();
    let directory = services.directory.as_ref();
    let user = resolve_account(services, &order.form).await?;

    let control = user.control().disable();
    let delta = AttributeDelta::new()
        .with_replace(attr::ACCOUNT_CONTROL, u32::from(control))
        .with_replace(attr::ACCOUNT_EXPIRES, 0i64);
    directory.modify(&user.dn, delta).await?;
    info!(dn = %user.dn, control = u32::from(control), "Account disabled");

    let disabled = ctx.disabled_dn();
    if user.container().is_some_and(|c| dn::dn_eq(c, disabled)) {
        return Ok(());
    }

    let rdn = user
        .rdn()
        .ok_or_else(|| SyncError::validation("dn", format!("'{}' has no RDN", user.dn)))?;
    ou_path::ensure_ou_path(directory, ctx, disabled).await?;
    directory.move_dn(&user.dn, rdn, disabled).await?;
    info!(dn = %user.dn, to = %disabled, "Moved disabled account");
    Ok(())
}
