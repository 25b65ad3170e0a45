//! Password retrieval: reset to a new random password and deliver it.

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, instrument};

use dirsync_connector::operation::AttributeDelta;
use dirsync_connector_ldap::ad::{encode_ad_password, generate_password};

use super::{resolve_account, OrderServices};
use crate::error::SyncResult;
use crate::model::attr;
use crate::orders::form::OrderDetail;

pub const TEMPLATE: &str = "password_reset";

/// The new password must reach the holder, so a failed delivery fails the
/// order and a retry resets again.
#[instrument(skip(services, order, _now), fields(order_id = %order.order_id))]
pub async fn handle(
    services: &OrderServices,
    order: &OrderDetail,
    _now: DateTime<Utc>,
) -> SyncResult<()> {
    let user = resolve_account(services, &order.form).await?;
    let password = generate_password(services.ctx.settings().password_length);

    let delta = AttributeDelta::new()
        .with_replace(attr::UNICODE_PWD, encode_ad_password(&password)?)
        .with_replace(attr::PWD_LAST_SET, 0i64)
        .with_replace(attr::LOCKOUT_TIME, 0i64);
    services.directory.modify(&user.dn, delta).await?;
    info!(dn = %user.dn, "Password reset");

    services
        .notifier
        .send_markdown(
            user.recipient(),
            TEMPLATE,
            json!({
                "login": user.login,
                "display_name": user.display_name,
                "password": password,
            }),
        )
        .await
}
