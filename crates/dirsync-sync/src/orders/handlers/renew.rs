//! Account renewal.

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use tracing::{info, instrument};

use dirsync_connector::operation::AttributeDelta;
use dirsync_connector_ldap::ad::datetime_to_filetime;

use super::{fields, resolve_account, OrderServices};
use crate::error::{SyncError, SyncResult};
use crate::model::attr;
use crate::notify::notify_markdown;
use crate::orders::form::OrderDetail;

pub const TEMPLATE: &str = "account_renewed";

/// New expiry: end of the requested local day, or the default lifetime from now.
pub fn renewal_expiry(
    ctx: &crate::context::SyncContext,
    order: &OrderDetail,
    now: DateTime<Utc>,
) -> SyncResult<DateTime<Utc>> {
    let expires_at = match order.form.date(fields::EXPIRE_DATE) {
        Some(date) => ctx.local_midnight(date + Duration::days(1)) - Duration::seconds(1),
        None => now + Duration::days(ctx.settings().external_account_days),
    };
    if expires_at <= now {
        return Err(SyncError::validation(
            "expire_date",
            format!("renewal date {expires_at} is not in the future"),
        ));
    }
    Ok(expires_at)
}

#[instrument(skip(services, order, now), fields(order_id = %order.order_id))]
pub async fn handle(
    services: &OrderServices,
    order: &OrderDetail,
    now: DateTime<Utc>,
) -> SyncResult<()> {
    let user = resolve_account(services, &order.form).await?;
    let expires_at = renewal_expiry(&services.ctx, order, now)?;

    let control = user.control().enable();
    let delta = AttributeDelta::new()
        .with_replace(attr::ACCOUNT_EXPIRES, datetime_to_filetime(expires_at))
        .with_replace(attr::ACCOUNT_CONTROL, u32::from(control));
    services.directory.modify(&user.dn, delta).await?;
    info!(dn = %user.dn, expires_at = %expires_at, "Account renewed");

    notify_markdown(
        services.notifier.as_ref(),
        user.recipient(),
        TEMPLATE,
        json!({
            "login": user.login,
            "expires_at": services.ctx.local_date(expires_at).to_string(),
        }),
    )
    .await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::tests::context;
    use crate::orders::form::parse_order_detail;
    use chrono::TimeZone;

    fn order(form: serde_json::Value) -> OrderDetail {
        parse_order_detail(json!({ "order_id": "PO-9", "template_code": "TPL-RENEW", "form": form }))
            .unwrap()
    }

    #[test]
    fn test_renewal_to_end_of_local_day() {
        let ctx = context();
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        let order = order(json!([
            {"id": "expire_date", "name": "Expire date", "type": "date", "value": "2026-06-30"}
        ]));
        // 23:59:59 at UTC+8
        assert_eq!(
            renewal_expiry(&ctx, &order, now).unwrap(),
            Utc.with_ymd_and_hms(2026, 6, 30, 15, 59, 59).unwrap()
        );
    }

    #[test]
    fn test_renewal_default_period() {
        let ctx = context();
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        assert_eq!(
            renewal_expiry(&ctx, &order(json!([])), now).unwrap(),
            now + Duration::days(90)
        );
    }

    #[test]
    fn test_renewal_in_the_past_is_rejected() {
        let ctx = context();
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 0, 0, 0).unwrap();
        let order = order(json!([
            {"id": "expire_date", "name": "Expire date", "type": "date", "value": "2026-04-01"}
        ]));
        assert!(renewal_expiry(&ctx, &order, now).is_err());
    }
}
