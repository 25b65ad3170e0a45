//! Order state machine.
//!
//! Per order id: no ledger row, a failed row, or a succeeded row. Each
//! trigger for a failed or unseen order runs exactly one handler and records
//! the outcome once. A succeeded row is terminal: later triggers return
//! [`OrderOutcome::AlreadyHandled`] without fetching the order.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

use super::form::parse_order_detail;
use super::handlers::{self, OrderServices};
use super::ledger::OrderLedger;
use super::types::{OrderOutcome, OrderType};
use crate::approval::ApprovalClient;
use crate::error::{ErrorKind, SyncError, SyncResult};
use crate::notify::notify_markdown;

/// Template of the failure notice sent to the order initiator.
pub const FAILURE_TEMPLATE: &str = "order_failed";

/// Removes an order id from the in-flight set on drop.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    order_id: String,
}

impl<'a> InFlight<'a> {
    fn acquire(set: &'a Mutex<HashSet<String>>, order_id: &str) -> Option<Self> {
        let inserted = set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(order_id.to_string());
        inserted.then(|| Self {
            set,
            order_id: order_id.to_string(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.order_id);
    }
}

struct Execution {
    order_type: Option<OrderType>,
    initiator: String,
    result: SyncResult<()>,
}

pub struct OrderProcessor {
    services: OrderServices,
    approval: Arc<dyn ApprovalClient>,
    ledger: Arc<dyn OrderLedger>,
    in_flight: Mutex<HashSet<String>>,
}

impl OrderProcessor {
    pub fn new(
        services: OrderServices,
        approval: Arc<dyn ApprovalClient>,
        ledger: Arc<dyn OrderLedger>,
    ) -> Self {
        Self {
            services,
            approval,
            ledger,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub async fn process(&self, order_id: &str) -> SyncResult<OrderOutcome> {
        self.process_at(order_id, Utc::now()).await
    }

    /// Process one order as of `now`.
    ///
    /// Handler failures are recorded and returned as
    /// `Executed { success: false }`. Only a ledger failure is an `Err`.
    #[instrument(skip(self, now))]
    pub async fn process_at(&self, order_id: &str, now: DateTime<Utc>) -> SyncResult<OrderOutcome> {
        let order_id = order_id.trim();
        if order_id.is_empty() {
            return Err(SyncError::validation("order_id", "empty order id"));
        }

        let Some(_guard) = InFlight::acquire(&self.in_flight, order_id) else {
            info!("Order is already being processed");
            return Ok(OrderOutcome::InProgress);
        };

        if let Some(entry) = self.ledger.find(order_id).await? {
            if entry.status {
                info!("Order already handled");
                return Ok(OrderOutcome::AlreadyHandled);
            }
            debug!(previous_error = %entry.message, "Retrying failed order");
        }

        let execution = self.execute(order_id, now).await;
        let success = execution.result.is_ok();
        let message = match &execution.result {
            Ok(()) => String::new(),
            Err(e) => e.to_string(),
        };
        let type_label = execution.order_type.map(OrderType::as_str).unwrap_or_default();

        let recorded = self
            .ledger
            .record_outcome(order_id, type_label, success, &message)
            .await?;
        if !recorded {
            warn!("Order succeeded elsewhere while this attempt ran");
            return Ok(OrderOutcome::AlreadyHandled);
        }

        match &execution.result {
            Ok(()) => info!(order_type = type_label, "Order executed"),
            Err(e) => {
                match e.kind() {
                    ErrorKind::Transport => error!(order_type = type_label, error = %e, "Order failed"),
                    kind => warn!(order_type = type_label, ?kind, error = %e, "Order rejected"),
                }
                notify_markdown(
                    self.services.notifier.as_ref(),
                    &execution.initiator,
                    FAILURE_TEMPLATE,
                    json!({
                        "order_id": order_id,
                        "order_type": type_label,
                        "message": message,
                    }),
                )
                .await;
            }
        }

        Ok(OrderOutcome::Executed { success, message })
    }

    async fn execute(&self, order_id: &str, now: DateTime<Utc>) -> Execution {
        let mut execution = Execution {
            order_type: None,
            initiator: String::new(),
            result: Ok(()),
        };

        let detail = match self.approval.get_order_detail(order_id).await {
            Ok(payload) => parse_order_detail(payload),
            Err(e) => Err(e),
        };
        let mut detail = match detail {
            Ok(detail) => detail,
            Err(e) => {
                execution.result = Err(e);
                return execution;
            }
        };
        if detail.order_id.is_empty() {
            detail.order_id = order_id.to_string();
        }
        execution.initiator = detail.initiator.clone();

        let Some(order_type) = self.services.ctx.order_type(&detail.template_code) else {
            execution.result = Err(SyncError::UnknownOrderType {
                template_code: detail.template_code.clone(),
            });
            return execution;
        };
        execution.order_type = Some(order_type);

        let services = &self.services;
        execution.result = match order_type {
            OrderType::AccountRegister => handlers::register::handle(services, &detail, now).await,
            OrderType::PasswordRetrieve => handlers::password::handle(services, &detail, now).await,
            OrderType::AccountDisable => handlers::disable::handle(services, &detail, now).await,
            OrderType::AccountRenew => handlers::renew::handle(services, &detail, now).await,
            OrderType::AuthorityGrant => Err(SyncError::unsupported("authority grant orders")),
        };
        execution
    }
}
