//! Approval workflow client.

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument};

use dirsync_sync::approval::ApprovalClient;
use dirsync_sync::{SyncError, SyncResult};

use crate::config::ServiceConfig;
use crate::error::ClientResult;
use crate::http::ServiceClient;

const SERVICE: &str = "approval";

/// Reads order details from `GET {base_url}/orders/{id}`.
///
/// Some workflow gateways wrap the payload as `{ "data": {...} }`; the
/// wrapper is removed before the detail is handed to the form parser.
#[derive(Debug, Clone)]
pub struct HttpApprovalClient {
    client: ServiceClient,
}

impl HttpApprovalClient {
    pub fn new(config: &ServiceConfig) -> ClientResult<Self> {
        Ok(Self {
            client: ServiceClient::new(config)?,
        })
    }

    #[must_use]
    pub fn with_client(client: ServiceClient) -> Self {
        Self { client }
    }
}

fn unwrap_data(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.len() == 1 && map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[async_trait]
impl ApprovalClient for HttpApprovalClient {
    #[instrument(skip(self))]
    async fn get_order_detail(&self, order_id: &str) -> SyncResult<Value> {
        if order_id.contains('/') {
            return Err(SyncError::validation("order_id", "must not contain '/'"));
        }
        let body: Value = self
            .client
            .get_json(&format!("orders/{order_id}"))
            .await
            .map_err(|e| e.into_sync(SERVICE))?;
        debug!(order_id, "Fetched order detail");
        Ok(unwrap_data(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_data() {
        assert_eq!(
            unwrap_data(json!({ "data": { "order_id": "7" } })),
            json!({ "order_id": "7" })
        );
        let plain = json!({ "order_id": "7", "data": 1 });
        assert_eq!(unwrap_data(plain.clone()), plain);
    }
}
