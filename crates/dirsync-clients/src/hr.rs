//! HR feed client.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use dirsync_sync::hr::HrSource;
use dirsync_sync::model::HrRecord;
use dirsync_sync::SyncResult;

use crate::config::ServiceConfig;
use crate::error::ClientResult;
use crate::http::ServiceClient;

const SERVICE: &str = "hr";

/// The feed answers either a bare array or `{ "records": [...] }`.
#[derive(Deserialize)]
#[serde(untagged)]
enum SnapshotBody {
    Bare(Vec<Value>),
    Wrapped { records: Vec<Value> },
}

impl SnapshotBody {
    fn into_records(self) -> Vec<Value> {
        match self {
            SnapshotBody::Bare(records) | SnapshotBody::Wrapped { records } => records,
        }
    }
}

/// Fetches employee snapshots from `GET {base_url}/employees`.
#[derive(Debug, Clone)]
pub struct HttpHrSource {
    client: ServiceClient,
}

impl HttpHrSource {
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

/// Decode each record independently, dropping the ones that fail.
fn decode_records(raw: Vec<Value>) -> Vec<HrRecord> {
    let total = raw.len();
    let records: Vec<HrRecord> = raw
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(index, error = %e, "Dropping undecodable HR record");
                None
            }
        })
        .collect();
    if records.len() < total {
        warn!(total, kept = records.len(), "HR snapshot had malformed records");
    }
    records
}

#[async_trait]
impl HrSource for HttpHrSource {
    #[instrument(skip(self))]
    async fn fetch_snapshot(&self) -> SyncResult<Vec<HrRecord>> {
        let body: SnapshotBody = self
            .client
            .get_json("employees")
            .await
            .map_err(|e| e.into_sync(SERVICE))?;
        let records = decode_records(body.into_records());
        info!(count = records.len(), "Fetched HR snapshot");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_drops_bad_records() {
        let records = decode_records(vec![
            json!({ "employee_id": "E1", "status": "在职" }),
            json!("not an object"),
            json!({ "employee_id": 7, "status": "在职" }),
            json!({ "employee_id": "E2", "status": "离职" }),
        ]);
        let ids: Vec<_> = records.iter().map(|r| r.employee_id.as_str()).collect();
        assert_eq!(ids, vec!["E1", "E2"]);
    }

    #[test]
    fn test_snapshot_body_shapes() {
        let wrapped: SnapshotBody = serde_json::from_value(json!({ "records": [{}] })).unwrap();
        assert_eq!(wrapped.into_records().len(), 1);
        let bare: SnapshotBody = serde_json::from_value(json!([{}, {}])).unwrap();
        assert_eq!(bare.into_records().len(), 2);
    }
}
