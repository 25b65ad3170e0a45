//! Wires configuration into live collaborators.

use std::sync::Arc;

use tracing::{info, instrument};

use dirsync_clients::{HttpApprovalClient, HttpHrSource, HttpNotifier, HttpPlatformProvisioner};
use dirsync_connector::traits::{Connector, DirectoryOps};
use dirsync_connector_ldap::LdapConnector;
use dirsync_db::{run_migrations, DbPool};
use dirsync_sync::audit::PgDepartmentAudit;
use dirsync_sync::hr::HrSource;
use dirsync_sync::notify::Notifier;
use dirsync_sync::orders::{OrderProcessor, OrderServices, PgOrderLedger};
use dirsync_sync::reconciliation::{ExpirySweep, Reconciler};
use dirsync_sync::SyncContext;

use crate::config::AppConfig;
use crate::error::AppResult;

/// Validate the sync section. A bad base identity stops the process here.
pub fn context(config: &AppConfig) -> AppResult<Arc<SyncContext>> {
    let ctx = SyncContext::new(config.sync.clone())?;
    config.ldap.validate()?;
    Ok(Arc::new(ctx))
}

/// Connected collaborators for one process run.
pub struct Runtime {
    pub ctx: Arc<SyncContext>,
    pub directory: Arc<dyn DirectoryOps>,
    pub db: DbPool,
    pub hr: Arc<dyn HrSource>,
    pub notifier: Arc<dyn Notifier>,
    config: AppConfig,
}

impl Runtime {
    #[instrument(skip(config), fields(ldap_host = %config.ldap.host))]
    pub async fn connect(config: AppConfig) -> AppResult<Self> {
        let ctx = context(&config)?;

        let directory: Arc<dyn DirectoryOps> = Arc::new(LdapConnector::new(config.ldap.clone())?);
        directory.test_connection().await?;

        let db = DbPool::connect_with(&config.database.url, config.database.max_connections).await?;
        run_migrations(&db).await?;

        let hr: Arc<dyn HrSource> = Arc::new(HttpHrSource::new(&config.hr)?);
        let notifier: Arc<dyn Notifier> = Arc::new(HttpNotifier::new(&config.notify)?);

        info!(base_dn = %ctx.base_dn(), "Runtime connected");
        Ok(Self {
            ctx,
            directory,
            db,
            hr,
            notifier,
            config,
        })
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::new(
            Arc::clone(&self.ctx),
            Arc::clone(&self.directory),
            Arc::new(PgDepartmentAudit::new(self.db.clone())),
            Arc::clone(&self.notifier),
        )
    }

    pub fn expiry_sweep(&self) -> ExpirySweep {
        ExpirySweep::new(
            Arc::clone(&self.ctx),
            Arc::clone(&self.directory),
            Arc::clone(&self.notifier),
        )
    }

    pub fn order_processor(&self) -> AppResult<OrderProcessor> {
        let services = OrderServices {
            ctx: Arc::clone(&self.ctx),
            directory: Arc::clone(&self.directory),
            notifier: Arc::clone(&self.notifier),
            platforms: Arc::new(HttpPlatformProvisioner::new(&self.config.platforms)?),
        };
        Ok(OrderProcessor::new(
            services,
            Arc::new(HttpApprovalClient::new(&self.config.approval)?),
            Arc::new(PgOrderLedger::new(self.db.clone())),
        ))
    }

    pub async fn shutdown(&self) {
        if let Err(e) = self.directory.dispose().await {
            tracing::warn!(error = %e, "Directory dispose failed");
        }
        self.db.close().await;
    }
}
