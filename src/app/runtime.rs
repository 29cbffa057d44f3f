//! Builds the long-lived collaborators a command needs from [`Settings`].

use std::sync::Arc;

use anyhow::{Context, Result};
use joblo_core::batch::BatchObserver;
use joblo_core::proxy::load_proxy_list;
use joblo_core::{
    BatchScheduler, CancelFlag, Database, EncryptedFileSessionStore, HttpBrowserLauncher,
    HttpProxyProbe, OrchestratedExecutor, ProxyPool, RetryOrchestrator, RetryPolicy,
    SessionManager, Settings, SiteProfile, SiteScraper, SqliteRecordStore,
};
use tracing::{debug, info, warn};

/// Everything a scrape or serve command drives.
pub(crate) struct Runtime {
    pub(crate) site: SiteProfile,
    pub(crate) store: SqliteRecordStore,
    orchestrator: Arc<RetryOrchestrator>,
    scraper: Arc<SiteScraper>,
}

impl Runtime {
    /// Opens the database and session store, loads proxies and assembles
    /// the orchestrator.
    pub(crate) async fn build(settings: &Settings) -> Result<Self> {
        let site = SiteProfile::linkedin();
        let store = open_record_store(settings).await?;

        let sessions = open_session_store(settings)?;
        if settings.credential.is_none() {
            warn!("no credential configured; only a stored session can be restored");
        }
        let session = SessionManager::new(
            settings.account(),
            settings.credential.clone(),
            site.clone(),
            Arc::new(sessions),
        );

        let proxies = load_proxy_list(&settings.proxy_file)
            .with_context(|| format!("Cannot read proxy list {}", settings.proxy_file.display()))?;
        if proxies.is_empty() {
            warn!(
                path = %settings.proxy_file.display(),
                "proxy list is empty; retries after the first attempt will fail"
            );
        } else {
            info!(proxies = proxies.len(), "proxy list loaded");
        }
        let pool = ProxyPool::new(proxies, Arc::new(HttpProxyProbe::new(site.base_url.clone())));

        let orchestrator = RetryOrchestrator::new(
            Arc::new(HttpBrowserLauncher::default()),
            Arc::new(session),
            Arc::new(pool),
            RetryPolicy::default(),
        );

        Ok(Self {
            scraper: Arc::new(SiteScraper::new(site.clone())),
            site,
            store,
            orchestrator: Arc::new(orchestrator),
        })
    }

    /// A scheduler that scrapes with this runtime's site and stores into its
    /// database.
    pub(crate) fn scheduler(
        &self,
        max_attempts: u32,
        cancel: CancelFlag,
        observer: Option<Arc<dyn BatchObserver>>,
    ) -> BatchScheduler {
        let executor = OrchestratedExecutor::new(
            Arc::clone(&self.orchestrator),
            self.scraper.clone(),
            max_attempts,
        );
        let scheduler = BatchScheduler::new(
            Arc::new(executor),
            Arc::new(self.store.clone()),
            cancel,
        );
        match observer {
            Some(observer) => scheduler.with_observer(observer),
            None => scheduler,
        }
    }
}

/// Opens the configured SQLite database.
pub(crate) async fn open_record_store(settings: &Settings) -> Result<SqliteRecordStore> {
    let db = Database::open(&settings.database)
        .await
        .with_context(|| format!("Cannot open database {}", settings.database.display()))?;
    debug!(path = %settings.database.display(), "database ready");
    Ok(SqliteRecordStore::new(db))
}

/// Opens the encrypted token store, honouring the state dir and key overrides.
pub(crate) fn open_session_store(settings: &Settings) -> Result<EncryptedFileSessionStore> {
    EncryptedFileSessionStore::open(settings.state_dir.clone(), settings.master_key.clone())
        .context("Cannot open session store")
}

/// Sets `cancel` on the first Ctrl-C. The batch stops before its next item.
pub(crate) fn cancel_on_ctrl_c(cancel: CancelFlag) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; finishing the current item and stopping");
            cancel.cancel();
        }
    });
}
