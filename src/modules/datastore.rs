use anyhow::Context;
use async_trait::async_trait;
use bookreview_db::StoreHandle;
use bookreview_kernel::{InitCtx, Module};

/// Core module owning the datastore connection lifecycle: verified on init,
/// released on stop.
pub struct DatastoreModule {
    store: StoreHandle,
}

impl DatastoreModule {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Module for DatastoreModule {
    fn name(&self) -> &'static str {
        "datastore"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        self.store
            .ping()
            .await
            .context("datastore did not answer ping")?;
        tracing::info!(
            module = self.name(),
            database = %ctx.settings.database.name,
            "datastore module initialized"
        );
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<()> {
        self.store
            .shutdown()
            .await
            .context("failed to shut down datastore client")?;
        tracing::info!(module = self.name(), "datastore module stopped");
        Ok(())
    }
}

pub fn create_module(store: StoreHandle) -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(DatastoreModule::new(store))
}
