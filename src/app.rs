//! Process entry points shared by the app binary and the CLI.

use anyhow::Context;
use bookreview_db::StoreHandle;
use bookreview_kernel::{settings::Settings, InitCtx, ModuleRegistry};
use rand::{rngs::StdRng, SeedableRng};

use crate::catalog::Catalog;
use crate::modules;
use crate::seed::{SeedPlan, SeedReport};

/// Connect to the configured datastore. Fails when no URI is configured or
/// the datastore does not answer.
pub async fn connect(settings: &Settings) -> anyhow::Result<StoreHandle> {
    let uri = settings.database.require_uri()?;
    match bookreview_db::connect(uri, &settings.database.name).await {
        Ok(store) => Ok(store),
        Err(err) => {
            tracing::error!(error = %err, "failed to connect to the datastore");
            Err(err).context("failed to connect to the datastore")
        }
    }
}

/// Registry holding the datastore core module and every catalog module
pub fn build_registry(store: &StoreHandle) -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry, store);
    registry
}

/// Run the module lifecycle around the HTTP server until shutdown.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    tracing::info!(
        env = ?settings.environment,
        database = %settings.database.name,
        "bookreview bootstrap starting"
    );

    let store = connect(&settings).await?;
    let registry = build_registry(&store);
    let ctx = InitCtx {
        settings: &settings,
        store: &store,
    };

    registry.init_core_modules(&ctx).await?;
    registry.init_custom_modules(&ctx).await?;
    registry.ensure_indexes(&ctx).await?;
    registry.start_core_modules(&ctx).await?;
    registry.start_custom_modules(&ctx).await?;
    tracing::info!(
        core = registry.core_module_count(),
        custom = registry.custom_module_count(),
        "bookreview bootstrap complete"
    );

    let served = bookreview_http::start_server(&registry, &settings, &store).await;

    // Stop modules even when the server failed, then report the first error
    let stopped = async {
        registry.stop_custom_modules().await?;
        registry.stop_core_modules().await
    }
    .await;

    served?;
    stopped
}

/// Wipe the catalog and fill it with generated data.
///
/// Without `rng_seed` a random seed is drawn and logged so the run can be
/// repeated.
pub async fn seed(
    settings: &Settings,
    plan: SeedPlan,
    rng_seed: Option<u64>,
) -> anyhow::Result<SeedReport> {
    let store = connect(settings).await?;
    let rng_seed = rng_seed.unwrap_or_else(rand::random);
    tracing::info!(
        rng_seed,
        authors = plan.authors,
        books = plan.books,
        "seeding catalog"
    );

    let mut rng = StdRng::seed_from_u64(rng_seed);
    let today = chrono::Local::now().date_naive();
    let report = crate::seed::run(&Catalog::new(store.clone()), plan, &mut rng, today).await;

    if let Err(err) = store.shutdown().await {
        tracing::warn!(error = %err, "failed to shut down datastore client");
    }
    report
}
