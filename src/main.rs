use anyhow::Context;
use bookreview_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load bookreview settings")?;
    bookreview_telemetry::init(&settings.telemetry)?;

    bookreview_app::serve(settings).await
}
