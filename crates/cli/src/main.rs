use anyhow::Context;
use bookreview_app::SeedPlan;
use bookreview_kernel::settings::Settings;
use clap::{Args, Parser, Subcommand};

/// Book review catalog API
#[derive(Debug, Parser)]
#[command(name = "bookreview", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API until Ctrl-C or SIGTERM
    Serve,
    /// Replace the catalog contents with generated data
    Seed(SeedArgs),
}

#[derive(Debug, Args)]
struct SeedArgs {
    /// Number of authors to create
    #[arg(long, default_value_t = SeedPlan::default().authors)]
    authors: usize,

    /// Number of books to create, each with reviews and five years of sales
    #[arg(long, default_value_t = SeedPlan::default().books)]
    books: usize,

    /// Seed of the random generator, for reproducible data
    #[arg(long)]
    rng_seed: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load bookreview settings")?;
    bookreview_telemetry::init(&settings.telemetry)?;

    match cli.command {
        Command::Serve => bookreview_app::serve(settings).await,
        Command::Seed(args) => {
            let plan = SeedPlan {
                authors: args.authors,
                books: args.books,
            };
            let report = bookreview_app::seed_catalog(&settings, plan, args.rng_seed).await?;
            tracing::info!(
                authors = report.authors,
                books = report.books,
                reviews = report.reviews,
                sales = report.sales,
                "catalog seeded"
            );
            Ok(())
        }
    }
}
