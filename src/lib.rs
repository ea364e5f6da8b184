//! Book review catalog application.
//!
//! Catalog modules (authors, books, reviews, sales), the typed repositories
//! they share, the seed generator and the bootstrap used by both binaries.

pub mod app;
pub mod catalog;
pub mod modules;
pub mod seed;
pub mod validation;

pub use app::{build_registry, connect, seed as seed_catalog, serve};
pub use catalog::Catalog;
pub use seed::{SeedPlan, SeedReport};
