pub mod authors;
pub mod books;
pub mod common;
pub mod datastore;
pub mod reviews;
pub mod sales;

use bookreview_db::StoreHandle;
use bookreview_kernel::ModuleRegistry;

use crate::catalog::Catalog;

/// Register the datastore core module and every catalog module
pub fn register_all(registry: &mut ModuleRegistry, store: &StoreHandle) {
    registry.register_core(datastore::create_module(store.clone()));

    let catalog = Catalog::new(store.clone());
    registry.register_custom(authors::create_module(catalog.clone()));
    registry.register_custom(books::create_module(catalog.clone()));
    registry.register_custom(reviews::create_module(catalog.clone()));
    registry.register_custom(sales::create_module(catalog));
}
