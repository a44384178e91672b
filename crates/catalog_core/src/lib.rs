//! Reactive product/supplier catalog pipeline.
//!
//! Collections fetched over HTTP are combined into derived views: products
//! joined with their categories, the selected product, that product's
//! suppliers, and a product list extended with locally added records.

use std::sync::Arc;

use anyhow::Result;
use shared::{
    domain::ProductId,
    protocol::{Category, Product, Supplier},
};
use tracing::info;

pub mod categories;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod merger;
pub mod selection;
pub mod stream;
pub mod suppliers;
pub mod transport;
pub mod view;

pub use categories::{CategoryFeed, CategorySource};
pub use config::{load_settings, ClientSettings};
pub use error::FetchError;
pub use fetcher::RemoteCollection;
pub use merger::{placeholder_product, ProductMerger};
pub use selection::SelectionStore;
pub use stream::{ReplayCache, Source, StreamEvent, Subscription};
pub use suppliers::SupplierResolver;
pub use transport::{CatalogApi, HttpCatalogApi};
pub use view::{ErrorNotifier, ProductDetailView, ProductListView};

/// Composition root wiring every catalog node together.
///
/// Must be created inside a tokio runtime; each derived node runs as a task
/// that is aborted when the catalog is dropped.
pub struct Catalog {
    categories: Arc<dyn CategorySource>,
    products: RemoteCollection<Product>,
    suppliers: RemoteCollection<Supplier>,
    products_with_category: stream::Derived<Vec<Product>>,
    selection: Arc<SelectionStore>,
    product_suppliers: SupplierResolver,
    merger: Arc<ProductMerger>,
    channel_capacity: usize,
}

impl Catalog {
    pub fn new(
        api: Arc<dyn CatalogApi>,
        categories: Arc<dyn CategorySource>,
        channel_capacity: usize,
    ) -> Self {
        let products = RemoteCollection::products(Arc::clone(&api), channel_capacity);
        let suppliers = RemoteCollection::suppliers(Arc::clone(&api), channel_capacity);
        let products_with_category = categories::join_with_categories(
            products.subscribe(),
            categories.subscribe(),
            channel_capacity,
        );
        let selection = Arc::new(SelectionStore::new(
            products_with_category.subscribe(),
            channel_capacity,
        ));
        let product_suppliers = SupplierResolver::spawn(api, selection.selected(), channel_capacity);
        let merger = Arc::new(ProductMerger::spawn(&products_with_category, channel_capacity));

        Self {
            categories,
            products,
            suppliers,
            products_with_category,
            selection,
            product_suppliers,
            merger,
            channel_capacity,
        }
    }

    /// Catalog over the HTTP API at `settings.base_url`, with categories read
    /// from the same backend.
    pub fn connect(settings: &ClientSettings) -> Result<Self> {
        settings.validate()?;
        let api: Arc<dyn CatalogApi> = Arc::new(HttpCatalogApi::from_settings(settings)?);
        let categories = Arc::new(RemoteCollection::categories(
            Arc::clone(&api),
            settings.channel_capacity,
        ));
        info!(base_url = %settings.base_url, "catalog pipeline connecting");
        Ok(Self::new(api, categories, settings.channel_capacity))
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }

    /// Products exactly as returned by the backend.
    pub fn products(&self) -> Subscription<Vec<Product>> {
        self.products.subscribe()
    }

    /// Every supplier; read on first subscription.
    pub fn suppliers(&self) -> Subscription<Vec<Supplier>> {
        self.suppliers.subscribe()
    }

    pub fn categories(&self) -> Subscription<Vec<Category>> {
        self.categories.subscribe()
    }

    pub fn products_with_category(&self) -> Subscription<Vec<Product>> {
        self.products_with_category.subscribe()
    }

    pub fn select(&self, product_id: ProductId) {
        self.selection.select(product_id);
    }

    pub fn selected_product(&self) -> Subscription<Option<Product>> {
        self.selection.selected()
    }

    pub fn product_suppliers(&self) -> Subscription<Vec<Supplier>> {
        self.product_suppliers.suppliers()
    }

    pub fn add_product(&self, product: Option<Product>) {
        self.merger.add_product(product);
    }

    pub fn merged_products(&self) -> Subscription<Vec<Product>> {
        self.merger.merged()
    }

    pub fn selection_store(&self) -> Arc<SelectionStore> {
        Arc::clone(&self.selection)
    }

    pub fn merger(&self) -> Arc<ProductMerger> {
        Arc::clone(&self.merger)
    }
}

#[cfg(test)]
pub(crate) mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
