//! Per-page view adapters.
//!
//! Views subscribe to the catalog's derived streams, report upstream
//! failures on a per-view error channel and substitute an empty result so
//! the page keeps rendering.

use std::sync::Arc;

use shared::{
    domain::ProductId,
    protocol::{Product, Supplier},
};
use tracing::{debug, warn};

use crate::{
    merger::ProductMerger,
    selection::SelectionStore,
    stream::{map, Derived, ReplayCache, Source, StreamEvent, Subscription},
    Catalog,
};

pub const PRODUCT_LIST_TITLE: &str = "Products";

/// Most recent error message surfaced by a view.
#[derive(Clone)]
pub struct ErrorNotifier {
    messages: ReplayCache<String>,
}

impl ErrorNotifier {
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: ReplayCache::with_capacity(capacity),
        }
    }

    pub fn report(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(%message, "catalog view error");
        self.messages.next(message);
    }

    pub fn latest(&self) -> Option<String> {
        self.messages
            .latest()
            .and_then(|event| event.as_next().cloned())
    }
}

impl Source<String> for ErrorNotifier {
    fn subscribe(&self) -> Subscription<String> {
        self.messages.subscribe()
    }
}

/// Forwards `upstream` values; a failure is reported on `errors` and
/// replaced by `fallback`, and later values keep flowing.
pub fn catch_errors<T>(
    upstream: Subscription<T>,
    errors: ErrorNotifier,
    fallback: T,
    capacity: usize,
) -> Derived<T>
where
    T: Clone + Send + Sync + 'static,
{
    recover(upstream, Some(errors), fallback, capacity)
}

/// [`catch_errors`] without reporting, for a stream whose failures always
/// originate in a sibling stream that already reports them.
pub fn substitute_errors<T>(upstream: Subscription<T>, fallback: T, capacity: usize) -> Derived<T>
where
    T: Clone + Send + Sync + 'static,
{
    recover(upstream, None, fallback, capacity)
}

fn recover<T>(
    mut upstream: Subscription<T>,
    errors: Option<ErrorNotifier>,
    fallback: T,
    capacity: usize,
) -> Derived<T>
where
    T: Clone + Send + Sync + 'static,
{
    Derived::spawn(capacity, move |output| async move {
        while let Some(event) = upstream.next().await {
            match event {
                StreamEvent::Next(value) => output.next(value),
                StreamEvent::Failed(error) => {
                    match &errors {
                        Some(errors) => errors.report(error.to_string()),
                        None => debug!(%error, "substituting fallback for failed stream"),
                    }
                    output.next(fallback.clone());
                }
            }
        }
    })
}

pub fn detail_title(product: Option<&Product>) -> Option<String> {
    product.map(|product| format!("Product Detail for: {}", product.product_name))
}

pub struct ProductListView {
    products: Derived<Vec<Product>>,
    products_with_additions: Derived<Vec<Product>>,
    selection: Arc<SelectionStore>,
    merger: Arc<ProductMerger>,
    errors: ErrorNotifier,
}

impl ProductListView {
    pub fn new(catalog: &Catalog) -> Self {
        let capacity = catalog.channel_capacity();
        let errors = ErrorNotifier::new(capacity);
        let products = catch_errors(
            catalog.products_with_category(),
            errors.clone(),
            Vec::new(),
            capacity,
        );
        // The merged list only fails when the joined products fail, which
        // `products` already reports.
        let products_with_additions =
            substitute_errors(catalog.merged_products(), Vec::new(), capacity);
        Self {
            products,
            products_with_additions,
            selection: catalog.selection_store(),
            merger: catalog.merger(),
            errors,
        }
    }

    pub fn page_title(&self) -> &'static str {
        PRODUCT_LIST_TITLE
    }

    pub fn products(&self) -> Subscription<Vec<Product>> {
        self.products.subscribe()
    }

    pub fn products_with_additions(&self) -> Subscription<Vec<Product>> {
        self.products_with_additions.subscribe()
    }

    pub fn selected_product_id(&self) -> Subscription<ProductId> {
        self.selection.selection()
    }

    pub fn on_selected(&self, product_id: ProductId) {
        self.selection.select(product_id);
    }

    pub fn add_product(&self, product: Option<Product>) {
        self.merger.add_product(product);
    }

    pub fn errors(&self) -> Subscription<String> {
        self.errors.subscribe()
    }

    pub fn last_error(&self) -> Option<String> {
        self.errors.latest()
    }
}

pub struct ProductDetailView {
    product: Derived<Option<Product>>,
    page_title: Derived<Option<String>>,
    suppliers: Derived<Vec<Supplier>>,
    errors: ErrorNotifier,
}

impl ProductDetailView {
    pub fn new(catalog: &Catalog) -> Self {
        let capacity = catalog.channel_capacity();
        let errors = ErrorNotifier::new(capacity);
        let product = catch_errors(catalog.selected_product(), errors.clone(), None, capacity);
        let page_title = map(product.subscribe(), capacity, |product| {
            detail_title(product.as_ref())
        });
        let suppliers = catch_errors(
            catalog.product_suppliers(),
            errors.clone(),
            Vec::new(),
            capacity,
        );
        Self {
            product,
            page_title,
            suppliers,
            errors,
        }
    }

    pub fn product(&self) -> Subscription<Option<Product>> {
        self.product.subscribe()
    }

    pub fn page_title(&self) -> Subscription<Option<String>> {
        self.page_title.subscribe()
    }

    pub fn suppliers(&self) -> Subscription<Vec<Supplier>> {
        self.suppliers.subscribe()
    }

    pub fn errors(&self) -> Subscription<String> {
        self.errors.subscribe()
    }

    pub fn last_error(&self) -> Option<String> {
        self.errors.latest()
    }
}
