use shared::{domain::ProductId, protocol::Product};
use tracing::debug;

use crate::stream::{combine_latest, Derived, ReplayCache, Source, StreamEvent, Subscription};

/// Owner of the selected product id.
///
/// `select` is the only writer. The selected product is recomputed whenever
/// the product collection or the selection changes.
pub struct SelectionStore {
    selection: ReplayCache<ProductId>,
    selected: Derived<Option<Product>>,
}

impl SelectionStore {
    pub fn new(products: Subscription<Vec<Product>>, capacity: usize) -> Self {
        let selection = ReplayCache::seeded(ProductId::NONE, capacity);
        let selected = combine_latest(products, selection.subscribe(), capacity, |products, id| {
            let product = find_selected(products, *id);
            debug!(
                product_id = %id,
                found = product.is_some(),
                "selected product recomputed"
            );
            product
        });
        Self {
            selection,
            selected,
        }
    }

    /// Replaces the current selection and notifies subscribers before
    /// returning.
    pub fn select(&self, product_id: ProductId) {
        debug!(%product_id, "product selection changed");
        self.selection.next(product_id);
    }

    pub fn current(&self) -> ProductId {
        match self.selection.latest() {
            Some(StreamEvent::Next(id)) => id,
            _ => ProductId::NONE,
        }
    }

    pub fn selection(&self) -> Subscription<ProductId> {
        self.selection.subscribe()
    }

    pub fn selected(&self) -> Subscription<Option<Product>> {
        self.selected.subscribe()
    }
}

/// The product whose id equals `id`; `None` for the empty selection or when
/// nothing matches.
pub fn find_selected(products: &[Product], id: ProductId) -> Option<Product> {
    if id.is_none() {
        return None;
    }
    products.iter().find(|product| product.id == id).cloned()
}
