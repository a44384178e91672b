//! Category source and the product/category join.

use shared::protocol::{Category, Product};
use tracing::debug;

use crate::{
    error::FetchError,
    stream::{combine_latest, Derived, ReplayCache, Source, Subscription},
};

/// Markup applied to every base price when products are joined.
pub const PRICE_MARKUP: f64 = 1.5;

/// Provider of the category collection the joiner combines with products.
pub trait CategorySource: Source<Vec<Category>> + Send + Sync {}

impl<S> CategorySource for S where S: Source<Vec<Category>> + Send + Sync {}

/// In-process category collection that callers publish into directly.
#[derive(Clone, Default)]
pub struct CategoryFeed {
    cache: ReplayCache<Vec<Category>>,
}

impl CategoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_categories(categories: Vec<Category>) -> Self {
        let feed = Self::new();
        feed.publish(categories);
        feed
    }

    pub fn publish(&self, categories: Vec<Category>) {
        self.cache.next(categories);
    }

    pub fn fail(&self, error: FetchError) {
        self.cache.fail(error);
    }
}

impl Source<Vec<Category>> for CategoryFeed {
    fn subscribe(&self) -> Subscription<Vec<Category>> {
        self.cache.subscribe()
    }
}

/// `base * 1.5`, or `0` when the base price is missing, zero or NaN.
pub fn adjusted_price(base: Option<f64>) -> f64 {
    match base {
        Some(price) if price != 0.0 && !price.is_nan() => price * PRICE_MARKUP,
        _ => 0.0,
    }
}

/// Resolves each product's category name and adjusted price.
///
/// The category name is the first category whose id matches the product's
/// category id, and is cleared when nothing matches.
pub fn join_categories(products: &[Product], categories: &[Category]) -> Vec<Product> {
    products
        .iter()
        .map(|product| Product {
            price: Some(adjusted_price(product.price)),
            category: product
                .category_id
                .and_then(|id| categories.iter().find(|category| category.id == id))
                .map(|category| category.name.clone()),
            search_key: Some(vec![product.product_name.clone()]),
            ..product.clone()
        })
        .collect()
}

/// Combine-latest of products and categories through [`join_categories`].
pub fn join_with_categories(
    products: Subscription<Vec<Product>>,
    categories: Subscription<Vec<Category>>,
    capacity: usize,
) -> Derived<Vec<Product>> {
    combine_latest(products, categories, capacity, |products, categories| {
        let joined = join_categories(products, categories);
        debug!(
            products = joined.len(),
            categories = categories.len(),
            "joined products with categories"
        );
        joined
    })
}
