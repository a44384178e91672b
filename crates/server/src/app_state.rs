use std::sync::Arc;

use crate::catalog::CatalogData;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) catalog: Arc<CatalogData>,
    /// Answer `/products` with a 500 so clients can exercise their error path.
    pub(crate) fail_products: bool,
}
