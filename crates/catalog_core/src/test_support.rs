use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use shared::{
    domain::{CategoryId, ProductId, SupplierId},
    protocol::{Category, Product, Supplier},
};
use tokio::{sync::watch, time::timeout};

use crate::{
    error::FetchError,
    stream::{StreamEvent, Subscription},
    transport::CatalogApi,
};

const EVENT_TIMEOUT: Duration = Duration::from_secs(2);

pub(crate) fn product(id: i64, price: Option<f64>, category_id: i64, supplier_ids: &[i64]) -> Product {
    Product {
        id: ProductId(id),
        product_name: format!("Product {id}"),
        product_code: format!("TST-{id:04}"),
        description: String::new(),
        price,
        category_id: Some(CategoryId(category_id)),
        category: None,
        supplier_ids: (!supplier_ids.is_empty())
            .then(|| supplier_ids.iter().copied().map(SupplierId).collect()),
        quantity_in_stock: 10,
        search_key: None,
    }
}

pub(crate) fn category(id: i64, name: &str) -> Category {
    Category {
        id: CategoryId(id),
        name: name.to_string(),
    }
}

pub(crate) fn supplier(id: i64) -> Supplier {
    Supplier {
        id: SupplierId(id),
        name: format!("Supplier {id}"),
        cost: Some(id as f64),
        min_quantity: Some(1),
    }
}

/// In-memory catalog backend with call recording and per-supplier gates that
/// hold a fetch open until the test releases it.
pub(crate) struct FakeCatalogApi {
    products: Result<Vec<Product>, FetchError>,
    categories: Vec<Category>,
    suppliers: Vec<Supplier>,
    supplier_failures: HashMap<SupplierId, FetchError>,
    gates: HashMap<SupplierId, watch::Sender<bool>>,
    product_calls: AtomicUsize,
    supplier_list_calls: AtomicUsize,
    supplier_calls: Mutex<Vec<SupplierId>>,
}

impl FakeCatalogApi {
    pub(crate) fn new(products: Vec<Product>) -> Self {
        Self {
            products: Ok(products),
            categories: Vec::new(),
            suppliers: Vec::new(),
            supplier_failures: HashMap::new(),
            gates: HashMap::new(),
            product_calls: AtomicUsize::new(0),
            supplier_list_calls: AtomicUsize::new(0),
            supplier_calls: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn failing_products(error: FetchError) -> Self {
        let mut api = Self::new(Vec::new());
        api.products = Err(error);
        api
    }

    pub(crate) fn with_categories(mut self, categories: Vec<Category>) -> Self {
        self.categories = categories;
        self
    }

    pub(crate) fn with_suppliers(mut self, suppliers: Vec<Supplier>) -> Self {
        self.suppliers = suppliers;
        self
    }

    pub(crate) fn with_supplier_failure(mut self, id: i64, error: FetchError) -> Self {
        self.supplier_failures.insert(SupplierId(id), error);
        self
    }

    pub(crate) fn with_gate(mut self, id: i64) -> Self {
        let (gate, _) = watch::channel(false);
        self.gates.insert(SupplierId(id), gate);
        self
    }

    pub(crate) fn open_gate(&self, id: i64) {
        if let Some(gate) = self.gates.get(&SupplierId(id)) {
            gate.send_replace(true);
        }
    }

    pub(crate) fn product_calls(&self) -> usize {
        self.product_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn supplier_list_calls(&self) -> usize {
        self.supplier_list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn supplier_calls(&self) -> Vec<SupplierId> {
        self.supplier_calls.lock().expect("supplier calls").clone()
    }
}

#[async_trait]
impl CatalogApi for FakeCatalogApi {
    async fn list_products(&self) -> Result<Vec<Product>, FetchError> {
        self.product_calls.fetch_add(1, Ordering::SeqCst);
        self.products.clone()
    }

    async fn list_categories(&self) -> Result<Vec<Category>, FetchError> {
        Ok(self.categories.clone())
    }

    async fn list_suppliers(&self) -> Result<Vec<Supplier>, FetchError> {
        self.supplier_list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.suppliers.clone())
    }

    async fn fetch_supplier(&self, supplier_id: SupplierId) -> Result<Supplier, FetchError> {
        self.supplier_calls
            .lock()
            .expect("supplier calls")
            .push(supplier_id);

        if let Some(gate) = self.gates.get(&supplier_id) {
            let mut open = gate.subscribe();
            let _ = open.wait_for(|open| *open).await;
        }
        if let Some(error) = self.supplier_failures.get(&supplier_id) {
            return Err(error.clone());
        }
        self.suppliers
            .iter()
            .find(|supplier| supplier.id == supplier_id)
            .cloned()
            .ok_or_else(|| FetchError::server(404, format!("supplier {supplier_id} not found")))
    }
}

pub(crate) async fn next_event<T: Clone>(subscription: &mut Subscription<T>) -> StreamEvent<T> {
    timeout(EVENT_TIMEOUT, subscription.next())
        .await
        .expect("stream event before timeout")
        .expect("stream still open")
}

pub(crate) async fn next_value<T: Clone + std::fmt::Debug>(subscription: &mut Subscription<T>) -> T {
    match next_event(subscription).await {
        StreamEvent::Next(value) => value,
        StreamEvent::Failed(error) => panic!("expected a value, stream failed with: {error}"),
    }
}

/// Asserts nothing further is published within a short quiet period.
pub(crate) async fn assert_quiet<T: Clone + std::fmt::Debug>(subscription: &mut Subscription<T>) {
    tokio::time::sleep(Duration::from_millis(50)).await;
    if let Some(event) = subscription.try_next() {
        panic!("unexpected stream event: {event:?}");
    }
}

pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(EVENT_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition before timeout");
}

pub(crate) fn ids(products: &[Product]) -> Vec<i64> {
    products.iter().map(|product| product.id.0).collect()
}
