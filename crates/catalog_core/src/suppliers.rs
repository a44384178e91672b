use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use shared::{
    domain::ProductId,
    protocol::{Product, Supplier},
};
use tracing::{debug, warn};

use crate::{
    error::FetchError,
    stream::{Derived, ReplayCache, Source, StreamEvent, Subscription},
    transport::CatalogApi,
};

type Resolution = BoxFuture<'static, (ProductId, Result<Vec<Supplier>, FetchError>)>;

/// Suppliers of the currently selected product, fetched just in time.
///
/// Each selected product starts a fan-out of one request per supplier id and
/// publishes once all of them complete. A newer selection drops the pending
/// resolution, so only the latest selection's suppliers are ever published.
/// A failed resolution is published as a failure for that selection only;
/// the next selection resolves normally.
pub struct SupplierResolver {
    suppliers: Derived<Vec<Supplier>>,
}

impl SupplierResolver {
    pub fn spawn(
        api: Arc<dyn CatalogApi>,
        selected: Subscription<Option<Product>>,
        capacity: usize,
    ) -> Self {
        let suppliers =
            Derived::spawn(capacity, move |output| run_resolver(api, selected, output));
        Self { suppliers }
    }

    pub fn suppliers(&self) -> Subscription<Vec<Supplier>> {
        self.suppliers.subscribe()
    }
}

async fn run_resolver(
    api: Arc<dyn CatalogApi>,
    mut selected: Subscription<Option<Product>>,
    output: ReplayCache<Vec<Supplier>>,
) {
    let mut in_flight: Option<Resolution> = None;

    loop {
        tokio::select! {
            event = selected.next() => match event {
                Some(StreamEvent::Next(Some(product))) => {
                    if in_flight.is_some() {
                        debug!(product_id = %product.id, "superseding pending supplier resolution");
                    }
                    in_flight = Some(resolve(&api, &product));
                }
                Some(StreamEvent::Next(None)) => {}
                Some(StreamEvent::Failed(error)) => {
                    output.fail(error);
                    break;
                }
                None => {
                    if let Some(pending) = in_flight.take() {
                        publish(&output, pending.await);
                    }
                    break;
                }
            },
            resolved = wait_in_flight(&mut in_flight) => {
                in_flight = None;
                publish(&output, resolved);
            }
        }
    }
}

async fn wait_in_flight(in_flight: &mut Option<Resolution>) -> (ProductId, Result<Vec<Supplier>, FetchError>) {
    match in_flight {
        Some(resolution) => resolution.await,
        None => future::pending().await,
    }
}

fn publish(
    output: &ReplayCache<Vec<Supplier>>,
    (product_id, result): (ProductId, Result<Vec<Supplier>, FetchError>),
) {
    match result {
        Ok(suppliers) => {
            debug!(%product_id, count = suppliers.len(), "product suppliers resolved");
            output.next(suppliers);
        }
        Err(error) => {
            warn!(%product_id, %error, "product supplier resolution failed");
            output.fail(error);
        }
    }
}

/// One request per supplier id, all in flight together; resolves to the
/// suppliers in id-list order or the first failure. No request is made for a
/// product without supplier ids.
fn resolve(api: &Arc<dyn CatalogApi>, product: &Product) -> Resolution {
    let product_id = product.id;
    let supplier_ids = product.supplier_ids().to_vec();
    if supplier_ids.is_empty() {
        return future::ready((product_id, Ok(Vec::new()))).boxed();
    }

    let api = Arc::clone(api);
    async move {
        let fetches = supplier_ids.iter().map(|id| api.fetch_supplier(*id));
        (product_id, future::try_join_all(fetches).await)
    }
    .boxed()
}
