use shared::{
    domain::{CategoryId, ProductId},
    protocol::Product,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::stream::{Derived, PublishClock, ReplayCache, Source, StreamEvent, Subscription};

/// Product appended by `add_product` when the caller supplies none.
pub fn placeholder_product() -> Product {
    Product {
        id: ProductId(42),
        product_name: "Another One".to_string(),
        product_code: "TBX-0042".to_string(),
        description: "Our new product".to_string(),
        price: Some(8.9),
        category_id: Some(CategoryId(3)),
        category: Some("Toolbox".to_string()),
        supplier_ids: None,
        quantity_in_stock: 30,
        search_key: None,
    }
}

/// Running product list: each full snapshot from the source replaces the
/// list wholesale, each locally added product is appended to it.
///
/// Products added before a snapshot was published are discarded when that
/// snapshot arrives; products added after it survive it. Every addition is
/// stamped with the source's publish count at call time, so this holds no
/// matter in which order the merging task drains its two inputs.
pub struct ProductMerger {
    additions: mpsc::UnboundedSender<Addition>,
    source_clock: PublishClock<Vec<Product>>,
    merged: Derived<Vec<Product>>,
}

struct Addition {
    /// Source publish count when the product was added.
    stamp: u64,
    product: Product,
}

impl ProductMerger {
    pub fn spawn(source: &Derived<Vec<Product>>, capacity: usize) -> Self {
        let (additions, added) = mpsc::unbounded_channel();
        let snapshots = source.subscribe();
        let merged = Derived::spawn(capacity, move |output| run_merger(snapshots, added, output));
        Self {
            additions,
            source_clock: source.clock(),
            merged,
        }
    }

    pub fn add_product(&self, product: Option<Product>) {
        let product = product.unwrap_or_else(placeholder_product);
        info!(product_id = %product.id, name = %product.product_name, "adding local product");
        let addition = Addition {
            stamp: self.source_clock.now(),
            product,
        };
        if self.additions.send(addition).is_err() {
            warn!("merged product list is no longer running; local product dropped");
        }
    }

    pub fn merged(&self) -> Subscription<Vec<Product>> {
        self.merged.subscribe()
    }
}

async fn run_merger(
    mut source: Subscription<Vec<Product>>,
    mut added: mpsc::UnboundedReceiver<Addition>,
    output: ReplayCache<Vec<Product>>,
) {
    let mut products: Vec<Product> = Vec::new();
    // Stamp of the last source event applied to `products`.
    let mut applied = 0;
    // Additions made after a source event this task has not received yet.
    let mut pending: Vec<Addition> = Vec::new();
    let mut source_open = true;

    loop {
        tokio::select! {
            event = source.next_stamped(), if source_open => match event {
                Some((stamp, StreamEvent::Next(snapshot))) => {
                    applied = stamp;
                    let before = pending.len();
                    pending.retain(|addition| addition.stamp >= stamp);
                    debug!(
                        count = snapshot.len(),
                        discarded = before - pending.len(),
                        "source snapshot replaced merged products"
                    );
                    products = snapshot;
                    // Additions stamped past this snapshot wait for a later one.
                    let ready = pending
                        .iter()
                        .take_while(|addition| addition.stamp == stamp)
                        .count();
                    products.extend(pending.drain(..ready).map(|addition| addition.product));
                }
                Some((_, StreamEvent::Failed(error))) => {
                    // No snapshot can follow a failed source; local additions
                    // keep appending to the current list.
                    source_open = false;
                    output.fail(error);
                    if pending.is_empty() {
                        continue;
                    }
                    products.extend(pending.drain(..).map(|addition| addition.product));
                }
                None => {
                    source_open = false;
                    if pending.is_empty() {
                        continue;
                    }
                    products.extend(pending.drain(..).map(|addition| addition.product));
                }
            },
            addition = added.recv() => match addition {
                Some(addition) if !source_open || addition.stamp == applied => {
                    products.push(addition.product);
                }
                Some(addition) if addition.stamp > applied => {
                    pending.push(addition);
                    continue;
                }
                Some(addition) => {
                    debug!(
                        product_id = %addition.product.id,
                        "local product predates the current snapshot; dropped"
                    );
                    continue;
                }
                None => break,
            },
        }

        output.next(products.clone());
    }
}
