use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError,
};

use futures::future::{BoxFuture, FutureExt};
use shared::protocol::{Category, Product, Supplier};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::{
    error::FetchError,
    stream::{ReplayCache, Source, Subscription},
    transport::CatalogApi,
};

type Loader<T> = Box<dyn Fn() -> BoxFuture<'static, Result<Vec<T>, FetchError>> + Send + Sync>;

/// A named remote collection read at most once and replayed to every
/// subscriber.
///
/// The read starts on the first subscription. Success publishes the items;
/// failure publishes the normalized error, which ends the stream for this
/// resource. There is no retry.
pub struct RemoteCollection<T> {
    resource: &'static str,
    cache: ReplayCache<Vec<T>>,
    load: Loader<T>,
    started: AtomicBool,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<T: Clone + Send + 'static> RemoteCollection<T> {
    pub fn new<F>(resource: &'static str, capacity: usize, load: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, Result<Vec<T>, FetchError>> + Send + Sync + 'static,
    {
        Self {
            resource,
            cache: ReplayCache::with_capacity(capacity),
            load: Box::new(load),
            started: AtomicBool::new(false),
            task: Mutex::new(None),
        }
    }

    fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let resource = self.resource;
        let cache = self.cache.clone();
        let load = (self.load)();
        let task = tokio::spawn(async move {
            match load.await {
                Ok(items) => {
                    info!(resource, count = items.len(), "catalog collection loaded");
                    cache.next(items);
                }
                Err(error) => {
                    error!(resource, %error, "catalog collection fetch failed");
                    cache.fail(error);
                }
            }
        });
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(task);
    }
}

impl<T: Clone + Send + 'static> Source<Vec<T>> for RemoteCollection<T> {
    fn subscribe(&self) -> Subscription<Vec<T>> {
        let subscription = self.cache.subscribe();
        self.start();
        subscription
    }
}

impl<T> Drop for RemoteCollection<T> {
    fn drop(&mut self) {
        let task = self.task.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = task.take() {
            task.abort();
        }
    }
}

impl RemoteCollection<Product> {
    pub fn products(api: Arc<dyn CatalogApi>, capacity: usize) -> Self {
        Self::new("products", capacity, move || {
            let api = Arc::clone(&api);
            async move { api.list_products().await }.boxed()
        })
    }
}

impl RemoteCollection<Supplier> {
    pub fn suppliers(api: Arc<dyn CatalogApi>, capacity: usize) -> Self {
        Self::new("suppliers", capacity, move || {
            let api = Arc::clone(&api);
            async move { api.list_suppliers().await }.boxed()
        })
    }
}

impl RemoteCollection<Category> {
    pub fn categories(api: Arc<dyn CatalogApi>, capacity: usize) -> Self {
        Self::new("productCategories", capacity, move || {
            let api = Arc::clone(&api);
            async move { api.list_categories().await }.boxed()
        })
    }
}
