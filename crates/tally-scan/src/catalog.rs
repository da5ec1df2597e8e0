//! # Catalog Feed
//!
//! Owner-side publisher of the active [`CatalogIndex`].
//!
//! The component that renders the product list owns the feed. Every time the
//! product collection changes it calls [`CatalogFeed::replace_products`],
//! which rebuilds the index from scratch and publishes it. Readers (the
//! dispatcher) hold a `watch::Receiver` and always see the latest index.

use std::sync::Arc;

use tally_core::{CatalogIndex, ScannableProduct};
use tokio::sync::watch;
use tracing::{info, warn};

/// Publishes rebuilt catalog indexes to the dispatcher.
#[derive(Debug)]
pub struct CatalogFeed {
    tx: watch::Sender<Arc<CatalogIndex>>,
}

impl CatalogFeed {
    /// Creates a feed holding an empty index.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Arc::new(CatalogIndex::default()));
        CatalogFeed { tx }
    }

    /// Creates a feed already indexing `products`.
    pub fn with_products(products: &[ScannableProduct]) -> Self {
        let feed = CatalogFeed::new();
        feed.replace_products(products);
        feed
    }

    /// Rebuilds the index from `products` and publishes it.
    pub fn replace_products(&self, products: &[ScannableProduct]) {
        let index = CatalogIndex::build(products);

        if index.collisions() > 0 {
            warn!(
                collisions = index.collisions(),
                "Duplicate scan codes in product list, last product wins"
            );
        }
        info!(
            products = products.len(),
            codes = index.len(),
            "Catalog index rebuilt"
        );

        self.tx.send_replace(Arc::new(index));
    }

    /// Returns a receiver that always observes the latest index.
    pub fn subscribe(&self) -> watch::Receiver<Arc<CatalogIndex>> {
        self.tx.subscribe()
    }

    /// Returns the index currently published.
    pub fn current(&self) -> Arc<CatalogIndex> {
        Arc::clone(&self.tx.borrow())
    }
}

impl Default for CatalogFeed {
    fn default() -> Self {
        CatalogFeed::new()
    }
}
