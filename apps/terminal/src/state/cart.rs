//! # Cart State
//!
//! The sale in progress, fed by scan outcomes.
//!
//! ## Scan → Cart
//! ```text
//! ScanOutcome::Found { product, source }
//!         │
//!         ▼
//! Cart::add_scanned(product)
//!   ├── already a line?  → quantity + 1 (if stock allows)
//!   └── new product?     → push line   (if stock and cart size allow)
//! ```
//!
//! Stock is only enforced for products that track it (`stock: Some(_)`).

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_core::{ScanSource, ScannableProduct};
use uuid::Uuid;

use crate::error::CartError;

/// Maximum quantity of a single line.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum number of distinct lines in one cart.
pub const MAX_CART_ITEMS: usize = 100;

// =============================================================================
// Cart Item
// =============================================================================

/// One line in the cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub product_id: String,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,

    /// Stock level when the line was last touched, `None` if untracked.
    pub stock: Option<i64>,

    /// How the most recent unit was added.
    pub last_source: ScanSource,

    pub added_at: DateTime<Utc>,
}

impl CartItem {
    pub fn from_product(product: &ScannableProduct, quantity: i64, source: ScanSource) -> Self {
        CartItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity,
            stock: product.stock,
            last_source: source,
            added_at: Utc::now(),
        }
    }

    pub fn line_total_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }
}

// =============================================================================
// Cart
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub id: Uuid,
    pub items: Vec<CartItem>,

    /// When the cart was opened.
    pub created_at: DateTime<Utc>,
}

impl Cart {
    pub fn new() -> Self {
        Cart {
            id: Uuid::new_v4(),
            items: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Adds one unit of a scanned product, merging into an existing line.
    ///
    /// The product snapshot refreshes the line's price and stock so a catalog
    /// update between scans is honored. Returns the line's new quantity.
    pub fn add_scanned(&mut self, product: &ScannableProduct, source: ScanSource) -> Result<i64, CartError> {
        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            let new_qty = item.quantity + 1;
            check_quantity(product, new_qty)?;
            item.quantity = new_qty;
            item.unit_price_cents = product.price_cents;
            item.stock = product.stock;
            item.last_source = source;
            return Ok(new_qty);
        }

        if self.items.len() >= MAX_CART_ITEMS {
            return Err(CartError::CartFull { max: MAX_CART_ITEMS });
        }
        check_quantity(product, 1)?;

        self.items.push(CartItem::from_product(product, 1, source));
        Ok(1)
    }

    pub fn quantity_of(&self, product_id: &str) -> i64 {
        self.items
            .iter()
            .find(|i| i.product_id == product_id)
            .map_or(0, |i| i.quantity)
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn subtotal_cents(&self) -> i64 {
        self.items.iter().map(|i| i.line_total_cents()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

fn check_quantity(product: &ScannableProduct, quantity: i64) -> Result<(), CartError> {
    if quantity > MAX_ITEM_QUANTITY {
        return Err(CartError::QuantityLimit { max: MAX_ITEM_QUANTITY });
    }
    if !product.can_sell(quantity) {
        return Err(CartError::InsufficientStock {
            name: product.name.clone(),
            available: product.stock.unwrap_or(0),
        });
    }
    Ok(())
}

/// Cart totals summary for the console and the headless log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub subtotal_cents: i64,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            item_count: cart.item_count(),
            total_quantity: cart.total_quantity(),
            subtotal_cents: cart.subtotal_cents(),
        }
    }
}

// =============================================================================
// Shared Cart State
// =============================================================================

/// Cart shared between the outcome consumer task and the screen.
///
/// Operations are short and mostly writes, so a plain `Mutex` is enough.
#[derive(Debug, Clone, Default)]
pub struct CartState {
    cart: Arc<Mutex<Cart>>,
}

impl CartState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `f` with read access to the cart.
    ///
    /// ```rust,ignore
    /// let totals = cart_state.with_cart(|cart| CartTotals::from(cart));
    /// ```
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        let cart = self.cart.lock().unwrap_or_else(PoisonError::into_inner);
        f(&cart)
    }

    /// Runs `f` with write access to the cart.
    pub fn with_cart_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Cart) -> R,
    {
        let mut cart = self.cart.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut cart)
    }

    pub fn totals(&self) -> CartTotals {
        self.with_cart(|cart| CartTotals::from(cart))
    }
}
