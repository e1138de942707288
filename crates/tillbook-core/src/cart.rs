//! # Cart
//!
//! The POS cart and its checkout state machine.
//!
//! ## States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Lifecycle                                       │
//! │                                                                         │
//! │              add                    begin_checkout                      │
//! │  ┌───────┐ ───────► ┌───────────┐ ───────────────► ┌─────────────┐     │
//! │  │ Empty │          │ Populated │                  │ CheckingOut │     │
//! │  └───────┘ ◄─────── └───────────┘ ◄─────────────── └─────────────┘     │
//! │      ▲   last line      │  ▲      finish_checkout(Failed)   │           │
//! │      │   removed        │  │      (cart restored)           │           │
//! │      │                  └──┘ add / decrement / set qty      │           │
//! │      │                                                      │           │
//! │      └──────────────────────────────────────────────────────┘           │
//! │                    finish_checkout(Committed): cart cleared             │
//! │                                                                         │
//! │  While CheckingOut every mutation is rejected, and so is a second      │
//! │  checkout, so one cart can never produce two sales.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Invariants
//! - Lines are unique by `product_id` (adding again increments quantity)
//! - No line ever has quantity <= 0; reaching zero removes the line
//! - At most [`MAX_CART_ITEMS`] lines, at most [`MAX_ITEM_QUANTITY`] per line
//! - `total = Σ unit_price × quantity`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::Product;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

/// Where the cart is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub enum CartPhase {
    Empty,
    Populated,
    CheckingOut,
}

/// How a checkout attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutResult {
    /// Sale, invoice and stock changes are committed. The cart empties.
    Committed,
    /// Nothing was written. The cart keeps its lines.
    Failed,
}

/// A line in the cart.
///
/// Name and price are frozen when the product is first added, so the cart
/// keeps showing what the cashier rang up even if the catalog changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartItem {
    pub product_id: String,

    /// Product name at time of adding (frozen)
    pub name: String,

    /// Price in minor units at time of adding (frozen)
    pub unit_price_cents: i64,

    pub quantity: i64,

    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    /// Snapshots a product into a new cart line.
    pub fn from_product(product: &Product, quantity: i64) -> Self {
        CartItem {
            product_id: product.id.clone(),
            name: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity,
            added_at: Utc::now(),
        }
    }

    pub fn line_total(&self) -> Money {
        Money::from_cents(self.unit_price_cents).multiply_quantity(self.quantity)
    }
}

/// The POS cart of one signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    items: Vec<CartItem>,
    checking_out: bool,
    created_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self {
        Cart::new()
    }
}

impl Cart {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        Cart {
            items: Vec::new(),
            checking_out: false,
            created_at: Utc::now(),
        }
    }

    pub fn phase(&self) -> CartPhase {
        if self.checking_out {
            CartPhase::CheckingOut
        } else if self.items.is_empty() {
            CartPhase::Empty
        } else {
            CartPhase::Populated
        }
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    fn ensure_idle(&self) -> CoreResult<()> {
        if self.checking_out {
            return Err(CoreError::CheckoutInProgress);
        }
        Ok(())
    }

    /// Adds one unit of a product (the POS "tap a product" action).
    pub fn add_product(&mut self, product: &Product) -> CoreResult<()> {
        self.add_item(product, 1)
    }

    /// Adds `quantity` units, merging with an existing line.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        self.ensure_idle()?;
        crate::validation::validate_quantity(quantity)?;

        if let Some(item) = self.items.iter_mut().find(|i| i.product_id == product.id) {
            let new_qty = item.quantity + quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            item.quantity = new_qty;
            return Ok(());
        }

        if self.items.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge { max: MAX_CART_ITEMS });
        }

        self.items.push(CartItem::from_product(product, quantity));
        Ok(())
    }

    /// Removes one unit; the line disappears when its last unit goes.
    pub fn decrement(&mut self, product_id: &str) -> CoreResult<()> {
        self.ensure_idle()?;
        let idx = self.position(product_id)?;
        if self.items[idx].quantity <= 1 {
            self.items.remove(idx);
        } else {
            self.items[idx].quantity -= 1;
        }
        Ok(())
    }

    /// Sets a line's quantity. Zero or less removes the line.
    pub fn set_quantity(&mut self, product_id: &str, quantity: i64) -> CoreResult<()> {
        self.ensure_idle()?;
        if quantity <= 0 {
            return self.remove_item(product_id);
        }

        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }

        let idx = self.position(product_id)?;
        self.items[idx].quantity = quantity;
        Ok(())
    }

    /// Removes a line by product ID.
    pub fn remove_item(&mut self, product_id: &str) -> CoreResult<()> {
        self.ensure_idle()?;
        let idx = self.position(product_id)?;
        self.items.remove(idx);
        Ok(())
    }

    /// Discards every line.
    pub fn clear(&mut self) -> CoreResult<()> {
        self.ensure_idle()?;
        self.reset();
        Ok(())
    }

    /// Enters `CheckingOut` and returns the lines to be committed.
    pub fn begin_checkout(&mut self) -> CoreResult<Vec<CartItem>> {
        if self.checking_out {
            return Err(CoreError::CheckoutInProgress);
        }
        if self.items.is_empty() {
            return Err(CoreError::CartEmpty);
        }
        self.checking_out = true;
        Ok(self.items.clone())
    }

    /// Leaves `CheckingOut`.
    pub fn finish_checkout(&mut self, result: CheckoutResult) {
        self.checking_out = false;
        if result == CheckoutResult::Committed {
            self.reset();
        }
    }

    fn reset(&mut self) {
        self.items.clear();
        self.created_at = Utc::now();
    }

    fn position(&self, product_id: &str) -> CoreResult<usize> {
        self.items
            .iter()
            .position(|i| i.product_id == product_id)
            .ok_or_else(|| CoreError::NotInCart(product_id.to_string()))
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Units across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }

    pub fn total(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Cart totals summary for API responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub total_cents: i64,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            item_count: cart.item_count(),
            total_quantity: cart.total_quantity(),
            total_cents: cart.total().cents(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProductCategory;

    fn product(id: &str, price_cents: i64) -> Product {
        Product {
            id: id.to_string(),
            user_id: "u1".to_string(),
            name: format!("Product {}", id),
            category: ProductCategory::General,
            price_cents,
            stock: 20,
            low_stock_threshold: 10,
            description: None,
            barcode: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_increments_existing_line() {
        let mut cart = Cart::new();
        let a = product("A", 5000);

        cart.add_product(&a).unwrap();
        cart.add_product(&a).unwrap();

        assert_eq!(cart.item_count(), 1);
        assert_eq!(cart.total_quantity(), 2);
        assert_eq!(cart.phase(), CartPhase::Populated);
    }

    #[test]
    fn test_total_is_sum_of_lines() {
        let mut cart = Cart::new();
        let a = product("A", 5000);
        let b = product("B", 3000);

        cart.add_item(&a, 2).unwrap();
        cart.add_product(&b).unwrap();

        assert_eq!(cart.total().cents(), 13000);
        assert_eq!(CartTotals::from(&cart).total_cents, 13000);
    }

    #[test]
    fn test_decrement_last_unit_removes_line() {
        let mut cart = Cart::new();
        let a = product("A", 100);
        cart.add_item(&a, 2).unwrap();

        cart.decrement("A").unwrap();
        assert_eq!(cart.items()[0].quantity, 1);

        cart.decrement("A").unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.phase(), CartPhase::Empty);
    }

    #[test]
    fn test_set_quantity_zero_or_less_removes() {
        let mut cart = Cart::new();
        cart.add_product(&product("A", 100)).unwrap();
        cart.add_product(&product("B", 100)).unwrap();

        cart.set_quantity("A", 0).unwrap();
        cart.set_quantity("B", -3).unwrap();
        assert!(cart.is_empty());
        assert!(cart.items().iter().all(|i| i.quantity > 0));
    }

    #[test]
    fn test_limits() {
        let mut cart = Cart::new();
        let a = product("A", 100);
        cart.add_item(&a, MAX_ITEM_QUANTITY).unwrap();
        assert!(matches!(
            cart.add_product(&a),
            Err(CoreError::QuantityTooLarge { .. })
        ));
        assert!(matches!(
            cart.set_quantity("A", MAX_ITEM_QUANTITY + 1),
            Err(CoreError::QuantityTooLarge { .. })
        ));
        assert!(matches!(cart.decrement("missing"), Err(CoreError::NotInCart(_))));
    }

    #[test]
    fn test_checkout_rejected_when_empty() {
        let mut cart = Cart::new();
        assert_eq!(cart.begin_checkout(), Err(CoreError::CartEmpty));
    }

    #[test]
    fn test_checkout_blocks_mutation_and_second_checkout() {
        let mut cart = Cart::new();
        let a = product("A", 100);
        cart.add_product(&a).unwrap();

        let lines = cart.begin_checkout().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(cart.phase(), CartPhase::CheckingOut);

        assert_eq!(cart.begin_checkout(), Err(CoreError::CheckoutInProgress));
        assert_eq!(cart.add_product(&a), Err(CoreError::CheckoutInProgress));
        assert_eq!(cart.clear(), Err(CoreError::CheckoutInProgress));
    }

    #[test]
    fn test_failed_checkout_restores_cart() {
        let mut cart = Cart::new();
        cart.add_item(&product("A", 100), 3).unwrap();

        cart.begin_checkout().unwrap();
        cart.finish_checkout(CheckoutResult::Failed);

        assert_eq!(cart.phase(), CartPhase::Populated);
        assert_eq!(cart.total_quantity(), 3);
    }

    #[test]
    fn test_committed_checkout_empties_cart() {
        let mut cart = Cart::new();
        cart.add_product(&product("A", 100)).unwrap();

        cart.begin_checkout().unwrap();
        cart.finish_checkout(CheckoutResult::Committed);

        assert_eq!(cart.phase(), CartPhase::Empty);
    }
}
