//! In-memory POS carts, one per signed-in user.
//!
//! A cart is created on first use and dropped when it is discarded or a
//! checkout commits. Carts do not survive a restart.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use tillbook_core::cart::{CartTotals, CheckoutResult};
use tillbook_core::{Cart, CartItem, CartPhase, CoreError, CoreResult};

/// What the POS screen renders.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub phase: CartPhase,
    pub items: Vec<CartItem>,
    pub totals: CartTotals,
}

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        CartView {
            phase: cart.phase(),
            items: cart.items().to_vec(),
            totals: CartTotals::from(cart),
        }
    }
}

#[derive(Debug, Default)]
pub struct CartStore {
    carts: Mutex<HashMap<String, Cart>>,
}

impl CartStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn view(&self, user_id: &str) -> CartView {
        let carts = self.carts.lock().await;
        match carts.get(user_id) {
            Some(cart) => CartView::from(cart),
            None => CartView::from(&Cart::new()),
        }
    }

    /// Applies one cart mutation. A failed mutation leaves the cart as it was.
    pub async fn update<F>(&self, user_id: &str, mutate: F) -> CoreResult<CartView>
    where
        F: FnOnce(&mut Cart) -> CoreResult<()>,
    {
        let mut carts = self.carts.lock().await;
        let cart = carts.entry(user_id.to_string()).or_default();

        let mut next = cart.clone();
        mutate(&mut next)?;
        *cart = next;

        Ok(CartView::from(&*cart))
    }

    /// Drops the cart (the cashier navigated away). Refused mid-checkout.
    pub async fn discard(&self, user_id: &str) -> CoreResult<()> {
        let mut carts = self.carts.lock().await;
        if let Some(cart) = carts.get(user_id) {
            if cart.phase() == CartPhase::CheckingOut {
                return Err(CoreError::CheckoutInProgress);
            }
            carts.remove(user_id);
            debug!(user_id, "Cart discarded");
        }
        Ok(())
    }

    /// Moves the cart into `CheckingOut` and returns its lines.
    pub async fn begin_checkout(&self, user_id: &str) -> CoreResult<Vec<CartItem>> {
        let mut carts = self.carts.lock().await;
        let cart = carts.get_mut(user_id).ok_or(CoreError::CartEmpty)?;
        cart.begin_checkout()
    }

    /// Ends a checkout: a committed one empties the cart, a failed one puts
    /// it back to `Populated`.
    pub async fn finish_checkout(&self, user_id: &str, result: CheckoutResult) {
        let mut carts = self.carts.lock().await;
        if let Some(cart) = carts.get_mut(user_id) {
            cart.finish_checkout(result);
            if cart.is_empty() {
                carts.remove(user_id);
            }
        }
    }
}
