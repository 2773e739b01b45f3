//! Cart Manager

use tracing::{debug, info};

use crate::domain::aggregates::{Cart, Product};
use crate::domain::value_objects::Quantity;
use crate::store::{CartRepository, Directory, Store, UnitOfWork};
use crate::{Result, ShopError};

#[derive(Clone, Debug)]
pub struct CartService<S> {
    store: S,
}

/// Resolves the product and checks the requested quantity against its stock.
async fn stocked_product<T: Directory>(tx: &mut T, product_id: i64, quantity: Quantity) -> Result<Product> {
    let product = tx.find_product(product_id).await?.ok_or(ShopError::ProductNotFound)?;
    if !product.has_stock_for(quantity) {
        return Err(ShopError::InsufficientStock);
    }
    Ok(product)
}

impl<S: Store> CartService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns the user's cart, creating an empty one on first access.
    #[tracing::instrument(skip(self))]
    pub async fn get_cart(&self, user_id: i64) -> Result<Cart> {
        let mut tx = self.store.begin().await?;
        let cart = match tx.find_cart(user_id).await? {
            Some(cart) => cart,
            None => {
                debug!(user_id, "creating empty cart");
                tx.create_cart(user_id).await?
            }
        };
        tx.commit().await?;
        Ok(cart)
    }

    #[tracing::instrument(skip(self))]
    pub async fn add_item(&self, user_id: i64, product_id: i64, quantity: i32) -> Result<Cart> {
        let quantity = Quantity::new(quantity)?;
        let mut tx = self.store.begin().await?;
        stocked_product(&mut tx, product_id, quantity).await?;

        let cart_id = match tx.find_cart_id(user_id).await? {
            Some(id) => id,
            None => tx.create_cart(user_id).await?.id(),
        };
        tx.upsert_cart_line(cart_id, product_id, quantity).await?;
        let cart = tx.find_cart(user_id).await?.ok_or(ShopError::CartNotFound)?;
        tx.commit().await?;

        info!(user_id, product_id, quantity = quantity.value(), "added item to cart");
        Ok(cart)
    }

    /// Replaces the quantity of an existing line.
    #[tracing::instrument(skip(self))]
    pub async fn update_item(&self, user_id: i64, product_id: i64, quantity: i32) -> Result<Cart> {
        let quantity = Quantity::new(quantity)?;
        let mut tx = self.store.begin().await?;
        stocked_product(&mut tx, product_id, quantity).await?;

        let cart_id = tx.find_cart_id(user_id).await?.ok_or(ShopError::CartNotFound)?;
        if !tx.set_cart_line_quantity(cart_id, product_id, quantity).await? {
            return Err(ShopError::CartItemNotFound);
        }
        let cart = tx.find_cart(user_id).await?.ok_or(ShopError::CartNotFound)?;
        tx.commit().await?;

        info!(user_id, product_id, quantity = quantity.value(), "updated cart item");
        Ok(cart)
    }

    /// Removing a line that is not in the cart is a no-op.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, user_id: i64, product_id: i64) -> Result<Cart> {
        let mut tx = self.store.begin().await?;
        let cart_id = tx.find_cart_id(user_id).await?.ok_or(ShopError::CartNotFound)?;
        let removed = tx.delete_cart_line(cart_id, product_id).await?;
        let cart = tx.find_cart(user_id).await?.ok_or(ShopError::CartNotFound)?;
        tx.commit().await?;

        debug!(user_id, product_id, removed, "removed cart item");
        Ok(cart)
    }

    #[tracing::instrument(skip(self))]
    pub async fn clear_cart(&self, user_id: i64) -> Result<()> {
        let mut tx = self.store.begin().await?;
        let cart_id = tx.find_cart_id(user_id).await?.ok_or(ShopError::CartNotFound)?;
        let removed = tx.clear_cart(cart_id).await?;
        tx.commit().await?;

        info!(user_id, removed, "cleared cart");
        Ok(())
    }
}
