//! Request bodies and response views exchanged with the HTTP layer

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::aggregates::{Address, Cart, Order, OrderLine, OrderStatus, Product, ProductUpdate};
use crate::domain::filters::{OrderFilters, SortColumn, SortDirection, DEFAULT_LIMIT, DEFAULT_PAGE, MAX_LIMIT};
use crate::domain::value_objects::Money;
use crate::{Result, ShopError};

/// Runs `validator` rules and folds failures into [`ShopError::InvalidInput`].
pub fn validated<T: Validate>(req: T) -> Result<T> {
    req.validate().map_err(|e| ShopError::InvalidInput(e.to_string()))?;
    Ok(req)
}

// -----------------------------------------------------------------------------
// Requests
// -----------------------------------------------------------------------------

#[derive(Debug, Deserialize)] pub struct AddToCartRequest { pub product_id: i64, pub quantity: i32 }
#[derive(Debug, Deserialize)] pub struct UpdateCartItemRequest { pub quantity: i32 }

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(range(min = 1, message = "address_id is required"))]
    pub address_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOrderStatusRequest {
    #[validate(length(min = 1, message = "status is required"))]
    pub status: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: Option<String>,
    pub price: Option<Decimal>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
}

/// Largest price a `NUMERIC(12, 2)` column holds.
pub const MAX_PRICE: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

impl TryFrom<UpdateProductRequest> for ProductUpdate {
    type Error = ShopError;
    fn try_from(r: UpdateProductRequest) -> Result<Self> {
        if let Some(price) = r.price {
            if price.is_sign_negative() {
                return Err(ShopError::InvalidInput("price cannot be negative".into()));
            }
            if price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero) > MAX_PRICE {
                return Err(ShopError::InvalidInput(format!("price cannot exceed {MAX_PRICE}")));
            }
        }
        let update = ProductUpdate { name: r.name, price: r.price.map(Money::new), stock: r.stock };
        if update.is_empty() { return Err(ShopError::InvalidInput("nothing to update".into())); }
        Ok(update)
    }
}

/// Raw query string of the order list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct OrderListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub status: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    pub user_id: Option<i64>,
}

impl TryFrom<OrderListParams> for OrderFilters {
    type Error = ShopError;
    fn try_from(p: OrderListParams) -> Result<Self> {
        let defaults = OrderFilters::default();
        let start_of = |d: NaiveDate| d.and_time(NaiveTime::MIN).and_utc();
        let created_before = match p.date_to {
            Some(d) => Some(start_of(d.checked_add_days(Days::new(1)).ok_or_else(|| ShopError::InvalidInput("date_to out of range".into()))?)),
            None => None,
        };
        Ok(OrderFilters {
            page: p.page.unwrap_or(DEFAULT_PAGE).max(1),
            limit: p.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT),
            user_id: p.user_id,
            status: p.status.as_deref().map(str::parse::<OrderStatus>).transpose()?,
            created_from: p.date_from.map(start_of),
            created_before,
            min_amount: p.min_amount.map(Money::new),
            max_amount: p.max_amount.map(Money::new),
            sort_by: p.sort_by.as_deref().map(str::parse::<SortColumn>).transpose()?.unwrap_or(defaults.sort_by),
            sort_direction: p.sort_order.as_deref().map(str::parse::<SortDirection>).transpose()?.unwrap_or(defaults.sort_direction),
        })
    }
}

// -----------------------------------------------------------------------------
// Views
// -----------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct CartItemView { pub product_id: i64, pub product_name: String, pub quantity: i32, pub price: String, pub subtotal: String }

#[derive(Debug, Serialize, Deserialize)]
pub struct CartView { pub id: i64, pub items: Vec<CartItemView>, pub total_price: String, pub total_items: i64 }

impl From<&Cart> for CartView {
    fn from(cart: &Cart) -> Self {
        let items = cart.lines().iter().map(|l| CartItemView {
            product_id: l.product.id,
            product_name: l.product.name.clone(),
            quantity: l.quantity.value(),
            price: l.product.price.to_fixed(),
            subtotal: l.subtotal().to_fixed(),
        }).collect();
        Self { id: cart.id(), items, total_price: cart.total().to_fixed(), total_items: cart.item_count() }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddressView {
    pub id: i64, pub uuid: String, pub address: String, pub city: Option<String>,
    pub postal_code: Option<String>, pub country: Option<String>, pub created_at: DateTime<Utc>,
}

impl From<&Address> for AddressView {
    fn from(a: &Address) -> Self {
        Self {
            id: a.id, uuid: a.uuid.to_string(), address: a.address.clone(), city: a.city.clone(),
            postal_code: a.postal_code.clone(), country: a.country.clone(), created_at: a.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderItemView { pub product_id: i64, pub product_name: String, pub price_at_order: String, pub quantity: i32, pub subtotal: String }

impl From<&OrderLine> for OrderItemView {
    fn from(l: &OrderLine) -> Self {
        Self {
            product_id: l.product_id, product_name: l.product_name.clone(), price_at_order: l.price_at_order.to_fixed(),
            quantity: l.quantity.value(), subtotal: l.subtotal().to_fixed(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderView {
    pub id: i64,
    pub uuid: String,
    pub user_id: i64,
    pub address_id: Option<i64>,
    pub total_price: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<AddressView>,
}

impl From<&Order> for OrderView {
    fn from(o: &Order) -> Self {
        Self {
            id: o.id, uuid: o.uuid.to_string(), user_id: o.user_id, address_id: o.address_id,
            total_price: o.total_price.to_fixed(), status: o.status.to_string(),
            created_at: o.created_at, updated_at: o.updated_at,
            items: o.lines.iter().map(OrderItemView::from).collect(),
            address: o.address.as_ref().map(AddressView::from),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OrderListView { pub orders: Vec<OrderView>, pub total_count: i64, pub total_amount: String, pub page: u32, pub limit: u32 }

impl OrderListView {
    pub fn assemble(orders: &[Order], total_count: i64, filters: &OrderFilters) -> Self {
        let total_amount: Money = orders.iter().map(|o| o.total_price).sum();
        Self {
            orders: orders.iter().map(OrderView::from).collect(),
            total_count,
            total_amount: total_amount.to_fixed(),
            page: filters.page,
            limit: filters.limit,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProductView { pub id: i64, pub uuid: String, pub name: String, pub description: Option<String>, pub price: String, pub stock: i32 }

impl From<&Product> for ProductView {
    fn from(p: &Product) -> Self {
        Self { id: p.id, uuid: p.uuid.to_string(), name: p.name.clone(), description: p.description.clone(), price: p.price.to_fixed(), stock: p.stock }
    }
}
