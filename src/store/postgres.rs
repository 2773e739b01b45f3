//! PostgreSQL adapter. One unit of work is one `sqlx` transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::error::ErrorKind as DbErrorKind;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use std::collections::HashMap;
use uuid::Uuid;

use crate::catalog::ProductAccessor;
use crate::domain::aggregates::{Address, Cart, CartLine, NewOrder, Order, OrderLine, OrderStatus, Product, ProductUpdate, User};
use crate::domain::filters::OrderFilters;
use crate::domain::value_objects::{Money, Quantity};
use crate::store::{CartRepository, Directory, OrderRepository, Store, UnitOfWork};
use crate::{Result, ShopError};

const PRODUCT_COLUMNS: &str = "id, uuid, name, description, price, stock, created_at, updated_at";
const ORDER_COLUMNS: &str = "id, uuid, user_id, address_id, total_price, status, created_at, updated_at";
const ADDRESS_COLUMNS: &str = "id, uuid, user_id, address, city, postal_code, country, created_at";

const GET_CART_SQL: &str = "SELECT id, uuid, user_id, created_at FROM carts WHERE user_id = $1";
const GET_CART_LINES_SQL: &str = "\
    SELECT p.id, p.uuid, p.name, p.description, p.price, p.stock, p.created_at, p.updated_at, ci.quantity \
    FROM cart_items ci JOIN products p ON p.id = ci.product_id \
    WHERE ci.cart_id = $1 ORDER BY p.id";
const CREATE_CART_SQL: &str = "INSERT INTO carts (uuid, user_id) VALUES ($1, $2) ON CONFLICT (user_id) DO NOTHING";
const UPSERT_CART_LINE_SQL: &str = "\
    INSERT INTO cart_items (cart_id, product_id, quantity) VALUES ($1, $2, $3) \
    ON CONFLICT (cart_id, product_id) DO UPDATE \
    SET quantity = LEAST(cart_items.quantity::BIGINT + EXCLUDED.quantity, 2147483647)::INTEGER, updated_at = NOW()";
const SET_CART_LINE_SQL: &str = "UPDATE cart_items SET quantity = $3, updated_at = NOW() WHERE cart_id = $1 AND product_id = $2";
const DELETE_CART_LINE_SQL: &str = "DELETE FROM cart_items WHERE cart_id = $1 AND product_id = $2";
const CLEAR_CART_SQL: &str = "DELETE FROM cart_items WHERE cart_id = $1";

const INSERT_ORDER_SQL: &str = "\
    INSERT INTO orders (uuid, user_id, address_id, total_price, status, created_at, updated_at) \
    VALUES ($1, $2, $3, $4, $5, $6, $6) RETURNING id";
const GET_ORDER_LINES_SQL: &str = "\
    SELECT order_id, product_id, product_name, price_at_order, quantity \
    FROM order_items WHERE order_id = ANY($1) ORDER BY id";
const SET_ORDER_STATUS_SQL: &str = "UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1";
const CANCEL_ORDER_SQL: &str = "UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1 AND status = ANY($4)";

const UPDATE_PRODUCT_SQL: &str = "\
    UPDATE products SET name = COALESCE($2, name), price = COALESCE($3, price), stock = COALESCE($4, stock), updated_at = $5 \
    WHERE id = $1 RETURNING id, uuid, name, description, price, stock, created_at, updated_at";

#[derive(FromRow)]
struct ProductRow {
    id: i64,
    uuid: Uuid,
    name: String,
    description: Option<String>,
    price: Decimal,
    stock: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(r: ProductRow) -> Self {
        Product {
            id: r.id, uuid: r.uuid, name: r.name, description: r.description, price: Money::new(r.price),
            stock: r.stock, created_at: r.created_at, updated_at: r.updated_at,
        }
    }
}

#[derive(FromRow)]
struct CartLineRow {
    #[sqlx(flatten)]
    product: ProductRow,
    quantity: i32,
}

#[derive(FromRow)]
struct CartRow { id: i64, uuid: Uuid, user_id: i64, created_at: DateTime<Utc> }

#[derive(FromRow)]
struct UserRow { id: i64, uuid: Uuid, email: String, name: String, created_at: DateTime<Utc> }

#[derive(FromRow)]
struct AddressRow {
    id: i64,
    uuid: Uuid,
    user_id: i64,
    address: String,
    city: Option<String>,
    postal_code: Option<String>,
    country: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<AddressRow> for Address {
    fn from(r: AddressRow) -> Self {
        Address {
            id: r.id, uuid: r.uuid, user_id: r.user_id, address: r.address, city: r.city,
            postal_code: r.postal_code, country: r.country, created_at: r.created_at,
        }
    }
}

#[derive(FromRow)]
struct OrderRow {
    id: i64,
    uuid: Uuid,
    user_id: i64,
    address_id: Option<i64>,
    total_price: Decimal,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct OrderLineRow { order_id: i64, product_id: i64, product_name: String, price_at_order: Decimal, quantity: i32 }

fn stored_quantity(value: i32) -> Result<Quantity> {
    Quantity::new(value).map_err(|_| ShopError::storage(format!("stored quantity {value} is not positive")))
}

fn stored_status(value: &str) -> Result<OrderStatus> {
    value.parse().map_err(|_| ShopError::storage(format!("stored order status {value:?} is unknown")))
}

/// Translates foreign-key violations into domain errors keyed by constraint name.
fn map_fk(error: sqlx::Error, by_constraint: impl FnOnce(&str) -> ShopError) -> ShopError {
    if let sqlx::Error::Database(db) = &error {
        if db.kind() == DbErrorKind::ForeignKeyViolation {
            return by_constraint(db.constraint().unwrap_or_default());
        }
    }
    error.into()
}

fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, f: &OrderFilters) {
    qb.push(" WHERE TRUE");
    if let Some(user_id) = f.user_id { qb.push(" AND user_id = ").push_bind(user_id); }
    if let Some(status) = f.status { qb.push(" AND status = ").push_bind(status.as_str()); }
    if let Some(from) = f.created_from { qb.push(" AND created_at >= ").push_bind(from); }
    if let Some(before) = f.created_before { qb.push(" AND created_at < ").push_bind(before); }
    if let Some(min) = f.min_amount { qb.push(" AND total_price >= ").push_bind(min.amount()); }
    if let Some(max) = f.max_amount { qb.push(" AND total_price <= ").push_bind(max.amount()); }
}

#[derive(Clone, Debug)]
pub struct PgStore { pool: PgPool }

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

pub struct PgUnitOfWork { tx: Transaction<'static, Postgres> }

impl PgUnitOfWork {
    /// Attaches lines and addresses to a batch of order headers.
    async fn hydrate(&mut self, rows: Vec<OrderRow>) -> Result<Vec<Order>> {
        if rows.is_empty() { return Ok(Vec::new()); }
        let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
        let address_ids: Vec<i64> = rows.iter().filter_map(|r| r.address_id).collect();

        let mut lines: HashMap<i64, Vec<OrderLine>> = HashMap::new();
        for r in sqlx::query_as::<_, OrderLineRow>(GET_ORDER_LINES_SQL).bind(&ids).fetch_all(&mut *self.tx).await? {
            lines.entry(r.order_id).or_default().push(OrderLine {
                product_id: r.product_id,
                product_name: r.product_name,
                price_at_order: Money::new(r.price_at_order),
                quantity: stored_quantity(r.quantity)?,
            });
        }

        let mut addresses: HashMap<i64, Address> = HashMap::new();
        if !address_ids.is_empty() {
            let sql = format!("SELECT {ADDRESS_COLUMNS} FROM user_addresses WHERE id = ANY($1)");
            for r in sqlx::query_as::<_, AddressRow>(&sql).bind(&address_ids).fetch_all(&mut *self.tx).await? {
                addresses.insert(r.id, r.into());
            }
        }

        rows.into_iter()
            .map(|r| {
                Ok(Order {
                    id: r.id,
                    uuid: r.uuid,
                    user_id: r.user_id,
                    address_id: r.address_id,
                    total_price: Money::new(r.total_price),
                    status: stored_status(&r.status)?,
                    created_at: r.created_at,
                    updated_at: r.updated_at,
                    lines: lines.remove(&r.id).unwrap_or_default(),
                    address: r.address_id.and_then(|a| addresses.get(&a).cloned()),
                })
            })
            .collect()
    }
}

#[async_trait]
impl Store for PgStore {
    type Tx = PgUnitOfWork;

    async fn begin(&self) -> Result<PgUnitOfWork> {
        Ok(PgUnitOfWork { tx: self.pool.begin().await? })
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[async_trait]
impl CartRepository for PgUnitOfWork {
    async fn find_cart(&mut self, user_id: i64) -> Result<Option<Cart>> {
        let Some(cart) = sqlx::query_as::<_, CartRow>(GET_CART_SQL).bind(user_id).fetch_optional(&mut *self.tx).await? else {
            return Ok(None);
        };
        let rows = sqlx::query_as::<_, CartLineRow>(GET_CART_LINES_SQL).bind(cart.id).fetch_all(&mut *self.tx).await?;
        let lines = rows
            .into_iter()
            .map(|r| Ok(CartLine { product: r.product.into(), quantity: stored_quantity(r.quantity)? }))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some(Cart::new(cart.id, cart.uuid, cart.user_id, cart.created_at, lines)))
    }

    async fn find_cart_id(&mut self, user_id: i64) -> Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>("SELECT id FROM carts WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(id)
    }

    async fn create_cart(&mut self, user_id: i64) -> Result<Cart> {
        sqlx::query(CREATE_CART_SQL)
            .bind(Uuid::new_v4())
            .bind(user_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_fk(e, |_| ShopError::UserNotFound))?;
        self.find_cart(user_id).await?.ok_or(ShopError::CartNotFound)
    }

    async fn upsert_cart_line(&mut self, cart_id: i64, product_id: i64, quantity: Quantity) -> Result<()> {
        sqlx::query(UPSERT_CART_LINE_SQL)
            .bind(cart_id)
            .bind(product_id)
            .bind(quantity.value())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| {
                map_fk(e, |constraint| match constraint {
                    "cart_items_product_id_fkey" => ShopError::ProductNotFound,
                    _ => ShopError::CartNotFound,
                })
            })?;
        Ok(())
    }

    async fn set_cart_line_quantity(&mut self, cart_id: i64, product_id: i64, quantity: Quantity) -> Result<bool> {
        let done = sqlx::query(SET_CART_LINE_SQL)
            .bind(cart_id)
            .bind(product_id)
            .bind(quantity.value())
            .execute(&mut *self.tx)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn delete_cart_line(&mut self, cart_id: i64, product_id: i64) -> Result<u64> {
        let done = sqlx::query(DELETE_CART_LINE_SQL).bind(cart_id).bind(product_id).execute(&mut *self.tx).await?;
        Ok(done.rows_affected())
    }

    async fn clear_cart(&mut self, cart_id: i64) -> Result<u64> {
        let done = sqlx::query(CLEAR_CART_SQL).bind(cart_id).execute(&mut *self.tx).await?;
        Ok(done.rows_affected())
    }
}

#[async_trait]
impl OrderRepository for PgUnitOfWork {
    async fn insert_order(&mut self, order: &NewOrder) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(INSERT_ORDER_SQL)
            .bind(order.uuid)
            .bind(order.user_id)
            .bind(order.address_id)
            .bind(order.total_price.amount())
            .bind(order.status.as_str())
            .bind(order.created_at)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(|e| {
                map_fk(e, |constraint| match constraint {
                    "orders_address_id_fkey" => ShopError::AddressNotFound,
                    _ => ShopError::UserNotFound,
                })
            })?;
        Ok(id)
    }

    async fn insert_order_lines(&mut self, order_id: i64, lines: &[OrderLine]) -> Result<()> {
        if lines.is_empty() { return Ok(()); }
        let mut qb: QueryBuilder<'_, Postgres> =
            QueryBuilder::new("INSERT INTO order_items (order_id, product_id, product_name, price_at_order, quantity) ");
        qb.push_values(lines, |mut row, line| {
            row.push_bind(order_id)
                .push_bind(line.product_id)
                .push_bind(line.product_name.clone())
                .push_bind(line.price_at_order.amount())
                .push_bind(line.quantity.value());
        });
        qb.build().execute(&mut *self.tx).await.map_err(|e| map_fk(e, |_| ShopError::ProductNotFound))?;
        Ok(())
    }

    async fn find_order(&mut self, order_id: i64) -> Result<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let Some(row) = sqlx::query_as::<_, OrderRow>(&sql).bind(order_id).fetch_optional(&mut *self.tx).await? else {
            return Ok(None);
        };
        Ok(self.hydrate(vec![row]).await?.pop())
    }

    async fn order_status(&mut self, order_id: i64) -> Result<Option<OrderStatus>> {
        let status = sqlx::query_scalar::<_, String>("SELECT status FROM orders WHERE id = $1")
            .bind(order_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        status.as_deref().map(stored_status).transpose()
    }

    async fn list_orders(&mut self, filters: &OrderFilters) -> Result<(Vec<Order>, i64)> {
        let mut count: QueryBuilder<'_, Postgres> = QueryBuilder::new("SELECT COUNT(*) FROM orders");
        push_filters(&mut count, filters);
        let total: i64 = count.build_query_scalar().fetch_one(&mut *self.tx).await?;

        let mut page: QueryBuilder<'_, Postgres> = QueryBuilder::new(format!("SELECT {ORDER_COLUMNS} FROM orders"));
        push_filters(&mut page, filters);
        let direction = filters.sort_direction.keyword();
        page.push(format!(" ORDER BY {} {direction}, id {direction}", filters.sort_by.column()));
        page.push(" LIMIT ").push_bind(i64::from(filters.limit));
        page.push(" OFFSET ").push_bind(i64::try_from(filters.offset()).unwrap_or(i64::MAX));
        let rows = page.build_query_as::<OrderRow>().fetch_all(&mut *self.tx).await?;

        Ok((self.hydrate(rows).await?, total))
    }

    async fn set_order_status(&mut self, order_id: i64, status: OrderStatus, at: DateTime<Utc>) -> Result<bool> {
        let done = sqlx::query(SET_ORDER_STATUS_SQL)
            .bind(order_id)
            .bind(status.as_str())
            .bind(at)
            .execute(&mut *self.tx)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn cancel_order(&mut self, order_id: i64, at: DateTime<Utc>) -> Result<bool> {
        let cancellable: Vec<&str> = OrderStatus::CANCELLABLE.iter().map(OrderStatus::as_str).collect();
        let done = sqlx::query(CANCEL_ORDER_SQL)
            .bind(order_id)
            .bind(OrderStatus::Cancelled.as_str())
            .bind(at)
            .bind(cancellable)
            .execute(&mut *self.tx)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}

#[async_trait]
impl Directory for PgUnitOfWork {
    async fn find_product(&mut self, product_id: i64) -> Result<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        let row = sqlx::query_as::<_, ProductRow>(&sql).bind(product_id).fetch_optional(&mut *self.tx).await?;
        Ok(row.map(Product::from))
    }

    async fn find_user(&mut self, user_id: i64) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, uuid, email, name, created_at FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.map(|r| User { id: r.id, uuid: r.uuid, email: r.email, name: r.name, created_at: r.created_at }))
    }

    async fn find_address(&mut self, address_id: i64) -> Result<Option<Address>> {
        let sql = format!("SELECT {ADDRESS_COLUMNS} FROM user_addresses WHERE id = $1");
        let row = sqlx::query_as::<_, AddressRow>(&sql).bind(address_id).fetch_optional(&mut *self.tx).await?;
        Ok(row.map(Address::from))
    }
}

#[async_trait]
impl ProductAccessor for PgStore {
    async fn get_product(&self, product_id: i64) -> Result<Product> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        sqlx::query_as::<_, ProductRow>(&sql)
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Product::from)
            .ok_or(ShopError::ProductNotFound)
    }

    async fn update_product(&self, product_id: i64, update: &ProductUpdate) -> Result<Product> {
        sqlx::query_as::<_, ProductRow>(UPDATE_PRODUCT_SQL)
            .bind(product_id)
            .bind(update.name.as_deref())
            .bind(update.price.map(|p| p.amount()))
            .bind(update.stock)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?
            .map(Product::from)
            .ok_or(ShopError::ProductNotFound)
    }
}
