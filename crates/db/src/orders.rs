//! Order repository, including the cash-on-delivery checkout transaction.

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{PgConnection, PgPool};
use tracing::{info, instrument};

use zolar_core::checkout::{self, CheckoutError, PricedLine, RequestedLine};
use zolar_core::{
    CustomerId, CustomerTier, Email, OrderId, OrderItemId, OrderStatus, PaymentMethod, Phone,
    Price, VariantId,
};

use super::RepositoryError;
use super::customers::{self, CustomerContact};
use super::products;

const ORDER_SELECT: &str = r"
    SELECT o.id, o.order_number, o.customer_id, c.email AS customer_email, o.status,
           o.payment_method, o.subtotal, o.shipping_fee, o.total, o.shipping_name,
           o.shipping_phone, o.shipping_address, o.shipping_city, o.notes,
           o.created_at, o.updated_at
    FROM customer_order o
    JOIN customer c ON c.id = o.customer_id
";

const ITEM_COLUMNS: &str =
    "id, order_id, variant_id, product_name, sku, color, size, unit_price, quantity, line_total";

/// Characters used in the random part of an order number. No `0/O` or `1/I`,
/// since customers read these out over the phone.
const ORDER_NUMBER_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const ORDER_NUMBER_SUFFIX_LEN: usize = 6;
const ORDER_NUMBER_ATTEMPTS: usize = 5;

/// An order header.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    pub order_number: String,
    pub customer_id: CustomerId,
    pub customer_email: Email,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub subtotal: Price,
    pub shipping_fee: Price,
    pub total: Price,
    pub shipping_name: String,
    pub shipping_phone: String,
    pub shipping_address: String,
    pub shipping_city: String,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A purchased line. Product name and SKU are copied at purchase time so
/// the order survives catalog edits.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub variant_id: Option<VariantId>,
    pub product_name: String,
    pub sku: String,
    pub color: Option<String>,
    pub size: Option<String>,
    pub unit_price: Price,
    pub quantity: i32,
    pub line_total: Price,
}

/// An order with its line items.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithItems {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// A validated cash-on-delivery order request.
#[derive(Debug, Clone)]
pub struct NewCodOrder {
    pub email: Email,
    pub name: String,
    pub phone: Phone,
    pub address: String,
    pub city: String,
    pub notes: Option<String>,
    pub lines: Vec<RequestedLine>,
    pub shipping_fee: Price,
}

/// Result of a successful checkout.
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    #[serde(flatten)]
    pub order: OrderWithItems,
    pub customer_tier: CustomerTier,
}

/// Order list filter.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    /// Matches order number or customer email.
    pub search: Option<String>,
    pub customer_id: Option<CustomerId>,
    pub limit: i64,
    pub offset: i64,
}

/// Errors from placing an order.
#[derive(Debug, thiserror::Error)]
pub enum PlaceOrderError {
    /// The cart failed validation or a line is out of stock.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// Stock changed between the check and the decrement.
    #[error("{sku} sold out while placing the order")]
    OutOfStock { sku: String },

    /// Database failure. The transaction has been rolled back.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for PlaceOrderError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Generate an order number of the form `ZLR-YYMMDD-XXXXXX`.
#[must_use]
pub fn generate_order_number<R: Rng>(date: NaiveDate, rng: &mut R) -> String {
    let suffix: String = (0..ORDER_NUMBER_SUFFIX_LEN)
        .map(|_| {
            let idx = rng.random_range(0..ORDER_NUMBER_CHARSET.len());
            char::from(ORDER_NUMBER_CHARSET.get(idx).copied().unwrap_or(b'X'))
        })
        .collect();
    format!("ZLR-{}-{suffix}", date.format("%y%m%d"))
}

async fn insert_order_header(
    conn: &mut PgConnection,
    customer_id: CustomerId,
    new: &NewCodOrder,
    subtotal: Price,
    total: Price,
) -> Result<OrderId, RepositoryError> {
    for _ in 0..ORDER_NUMBER_ATTEMPTS {
        let number = generate_order_number(Utc::now().date_naive(), &mut rand::rng());
        let inserted: Option<(OrderId,)> = sqlx::query_as(
            r"
            INSERT INTO customer_order
                (order_number, customer_id, status, payment_method, subtotal, shipping_fee, total,
                 shipping_name, shipping_phone, shipping_address, shipping_city, notes)
            VALUES ($1, $2, 'pending', 'cod', $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (order_number) DO NOTHING
            RETURNING id
            ",
        )
        .bind(&number)
        .bind(customer_id)
        .bind(subtotal)
        .bind(new.shipping_fee)
        .bind(total)
        .bind(&new.name)
        .bind(new.phone.as_str())
        .bind(&new.address)
        .bind(&new.city)
        .bind(new.notes.as_deref())
        .fetch_optional(&mut *conn)
        .await?;

        if let Some((id,)) = inserted {
            return Ok(id);
        }
        tracing::warn!(order_number = %number, "Order number collision, retrying");
    }
    Err(RepositoryError::Conflict(
        "could not allocate a unique order number".to_string(),
    ))
}

async fn insert_item(
    conn: &mut PgConnection,
    order_id: OrderId,
    line: &PricedLine,
) -> Result<(), RepositoryError> {
    let quantity = i32::try_from(line.quantity)
        .map_err(|_| RepositoryError::DataCorruption(format!("quantity {}", line.quantity)))?;
    sqlx::query(
        r"
        INSERT INTO order_item
            (order_id, variant_id, product_name, sku, color, size, unit_price, quantity, line_total)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ",
    )
    .bind(order_id)
    .bind(line.variant_id)
    .bind(&line.product_name)
    .bind(&line.sku)
    .bind(line.color.as_deref())
    .bind(line.size.as_deref())
    .bind(line.unit_price)
    .bind(quantity)
    .bind(line.line_total)
    .execute(conn)
    .await?;
    Ok(())
}

async fn fetch_order(conn: &mut PgConnection, id: OrderId) -> Result<Order, RepositoryError> {
    sqlx::query_as::<_, Order>(&format!("{ORDER_SELECT} WHERE o.id = $1"))
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or(RepositoryError::NotFound)
}

async fn fetch_items(
    conn: &mut PgConnection,
    order_id: OrderId,
) -> Result<Vec<OrderItem>, RepositoryError> {
    let items = sqlx::query_as::<_, OrderItem>(&format!(
        "SELECT {ITEM_COLUMNS} FROM order_item WHERE order_id = $1 ORDER BY id"
    ))
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(items)
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Place a cash-on-delivery order.
    ///
    /// Runs in one transaction: the requested variants are locked, priced and
    /// stock-checked; the customer is upserted by email; the order and its
    /// items are inserted; stock is decremented; customer stats and tier are
    /// updated. Any failure rolls everything back.
    ///
    /// # Errors
    ///
    /// Returns `PlaceOrderError::Checkout` for an invalid cart or
    /// insufficient stock, `PlaceOrderError::OutOfStock` if a decrement
    /// finds less stock than was checked, and `PlaceOrderError::Repository`
    /// for database failures.
    #[instrument(skip(self, new), fields(email = %new.email, lines = new.lines.len()))]
    pub async fn create_cod_order(&self, new: &NewCodOrder) -> Result<PlacedOrder, PlaceOrderError> {
        let lines = checkout::normalize_lines(&new.lines)?;
        let variant_ids: Vec<VariantId> = lines.iter().map(|l| l.variant_id).collect();

        let mut tx = self.pool.begin().await?;

        let snapshots = products::lock_snapshots(&mut tx, &variant_ids).await?;
        let priced = checkout::price_order(&lines, &snapshots, new.shipping_fee)?;

        let contact = CustomerContact {
            email: &new.email,
            name: &new.name,
            phone: new.phone.as_str(),
            address: &new.address,
            city: &new.city,
        };
        let customer_id = customers::upsert_for_checkout(&mut tx, &contact).await?;

        let order_id =
            insert_order_header(&mut tx, customer_id, new, priced.subtotal, priced.total).await?;

        for line in &priced.lines {
            insert_item(&mut tx, order_id, line).await?;
            let quantity = i32::try_from(line.quantity).map_err(|_| {
                RepositoryError::DataCorruption(format!("quantity {}", line.quantity))
            })?;
            if !products::decrement_stock(&mut tx, line.variant_id, quantity).await? {
                return Err(PlaceOrderError::OutOfStock {
                    sku: line.sku.clone(),
                });
            }
        }

        let tier =
            customers::record_order(&mut tx, customer_id, 1, Decimal::from(priced.total)).await?;

        let order = fetch_order(&mut tx, order_id).await?;
        let items = fetch_items(&mut tx, order_id).await?;

        tx.commit().await?;

        info!(
            order_number = %order.order_number,
            total = %order.total,
            items = priced.item_count(),
            "COD order placed"
        );

        Ok(PlacedOrder {
            order: OrderWithItems { order, items },
            customer_tier: tier,
        })
    }

    /// List orders, newest first. Returns the page and the total number of
    /// matches.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self))]
    pub async fn list(&self, filter: &OrderFilter) -> Result<(Vec<Order>, i64), RepositoryError> {
        const WHERE: &str = r"
            WHERE ($1::order_status IS NULL OR o.status = $1)
              AND ($2::text IS NULL OR o.order_number ILIKE '%' || $2 || '%'
                   OR c.email ILIKE '%' || $2 || '%')
              AND ($3::integer IS NULL OR o.customer_id = $3)
        ";

        let orders = sqlx::query_as::<_, Order>(&format!(
            "{ORDER_SELECT} {WHERE} ORDER BY o.created_at DESC, o.id DESC LIMIT $4 OFFSET $5"
        ))
        .bind(filter.status)
        .bind(filter.search.as_deref())
        .bind(filter.customer_id)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(self.pool)
        .await?;

        let (total,): (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM customer_order o JOIN customer c ON c.id = o.customer_id {WHERE}"
        ))
        .bind(filter.status)
        .bind(filter.search.as_deref())
        .bind(filter.customer_id)
        .fetch_one(self.pool)
        .await?;

        Ok((orders, total))
    }

    /// Get an order with its items by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_items(&self, id: OrderId) -> Result<Option<OrderWithItems>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        match fetch_order(&mut conn, id).await {
            Ok(order) => {
                let items = fetch_items(&mut conn, id).await?;
                Ok(Some(OrderWithItems { order, items }))
            }
            Err(RepositoryError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Look up an order for the customer who placed it. Both the number and
    /// the email must match, so order numbers alone reveal nothing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    #[instrument(skip(self, email))]
    pub async fn get_by_number(
        &self,
        order_number: &str,
        email: &Email,
    ) -> Result<Option<OrderWithItems>, RepositoryError> {
        let order = sqlx::query_as::<_, Order>(&format!(
            "{ORDER_SELECT} WHERE o.order_number = $1 AND c.email = $2"
        ))
        .bind(order_number)
        .bind(email)
        .fetch_optional(self.pool)
        .await?;

        match order {
            Some(order) => {
                let mut conn = self.pool.acquire().await?;
                let items = fetch_items(&mut conn, order.id).await?;
                Ok(Some(OrderWithItems { order, items }))
            }
            None => Ok(None),
        }
    }

    /// Move an order to `next`.
    ///
    /// Cancelling returns the items to stock and takes the order back out of
    /// the customer's stats (recomputing the tier).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order does not exist and
    /// `RepositoryError::Conflict` if the transition is not allowed.
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let (current, customer_id, total): (OrderStatus, CustomerId, Decimal) = sqlx::query_as(
            "SELECT status, customer_id, total FROM customer_order WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if current.is_terminal() {
            return Err(RepositoryError::Conflict(format!("order is already {current}")));
        }
        if !current.can_transition_to(next) {
            return Err(RepositoryError::Conflict(format!(
                "cannot change order status from {current} to {next}"
            )));
        }

        sqlx::query("UPDATE customer_order SET status = $2, updated_at = NOW() WHERE id = $1")
            .bind(id)
            .bind(next)
            .execute(&mut *tx)
            .await?;

        if next == OrderStatus::Cancelled {
            // Same lock order as checkout.
            sqlx::query(
                r"
                SELECT v.id FROM variant v
                JOIN order_item i ON i.variant_id = v.id
                WHERE i.order_id = $1
                ORDER BY v.id
                FOR UPDATE OF v
                ",
            )
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;

            let restocked = sqlx::query(
                r"
                UPDATE variant v
                SET stock = v.stock + i.quantity, updated_at = NOW()
                FROM order_item i
                WHERE i.order_id = $1 AND i.variant_id = v.id
                ",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
            customers::record_order(&mut tx, customer_id, -1, -total).await?;
            info!(order_id = %id, variants = restocked.rows_affected(), "Order cancelled, stock returned");
        }

        let order = fetch_order(&mut tx, id).await?;
        tx.commit().await?;
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_number_format() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        let number = generate_order_number(date, &mut rand::rng());

        assert_eq!(number.len(), "ZLR-260307-".len() + ORDER_NUMBER_SUFFIX_LEN);
        assert!(number.starts_with("ZLR-260307-"));
        let suffix = number.rsplit('-').next().unwrap();
        assert!(suffix.bytes().all(|b| ORDER_NUMBER_CHARSET.contains(&b)));
    }

    #[test]
    fn test_order_numbers_vary() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).unwrap();
        let mut rng = rand::rng();
        let numbers: std::collections::HashSet<String> =
            (0..50).map(|_| generate_order_number(date, &mut rng)).collect();
        assert!(numbers.len() > 45);
    }
}
