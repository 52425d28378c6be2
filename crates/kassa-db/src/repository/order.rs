//! # Order Repository
//!
//! Database operations for shop orders.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Order Lifecycle                                   │
//! │                                                                         │
//! │  1. CHECKOUT                                                           │
//! │     └── insert_pending() → Order { status: Pending }                   │
//! │     └── attach_session() → session_id from the gateway                 │
//! │                                                                         │
//! │  2. SETTLEMENT (gateway confirmation)                                  │
//! │     └── mark_completed() → Order { status: Completed, transaction_id } │
//! │                                                                         │
//! │  3. (OPTIONAL) ABANDON                                                 │
//! │     └── update_status(Failed | Canceled)                               │
//! │                                                                         │
//! │  4. BOOKKEEPING                                                        │
//! │     └── list_completed_with_transaction_ids()                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status changes go through [`OrderStatus::transition`] and are written
//! with a `WHERE status = <current>` guard, so a concurrent settlement
//! cannot be overwritten by a late cancel.
//!
//! `items`, `shipping` and `pricing` are stored as JSON text. The pricing
//! snapshot is written once at checkout and never recomputed. A single-order
//! read fails on malformed JSON; listings skip that row with a warning.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use kassa_core::{
    Money, NewOrder, Order, OrderItem, OrderPricingResult, OrderStatus, ShippingMetadata,
    ValidationError,
};

const ORDER_COLUMNS: &str = "id, session_id, transaction_id, user_id, email, total_amount, \
     discount_amount, discount_code, items, shipping, pricing, newsletter_opt_in, status, \
     created_at, updated_at";

/// Row shape of the `orders` table.
#[derive(Debug, FromRow)]
struct OrderRow {
    id: String,
    session_id: Option<String>,
    transaction_id: Option<String>,
    user_id: Option<String>,
    email: String,
    total_amount: i64,
    discount_amount: i64,
    discount_code: Option<String>,
    items: String,
    shipping: Option<String>,
    pricing: Option<String>,
    newsletter_opt_in: bool,
    status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = DbError;

    fn try_from(row: OrderRow) -> DbResult<Self> {
        let items: Vec<OrderItem> = serde_json::from_str(&row.items)?;
        let shipping: Option<ShippingMetadata> =
            row.shipping.as_deref().map(serde_json::from_str).transpose()?;
        let pricing: Option<OrderPricingResult> =
            row.pricing.as_deref().map(serde_json::from_str).transpose()?;

        Ok(Order {
            id: row.id,
            session_id: row.session_id,
            transaction_id: row.transaction_id,
            user_id: row.user_id,
            email: row.email,
            total_amount: Money::from_ore(row.total_amount),
            discount_amount: Money::from_ore(row.discount_amount),
            discount_code: row.discount_code,
            items,
            shipping,
            pricing,
            newsletter_opt_in: row.newsletter_opt_in,
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// Decodes listed rows, leaving out the ones whose JSON columns are broken.
fn into_orders(rows: Vec<OrderRow>) -> Vec<Order> {
    rows.into_iter()
        .filter_map(|row| {
            let id = row.id.clone();
            match Order::try_from(row) {
                Ok(order) => Some(order),
                Err(e) => {
                    warn!(order_id = %id, error = %e, "Skipping order with undecodable columns");
                    None
                }
            }
        })
        .collect()
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Inserts the order recorded before the customer is sent to pay.
    ///
    /// The repository assigns the id and timestamps. The order must be
    /// `pending`; settled orders only come from [`Self::mark_completed`].
    pub async fn insert_pending(&self, new: &NewOrder) -> DbResult<Order> {
        if new.status != OrderStatus::Pending {
            return Err(ValidationError::InvalidFormat {
                field: "status".to_string(),
                reason: format!("new orders start as pending, got {}", new.status),
            }
            .into());
        }

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            session_id: new.session_id.clone(),
            transaction_id: None,
            user_id: new.user_id.clone(),
            email: new.email.clone(),
            total_amount: new.total_amount,
            discount_amount: new.discount_amount,
            discount_code: new.discount_code.clone(),
            items: new.items.clone(),
            shipping: new.shipping.clone(),
            pricing: new.pricing.clone(),
            newsletter_opt_in: new.newsletter_opt_in,
            status: OrderStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        let items = serde_json::to_string(&order.items)?;
        let shipping = order.shipping.as_ref().map(serde_json::to_string).transpose()?;
        let pricing = order.pricing.as_ref().map(serde_json::to_string).transpose()?;

        debug!(
            id = %order.id,
            total = %order.total_amount,
            items = order.items.len(),
            "Inserting pending order"
        );

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, session_id, transaction_id, user_id, email,
                total_amount, discount_amount, discount_code,
                items, shipping, pricing, newsletter_opt_in, status,
                created_at, updated_at
            ) VALUES (?1, ?2, NULL, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&order.id)
        .bind(&order.session_id)
        .bind(&order.user_id)
        .bind(&order.email)
        .bind(order.total_amount.ore())
        .bind(order.discount_amount.ore())
        .bind(&order.discount_code)
        .bind(items)
        .bind(shipping)
        .bind(pricing)
        .bind(order.newsletter_opt_in)
        .bind(order.status)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(order)
    }

    /// Records the gateway's checkout session on a pending order.
    pub async fn attach_session(&self, order_id: &str, session_id: &str) -> DbResult<()> {
        debug!(order_id = %order_id, session_id = %session_id, "Attaching checkout session");

        let result = sqlx::query(
            "UPDATE orders SET session_id = ?2, updated_at = ?3 WHERE id = ?1 AND status = 'pending'",
        )
        .bind(order_id)
        .bind(session_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Order (pending)", order_id));
        }

        Ok(())
    }

    /// Gets an order by its ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1");
        let row: Option<OrderRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Order::try_from).transpose()
    }

    /// Gets an order by ID, failing with [`DbError::NotFound`] when absent.
    pub async fn require(&self, id: &str) -> DbResult<Order> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Order", id))
    }

    /// Moves an order to `next`, enforcing the order state machine.
    ///
    /// ## Returns
    /// * `Err(DbError::Domain)` - The transition is not allowed
    /// * `Err(DbError::Conflict)` - The status changed since it was read
    pub async fn update_status(&self, id: &str, next: OrderStatus) -> DbResult<Order> {
        let current = self.require(id).await?;
        let next = current.status.transition(next)?;

        let result = sqlx::query(
            "UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1 AND status = ?4",
        )
        .bind(id)
        .bind(next)
        .bind(Utc::now())
        .bind(current.status)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Conflict {
                entity: "Order".to_string(),
                id: id.to_string(),
            });
        }

        info!(order_id = %id, from = %current.status, to = %next, "Order status changed");
        self.require(id).await
    }

    /// Settles a pending order with the processor's transaction id.
    pub async fn mark_completed(&self, id: &str, transaction_id: &str) -> DbResult<Order> {
        let current = self.require(id).await?;
        let next = current.status.transition(OrderStatus::Completed)?;

        let result = sqlx::query(
            r#"
            UPDATE orders SET
                status = ?2,
                transaction_id = ?3,
                updated_at = ?4
            WHERE id = ?1 AND status = ?5
            "#,
        )
        .bind(id)
        .bind(next)
        .bind(transaction_id)
        .bind(Utc::now())
        .bind(current.status)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Conflict {
                entity: "Order".to_string(),
                id: id.to_string(),
            });
        }

        info!(order_id = %id, transaction_id = %transaction_id, "Order settled");
        self.require(id).await
    }

    /// Completed orders that carry a processor transaction id, oldest first.
    ///
    /// This is what the bookkeeping export reads.
    pub async fn list_completed_with_transaction_ids(&self) -> DbResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders \
             WHERE status = 'completed' AND transaction_id IS NOT NULL \
             ORDER BY created_at ASC"
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        debug!(count = rows.len(), "Listed completed orders");
        Ok(into_orders(rows))
    }

    /// Most recent orders of any status, newest first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC LIMIT ?1");
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(into_orders(rows))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
