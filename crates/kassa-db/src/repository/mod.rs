//! # Repository Module
//!
//! Database repository implementations for Kassa.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CheckoutService                                                       │
//! │       │                                                                 │
//! │       │  db.orders().insert_pending(&new_order)                        │
//! │       ▼                                                                 │
//! │  OrderRepository                                                       │
//! │  ├── insert_pending(&self, order)                                      │
//! │  ├── attach_session(&self, id, session_id)                             │
//! │  ├── mark_completed(&self, id, transaction_id)                         │
//! │  └── list_completed_with_transaction_ids(&self)                        │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog reads and inserts
//! - [`OrderRepository`](order::OrderRepository) - Order lifecycle and accounting reads

pub mod order;
pub mod product;
