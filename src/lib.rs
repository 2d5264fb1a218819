//! # erp-gateway
//!
//! Versioned HTTP API host for the ERP domain modules.
//!
//! The process mounts the independently developed `sales`, `operations`
//! and `analytics` routers under `/api/v1/<module>` on one listener and
//! shares a single bounded MySQL connection pool between them. Business
//! routes live in the modules; this crate is the composition layer.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP)
//!     │
//!     ├── /health                  (api/system)
//!     ├── MountTable               (api/composer)
//!     │     ├── /api/v1/sales       ─┐
//!     │     ├── /api/v1/operations   ├─ modules/
//!     │     └── /api/v1/analytics   ─┘
//!     │
//!     ├── PoolManager              (db/manager)
//!     ├── ConnectionPool           (db/pool)
//!     │
//!     └── MySQL
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod db;
pub mod error;
pub mod modules;
pub mod server;
