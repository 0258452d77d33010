//! Postgres/PostGIS persistence for units, assignments, routes, and
//! dispatch configuration.
//!
//! Every mutation the dispatcher depends on is a single transaction or a
//! single conditional statement, so concurrent readers never observe a
//! half-committed preemption and concurrent writers get exactly one
//! winner per unit.

pub mod assignments;
pub mod candidates;
pub mod config;
pub mod routes;
pub mod store;
pub mod units;

pub use routes::RouteRepairJob;
pub use store::Store;
