//! Collection types used by bus-level schedulers.
pub mod pq;
