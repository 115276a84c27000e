//! Shared data types for cinder: relational expression trees, the value
//! vocabulary of resolved condition leaves, and pipeline timing.

pub mod relational;
pub mod timing;
pub mod types;
