//! slope-vector
//!
//! Nearest-neighbour retrieval over chunk embeddings. Search is an exact flat
//! inner-product scan held in memory ([`FlatVectorIndex`]); persistence goes
//! through a LanceDB table ([`store`]).

pub mod flat;
pub mod schema;
pub mod store;

pub use flat::FlatVectorIndex;
