//! ArangoDB 저장소.

pub mod arango;
pub mod prices;
