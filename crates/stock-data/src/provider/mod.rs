//! 외부 데이터 제공자.

pub mod index_constituents;
pub mod yahoo;
