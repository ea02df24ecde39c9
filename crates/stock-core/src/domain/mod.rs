//! 도메인 모델.

pub mod price;

pub use price::{document_key, PriceRecord};
