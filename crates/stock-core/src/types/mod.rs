//! 기본 타입 정의.

pub mod ticker;

pub use ticker::Ticker;
