//! Daily stock price collector.
//!
//! 이 crate는 일봉 가격을 수집해 ArangoDB 공유 컬렉션에 저장하는 바이너리를 제공합니다:
//! - 데이터베이스/사용자/컬렉션 초기화
//! - 티커 목록 구성 (포함/제외 파일, 지수 구성 종목, 픽 CSV)
//! - 종목별 마지막 저장일 기준 다운로드 계획
//! - Yahoo Finance 일봉 수집 및 upsert

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::CollectorConfig;
pub use error::{CollectorError, Result};
pub use stats::CollectionStats;
