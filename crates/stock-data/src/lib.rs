//! 외부 데이터 소스와 저장소.
//!
//! 이 crate는 다음을 제공합니다:
//! - Yahoo Finance 일봉 가격 소스
//! - 위키피디아 지수 구성 종목 수집 (로컬 캐시)
//! - ArangoDB HTTP 클라이언트
//! - 공유 컬렉션 기반 가격 저장소

pub mod error;
pub mod provider;
pub mod storage;

pub use error::{DataError, Result};

pub use provider::index_constituents::{IndexConstituentProvider, IndexSource};
pub use provider::yahoo::{PriceSource, YahooPriceSource};
pub use storage::arango::{ArangoClient, ArangoConfig, ImportSummary, OnDuplicate};
pub use storage::prices::{CollectionSummary, PriceRepository};
