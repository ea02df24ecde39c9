//! # Stock Core
//!
//! 주가 수집기의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 워크스페이스 전반에서 사용되는 기본 타입을 제공합니다:
//! - 티커 심볼 정규화
//! - 일봉 가격 레코드와 ArangoDB 문서 키
//! - NYSE 거래 캘린더 (휴장일, 조기 폐장)
//! - 로깅 인프라

pub mod calendar;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use calendar::NyseCalendar;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
