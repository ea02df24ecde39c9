//! 핵심 도메인 에러 타입.

use thiserror::Error;

/// 도메인 타입 생성/파싱 에러.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// 잘못된 티커 심볼
    #[error("잘못된 티커: {0}")]
    InvalidTicker(String),

    /// 잘못된 날짜
    #[error("잘못된 날짜: {0}")]
    InvalidDate(String),
}

/// 핵심 작업을 위한 Result 타입.
pub type CoreResult<T> = Result<T, CoreError>;
