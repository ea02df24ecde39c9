//! 데이터 모듈 오류 타입.

use stock_core::CoreError;
use thiserror::Error;

/// 데이터 관련 오류.
#[derive(Debug, Error)]
pub enum DataError {
    /// HTTP 전송 오류
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// ArangoDB가 반환한 오류 응답
    #[error("ArangoDB error [{status}] (errorNum {error_num}): {message}")]
    Arango {
        status: u16,
        error_num: i64,
        message: String,
    },

    /// 데이터 가져오기 오류 (외부 소스)
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// 파싱 오류
    #[error("Parse error: {0}")]
    Parse(String),

    /// 직렬화/역직렬화 오류
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 파일 입출력 오류
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// 도메인 타입 오류
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl DataError {
    /// ArangoDB "찾을 수 없음" 응답 여부 (HTTP 404).
    pub fn is_not_found(&self) -> bool {
        matches!(self, DataError::Arango { status: 404, .. })
    }

    /// ArangoDB "중복" 응답 여부 (HTTP 409 / errorNum 1207, 1210, 1702).
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DataError::Arango { status: 409, .. }
                | DataError::Arango { error_num: 1207 | 1210 | 1702, .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, DataError>;
