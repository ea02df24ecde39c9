//! 티커 심볼 정의.
//!
//! 입력 파일, 위키피디아 지수 구성 종목, 픽 CSV 등 여러 소스에서 들어오는
//! 심볼을 하나의 정규화된 형식으로 맞춥니다.
//!
//! - 앞뒤 공백 제거, 대문자 변환
//! - 클래스 주식의 점(`.`)을 대시(`-`)로 변환 (`BRK.B` → `BRK-B`, Yahoo 표기)

use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 티커 최대 길이.
const MAX_TICKER_LEN: usize = 16;

/// 정규화된 티커 심볼.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Ticker(String);

impl Ticker {
    /// 원시 문자열을 정규화하여 티커를 생성합니다.
    pub fn parse(raw: &str) -> CoreResult<Self> {
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(CoreError::InvalidTicker("빈 문자열".to_string()));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(CoreError::InvalidTicker(format!("공백 포함: {:?}", trimmed)));
        }
        if trimmed.chars().count() > MAX_TICKER_LEN {
            return Err(CoreError::InvalidTicker(format!("너무 긴 심볼: {}", trimmed)));
        }

        Ok(Self(trimmed.to_uppercase().replace('.', "-")))
    }

    /// 정규화된 심볼 문자열.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 지수 심볼 여부 (예: `^GSPC`).
    pub fn is_index(&self) -> bool {
        self.0.starts_with('^')
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Ticker {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Ticker {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Ticker {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Ticker> for String {
    fn from(ticker: Ticker) -> Self {
        ticker.0
    }
}
