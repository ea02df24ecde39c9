//! 일봉 가격 레코드.
//!
//! 모든 종목의 레코드가 하나의 공유 컬렉션에 저장되므로, 문서 키는
//! `(ticker, date)` 조합에서 결정적으로 만들어집니다. 같은 종목/날짜는
//! 항상 같은 `_key`가 되어 재실행 시에도 문서가 하나만 남습니다.

use crate::types::Ticker;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// ArangoDB `_key`에 그대로 쓸 수 있는 문자인지 확인.
///
/// `%`는 인코딩 접두사로 쓰이므로 허용 목록에서 제외합니다.
fn is_key_safe(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || matches!(
            c,
            '_' | '-' | ':' | '.' | '@' | '(' | ')' | '+' | ',' | '=' | ';' | '$' | '!' | '*'
                | '\''
        )
}

/// `(ticker, date)`에 대한 문서 키 생성.
///
/// 형식: `{ticker}_{YYYY-MM-DD}`. 키에 허용되지 않는 문자는 `%XX`로 인코딩합니다.
pub fn document_key(ticker: &Ticker, date: NaiveDate) -> String {
    let mut key = String::with_capacity(ticker.as_str().len() + 11);
    for c in ticker.as_str().chars() {
        if is_key_safe(c) {
            key.push(c);
        } else {
            let mut buf = [0u8; 4];
            for byte in c.encode_utf8(&mut buf).bytes() {
                key.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    key.push('_');
    key.push_str(&date.format("%Y-%m-%d").to_string());
    key
}

/// 한 종목의 하루치 가격 데이터.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// 티커
    pub ticker: Ticker,
    /// 세션 날짜 (뉴욕 기준)
    pub date: NaiveDate,
    /// 시가
    #[serde(with = "rust_decimal::serde::float")]
    pub open: Decimal,
    /// 고가
    #[serde(with = "rust_decimal::serde::float")]
    pub high: Decimal,
    /// 저가
    #[serde(with = "rust_decimal::serde::float")]
    pub low: Decimal,
    /// 수정 종가
    #[serde(with = "rust_decimal::serde::float")]
    pub close: Decimal,
    /// 원 종가 (배당/분할 미반영)
    #[serde(with = "rust_decimal::serde::float")]
    pub raw_close: Decimal,
    /// 거래량
    pub volume: u64,
}

impl PriceRecord {
    /// 이 레코드의 문서 키.
    pub fn key(&self) -> String {
        document_key(&self.ticker, self.date)
    }

    /// 저장 가능한 캔들인지 확인.
    ///
    /// 가격이 모두 양수이고 고가가 저가 이상이어야 합니다.
    pub fn is_valid(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close, self.raw_close];
        prices.iter().all(|p| *p > Decimal::ZERO) && self.low <= self.high
    }

    /// `_key`를 포함한 ArangoDB 문서로 변환.
    pub fn to_document(&self) -> PriceDocument<'_> {
        PriceDocument {
            key: self.key(),
            record: self,
        }
    }
}

/// 컬렉션에 저장되는 문서 형태.
#[derive(Debug, Serialize)]
pub struct PriceDocument<'a> {
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(flatten)]
    pub record: &'a PriceRecord,
}
