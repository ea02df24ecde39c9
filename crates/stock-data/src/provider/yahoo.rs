//! Yahoo Finance 일봉 가격 소스.
//!
//! `yahoo_finance_api` 크레이트로 종목별 일봉을 조회하고
//! 공유 컬렉션에 저장할 [`PriceRecord`]로 변환합니다.
//!
//! - 캔들 타임스탬프는 뉴욕 시간 기준 세션 날짜로 변환
//! - 수정 종가(adjclose)를 `close`로, 원 종가를 `raw_close`로 저장
//! - NaN/0 가격 등 유효하지 않은 캔들은 버림
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! use stock_data::{PriceSource, YahooPriceSource};
//!
//! let source = YahooPriceSource::new()?;
//! let records = source.fetch_daily(&ticker, start, end).await?;
//! ```

use crate::error::{DataError, Result};
use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, TimeZone, Utc};
use chrono_tz::America::New_York;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use stock_core::{PriceRecord, Ticker};
use time::OffsetDateTime;
use tracing::{debug, instrument};

/// 일봉 가격 소스 트레잇.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// 소스 이름 (로그용).
    fn name(&self) -> &'static str;

    /// `start <= date <= end` 범위의 완료된 일봉 조회 (날짜 오름차순).
    async fn fetch_daily(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceRecord>>;
}

/// 제공자 응답을 변환하기 전의 원시 캔들.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyBar {
    /// UNIX 타임스탬프 (초)
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adjclose: f64,
    pub volume: u64,
}

impl DailyBar {
    /// 뉴욕 기준 세션 날짜.
    pub fn session_date(&self) -> Option<NaiveDate> {
        Utc.timestamp_opt(self.timestamp, 0)
            .single()
            .map(|ts| ts.with_timezone(&New_York).date_naive())
    }

    /// 가격 레코드로 변환. 변환 불가능하거나 유효하지 않으면 `None`.
    pub fn to_record(&self, ticker: &Ticker) -> Option<PriceRecord> {
        let record = PriceRecord {
            ticker: ticker.clone(),
            date: self.session_date()?,
            open: to_decimal(self.open)?,
            high: to_decimal(self.high)?,
            low: to_decimal(self.low)?,
            close: to_decimal(self.adjclose)?,
            raw_close: to_decimal(self.close)?,
            volume: self.volume,
        };
        record.is_valid().then_some(record)
    }
}

fn to_decimal(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_f64(value).map(|d| d.round_dp(6).normalize())
}

/// 원시 캔들 목록을 레코드로 변환.
///
/// 범위 밖 날짜와 유효하지 않은 캔들은 버리고, 같은 날짜가 여러 번 나오면
/// 마지막 값을 사용합니다.
pub fn bars_to_records(
    ticker: &Ticker,
    bars: &[DailyBar],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<PriceRecord> {
    let mut by_date: BTreeMap<NaiveDate, PriceRecord> = BTreeMap::new();

    for bar in bars {
        match bar.to_record(ticker) {
            Some(record) if record.date >= start && record.date <= end => {
                by_date.insert(record.date, record);
            }
            Some(_) => {}
            None => {
                debug!(ticker = %ticker, timestamp = bar.timestamp, "유효하지 않은 캔들 제외");
            }
        }
    }

    by_date.into_values().collect()
}

/// Yahoo Finance 기반 가격 소스.
pub struct YahooPriceSource {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooPriceSource {
    /// 새 가격 소스 생성.
    pub fn new() -> Result<Self> {
        let connector = yahoo_finance_api::YahooConnector::new()
            .map_err(|e| DataError::Fetch(format!("Yahoo Finance 연결 실패: {}", e)))?;
        Ok(Self { connector })
    }
}

#[async_trait]
impl PriceSource for YahooPriceSource {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    #[instrument(skip(self), fields(ticker = %ticker))]
    async fn fetch_daily(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<PriceRecord>> {
        if start > end {
            return Ok(Vec::new());
        }

        // 종료일은 미포함이므로 하루를 더한다
        let from = naive_date_to_offset_datetime(start)?;
        let to = naive_date_to_offset_datetime(end + Duration::days(1))?;

        debug!(start = %start, end = %end, "Yahoo Finance 일봉 조회");

        let response = self
            .connector
            .get_quote_history_interval(ticker.as_str(), from, to, "1d")
            .await
            .map_err(|e| DataError::Fetch(format!("Yahoo Finance API 오류 ({}): {}", ticker, e)))?;

        let quotes = response
            .quotes()
            .map_err(|e| DataError::Parse(format!("Quote 파싱 오류 ({}): {}", ticker, e)))?;

        let bars: Vec<DailyBar> = quotes
            .iter()
            .map(|q| DailyBar {
                timestamp: q.timestamp as i64,
                open: q.open,
                high: q.high,
                low: q.low,
                close: q.close,
                adjclose: q.adjclose,
                volume: q.volume as u64,
            })
            .collect();

        let records = bars_to_records(ticker, &bars, start, end);
        debug!(quotes = bars.len(), records = records.len(), "일봉 변환 완료");

        Ok(records)
    }
}

/// NaiveDate를 자정(UTC)의 OffsetDateTime으로 변환.
fn naive_date_to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime> {
    let month = time::Month::try_from(date.month() as u8)
        .map_err(|e| DataError::Parse(format!("잘못된 월 ({}): {}", date, e)))?;
    let day = time::Date::from_calendar_date(date.year(), month, date.day() as u8)
        .map_err(|e| DataError::Parse(format!("잘못된 날짜 ({}): {}", date, e)))?;
    Ok(day.midnight().assume_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    /// 2024-03-15 09:30 EDT = 13:30 UTC
    const MAR_15_OPEN: i64 = 1_710_509_400;
    const DAY: i64 = 86_400;

    fn bar(timestamp: i64, close: f64) -> DailyBar {
        DailyBar {
            timestamp,
            open: 170.0,
            high: 175.0,
            low: 169.5,
            close,
            adjclose: close - 1.0,
            volume: 1_000_000,
        }
    }

    #[test]
    fn test_session_date_uses_new_york() {
        assert_eq!(bar(MAR_15_OPEN, 172.0).session_date(), Some(d(2024, 3, 15)));
        // 00:30 UTC는 뉴욕 기준 전날 저녁
        assert_eq!(
            bar(MAR_15_OPEN + 11 * 3600, 172.0).session_date(),
            Some(d(2024, 3, 15))
        );
    }

    #[test]
    fn test_to_record_maps_adjusted_close() {
        let ticker = Ticker::parse("AAPL").unwrap();
        let record = bar(MAR_15_OPEN, 172.62).to_record(&ticker).unwrap();

        assert_eq!(record.close, dec!(171.62));
        assert_eq!(record.raw_close, dec!(172.62));
        assert_eq!(record.open, dec!(170));
        assert_eq!(record.volume, 1_000_000);
    }

    #[test]
    fn test_invalid_bars_dropped() {
        let ticker = Ticker::parse("AAPL").unwrap();
        let mut nan = bar(MAR_15_OPEN, 172.0);
        nan.open = f64::NAN;
        assert!(nan.to_record(&ticker).is_none());

        let mut zero = bar(MAR_15_OPEN, 172.0);
        zero.low = 0.0;
        assert!(zero.to_record(&ticker).is_none());
    }

    #[test]
    fn test_bars_to_records_filters_range_and_dedups() {
        let ticker = Ticker::parse("MSFT").unwrap();
        let bars = vec![
            bar(MAR_15_OPEN + 3 * DAY, 180.0), // 3/18
            bar(MAR_15_OPEN - DAY, 171.0),     // 3/14
            bar(MAR_15_OPEN, 172.0),           // 3/15
            bar(MAR_15_OPEN + 60, 173.0),      // 3/15 중복
            bar(MAR_15_OPEN + 4 * DAY, 181.0), // 3/19 범위 밖
        ];

        let records = bars_to_records(&ticker, &bars, d(2024, 3, 14), d(2024, 3, 18));
        let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();

        assert_eq!(dates, vec![d(2024, 3, 14), d(2024, 3, 15), d(2024, 3, 18)]);
        assert_eq!(records[1].raw_close, dec!(173));
    }

    #[test]
    fn test_naive_date_to_offset_datetime() {
        let odt = naive_date_to_offset_datetime(d(2024, 2, 29)).unwrap();
        assert_eq!(odt.unix_timestamp(), 1_709_164_800);
    }
}
