//! 다운로드 계획 모듈.
//!
//! 종목별 마지막 저장일과 NYSE 캘린더로 무엇을 받아야 하는지 계산합니다.
//!
//! - 저장된 데이터가 없는 종목: 시작일(`BEGINNING_DATE`)부터
//! - 마지막 저장일 `d`의 다음 거래일이 마지막 완료 세션 이하: `d`부터 (마지막 봉 재수집)
//! - 그 외: 최신 상태, 건너뜀
//!
//! 시작일이 같은 종목끼리 하나의 배치로 묶습니다.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use stock_core::{NyseCalendar, Ticker};

/// 같은 기간을 받는 종목 묶음.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadBatch {
    /// 수집 시작일 (포함)
    pub start: NaiveDate,
    /// 수집 종료일 (포함, 마지막 완료 세션)
    pub end: NaiveDate,
    /// 대상 종목 (정렬됨)
    pub tickers: Vec<Ticker>,
}

/// 다운로드 계획.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadPlan {
    /// 마지막 완료 세션
    pub end: NaiveDate,
    /// 시작일 오름차순 배치
    pub batches: Vec<DownloadBatch>,
    /// 이미 최신인 종목
    pub up_to_date: Vec<Ticker>,
}

impl DownloadPlan {
    /// 받을 것이 없는지 여부.
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// 다운로드 대상 종목 수.
    pub fn ticker_count(&self) -> usize {
        self.batches.iter().map(|b| b.tickers.len()).sum()
    }
}

/// 마지막 저장일 기준 다운로드 계획 생성.
pub fn plan_downloads(
    tickers: &[Ticker],
    last_dates: &HashMap<Ticker, NaiveDate>,
    calendar: &NyseCalendar,
    now: DateTime<Utc>,
    beginning_date: NaiveDate,
) -> DownloadPlan {
    let end = calendar.last_completed_session(now);
    let mut by_start: BTreeMap<NaiveDate, Vec<Ticker>> = BTreeMap::new();
    let mut up_to_date = Vec::new();

    for ticker in tickers {
        let start = match last_dates.get(ticker) {
            None => beginning_date,
            Some(&last) if calendar.next_trading_day(last) <= end => last,
            Some(_) => {
                up_to_date.push(ticker.clone());
                continue;
            }
        };

        if start > end {
            up_to_date.push(ticker.clone());
            continue;
        }
        by_start.entry(start).or_default().push(ticker.clone());
    }

    into_plan(end, by_start, up_to_date)
}

/// 모든 종목을 같은 시작일로 받는 계획 (`--start` 지정 시).
pub fn plan_from_start(
    tickers: &[Ticker],
    start: NaiveDate,
    calendar: &NyseCalendar,
    now: DateTime<Utc>,
) -> DownloadPlan {
    let end = calendar.last_completed_session(now);
    let mut by_start = BTreeMap::new();

    if start <= end && !tickers.is_empty() {
        by_start.insert(start, tickers.to_vec());
        return into_plan(end, by_start, Vec::new());
    }

    into_plan(end, by_start, tickers.to_vec())
}

fn into_plan(
    end: NaiveDate,
    by_start: BTreeMap<NaiveDate, Vec<Ticker>>,
    mut up_to_date: Vec<Ticker>,
) -> DownloadPlan {
    let batches = by_start
        .into_iter()
        .map(|(start, mut tickers)| {
            tickers.sort();
            tickers.dedup();
            DownloadBatch {
                start,
                end,
                tickers,
            }
        })
        .collect();
    up_to_date.sort();

    DownloadPlan {
        end,
        batches,
        up_to_date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn t(symbol: &str) -> Ticker {
        Ticker::parse(symbol).unwrap()
    }

    /// 2024-03-18(월) 21:00 UTC = 장 마감 후
    fn monday_after_close() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 18, 21, 0, 0).unwrap()
    }

    #[test]
    fn test_new_ticker_starts_at_beginning() {
        let cal = NyseCalendar::new();
        let plan = plan_downloads(
            &[t("AAPL")],
            &HashMap::new(),
            &cal,
            monday_after_close(),
            d(2015, 1, 1),
        );

        assert_eq!(plan.end, d(2024, 3, 18));
        assert_eq!(
            plan.batches,
            vec![DownloadBatch {
                start: d(2015, 1, 1),
                end: d(2024, 3, 18),
                tickers: vec![t("AAPL")],
            }]
        );
    }

    #[test]
    fn test_up_to_date_and_stale_tickers() {
        let cal = NyseCalendar::new();
        let last_dates = HashMap::from([
            (t("AAPL"), d(2024, 3, 18)), // 최신
            (t("MSFT"), d(2024, 3, 15)), // 금요일까지: 월요일분 필요
            (t("NVDA"), d(2024, 3, 15)),
            (t("XOM"), d(2024, 3, 1)),
        ]);
        let tickers = [t("NVDA"), t("AAPL"), t("MSFT"), t("XOM"), t("NEW")];

        let plan = plan_downloads(&tickers, &last_dates, &cal, monday_after_close(), d(2015, 1, 1));

        assert_eq!(plan.up_to_date, vec![t("AAPL")]);
        let starts: Vec<NaiveDate> = plan.batches.iter().map(|b| b.start).collect();
        assert_eq!(starts, vec![d(2015, 1, 1), d(2024, 3, 1), d(2024, 3, 15)]);
        assert_eq!(plan.batches[2].tickers, vec![t("MSFT"), t("NVDA")]);
        assert_eq!(plan.ticker_count(), 4);
    }

    #[test]
    fn test_before_close_uses_previous_session() {
        let cal = NyseCalendar::new();
        // 월요일 장중: 마지막 완료 세션은 금요일
        let intraday = Utc.with_ymd_and_hms(2024, 3, 18, 15, 0, 0).unwrap();
        let last_dates = HashMap::from([(t("AAPL"), d(2024, 3, 15))]);

        let plan = plan_downloads(&[t("AAPL")], &last_dates, &cal, intraday, d(2015, 1, 1));
        assert!(plan.is_empty());
        assert_eq!(plan.end, d(2024, 3, 15));
    }

    #[test]
    fn test_holiday_gap_is_not_stale() {
        let cal = NyseCalendar::new();
        // Good Friday 2024-03-29, 토요일 오후
        let saturday = Utc.with_ymd_and_hms(2024, 3, 30, 18, 0, 0).unwrap();
        let last_dates = HashMap::from([(t("AAPL"), d(2024, 3, 28))]);

        let plan = plan_downloads(&[t("AAPL")], &last_dates, &cal, saturday, d(2015, 1, 1));
        assert!(plan.is_empty());
        assert_eq!(plan.up_to_date, vec![t("AAPL")]);
    }

    #[test]
    fn test_beginning_date_in_future() {
        let cal = NyseCalendar::new();
        let plan = plan_downloads(
            &[t("AAPL")],
            &HashMap::new(),
            &cal,
            monday_after_close(),
            d(2030, 1, 1),
        );
        assert!(plan.is_empty());
    }

    #[test]
    fn test_plan_from_start() {
        let cal = NyseCalendar::new();
        let plan = plan_from_start(&[t("MSFT"), t("AAPL")], d(2024, 1, 2), &cal, monday_after_close());

        assert_eq!(plan.batches.len(), 1);
        assert_eq!(plan.batches[0].tickers, vec![t("AAPL"), t("MSFT")]);
        assert_eq!(plan.batches[0].start, d(2024, 1, 2));

        let future = plan_from_start(&[t("AAPL")], d(2030, 1, 1), &cal, monday_after_close());
        assert!(future.is_empty());
    }
}
