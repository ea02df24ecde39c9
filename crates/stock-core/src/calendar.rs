//! NYSE 거래 캘린더.
//!
//! 네트워크 조회 없이 규칙으로 휴장일과 조기 폐장을 계산합니다.
//!
//! # 휴장일
//!
//! | 휴일 | 규칙 |
//! |------|------|
//! | New Year's Day | 1/1 (일요일이면 월요일, 토요일이면 대체 없음) |
//! | Martin Luther King Jr. Day | 1월 셋째 월요일 (1998년부터) |
//! | Washington's Birthday | 2월 셋째 월요일 |
//! | Good Friday | 부활절 2일 전 |
//! | Memorial Day | 5월 마지막 월요일 |
//! | Juneteenth | 6/19 (2022년부터, 주말 대체) |
//! | Independence Day | 7/4 (주말 대체) |
//! | Labor Day | 9월 첫째 월요일 |
//! | Thanksgiving | 11월 넷째 목요일 |
//! | Christmas | 12/25 (주말 대체) |
//!
//! 여기에 임시 휴장일(국장, 허리케인 등)이 더해집니다.
//!
//! # 조기 폐장 (13:00 ET)
//!
//! - 7/4가 화~금요일일 때 7/3
//! - 추수감사절 다음 날
//! - 평일인 12/24

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::America::New_York;
use std::collections::BTreeSet;

/// 정규장 마감 시각 (ET).
const REGULAR_CLOSE: (u32, u32) = (16, 0);
/// 조기 폐장 시각 (ET).
const EARLY_CLOSE: (u32, u32) = (13, 0);

/// 규칙 외 임시 휴장일 (2001년 이후).
const AD_HOC_CLOSURES: [(i32, u32, u32); 10] = [
    (2001, 9, 11),
    (2001, 9, 12),
    (2001, 9, 13),
    (2001, 9, 14),
    (2004, 6, 11),
    (2007, 1, 2),
    (2012, 10, 29),
    (2012, 10, 30),
    (2018, 12, 5),
    (2025, 1, 9),
];

/// NYSE 캘린더.
#[derive(Debug, Clone)]
pub struct NyseCalendar {
    ad_hoc_closures: BTreeSet<NaiveDate>,
}

impl Default for NyseCalendar {
    fn default() -> Self {
        Self::new()
    }
}

impl NyseCalendar {
    /// 알려진 임시 휴장일이 포함된 캘린더 생성.
    pub fn new() -> Self {
        let ad_hoc_closures = AD_HOC_CLOSURES
            .iter()
            .filter_map(|&(y, m, d)| NaiveDate::from_ymd_opt(y, m, d))
            .collect();
        Self { ad_hoc_closures }
    }

    /// 임시 휴장일 추가.
    pub fn with_closure(mut self, date: NaiveDate) -> Self {
        self.ad_hoc_closures.insert(date);
        self
    }

    /// 해당 날짜가 규칙상 휴일인지 확인 (주말 제외).
    pub fn is_holiday(&self, date: NaiveDate) -> bool {
        self.ad_hoc_closures.contains(&date) || holidays(date.year()).contains(&date)
    }

    /// 거래일 여부.
    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !is_weekend(date) && !self.is_holiday(date)
    }

    /// 조기 폐장일 여부.
    pub fn is_early_close(&self, date: NaiveDate) -> bool {
        if !self.is_trading_day(date) {
            return false;
        }

        let year = date.year();
        let (month, day) = (date.month(), date.day());

        if month == 7 && day == 3 {
            let july_4 = date + Duration::days(1);
            return matches!(
                july_4.weekday(),
                Weekday::Tue | Weekday::Wed | Weekday::Thu | Weekday::Fri
            );
        }

        if month == 12 && day == 24 {
            return true;
        }

        thanksgiving(year).map(|t| t + Duration::days(1)) == Some(date)
    }

    /// 해당 거래일의 마감 시각 (UTC). 휴장일이면 `None`.
    pub fn close_time(&self, date: NaiveDate) -> Option<DateTime<Utc>> {
        if !self.is_trading_day(date) {
            return None;
        }

        let (hour, minute) = if self.is_early_close(date) {
            EARLY_CLOSE
        } else {
            REGULAR_CLOSE
        };
        let local = date.and_time(NaiveTime::from_hms_opt(hour, minute, 0)?);

        New_York
            .from_local_datetime(&local)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// `date` 이후(미포함) 첫 거래일.
    pub fn next_trading_day(&self, date: NaiveDate) -> NaiveDate {
        let mut day = date + Duration::days(1);
        while !self.is_trading_day(day) {
            day += Duration::days(1);
        }
        day
    }

    /// `date` 이전(미포함) 마지막 거래일.
    pub fn previous_trading_day(&self, date: NaiveDate) -> NaiveDate {
        let mut day = date - Duration::days(1);
        while !self.is_trading_day(day) {
            day -= Duration::days(1);
        }
        day
    }

    /// `now` 시점 기준으로 마감이 끝난 가장 최근 거래일.
    ///
    /// 장중이거나 장 시작 전이면 직전 거래일을 반환합니다.
    pub fn last_completed_session(&self, now: DateTime<Utc>) -> NaiveDate {
        let today = now.with_timezone(&New_York).date_naive();
        let mut day = if self.is_trading_day(today) {
            today
        } else {
            self.previous_trading_day(today)
        };

        loop {
            match self.close_time(day) {
                Some(close) if close <= now => return day,
                _ => day = self.previous_trading_day(day),
            }
        }
    }

    /// `[start, end]` 범위의 거래일 목록.
    pub fn trading_days_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| self.is_trading_day(*d))
            .collect()
    }
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// 해당 연도의 규칙 기반 휴일 목록.
fn holidays(year: i32) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(10);

    if let Some(new_year) = NaiveDate::from_ymd_opt(year, 1, 1) {
        match new_year.weekday() {
            Weekday::Sun => days.push(new_year + Duration::days(1)),
            Weekday::Sat => {}
            _ => days.push(new_year),
        }
    }

    if year >= 1998 {
        days.extend(nth_weekday(year, 1, Weekday::Mon, 3));
    }
    days.extend(nth_weekday(year, 2, Weekday::Mon, 3));
    days.extend(easter_sunday(year).map(|easter| easter - Duration::days(2)));
    days.extend(last_weekday(year, 5, Weekday::Mon));
    if year >= 2022 {
        days.extend(observed(year, 6, 19));
    }
    days.extend(observed(year, 7, 4));
    days.extend(nth_weekday(year, 9, Weekday::Mon, 1));
    days.extend(thanksgiving(year));
    days.extend(observed(year, 12, 25));

    days
}

/// 토요일이면 금요일, 일요일이면 월요일로 대체.
fn observed(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    })
}

fn thanksgiving(year: i32) -> Option<NaiveDate> {
    nth_weekday(year, 11, Weekday::Thu, 4)
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u8) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
}

/// 해당 월의 마지막 `weekday`.
fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    nth_weekday(year, month, weekday, 5).or_else(|| nth_weekday(year, month, weekday, 4))
}

/// 그레고리력 부활절 (Anonymous Gregorian algorithm).
fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn utc(y: i32, m: u32, day: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, day, h, min, 0).unwrap()
    }

    #[test]
    fn test_easter() {
        assert_eq!(easter_sunday(2024), Some(d(2024, 3, 31)));
        assert_eq!(easter_sunday(2025), Some(d(2025, 4, 20)));
        assert_eq!(easter_sunday(2019), Some(d(2019, 4, 21)));
    }

    #[test]
    fn test_last_weekday_of_month() {
        // 5월 월요일이 다섯 번인 해와 네 번인 해
        assert_eq!(last_weekday(2024, 5, Weekday::Mon), Some(d(2024, 5, 27)));
        assert_eq!(last_weekday(2023, 5, Weekday::Mon), Some(d(2023, 5, 29)));
        assert_eq!(last_weekday(2022, 5, Weekday::Mon), Some(d(2022, 5, 30)));
        assert_eq!(thanksgiving(2023), Some(d(2023, 11, 23)));
    }

    #[test]
    fn test_holidays_2024() {
        let cal = NyseCalendar::new();
        let expected = [
            d(2024, 1, 1),
            d(2024, 1, 15),
            d(2024, 2, 19),
            d(2024, 3, 29),
            d(2024, 5, 27),
            d(2024, 6, 19),
            d(2024, 7, 4),
            d(2024, 9, 2),
            d(2024, 11, 28),
            d(2024, 12, 25),
        ];
        for day in expected {
            assert!(!cal.is_trading_day(day), "{} should be closed", day);
        }
        assert_eq!(cal.trading_days_between(d(2024, 1, 1), d(2024, 12, 31)).len(), 252);
    }

    #[test]
    fn test_observed_rules() {
        let cal = NyseCalendar::new();
        // 2022-01-01 토요일: 2021-12-31은 정상 거래
        assert!(cal.is_trading_day(d(2021, 12, 31)));
        // 2021-12-25 토요일 → 12/24 휴장
        assert!(!cal.is_trading_day(d(2021, 12, 24)));
        // 2022-06-19 일요일 → 6/20 휴장
        assert!(!cal.is_trading_day(d(2022, 6, 20)));
        // Juneteenth 도입 이전
        assert!(cal.is_trading_day(d(2021, 6, 18)));
        // 2023-01-01 일요일 → 1/2 휴장
        assert!(!cal.is_trading_day(d(2023, 1, 2)));
    }

    #[test]
    fn test_ad_hoc_closures() {
        let cal = NyseCalendar::new();
        assert!(!cal.is_trading_day(d(2025, 1, 9)));
        assert!(!cal.is_trading_day(d(2018, 12, 5)));

        let custom = NyseCalendar::new().with_closure(d(2030, 3, 5));
        assert!(!custom.is_trading_day(d(2030, 3, 5)));
    }

    #[test]
    fn test_early_close() {
        let cal = NyseCalendar::new();
        assert!(cal.is_early_close(d(2024, 7, 3)));
        assert!(cal.is_early_close(d(2024, 11, 29)));
        assert!(cal.is_early_close(d(2024, 12, 24)));
        // 2022-07-04 월요일: 7/1 금요일은 정상 마감, 7/3은 일요일
        assert!(!cal.is_early_close(d(2022, 7, 1)));
        assert!(!cal.is_early_close(d(2024, 3, 15)));
    }

    #[test]
    fn test_close_time_dst() {
        let cal = NyseCalendar::new();
        // EST (UTC-5)
        assert_eq!(cal.close_time(d(2024, 1, 5)), Some(utc(2024, 1, 5, 21, 0)));
        // EDT (UTC-4)
        assert_eq!(cal.close_time(d(2024, 3, 15)), Some(utc(2024, 3, 15, 20, 0)));
        // 조기 폐장 (EST)
        assert_eq!(cal.close_time(d(2024, 11, 29)), Some(utc(2024, 11, 29, 18, 0)));
        assert_eq!(cal.close_time(d(2024, 3, 16)), None);
    }

    #[test]
    fn test_next_and_previous_trading_day() {
        let cal = NyseCalendar::new();
        // 금요일 → 월요일
        assert_eq!(cal.next_trading_day(d(2024, 3, 15)), d(2024, 3, 18));
        // Good Friday 건너뛰기
        assert_eq!(cal.next_trading_day(d(2024, 3, 28)), d(2024, 4, 1));
        assert_eq!(cal.previous_trading_day(d(2024, 4, 1)), d(2024, 3, 28));
        // 연말연시
        assert_eq!(cal.next_trading_day(d(2024, 12, 31)), d(2025, 1, 2));
    }

    #[test]
    fn test_last_completed_session() {
        let cal = NyseCalendar::new();
        // 장 마감 1분 전
        assert_eq!(cal.last_completed_session(utc(2024, 3, 15, 19, 59)), d(2024, 3, 14));
        // 마감 직후
        assert_eq!(cal.last_completed_session(utc(2024, 3, 15, 20, 0)), d(2024, 3, 15));
        // 주말
        assert_eq!(cal.last_completed_session(utc(2024, 3, 16, 12, 0)), d(2024, 3, 15));
        // UTC로는 월요일이지만 뉴욕은 일요일 밤
        assert_eq!(cal.last_completed_session(utc(2024, 3, 18, 3, 0)), d(2024, 3, 15));
        // 독립기념일 밤 → 조기 폐장한 7/3
        assert_eq!(cal.last_completed_session(utc(2024, 7, 5, 1, 0)), d(2024, 7, 3));
    }
}
