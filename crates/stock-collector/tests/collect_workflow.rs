//! 계획 → 수집 → upsert 흐름 통합 테스트 (ArangoDB는 mockito로 대체).

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use mockito::{Matcher, Server};
use rust_decimal_macros::dec;
use serde_json::json;
use std::sync::Mutex;
use stock_collector::modules::{build_plan, collect_prices, CollectOptions};
use stock_collector::CollectorConfig;
use stock_core::{PriceRecord, Ticker};
use stock_data::{PriceRepository, PriceSource};

/// 요청 구간을 기록하고 구간 안의 고정 봉을 돌려주는 소스.
struct RecordingSource {
    calls: Mutex<Vec<(String, NaiveDate, NaiveDate)>>,
}

impl RecordingSource {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl PriceSource for RecordingSource {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn fetch_daily(
        &self,
        ticker: &Ticker,
        start: NaiveDate,
        end: NaiveDate,
    ) -> stock_data::Result<Vec<PriceRecord>> {
        self.calls
            .lock()
            .unwrap()
            .push((ticker.to_string(), start, end));

        // 구간 밖 봉도 섞어서 반환
        let days = [13, 14, 15, 18, 19];
        Ok(days
            .iter()
            .map(|&day| PriceRecord {
                ticker: ticker.clone(),
                date: NaiveDate::from_ymd_opt(2024, 3, day).unwrap(),
                open: dec!(170.1),
                high: dec!(172.5),
                low: dec!(169.8),
                close: dec!(171.2),
                raw_close: dec!(172.0),
                volume: 55_000_000,
            })
            .collect())
    }
}

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

/// 2024-03-18(월) 장 마감 후
fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 18, 22, 0, 0).unwrap()
}

fn config_for(server: &Server) -> CollectorConfig {
    let host_port = server.host_with_port();
    let (host, port) = host_port.rsplit_once(':').unwrap();
    let pairs = [
        ("ADBHOST", host.to_string()),
        ("ADBPORT", port.to_string()),
        ("ADBNAME", "stocks".to_string()),
        ("ADBUSER", "app".to_string()),
        ("ADBPW", "apppw".to_string()),
        ("REQUEST_DELAY_MS", "0".to_string()),
        ("IMPORT_BATCH_SIZE", "2".to_string()),
    ];
    CollectorConfig::from_lookup(move |key| {
        pairs.iter().find(|(k, _)| *k == key).map(|(_, v)| v.clone())
    })
    .unwrap()
}

fn repo_for(config: &CollectorConfig) -> PriceRepository {
    stock_collector::modules::repository(config).unwrap()
}

#[tokio::test]
async fn test_incremental_run_refreshes_last_bar_and_appends() {
    let mut server = Server::new_async().await;

    // AAPL은 금요일(3/15)까지 저장됨, MSFT는 이미 최신, NVDA는 신규
    let last_dates = server
        .mock("POST", "/_db/stocks/_api/cursor")
        .match_body(Matcher::PartialJson(json!({
            "bindVars": { "@collection": "all_stocks", "tickers": ["NVDA", "AAPL", "MSFT"] }
        })))
        .with_status(201)
        .with_body(
            r#"{"result":[{"ticker":"AAPL","last":"2024-03-15"},{"ticker":"MSFT","last":"2024-03-18"}],"hasMore":false}"#,
        )
        .create_async()
        .await;

    // AAPL: 3/15, 3/18 두 건 (배치 크기 2 → 요청 1회)
    let aapl_import = server
        .mock("POST", "/_db/stocks/_api/import")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("collection".into(), "all_stocks".into()),
            Matcher::UrlEncoded("onDuplicate".into(), "replace".into()),
        ]))
        .match_body(Matcher::Json(json!([
            {
                "_key": "AAPL_2024-03-15",
                "ticker": "AAPL",
                "date": "2024-03-15",
                "open": 170.1,
                "high": 172.5,
                "low": 169.8,
                "close": 171.2,
                "raw_close": 172.0,
                "volume": 55_000_000
            },
            {
                "_key": "AAPL_2024-03-18",
                "ticker": "AAPL",
                "date": "2024-03-18",
                "open": 170.1,
                "high": 172.5,
                "low": 169.8,
                "close": 171.2,
                "raw_close": 172.0,
                "volume": 55_000_000
            }
        ])))
        .with_status(201)
        .with_body(r#"{"created":1,"errors":0,"empty":0,"updated":1,"ignored":0,"details":[]}"#)
        .expect(1)
        .create_async()
        .await;

    // NVDA: 시작일부터 3/18까지 네 건 → 배치 2회
    let nvda_import = server
        .mock("POST", "/_db/stocks/_api/import")
        .match_query(Matcher::UrlEncoded("onDuplicate".into(), "replace".into()))
        .match_body(Matcher::Regex("NVDA_2024-03-1".to_string()))
        .with_status(201)
        .with_body(r#"{"created":2,"errors":0,"empty":0,"updated":0,"ignored":0,"details":[]}"#)
        .expect(2)
        .create_async()
        .await;

    let config = config_for(&server);
    let repo = repo_for(&config);
    let options = CollectOptions {
        tickers: Some("nvda, AAPL,MSFT".to_string()),
        ..Default::default()
    };

    let plan = build_plan(&repo, &config, &options, now()).await.unwrap();
    assert_eq!(plan.end, d(18));
    assert_eq!(plan.up_to_date.len(), 1);
    assert_eq!(plan.ticker_count(), 2);

    let source = RecordingSource::new();
    let stats = collect_prices(&source, &repo, &plan, &config.collect)
        .await
        .unwrap();

    last_dates.assert_async().await;
    aapl_import.assert_async().await;
    nvda_import.assert_async().await;

    // 새 종목은 BEGINNING_DATE부터, 기존 종목은 마지막 저장일부터
    let calls = source.calls.lock().unwrap().clone();
    assert_eq!(
        calls,
        vec![
            ("NVDA".to_string(), NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(), d(18)),
            ("AAPL".to_string(), d(15), d(18)),
        ]
    );

    assert_eq!(stats.total, 2);
    assert_eq!(stats.success, 2);
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.total_records, 6);
    assert_eq!(stats.created, 5);
    assert_eq!(stats.updated, 1);
}

#[tokio::test]
async fn test_start_override_skips_last_date_lookup() {
    let mut server = Server::new_async().await;
    let cursor = server
        .mock("POST", "/_db/stocks/_api/cursor")
        .expect(0)
        .create_async()
        .await;

    let config = config_for(&server);
    let repo = repo_for(&config);
    let options = CollectOptions {
        tickers: Some("AAPL".to_string()),
        start: Some(d(14)),
        refresh_indexes: false,
    };

    let plan = build_plan(&repo, &config, &options, now()).await.unwrap();
    cursor.assert_async().await;

    assert_eq!(plan.batches.len(), 1);
    assert_eq!(plan.batches[0].start, d(14));
    assert_eq!(plan.batches[0].end, d(18));
}

#[tokio::test]
async fn test_invalid_explicit_ticker_is_an_error() {
    let server = Server::new_async().await;
    let config = config_for(&server);
    let repo = repo_for(&config);
    let options = CollectOptions {
        tickers: Some("AAPL,BAD TICKER".to_string()),
        ..Default::default()
    };

    assert!(build_plan(&repo, &config, &options, now()).await.is_err());
}

#[tokio::test]
async fn test_fresh_database_plans_from_beginning_date() {
    let mut server = Server::new_async().await;
    // 컬렉션이 아직 없는 데이터베이스
    let cursor = server
        .mock("POST", "/_db/stocks/_api/cursor")
        .with_status(404)
        .with_body(
            r#"{"error":true,"code":404,"errorNum":1203,"errorMessage":"AQL: collection or view not found: all_stocks"}"#,
        )
        .create_async()
        .await;

    let config = config_for(&server);
    let repo = repo_for(&config);
    let options = CollectOptions {
        tickers: Some("AAPL".to_string()),
        ..Default::default()
    };

    let plan = build_plan(&repo, &config, &options, now()).await.unwrap();
    cursor.assert_async().await;

    assert_eq!(plan.batches.len(), 1);
    assert_eq!(plan.batches[0].start, NaiveDate::from_ymd_opt(2015, 1, 1).unwrap());
    assert_eq!(plan.batches[0].end, d(18));
    assert!(plan.up_to_date.is_empty());
}
