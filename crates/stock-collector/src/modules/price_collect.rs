//! 일봉 가격 수집 모듈.

use super::download_plan::{plan_downloads, plan_from_start, DownloadPlan};
use super::ticker_list::{build_ticker_list, TickerSources};
use crate::config::PriceCollectConfig;
use crate::{CollectionStats, CollectorConfig, Result};
use chrono::{DateTime, NaiveDate, Utc};
use std::time::Instant;
use stock_core::{NyseCalendar, PriceRecord, Ticker};
use stock_data::{IndexConstituentProvider, PriceRepository, PriceSource, YahooPriceSource};

/// 수집 실행 옵션 (CLI 인자).
#[derive(Debug, Clone, Default)]
pub struct CollectOptions {
    /// 특정 종목만 수집 (쉼표로 구분, 예: "AAPL,MSFT")
    pub tickers: Option<String>,
    /// 종목별 시작일 대신 사용할 시작일
    pub start: Option<NaiveDate>,
    /// 지수 구성 종목 캐시 무시
    pub refresh_indexes: bool,
}

/// 대상 종목을 정하고 다운로드 계획 생성.
pub async fn build_plan(
    repo: &PriceRepository,
    config: &CollectorConfig,
    options: &CollectOptions,
    now: DateTime<Utc>,
) -> Result<DownloadPlan> {
    let tickers = match options.tickers {
        Some(ref s) => {
            let tickers = s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(Ticker::parse)
                .collect::<std::result::Result<Vec<_>, _>>()?;
            tracing::info!(count = tickers.len(), "특정 종목 수집");
            tickers
        }
        None => {
            let sources = TickerSources::from_config(&config.tickers, options.refresh_indexes);
            let provider = IndexConstituentProvider::new(&config.tickers.index_cache_dir)?;
            build_ticker_list(&sources, &provider).await
        }
    };

    let calendar = NyseCalendar::new();
    let plan = match options.start {
        Some(start) => plan_from_start(&tickers, start, &calendar, now),
        None => {
            let last_dates = repo.last_dates(&tickers).await?;
            plan_downloads(
                &tickers,
                &last_dates,
                &calendar,
                now,
                config.collect.beginning_date,
            )
        }
    };

    tracing::info!(
        end = %plan.end,
        batches = plan.batches.len(),
        download = plan.ticker_count(),
        up_to_date = plan.up_to_date.len(),
        "다운로드 계획 생성 완료"
    );
    Ok(plan)
}

/// 계획에 따라 가격을 받아 저장.
///
/// 종목 단위 실패는 통계에만 반영하고 다음 종목으로 넘어갑니다.
pub async fn collect_prices(
    source: &dyn PriceSource,
    repo: &PriceRepository,
    plan: &DownloadPlan,
    config: &PriceCollectConfig,
) -> Result<CollectionStats> {
    let start = Instant::now();
    let mut stats = CollectionStats::new();
    stats.skipped = plan.up_to_date.len();

    if plan.is_empty() {
        tracing::info!(end = %plan.end, "nothing to download");
        stats.elapsed = start.elapsed();
        return Ok(stats);
    }

    let total = plan.ticker_count();
    tracing::info!(source = source.name(), tickers = total, "가격 수집 시작");

    for batch in &plan.batches {
        for ticker in &batch.tickers {
            stats.total += 1;

            tracing::debug!(
                ticker = %ticker,
                start = %batch.start,
                end = %batch.end,
                progress = format!("{}/{}", stats.total, total),
                "수집 시작"
            );

            match source.fetch_daily(ticker, batch.start, batch.end).await {
                Ok(records) => {
                    let records = keep_in_range(records, batch.start, batch.end);
                    if records.is_empty() {
                        stats.empty += 1;
                        tracing::debug!(ticker = %ticker, "데이터 없음");
                    } else {
                        stats.total_records += records.len();
                        match repo.upsert(&records, config.import_batch_size).await {
                            Ok(summary) => {
                                stats.success += 1;
                                stats.created += summary.created;
                                stats.updated += summary.updated;
                                stats.rejected += summary.errors;
                                tracing::info!(
                                    ticker = %ticker,
                                    records = records.len(),
                                    created = summary.created,
                                    updated = summary.updated,
                                    "수집 및 저장 완료"
                                );
                            }
                            Err(e) => {
                                stats.errors += 1;
                                tracing::error!(ticker = %ticker, error = %e, "저장 실패");
                            }
                        }
                    }
                }
                Err(e) => {
                    stats.errors += 1;
                    tracing::error!(ticker = %ticker, error = %e, "조회 실패");
                }
            }

            // Rate limiting
            tokio::time::sleep(config.request_delay()).await;
        }
    }

    stats.elapsed = start.elapsed();
    Ok(stats)
}

/// 요청 구간 밖이거나 값이 잘못된 봉 제거.
fn keep_in_range(mut records: Vec<PriceRecord>, start: NaiveDate, end: NaiveDate) -> Vec<PriceRecord> {
    let before = records.len();
    records.retain(|r| r.date >= start && r.date <= end && r.is_valid());

    if records.len() < before {
        tracing::debug!(dropped = before - records.len(), "범위 밖 또는 잘못된 봉 제외");
    }
    records
}

/// 계획 생성부터 저장까지 한 번 실행.
pub async fn collect(
    repo: &PriceRepository,
    config: &CollectorConfig,
    options: &CollectOptions,
) -> Result<CollectionStats> {
    let plan = build_plan(repo, config, options, Utc::now()).await?;
    let source = YahooPriceSource::new()?;
    collect_prices(&source, repo, &plan, &config.collect).await
}
