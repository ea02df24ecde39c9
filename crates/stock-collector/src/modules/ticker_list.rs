//! 수집 대상 티커 목록 구성 모듈.
//!
//! 최종 목록 = (포함 파일 ∪ 지수 구성 종목 ∪ 픽 CSV) − 제외 파일
//!
//! - 포함/제외 파일: 공백 또는 줄바꿈으로 구분된 심볼
//! - 픽 CSV: `Ticker` 컬럼 (StockRover 내보내기 형식, 마지막 `Summary` 행 제외)
//! - 지수: Russell 1000, Dow Jones, Nasdaq-100 (위키피디아, 로컬 캐시)
//!
//! 파일이 없거나 읽을 수 없으면 경고만 남기고 빈 목록으로 처리합니다.

use crate::config::TickerSourceConfig;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use stock_core::Ticker;
use stock_data::{IndexConstituentProvider, IndexSource};

/// 픽 CSV의 심볼 컬럼.
const PICKS_COLUMN: &str = "Ticker";
/// 픽 CSV 마지막 요약 행 표시.
const PICKS_SUMMARY_ROW: &str = "Summary";

/// 티커 목록 소스.
#[derive(Debug, Clone)]
pub struct TickerSources {
    pub picks_file: PathBuf,
    pub inclusion_file: PathBuf,
    pub exclusion_file: PathBuf,
    pub indexes: Vec<IndexSource>,
    /// 지수 캐시를 무시하고 다시 수집
    pub refresh_indexes: bool,
}

impl TickerSources {
    /// 설정에서 소스 생성 (기본 지수 포함).
    pub fn from_config(config: &TickerSourceConfig, refresh_indexes: bool) -> Self {
        Self {
            picks_file: config.picks_file.clone(),
            inclusion_file: config.inclusion_file.clone(),
            exclusion_file: config.exclusion_file.clone(),
            indexes: IndexSource::defaults(),
            refresh_indexes,
        }
    }
}

/// 티커 목록 구성 (중복 제거, 정렬).
pub async fn build_ticker_list(
    sources: &TickerSources,
    provider: &IndexConstituentProvider,
) -> Vec<Ticker> {
    let inclusion = read_ticker_file(&sources.inclusion_file).await;

    let mut index_tickers = Vec::new();
    for index in &sources.indexes {
        match provider.constituents(index, sources.refresh_indexes).await {
            Ok(tickers) => {
                tracing::debug!(index = %index.name, count = tickers.len(), "지수 구성 종목 추가");
                index_tickers.extend(tickers);
            }
            Err(e) => {
                tracing::warn!(index = %index.name, error = %e, "지수 구성 종목 조회 실패, 건너뜀");
            }
        }
    }

    let picks = read_picks_csv(&sources.picks_file).await;
    let exclusion = read_ticker_file(&sources.exclusion_file).await;

    let tickers = combine(
        &[inclusion.as_slice(), index_tickers.as_slice(), picks.as_slice()],
        &exclusion,
    );

    tracing::info!(
        count = tickers.len(),
        excluded = exclusion.len(),
        "티커 목록 구성 완료"
    );
    tickers
}

/// 여러 목록의 합집합에서 제외 목록을 뺀 정렬된 목록.
pub fn combine(lists: &[&[Ticker]], exclusion: &[Ticker]) -> Vec<Ticker> {
    let excluded: BTreeSet<&Ticker> = exclusion.iter().collect();
    let all: BTreeSet<&Ticker> = lists
        .iter()
        .flat_map(|list| list.iter())
        .filter(|t| !excluded.contains(t))
        .collect();
    all.into_iter().cloned().collect()
}

/// 공백 구분 심볼 텍스트 파싱.
pub fn parse_ticker_text(text: &str) -> Vec<Ticker> {
    text.split_whitespace().filter_map(parse_or_warn).collect()
}

/// 픽 CSV 파싱.
pub fn parse_picks_csv(text: &str) -> Vec<Ticker> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let Some(header) = lines.next() else {
        return Vec::new();
    };
    let header = header.trim_start_matches('\u{feff}');
    let Some(index) = split_csv_line(header)
        .iter()
        .position(|h| h.eq_ignore_ascii_case(PICKS_COLUMN))
    else {
        tracing::warn!("픽 CSV에 '{}' 컬럼이 없습니다", PICKS_COLUMN);
        return Vec::new();
    };

    let mut values: Vec<&str> = lines
        .filter_map(|line| split_csv_line(line).get(index).copied())
        .filter(|v| !v.is_empty())
        .collect();

    if values.last() == Some(&PICKS_SUMMARY_ROW) {
        values.pop();
    }

    values.into_iter().filter_map(parse_or_warn).collect()
}

/// 따옴표를 고려한 CSV 한 줄 분리.
fn split_csv_line(line: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(clean_field(&line[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }
    fields.push(clean_field(&line[start..]));

    fields
}

fn clean_field(field: &str) -> &str {
    field.trim().trim_matches('"').trim()
}

fn parse_or_warn(raw: &str) -> Option<Ticker> {
    match Ticker::parse(raw) {
        Ok(ticker) => Some(ticker),
        Err(e) => {
            tracing::warn!(symbol = raw, error = %e, "심볼 무시");
            None
        }
    }
}

async fn read_optional(path: &Path) -> Option<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Some(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!(path = %path.display(), "파일이 없습니다. 무시합니다");
            None
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "파일 읽기 실패. 무시합니다");
            None
        }
    }
}

/// 심볼 파일 읽기.
pub async fn read_ticker_file(path: &Path) -> Vec<Ticker> {
    read_optional(path)
        .await
        .map(|text| parse_ticker_text(&text))
        .unwrap_or_default()
}

/// 픽 CSV 파일 읽기.
pub async fn read_picks_csv(path: &Path) -> Vec<Ticker> {
    read_optional(path)
        .await
        .map(|text| parse_picks_csv(&text))
        .unwrap_or_default()
}
