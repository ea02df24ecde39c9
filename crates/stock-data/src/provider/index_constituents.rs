//! 위키피디아 지수 구성 종목 수집.
//!
//! Russell 1000, Dow Jones Industrial Average, Nasdaq-100 구성 종목을
//! 위키피디아 표에서 읽어 옵니다. 결과는 캐시 디렉터리에 JSON으로 저장하고
//! 다음 실행부터는 캐시를 사용합니다 (위키피디아에 매번 요청하지 않음).
//!
//! ## 표 선택
//! 페이지의 `table.wikitable` 중 요청한 컬럼(`Ticker`, `Symbol`)이 헤더에 있고
//! 행이 가장 많은 표를 사용합니다.

use crate::error::{DataError, Result};
use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use stock_core::Ticker;
use tracing::{debug, info, warn};

const USER_AGENT: &str = concat!("stockdownloader/", env!("CARGO_PKG_VERSION"));

/// 지수 구성 종목 소스 정의.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSource {
    /// 지수 이름 (로그용)
    pub name: String,
    /// 위키피디아 페이지 URL
    pub url: String,
    /// 심볼이 들어있는 컬럼 헤더
    pub column: String,
    /// 캐시 파일 이름
    pub cache_file: String,
}

impl IndexSource {
    pub fn new(
        name: impl Into<String>,
        url: impl Into<String>,
        column: impl Into<String>,
        cache_file: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            column: column.into(),
            cache_file: cache_file.into(),
        }
    }

    pub fn russell_1000() -> Self {
        Self::new(
            "Russell 1000",
            "https://en.wikipedia.org/wiki/Russell_1000_Index",
            "Ticker",
            "Russell_1000_list.json",
        )
    }

    pub fn dow_jones() -> Self {
        Self::new(
            "Dow Jones",
            "https://en.wikipedia.org/wiki/Dow_Jones_Industrial_Average",
            "Symbol",
            "DJI_list.json",
        )
    }

    pub fn nasdaq_100() -> Self {
        Self::new(
            "NASDAQ 100",
            "https://en.wikipedia.org/wiki/Nasdaq-100",
            "Ticker",
            "NASDAQ_100_list.json",
        )
    }

    /// 기본 지수 목록.
    pub fn defaults() -> Vec<Self> {
        vec![Self::russell_1000(), Self::dow_jones(), Self::nasdaq_100()]
    }
}

/// 캐시 파일 형식.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedConstituents {
    index: String,
    fetched_at: DateTime<Utc>,
    symbols: Vec<String>,
}

/// 지수 구성 종목 제공자.
pub struct IndexConstituentProvider {
    client: reqwest::Client,
    cache_dir: PathBuf,
}

impl IndexConstituentProvider {
    /// 새 제공자 생성.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            cache_dir: cache_dir.into(),
        })
    }

    fn cache_path(&self, source: &IndexSource) -> PathBuf {
        self.cache_dir.join(&source.cache_file)
    }

    /// 구성 종목 조회.
    ///
    /// 캐시가 있으면 캐시를 쓰고, 없거나 읽을 수 없거나 `refresh`면 새로 수집해
    /// 캐시에 저장합니다.
    pub async fn constituents(&self, source: &IndexSource, refresh: bool) -> Result<Vec<Ticker>> {
        let path = self.cache_path(source);

        if !refresh {
            match load_cache(&path).await {
                Ok(cached) => {
                    debug!(
                        index = %source.name,
                        count = cached.symbols.len(),
                        fetched_at = %cached.fetched_at,
                        "캐시에서 구성 종목 로드"
                    );
                    return Ok(to_tickers(&source.name, &cached.symbols));
                }
                Err(e) => {
                    debug!(index = %source.name, path = %path.display(), error = %e, "캐시 없음, 새로 수집");
                }
            }
        }

        let symbols = self.scrape(source).await?;
        let cached = CachedConstituents {
            index: source.name.clone(),
            fetched_at: Utc::now(),
            symbols,
        };

        if let Err(e) = save_cache(&path, &cached).await {
            warn!(index = %source.name, path = %path.display(), error = %e, "캐시 저장 실패");
        }

        info!(index = %source.name, count = cached.symbols.len(), "구성 종목 수집 완료");
        Ok(to_tickers(&source.name, &cached.symbols))
    }

    /// 위키피디아 페이지에서 구성 종목 수집.
    pub async fn scrape(&self, source: &IndexSource) -> Result<Vec<String>> {
        debug!(index = %source.name, url = %source.url, "위키피디아 요청");

        let response = self.client.get(&source.url).send().await?;
        if !response.status().is_success() {
            return Err(DataError::Fetch(format!(
                "{} 페이지 요청 실패: {}",
                source.name,
                response.status()
            )));
        }

        let html = response.text().await?;
        parse_constituent_table(&html, &source.column)
    }
}

/// HTML에서 지정 컬럼의 값 목록을 추출.
pub fn parse_constituent_table(html: &str, column: &str) -> Result<Vec<String>> {
    let document = Html::parse_document(html);
    let table_selector = selector("table.wikitable")?;
    let row_selector = selector("tr")?;
    let cell_selector = selector("th, td")?;

    let mut best: Vec<String> = Vec::new();

    for table in document.select(&table_selector) {
        let mut rows = table.select(&row_selector);

        let Some(header) = rows.next() else {
            continue;
        };
        let Some(index) = header
            .select(&cell_selector)
            .position(|cell| cell_text(&cell).eq_ignore_ascii_case(column))
        else {
            continue;
        };

        let values: Vec<String> = rows
            .filter_map(|row| row.select(&cell_selector).nth(index))
            .map(|cell| cell_text(&cell))
            .filter(|text| !text.is_empty())
            .collect();

        if values.len() > best.len() {
            best = values;
        }
    }

    if best.is_empty() {
        return Err(DataError::Parse(format!(
            "'{}' 컬럼을 가진 표를 찾을 수 없습니다",
            column
        )));
    }

    Ok(best)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| DataError::Parse(format!("셀렉터 오류 ({}): {}", css, e)))
}

/// 셀 텍스트 (각주 `[1]` 제거).
fn cell_text(cell: &ElementRef<'_>) -> String {
    let text = cell.text().collect::<String>();
    let text = text.split('[').next().unwrap_or_default();
    text.trim().to_string()
}

fn to_tickers(index: &str, symbols: &[String]) -> Vec<Ticker> {
    symbols
        .iter()
        .filter_map(|s| match Ticker::parse(s) {
            Ok(t) => Some(t),
            Err(e) => {
                warn!(index = index, symbol = %s, error = %e, "심볼 무시");
                None
            }
        })
        .collect()
}

async fn load_cache(path: &Path) -> Result<CachedConstituents> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn save_cache(path: &Path, cached: &CachedConstituents) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let json = serde_json::to_vec_pretty(cached)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}
