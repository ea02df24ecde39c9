//! 공유 컬렉션 기반 가격 저장소.
//!
//! 모든 종목의 일봉이 하나의 컬렉션(기본 `all_stocks`)에 저장됩니다.
//! 종목별 테이블 대신 하나의 컬렉션을 쓰므로 나중에 종목 간 관계를
//! 그래프 엣지로 연결할 수 있습니다.
//!
//! # 인덱스
//!
//! | 필드 | 유니크 |
//! |------|--------|
//! | `[ticker, date]` | O |
//! | `[ticker]` | X |
//! | `[date]` | X |

use crate::error::Result;
use crate::storage::arango::{ArangoClient, ImportSummary, OnDuplicate};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use stock_core::{PriceRecord, Ticker};
use tracing::{debug, info, instrument, warn};

/// 기본 컬렉션 이름.
pub const DEFAULT_COLLECTION: &str = "all_stocks";

/// 종목별 마지막 저장일 조회.
const LAST_DATES_AQL: &str = r#"
FOR doc IN @@collection
    FILTER doc.ticker IN @tickers
    COLLECT ticker = doc.ticker AGGREGATE last = MAX(doc.date)
    RETURN { ticker, last }
"#;

/// 단일 종목 마지막 저장일 조회.
const LAST_DATE_AQL: &str = r#"
FOR doc IN @@collection
    FILTER doc.ticker == @ticker
    SORT doc.date DESC
    LIMIT 1
    RETURN doc.date
"#;

/// 컬렉션 요약 조회.
const SUMMARY_AQL: &str = r#"
LET tickers = LENGTH(FOR doc IN @@collection COLLECT t = doc.ticker RETURN 1)
LET range = FIRST(
    FOR doc IN @@collection
        COLLECT AGGREGATE first = MIN(doc.date), last = MAX(doc.date), documents = COUNT(1)
        RETURN { first, last, documents }
)
RETURN {
    documents: range.documents || 0,
    tickers: tickers,
    first_date: range.first,
    last_date: range.last
}
"#;

/// 종목 조회 결과 행.
#[derive(Debug, Deserialize)]
struct LastDateRow {
    ticker: String,
    last: Option<NaiveDate>,
}

/// 컬렉션 요약.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CollectionSummary {
    pub documents: u64,
    pub tickers: u64,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
}

/// 가격 저장소.
#[derive(Debug, Clone)]
pub struct PriceRepository {
    client: ArangoClient,
    collection: String,
}

impl PriceRepository {
    pub fn new(client: ArangoClient, collection: impl Into<String>) -> Self {
        Self {
            client,
            collection: collection.into(),
        }
    }

    /// 컬렉션 이름.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// 내부 클라이언트.
    pub fn client(&self) -> &ArangoClient {
        &self.client
    }

    /// 컬렉션과 인덱스 보장. 새로 생성했으면 `true`.
    #[instrument(skip(self), fields(collection = %self.collection))]
    pub async fn ensure_collection(&self) -> Result<bool> {
        let created = if self.client.collection_exists(&self.collection).await? {
            debug!("기존 컬렉션 사용");
            false
        } else {
            match self.client.create_collection(&self.collection).await {
                Ok(()) => {
                    info!("컬렉션 생성");
                    true
                }
                // 동시에 다른 프로세스가 만든 경우
                Err(e) if e.is_conflict() => false,
                Err(e) => return Err(e),
            }
        };

        self.client
            .ensure_persistent_index(&self.collection, &["ticker", "date"], true)
            .await?;
        self.client
            .ensure_persistent_index(&self.collection, &["ticker"], false)
            .await?;
        self.client
            .ensure_persistent_index(&self.collection, &["date"], false)
            .await?;

        Ok(created)
    }

    /// 종목별 마지막 저장일. 데이터가 없는 종목은 결과에 없습니다.
    #[instrument(skip(self, tickers), fields(tickers = tickers.len()))]
    pub async fn last_dates(&self, tickers: &[Ticker]) -> Result<HashMap<Ticker, NaiveDate>> {
        if tickers.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<LastDateRow> = self
            .query_stored(
                LAST_DATES_AQL,
                json!({ "@collection": self.collection, "tickers": tickers }),
            )
            .await?;

        let mut result = HashMap::with_capacity(rows.len());
        for row in rows {
            let Some(last) = row.last else { continue };
            match Ticker::parse(&row.ticker) {
                Ok(ticker) => {
                    result.insert(ticker, last);
                }
                Err(e) => warn!(ticker = %row.ticker, error = %e, "저장된 티커 파싱 실패"),
            }
        }

        debug!(found = result.len(), "마지막 저장일 조회 완료");
        Ok(result)
    }

    /// 단일 종목 마지막 저장일.
    pub async fn last_date(&self, ticker: &Ticker) -> Result<Option<NaiveDate>> {
        let rows: Vec<Option<NaiveDate>> = self
            .query_stored(
                LAST_DATE_AQL,
                json!({ "@collection": self.collection, "ticker": ticker }),
            )
            .await?;
        Ok(rows.into_iter().next().flatten())
    }

    /// 레코드 upsert. 같은 `_key`는 교체됩니다.
    #[instrument(skip(self, records), fields(collection = %self.collection, count = records.len()))]
    pub async fn upsert(&self, records: &[PriceRecord], batch_size: usize) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();

        for chunk in records.chunks(batch_size.max(1)) {
            let documents: Vec<_> = chunk.iter().map(PriceRecord::to_document).collect();
            let result = self
                .client
                .import_documents(&self.collection, &documents, OnDuplicate::Replace)
                .await?;

            if result.errors > 0 {
                warn!(
                    errors = result.errors,
                    details = ?result.details,
                    "일부 문서 저장 실패"
                );
            }
            summary.merge(result);
        }

        Ok(summary)
    }

    /// 컬렉션 요약. 컬렉션이 아직 없으면 빈 요약.
    pub async fn summary(&self) -> Result<CollectionSummary> {
        let rows: Vec<CollectionSummary> = self
            .query_stored(SUMMARY_AQL, json!({ "@collection": self.collection }))
            .await?;
        Ok(rows.into_iter().next().unwrap_or_default())
    }

    /// 저장 데이터 조회. 컬렉션이 없으면(404) 저장된 데이터가 없는 것으로 봅니다.
    async fn query_stored<T: DeserializeOwned>(&self, aql: &str, bind_vars: Value) -> Result<Vec<T>> {
        match self.client.query(aql, bind_vars).await {
            Ok(rows) => Ok(rows),
            Err(e) if e.is_not_found() => {
                debug!(collection = %self.collection, "컬렉션 없음, 저장된 데이터 없음으로 처리");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}
