//! 환경변수 기반 설정 모듈.
//!
//! `.env` 파일이 있으면 먼저 읽습니다 (`dotenvy`).

use crate::error::CollectorError;
use crate::Result;
use chrono::NaiveDate;
use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;
use stock_data::storage::prices::DEFAULT_COLLECTION;
use stock_data::ArangoConfig;

/// 기본 수집 시작일.
pub const DEFAULT_BEGINNING_DATE: &str = "2015-01-01";

/// Collector 전체 설정
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// ArangoDB 접속 설정
    pub arango: ArangoSettings,
    /// 공유 컬렉션 이름
    pub collection: String,
    /// 티커 목록 소스 설정
    pub tickers: TickerSourceConfig,
    /// 가격 수집 설정
    pub collect: PriceCollectConfig,
    /// 데몬 모드 설정
    pub daemon: DaemonConfig,
}

/// ArangoDB 접속 설정
#[derive(Debug, Clone)]
pub struct ArangoSettings {
    /// 호스트
    pub host: String,
    /// 포트
    pub port: u16,
    /// http / https
    pub scheme: String,
    /// 데이터베이스 이름
    pub database: String,
    /// 애플리케이션 사용자
    pub user: String,
    /// 애플리케이션 사용자 비밀번호
    pub password: SecretString,
    /// root 계정 (초기화용, 선택)
    pub root_user: Option<String>,
    /// root 비밀번호
    pub root_password: Option<SecretString>,
}

/// 티커 목록 소스 설정
#[derive(Debug, Clone)]
pub struct TickerSourceConfig {
    /// 픽 CSV (`Ticker` 컬럼)
    pub picks_file: PathBuf,
    /// 추가 종목 파일
    pub inclusion_file: PathBuf,
    /// 제외 종목 파일
    pub exclusion_file: PathBuf,
    /// 지수 구성 종목 캐시 디렉터리
    pub index_cache_dir: PathBuf,
}

/// 가격 수집 설정
#[derive(Debug, Clone)]
pub struct PriceCollectConfig {
    /// 데이터가 없는 종목의 수집 시작일
    pub beginning_date: NaiveDate,
    /// import 요청당 문서 수
    pub import_batch_size: usize,
    /// API 요청 간 딜레이 (밀리초)
    pub request_delay_ms: u64,
}

/// 데몬 모드 설정
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// 워크플로우 실행 주기 (분 단위)
    pub interval_minutes: u64,
}

impl CollectorConfig {
    /// 환경변수에서 설정 로드
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 키 조회 함수로 설정 로드.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).filter(|v| !v.is_empty()).ok_or_else(|| {
                CollectorError::Config(format!("{} 환경변수가 설정되지 않았습니다", key))
            })
        };

        let beginning_raw =
            lookup("BEGINNING_DATE").unwrap_or_else(|| DEFAULT_BEGINNING_DATE.to_string());
        let beginning_date = NaiveDate::parse_from_str(&beginning_raw, "%Y-%m-%d").map_err(|e| {
            CollectorError::Config(format!("BEGINNING_DATE 형식 오류 ({}): {}", beginning_raw, e))
        })?;

        let interval_minutes = parse_or(&lookup, "DAEMON_INTERVAL_MINUTES", 1440);
        if interval_minutes == 0 {
            return Err(CollectorError::Config(
                "DAEMON_INTERVAL_MINUTES는 1 이상이어야 합니다".to_string(),
            ));
        }

        let root_user = lookup("ADBROOT").filter(|v| !v.is_empty());
        let root_password = lookup("ADBROOTPW").map(SecretString::from);

        Ok(Self {
            arango: ArangoSettings {
                host: required("ADBHOST")?,
                port: parse_or(&lookup, "ADBPORT", 8529),
                scheme: lookup("ADBSCHEME").unwrap_or_else(|| "http".to_string()),
                database: required("ADBNAME")?,
                user: required("ADBUSER")?,
                password: SecretString::from(required("ADBPW")?),
                root_user,
                root_password,
            },
            collection: lookup("STOCKS_COLLECTION")
                .unwrap_or_else(|| DEFAULT_COLLECTION.to_string()),
            tickers: TickerSourceConfig {
                picks_file: path_or(&lookup, "PICKS_FILE", "./mypicks.csv"),
                inclusion_file: path_or(&lookup, "INCLUSION_FILE", "./inclusion_list.txt"),
                exclusion_file: path_or(&lookup, "EXCLUSION_FILE", "./exclusion_list.txt"),
                index_cache_dir: path_or(&lookup, "INDEX_CACHE_DIR", "."),
            },
            collect: PriceCollectConfig {
                beginning_date,
                import_batch_size: parse_or(&lookup, "IMPORT_BATCH_SIZE", 1000),
                request_delay_ms: parse_or(&lookup, "REQUEST_DELAY_MS", 500),
            },
            daemon: DaemonConfig { interval_minutes },
        })
    }
}

impl ArangoSettings {
    /// 서버 URL.
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// 애플리케이션 사용자 접속 설정.
    pub fn app_config(&self) -> ArangoConfig {
        ArangoConfig::new(
            self.url(),
            self.database.clone(),
            self.user.clone(),
            self.password.clone(),
        )
    }

    /// root 계정 접속 설정 (`_system` 대상). root 계정이 없으면 `None`.
    pub fn root_config(&self) -> Option<ArangoConfig> {
        let user = self.root_user.as_ref()?;
        let password = self.root_password.clone()?;
        Some(ArangoConfig::new(
            self.url(),
            stock_data::storage::arango::SYSTEM_DATABASE,
            user.clone(),
            password,
        ))
    }
}

impl PriceCollectConfig {
    /// API 요청 간 딜레이를 Duration으로 반환
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

impl DaemonConfig {
    /// 워크플로우 실행 주기를 Duration으로 반환
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}

/// 값을 파싱 (없거나 실패 시 기본값 사용)
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

fn path_or<F>(lookup: &F, key: &str, default: &str) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    PathBuf::from(lookup(key).unwrap_or_else(|| default.to_string()))
}
