//! 데이터베이스 초기화 모듈.
//!
//! root 계정으로 데이터베이스와 애플리케이션 사용자를 만들고,
//! 애플리케이션 사용자로 공유 컬렉션과 인덱스를 보장합니다.

use crate::error::CollectorError;
use crate::{CollectorConfig, Result};
use stock_data::{ArangoClient, PriceRepository};

/// 애플리케이션 사용자에게 부여하는 권한.
const APP_GRANT: &str = "rw";

/// root 계정으로 전체 초기화 후 저장소 반환.
pub async fn init_database(config: &CollectorConfig) -> Result<PriceRepository> {
    let settings = &config.arango;
    let root_config = settings.root_config().ok_or_else(|| {
        CollectorError::Config("초기화에는 ADBROOT/ADBROOTPW 환경변수가 필요합니다".to_string())
    })?;

    let root = ArangoClient::new(root_config)?;
    let version = root.server_version().await?;
    tracing::info!(server = %version.server, version = %version.version, "ArangoDB 연결 성공");

    if root.database_exists(&settings.database).await? {
        tracing::debug!(database = %settings.database, "기존 데이터베이스 사용");
    } else {
        match root.create_database(&settings.database).await {
            Ok(()) => tracing::info!(database = %settings.database, "데이터베이스 생성"),
            Err(e) if e.is_conflict() => {}
            Err(e) => return Err(e.into()),
        }
    }

    if root.user_exists(&settings.user).await? {
        tracing::debug!(user = %settings.user, "기존 사용자 사용");
    } else {
        root.create_user(&settings.user, &settings.password).await?;
        tracing::info!(user = %settings.user, "사용자 생성");
    }

    if let Err(e) = root
        .grant_database_access(&settings.user, &settings.database, APP_GRANT)
        .await
    {
        tracing::warn!(
            user = %settings.user,
            database = %settings.database,
            error = %e,
            "권한 부여 실패, 계속 진행"
        );
    }

    open_repository(config).await
}

/// 저장소 연결.
///
/// root 계정이 설정되어 있으면 먼저 [`init_database`]를 수행합니다.
pub async fn connect(config: &CollectorConfig) -> Result<PriceRepository> {
    if config.arango.root_config().is_some() {
        return init_database(config).await;
    }
    open_repository(config).await
}

/// 애플리케이션 사용자 저장소 (요청 없음, 읽기 전용 명령용).
pub fn repository(config: &CollectorConfig) -> Result<PriceRepository> {
    let client = ArangoClient::new(config.arango.app_config())?;
    Ok(PriceRepository::new(client, config.collection.clone()))
}

/// 애플리케이션 사용자로 컬렉션 보장.
async fn open_repository(config: &CollectorConfig) -> Result<PriceRepository> {
    let repo = repository(config)?;

    if repo.ensure_collection().await? {
        tracing::info!(collection = %repo.collection(), "공유 컬렉션 준비 완료 (신규)");
    } else {
        tracing::info!(collection = %repo.collection(), "공유 컬렉션 준비 완료");
    }
    Ok(repo)
}
