//! ArangoDB HTTP API 클라이언트.
//!
//! 수집기에 필요한 만큼의 REST 엔드포인트만 감쌉니다:
//!
//! | 기능 | 엔드포인트 |
//! |------|------------|
//! | 데이터베이스 | `GET/POST /_api/database` |
//! | 사용자/권한 | `GET/POST /_api/user`, `PUT /_api/user/{user}/database/{db}` |
//! | 컬렉션 | `GET/POST /_api/collection` |
//! | 인덱스 | `POST /_api/index?collection=` |
//! | AQL | `POST /_api/cursor`, `PUT /_api/cursor/{id}` |
//! | 대량 저장 | `POST /_api/import?collection=&type=list` |
//!
//! 모든 요청은 Basic 인증을 사용합니다.
//!
//! # 사용 예제
//!
//! ```rust,ignore
//! let client = ArangoClient::new(ArangoConfig::new("http://localhost:8529", "stocks", "app", pw))?;
//! let rows: Vec<String> = client.query("RETURN 'ok'", json!({})).await?;
//! ```

use crate::error::{DataError, Result};
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

/// 시스템 데이터베이스 이름.
pub const SYSTEM_DATABASE: &str = "_system";

/// 커서 배치 크기.
const CURSOR_BATCH_SIZE: usize = 1000;

/// 연결 설정.
#[derive(Debug, Clone)]
pub struct ArangoConfig {
    /// 서버 URL (예: `http://localhost:8529`)
    pub url: String,
    /// 대상 데이터베이스
    pub database: String,
    /// 사용자 이름
    pub username: String,
    /// 비밀번호
    pub password: SecretString,
    /// 요청 타임아웃
    pub timeout: Duration,
}

impl ArangoConfig {
    pub fn new(
        url: impl Into<String>,
        database: impl Into<String>,
        username: impl Into<String>,
        password: SecretString,
    ) -> Self {
        Self {
            url: url.into(),
            database: database.into(),
            username: username.into(),
            password,
            timeout: Duration::from_secs(60),
        }
    }
}

/// 대량 저장 시 중복 `_key` 처리 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnDuplicate {
    /// 오류로 처리
    Error,
    /// 기존 문서에 병합
    Update,
    /// 기존 문서를 교체
    Replace,
    /// 새 문서 무시
    Ignore,
}

impl OnDuplicate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Update => "update",
            Self::Replace => "replace",
            Self::Ignore => "ignore",
        }
    }
}

/// `/_api/import` 결과.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ImportSummary {
    #[serde(default)]
    pub created: usize,
    #[serde(default)]
    pub errors: usize,
    #[serde(default)]
    pub empty: usize,
    #[serde(default)]
    pub updated: usize,
    #[serde(default)]
    pub ignored: usize,
    /// 문서별 오류 메시지 (`details=true`)
    #[serde(default)]
    pub details: Vec<String>,
}

impl ImportSummary {
    /// 저장(생성 + 갱신)된 문서 수.
    pub fn written(&self) -> usize {
        self.created + self.updated
    }

    /// 다른 배치 결과를 합산.
    pub fn merge(&mut self, other: ImportSummary) {
        self.created += other.created;
        self.errors += other.errors;
        self.empty += other.empty;
        self.updated += other.updated;
        self.ignored += other.ignored;
        self.details.extend(other.details);
    }
}

/// 인덱스 생성 응답.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexInfo {
    pub id: String,
    #[serde(rename = "isNewlyCreated", default)]
    pub is_newly_created: bool,
}

/// 서버 버전 정보.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerVersion {
    pub server: String,
    pub version: String,
}

/// ArangoDB 오류 응답 본문.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "errorNum", default)]
    error_num: i64,
    #[serde(rename = "errorMessage", default)]
    error_message: String,
}

/// `result` 필드를 가진 응답.
#[derive(Debug, Deserialize)]
struct ResultBody<T> {
    result: T,
}

/// 커서 응답.
#[derive(Debug, Deserialize)]
struct CursorBody<T> {
    #[serde(default = "Vec::new")]
    result: Vec<T>,
    #[serde(rename = "hasMore", default)]
    has_more: bool,
    #[serde(default)]
    id: Option<String>,
}

#[derive(Serialize)]
struct CursorRequest<'a> {
    query: &'a str,
    #[serde(rename = "bindVars")]
    bind_vars: &'a Value,
    #[serde(rename = "batchSize")]
    batch_size: usize,
}

/// ArangoDB HTTP 클라이언트.
#[derive(Clone)]
pub struct ArangoClient {
    client: reqwest::Client,
    base_url: Url,
    database: String,
    username: String,
    password: SecretString,
}

impl std::fmt::Debug for ArangoClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArangoClient")
            .field("base_url", &self.base_url.as_str())
            .field("database", &self.database)
            .field("username", &self.username)
            .finish()
    }
}

impl ArangoClient {
    /// 새 클라이언트 생성.
    pub fn new(config: ArangoConfig) -> Result<Self> {
        let base_url = Url::parse(&config.url)
            .map_err(|e| DataError::Parse(format!("잘못된 ArangoDB URL ({}): {}", config.url, e)))?;
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            client,
            base_url,
            database: config.database,
            username: config.username,
            password: config.password,
        })
    }

    /// 같은 연결/계정으로 다른 데이터베이스를 대상으로 하는 클라이언트.
    pub fn for_database(&self, database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            ..self.clone()
        }
    }

    /// 대상 데이터베이스 이름.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// 사용자 이름.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// `/_db/{database}/{segments...}` URL.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DataError::Parse(format!("base URL에 경로를 붙일 수 없습니다: {}", self.base_url)))?
            .pop_if_empty()
            .push("_db")
            .push(&self.database)
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.url(segments)?;
        Ok(self
            .client
            .request(method, url)
            .basic_auth(&self.username, Some(self.password.expose_secret())))
    }

    /// 요청 전송 후 성공 응답을 역직렬화. 실패 응답은 [`DataError::Arango`].
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let text = response.text().await.unwrap_or_default();
        Err(arango_error(status, &text))
    }

    /// 서버 버전 조회 (연결 확인용).
    pub async fn server_version(&self) -> Result<ServerVersion> {
        self.send(self.request(Method::GET, &["_api", "version"])?).await
    }

    // ==================== 데이터베이스 / 사용자 ====================

    /// 데이터베이스 존재 여부. `_system` 대상 클라이언트에서 호출해야 합니다.
    pub async fn database_exists(&self, name: &str) -> Result<bool> {
        let body: ResultBody<Vec<String>> = self
            .send(self.request(Method::GET, &["_api", "database"])?)
            .await?;
        Ok(body.result.iter().any(|db| db == name))
    }

    /// 데이터베이스 생성.
    #[instrument(skip(self))]
    pub async fn create_database(&self, name: &str) -> Result<()> {
        let _: Value = self
            .send(
                self.request(Method::POST, &["_api", "database"])?
                    .json(&json!({ "name": name })),
            )
            .await?;
        Ok(())
    }

    /// 사용자 존재 여부.
    pub async fn user_exists(&self, user: &str) -> Result<bool> {
        match self
            .send::<Value>(self.request(Method::GET, &["_api", "user", user])?)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// 활성 사용자 생성.
    #[instrument(skip(self, password))]
    pub async fn create_user(&self, user: &str, password: &SecretString) -> Result<()> {
        let _: Value = self
            .send(self.request(Method::POST, &["_api", "user"])?.json(&json!({
                "user": user,
                "passwd": password.expose_secret(),
                "active": true,
            })))
            .await?;
        Ok(())
    }

    /// 사용자에게 데이터베이스 권한 부여 (`rw`, `ro`, `none`).
    #[instrument(skip(self))]
    pub async fn grant_database_access(&self, user: &str, database: &str, grant: &str) -> Result<()> {
        let _: Value = self
            .send(
                self.request(Method::PUT, &["_api", "user", user, "database", database])?
                    .json(&json!({ "grant": grant })),
            )
            .await?;
        Ok(())
    }

    // ==================== 컬렉션 / 인덱스 ====================

    /// 컬렉션 존재 여부.
    pub async fn collection_exists(&self, name: &str) -> Result<bool> {
        match self
            .send::<Value>(self.request(Method::GET, &["_api", "collection", name])?)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// 문서 컬렉션 생성.
    #[instrument(skip(self))]
    pub async fn create_collection(&self, name: &str) -> Result<()> {
        let _: Value = self
            .send(
                self.request(Method::POST, &["_api", "collection"])?
                    .json(&json!({ "name": name, "type": 2 })),
            )
            .await?;
        Ok(())
    }

    /// persistent 인덱스 보장 (이미 있으면 기존 인덱스 반환).
    #[instrument(skip(self))]
    pub async fn ensure_persistent_index(
        &self,
        collection: &str,
        fields: &[&str],
        unique: bool,
    ) -> Result<IndexInfo> {
        let request = self
            .request(Method::POST, &["_api", "index"])?
            .query(&[("collection", collection)])
            .json(&json!({
                "type": "persistent",
                "fields": fields,
                "unique": unique,
                "sparse": false,
            }));
        self.send(request).await
    }

    // ==================== AQL / 대량 저장 ====================

    /// AQL 실행. `hasMore`인 동안 다음 배치를 이어서 가져옵니다.
    ///
    /// 값은 항상 `bind_vars`로 전달하고 쿼리 문자열에 직접 넣지 않습니다.
    pub async fn query<T: DeserializeOwned>(&self, aql: &str, bind_vars: Value) -> Result<Vec<T>> {
        let request = self.request(Method::POST, &["_api", "cursor"])?.json(&CursorRequest {
            query: aql,
            bind_vars: &bind_vars,
            batch_size: CURSOR_BATCH_SIZE,
        });

        let mut page: CursorBody<T> = self.send(request).await?;
        let mut rows = std::mem::take(&mut page.result);

        while page.has_more {
            let Some(id) = page.id.take() else {
                return Err(DataError::Parse("hasMore 커서에 id가 없습니다".to_string()));
            };
            page = match self
                .send(self.request(Method::PUT, &["_api", "cursor", &id])?)
                .await
            {
                Ok(next) => next,
                Err(e) => {
                    self.delete_cursor(&id).await;
                    return Err(e);
                }
            };
            rows.append(&mut page.result);
            page.id = page.id.or(Some(id));
        }

        debug!(rows = rows.len(), "AQL 실행 완료");
        Ok(rows)
    }

    /// 서버 커서 정리. 실패해도 커서는 TTL이 지나면 사라집니다.
    async fn delete_cursor(&self, id: &str) {
        let result = match self.request(Method::DELETE, &["_api", "cursor", id]) {
            Ok(request) => self.send::<Value>(request).await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            debug!(cursor = id, error = %e, "커서 정리 실패");
        }
    }

    /// 문서 배열 대량 저장.
    #[instrument(skip(self, documents), fields(count = documents.len()))]
    pub async fn import_documents<D: Serialize>(
        &self,
        collection: &str,
        documents: &[D],
        on_duplicate: OnDuplicate,
    ) -> Result<ImportSummary> {
        if documents.is_empty() {
            return Ok(ImportSummary::default());
        }

        let request = self
            .request(Method::POST, &["_api", "import"])?
            .query(&[
                ("collection", collection),
                ("type", "list"),
                ("onDuplicate", on_duplicate.as_str()),
                ("details", "true"),
            ])
            .json(documents);

        self.send(request).await
    }
}

/// 실패 응답을 오류로 변환.
fn arango_error(status: StatusCode, body: &str) -> DataError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(err) => DataError::Arango {
            status: status.as_u16(),
            error_num: err.error_num,
            message: err.error_message,
        },
        Err(_) => DataError::Arango {
            status: status.as_u16(),
            error_num: 0,
            message: if body.is_empty() {
                status.to_string()
            } else {
                body.to_string()
            },
        },
    }
}
