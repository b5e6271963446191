/// MySQL接続の共通処理
///
/// プールは1接続に固定する（バッチは逐次実行のため）。
use chrono::NaiveDateTime;
use secrecy::ExposeSecret;
use sqlx::mysql::{MySqlArguments, MySqlConnectOptions, MySqlPoolOptions, MySqlRow};
use sqlx::query::Query;
use sqlx::{MySql, MySqlPool};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::infrastructure::config::MySqlConfig;

/// コネクタのエラー型
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// 接続失敗
    #[error("MySQL接続に失敗しました ({store}): {source}")]
    Connection {
        store: &'static str,
        #[source]
        source: sqlx::Error,
    },
    /// クエリ実行失敗（ドライバのエラーをそのまま保持）
    #[error("クエリ実行エラー ({operation}): {source}")]
    Database {
        operation: &'static str,
        #[source]
        source: sqlx::Error,
    },
    /// 単一行の検索で結果がない
    #[error("結果が見つかりません: {operation} ({key})")]
    NotFound { operation: &'static str, key: String },
}

/// バインドパラメータ
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Int(i64),
    DateTime(NaiveDateTime),
    Null,
}

impl From<&str> for SqlParam {
    fn from(value: &str) -> Self {
        SqlParam::Text(value.to_string())
    }
}

impl From<String> for SqlParam {
    fn from(value: String) -> Self {
        SqlParam::Text(value)
    }
}

impl From<i64> for SqlParam {
    fn from(value: i64) -> Self {
        SqlParam::Int(value)
    }
}

impl From<NaiveDateTime> for SqlParam {
    fn from(value: NaiveDateTime) -> Self {
        SqlParam::DateTime(value)
    }
}

impl From<Option<NaiveDateTime>> for SqlParam {
    fn from(value: Option<NaiveDateTime>) -> Self {
        value.map_or(SqlParam::Null, SqlParam::DateTime)
    }
}

/// `IN (...)`用のプレースホルダ列（`?, ?, ?`）
///
/// 空リストは呼び出し側でクエリ自体を省略すること。
pub fn in_placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn bind_params<'q>(
    mut query: Query<'q, MySql, MySqlArguments>,
    params: &'q [SqlParam],
) -> Query<'q, MySql, MySqlArguments> {
    for param in params {
        query = match param {
            SqlParam::Text(value) => query.bind(value.as_str()),
            SqlParam::Int(value) => query.bind(*value),
            SqlParam::DateTime(value) => query.bind(*value),
            SqlParam::Null => query.bind(Option::<String>::None),
        };
    }
    query
}

/// 1ストア分のMySQL接続
pub struct MySqlConnector {
    store: &'static str,
    pool: MySqlPool,
}

impl MySqlConnector {
    /// 設定からプールを作成して接続する
    pub async fn connect(
        store: &'static str,
        config: &MySqlConfig,
    ) -> Result<Self, ConnectorError> {
        let options = MySqlConnectOptions::new()
            .host(config.host())
            .port(config.port())
            .username(config.user())
            .password(config.password().expose_secret())
            .database(config.database())
            .charset("utf8mb4");

        let pool = MySqlPoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| {
                error!(store = store, host = %config.host(), error = %e, "MySQL接続エラー");
                ConnectorError::Connection { store, source: e }
            })?;

        info!(store = store, host = %config.host(), database = %config.database(), "MySQLに接続");
        Ok(Self { store, pool })
    }

    /// 1文を実行して全行を返す（0行も正常な結果）
    pub async fn execute(
        &self,
        operation: &'static str,
        query: &str,
        params: &[SqlParam],
    ) -> Result<Vec<MySqlRow>, ConnectorError> {
        debug!(store = self.store, operation = operation, "クエリ実行");
        let result = bind_params(sqlx::query(query), params)
            .fetch_all(&self.pool)
            .await;
        all_rows(self.store, operation, result)
    }

    /// 単一行を取得する（行がなければNotFound）
    pub async fn fetch_one(
        &self,
        operation: &'static str,
        key: &str,
        query: &str,
        params: &[SqlParam],
    ) -> Result<MySqlRow, ConnectorError> {
        let result = bind_params(sqlx::query(query), params)
            .fetch_optional(&self.pool)
            .await;
        one_row(self.store, operation, key, result)
    }

    /// 更新系の1文を実行して影響行数を返す
    pub async fn execute_statement(
        &self,
        operation: &'static str,
        query: &str,
        params: &[SqlParam],
    ) -> Result<u64, ConnectorError> {
        debug!(store = self.store, operation = operation, "ステートメント実行");
        let result = bind_params(sqlx::query(query), params)
            .execute(&self.pool)
            .await
            .map_err(|e| database_error(self.store, operation, e))?;
        Ok(result.rows_affected())
    }

    /// パラメータセットごとに同じ文を順に実行する（最初の失敗で中断）
    pub async fn execute_many(
        &self,
        operation: &'static str,
        query: &str,
        param_sets: &[Vec<SqlParam>],
    ) -> Result<u64, ConnectorError> {
        debug!(
            store = self.store,
            operation = operation,
            count = param_sets.len(),
            "ステートメントを連続実行"
        );
        sum_affected(param_sets, |params| {
            self.execute_statement(operation, query, params)
        })
        .await
    }

    /// プールを閉じる
    pub async fn close(self) {
        self.pool.close().await;
        info!(store = self.store, "MySQL接続をクローズ");
    }
}

/// 複数行クエリの結果を変換する（0行は空の`Vec`でNotFoundにはしない）
pub(crate) fn all_rows<T>(
    store: &'static str,
    operation: &'static str,
    result: Result<Vec<T>, sqlx::Error>,
) -> Result<Vec<T>, ConnectorError> {
    result.map_err(|e| database_error(store, operation, e))
}

/// 単一行クエリの結果を変換する（行がなければNotFound）
pub(crate) fn one_row<T>(
    store: &'static str,
    operation: &'static str,
    key: &str,
    result: Result<Option<T>, sqlx::Error>,
) -> Result<T, ConnectorError> {
    result
        .map_err(|e| database_error(store, operation, e))?
        .ok_or_else(|| {
            error!(store = store, operation = operation, key = %key, "結果が見つかりません");
            ConnectorError::NotFound {
                operation,
                key: key.to_string(),
            }
        })
}

/// パラメータセットを順に実行して影響行数を合計する（最初の失敗で中断）
pub(crate) async fn sum_affected<'p, F, Fut>(
    param_sets: &'p [Vec<SqlParam>],
    mut run: F,
) -> Result<u64, ConnectorError>
where
    F: FnMut(&'p [SqlParam]) -> Fut,
    Fut: Future<Output = Result<u64, ConnectorError>>,
{
    let mut affected = 0;
    for params in param_sets {
        affected += run(params).await?;
    }
    Ok(affected)
}

fn database_error(
    store: &'static str,
    operation: &'static str,
    source: sqlx::Error,
) -> ConnectorError {
    error!(store = store, operation = operation, error = %source, "クエリ実行エラー");
    ConnectorError::Database { operation, source }
}

/// 行のデコードエラーをDatabaseエラーとして扱う
pub(crate) fn decode_error(operation: &'static str) -> impl Fn(sqlx::Error) -> ConnectorError {
    move |source| {
        error!(operation = operation, error = %source, "行のデコードに失敗");
        ConnectorError::Database { operation, source }
    }
}
