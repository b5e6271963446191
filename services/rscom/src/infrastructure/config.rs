/// 実行時設定
///
/// 各ストアの接続設定は以下の優先順で解決する:
/// 1. `-c/--config`で指定したJSONファイル（環境変数と同じキーのフラットなオブジェクト）
/// 2. 環境変数
/// 3. SSMパラメータストア（`ssm_config`モジュール経由、明示的に要求された場合のみ）
///
/// 型付きの設定は検索関数（lookup）経由で読み込むため、
/// テストではプロセスの環境変数に触れずに検証できる。
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde_json::{Map, Value};
use thiserror::Error;

/// デフォルトの実行環境名
pub const DEFAULT_ENV: &str = "dev";
/// デフォルトのAWSリージョン
pub const DEFAULT_REGION: &str = "us-east-1";
/// MySQLのデフォルトポート
pub const DEFAULT_MYSQL_PORT: u16 = 3306;
/// Cassandraのデフォルトポート
pub const DEFAULT_CASSANDRA_PORT: u16 = 9042;

/// 設定のエラー型
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必須の設定値が見つからない
    #[error("Missing configuration value: {0}")]
    MissingValue(String),
    /// 設定値の形式が不正
    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },
    /// 設定ファイルの読み込み失敗
    #[error("Failed to read config file {path}: {message}")]
    FileRead { path: String, message: String },
    /// 設定ファイルのパース失敗
    #[error("Failed to parse config file {path}: {message}")]
    FileParse { path: String, message: String },
    /// SSMマニフェストの不備
    #[error("Invalid SSM manifest: {0}")]
    Manifest(String),
}

/// 設定値の検索関数
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn require(lookup: Lookup<'_>, key: &str) -> Result<String, ConfigError> {
    lookup(key)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ConfigError::MissingValue(key.to_string()))
}

fn optional(lookup: Lookup<'_>, key: &str) -> Option<String> {
    lookup(key).filter(|value| !value.is_empty())
}

fn parse_port(lookup: Lookup<'_>, key: &str, default: u16) -> Result<u16, ConfigError> {
    match optional(lookup, key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw,
        }),
        None => Ok(default),
    }
}

/// プロセスの環境変数を検索する
fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// JSONオブジェクトを検索する（数値も文字列として扱う）
fn json_lookup(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ==================== MySQL ====================

/// MySQLストアの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MySqlStore {
    /// post-serviceのデータベース
    Posts,
    /// collaboration-serviceのデータベース
    Collabs,
}

/// ストアごとの設定キー
#[derive(Debug, Clone, Copy)]
pub struct MySqlKeys {
    pub host: &'static str,
    pub port: &'static str,
    pub user: &'static str,
    pub password: &'static str,
    pub database: &'static str,
}

impl MySqlStore {
    /// ログ用のストア名
    pub fn label(self) -> &'static str {
        match self {
            MySqlStore::Posts => "posts",
            MySqlStore::Collabs => "collabs",
        }
    }

    /// 環境変数・JSONファイルのキー
    pub fn keys(self) -> MySqlKeys {
        match self {
            MySqlStore::Posts => MySqlKeys {
                host: "POST_SERVICE_MYSQL_HOST",
                port: "POST_SERVICE_MYSQL_PORT",
                user: "POST_SERVICE_MYSQL_USER",
                password: "POST_SERVICE_MYSQL_PASSWORD",
                database: "POST_DB_NAME",
            },
            MySqlStore::Collabs => MySqlKeys {
                host: "COLLABS_SERVICE_MYSQL_HOST",
                port: "COLLABS_SERVICE_MYSQL_PORT",
                user: "COLLABS_SERVICE_MYSQL_USER",
                password: "COLLABS_SERVICE_MYSQL_PASSWORD",
                database: "COLLABS_DB_NAME",
            },
        }
    }

    /// SSMパラメータのパスプレフィックス（環境名を除く）
    pub fn ssm_prefix(self) -> &'static str {
        match self {
            MySqlStore::Posts => "/rds/rs-post-service",
            MySqlStore::Collabs => "/rds/collaboration-service",
        }
    }
}

/// MySQL接続設定
#[derive(Debug, Clone)]
pub struct MySqlConfig {
    host: String,
    port: u16,
    user: String,
    password: SecretString,
    database: String,
}

impl MySqlConfig {
    /// 明示的な値で作成
    pub fn new(
        host: impl Into<String>,
        port: u16,
        user: impl Into<String>,
        password: SecretString,
        database: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            user: user.into(),
            password,
            database: database.into(),
        }
    }

    /// 検索関数から読み込む
    ///
    /// host/user/password/databaseは必須、portは省略時3306。
    pub fn from_lookup(store: MySqlStore, lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let keys = store.keys();
        Ok(Self {
            host: require(lookup, keys.host)?,
            port: parse_port(lookup, keys.port, DEFAULT_MYSQL_PORT)?,
            user: require(lookup, keys.user)?,
            password: SecretString::from(require(lookup, keys.password)?),
            database: require(lookup, keys.database)?,
        })
    }

    /// 環境変数から読み込む
    pub fn from_env(store: MySqlStore) -> Result<Self, ConfigError> {
        Self::from_lookup(store, &env_lookup)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    pub fn database(&self) -> &str {
        &self.database
    }
}

// ==================== Cassandra ====================

const CASSANDRA_HOST: &str = "HYPERLINK_CASSANDRA_HOST";
const CASSANDRA_PORT: &str = "HYPERLINK_CASSANDRA_PORT";
const CASSANDRA_USER: &str = "HYPERLINK_CASSANDRA_USER";
const CASSANDRA_PASSWORD: &str = "HYPERLINK_CASSANDRA_PASSWORD";
const CASSANDRA_KEYSPACE: &str = "HYPERLINK_CASSANDRA_DB";

/// Cassandra（links）接続設定
#[derive(Debug, Clone)]
pub struct CassandraConfig {
    hosts: Vec<String>,
    port: u16,
    credentials: Option<(String, SecretString)>,
    keyspace: String,
}

impl CassandraConfig {
    pub fn new(
        hosts: Vec<String>,
        port: u16,
        credentials: Option<(String, SecretString)>,
        keyspace: impl Into<String>,
    ) -> Self {
        Self {
            hosts,
            port,
            credentials,
            keyspace: keyspace.into(),
        }
    }

    /// 検索関数から読み込む
    ///
    /// HOSTはカンマ区切りのコンタクトポイント一覧。
    /// USERとPASSWORDは両方揃った場合のみ認証に使う。
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self, ConfigError> {
        let raw_hosts = require(lookup, CASSANDRA_HOST)?;
        let hosts: Vec<String> = raw_hosts
            .split(',')
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .map(str::to_string)
            .collect();
        if hosts.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: CASSANDRA_HOST.to_string(),
                value: raw_hosts,
            });
        }

        let credentials = match (
            optional(lookup, CASSANDRA_USER),
            optional(lookup, CASSANDRA_PASSWORD),
        ) {
            (Some(user), Some(password)) => Some((user, SecretString::from(password))),
            (Some(_), None) => {
                return Err(ConfigError::MissingValue(CASSANDRA_PASSWORD.to_string()));
            }
            _ => None,
        };

        Ok(Self {
            hosts,
            port: parse_port(lookup, CASSANDRA_PORT, DEFAULT_CASSANDRA_PORT)?,
            credentials,
            keyspace: require(lookup, CASSANDRA_KEYSPACE)?,
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&env_lookup)
    }

    /// `host:port`形式のコンタクトポイント（ポート指定済みのホストはそのまま）
    pub fn contact_points(&self) -> Vec<String> {
        self.hosts
            .iter()
            .map(|host| {
                if host.contains(':') {
                    host.clone()
                } else {
                    format!("{}:{}", host, self.port)
                }
            })
            .collect()
    }

    pub fn credentials(&self) -> Option<(&str, &SecretString)> {
        self.credentials
            .as_ref()
            .map(|(user, password)| (user.as_str(), password))
    }

    pub fn keyspace(&self) -> &str {
        &self.keyspace
    }
}

// ==================== API hosts ====================

/// Post serviceのホストキー
pub const POST_SERVICE_API_HOST: &str = "POST_SERVICE_API_HOST";
/// Hyperlink serviceのホストキー
pub const HYPERLINK_SERVICE_API_HOST: &str = "HYPERLINK_SERVICE_API_HOST";
/// Collabs serviceのホストキー
pub const COLLABS_SERVICE_API_HOST: &str = "COLLABS_SERVICE_API_HOST";

/// 各REST APIのベースURL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiHostsConfig {
    post_service: Option<String>,
    hyperlink_service: Option<String>,
    collabs_service: Option<String>,
}

impl ApiHostsConfig {
    /// 検索関数から読み込む（未設定のホストは使用時にエラーになる）
    pub fn from_lookup(lookup: Lookup<'_>) -> Self {
        Self {
            post_service: optional(lookup, POST_SERVICE_API_HOST),
            hyperlink_service: optional(lookup, HYPERLINK_SERVICE_API_HOST),
            collabs_service: optional(lookup, COLLABS_SERVICE_API_HOST),
        }
    }

    pub fn post_service(&self) -> Result<&str, ConfigError> {
        self.post_service
            .as_deref()
            .ok_or_else(|| ConfigError::MissingValue(POST_SERVICE_API_HOST.to_string()))
    }

    pub fn hyperlink_service(&self) -> Result<&str, ConfigError> {
        self.hyperlink_service
            .as_deref()
            .ok_or_else(|| ConfigError::MissingValue(HYPERLINK_SERVICE_API_HOST.to_string()))
    }

    pub fn collabs_service(&self) -> Result<&str, ConfigError> {
        self.collabs_service
            .as_deref()
            .ok_or_else(|| ConfigError::MissingValue(COLLABS_SERVICE_API_HOST.to_string()))
    }
}

// ==================== RuntimeConfig ====================

/// mainで一度だけ構築し、各コネクタへ参照で渡す実行時設定
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    env: String,
    region: String,
    file: Option<Map<String, Value>>,
}

impl RuntimeConfig {
    /// 明示的な値で作成
    pub fn new(
        env: impl Into<String>,
        region: impl Into<String>,
        file: Option<Map<String, Value>>,
    ) -> Self {
        Self {
            env: env.into(),
            region: region.into(),
            file,
        }
    }

    /// `ENV`/`AWS_DEFAULT_REGION`と任意のJSONファイルから作成
    ///
    /// ファイルが指定されて読めない場合はエラーとする。
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = config_path.map(read_config_file).transpose()?;
        Ok(Self::from_lookup(&env_lookup, file))
    }

    fn from_lookup(lookup: Lookup<'_>, file: Option<Map<String, Value>>) -> Self {
        Self {
            env: optional(lookup, "ENV").unwrap_or_else(|| DEFAULT_ENV.to_string()),
            region: optional(lookup, "AWS_DEFAULT_REGION")
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            file,
        }
    }

    pub fn env(&self) -> &str {
        &self.env
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// ファイルに該当ストアのホストがあればファイルから、なければ環境変数から読む
    pub fn mysql(&self, store: MySqlStore) -> Result<MySqlConfig, ConfigError> {
        self.mysql_with_env(store, &env_lookup)
    }

    fn mysql_with_env(
        &self,
        store: MySqlStore,
        env: Lookup<'_>,
    ) -> Result<MySqlConfig, ConfigError> {
        match &self.file {
            Some(map) if map.contains_key(store.keys().host) => {
                MySqlConfig::from_lookup(store, &|key| json_lookup(map, key))
            }
            _ => MySqlConfig::from_lookup(store, env),
        }
    }

    pub fn cassandra(&self) -> Result<CassandraConfig, ConfigError> {
        self.cassandra_with_env(&env_lookup)
    }

    fn cassandra_with_env(&self, env: Lookup<'_>) -> Result<CassandraConfig, ConfigError> {
        match &self.file {
            Some(map) if map.contains_key(CASSANDRA_HOST) => {
                CassandraConfig::from_lookup(&|key| json_lookup(map, key))
            }
            _ => CassandraConfig::from_lookup(env),
        }
    }

    /// APIホストはキー単位でファイル優先、なければ環境変数
    pub fn api_hosts(&self) -> ApiHostsConfig {
        self.api_hosts_with_env(&env_lookup)
    }

    fn api_hosts_with_env(&self, env: Lookup<'_>) -> ApiHostsConfig {
        ApiHostsConfig::from_lookup(&|key| {
            self.file
                .as_ref()
                .and_then(|map| json_lookup(map, key))
                .or_else(|| env(key))
        })
    }
}

/// JSON設定ファイルを読み込む
pub fn read_config_file(path: &Path) -> Result<Map<String, Value>, ConfigError> {
    let display = path.display().to_string();
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
        path: display.clone(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&contents).map_err(|e| ConfigError::FileParse {
        path: display,
        message: e.to_string(),
    })
}

/// `LAMBDA_TASK_ROOT`を基準に相対パスを解決する
pub fn resolve_task_path(path: &Path, task_root: Option<&str>) -> PathBuf {
    match task_root {
        Some(root) if path.is_relative() => Path::new(root).join(path),
        _ => path.to_path_buf(),
    }
}
