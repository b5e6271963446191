//! SSMベースの設定ローダー
//!
//! - YAMLマニフェスト（論理名 -> パラメータパス）を読み込み、SSMから値を解決する
//! - `AWS_SAM_LOCAL`環境では同名の環境変数から値を読む
//! - MySQLの接続情報をストアごとのSSMパスから組み立てる

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use thiserror::Error;
use tracing::{info, warn};

use super::config::{
    ApiHostsConfig, ConfigError, DEFAULT_MYSQL_PORT, MySqlConfig, MySqlStore, RuntimeConfig,
    resolve_task_path,
};
use super::parameter_store::{ParameterSource, ParameterStoreError, SsmParameterStore};

/// Lambdaパッケージ内のデフォルトのマニフェストパス
pub const DEFAULT_MANIFEST_PATH: &str = "lambda_function/ssm-params.yml";

/// SSM設定のエラー型
#[derive(Debug, Error)]
pub enum SsmConfigError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    ParameterStore(#[from] ParameterStoreError),
}

/// マニフェストのパスを決める（相対パスは`LAMBDA_TASK_ROOT`基準）
pub fn manifest_path(explicit: Option<&Path>) -> PathBuf {
    let path = explicit.unwrap_or_else(|| Path::new(DEFAULT_MANIFEST_PATH));
    let task_root = std::env::var("LAMBDA_TASK_ROOT").ok();
    resolve_task_path(path, task_root.as_deref())
}

/// SAM local実行中かどうか
pub fn is_sam_local() -> bool {
    std::env::var("AWS_SAM_LOCAL").is_ok_and(|value| !value.is_empty())
}

/// YAMLマニフェストを読み込む
///
/// 論理名は大文字に正規化する（環境変数名と揃えるため）。
pub fn read_manifest(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    let display = path.display().to_string();
    let settings = ::config::Config::builder()
        .add_source(::config::File::new(&display, ::config::FileFormat::Yaml))
        .build()
        .map_err(|e| ConfigError::FileRead {
            path: display.clone(),
            message: e.to_string(),
        })?;
    let raw: HashMap<String, String> =
        settings
            .try_deserialize()
            .map_err(|e| ConfigError::FileParse {
                path: display.clone(),
                message: e.to_string(),
            })?;

    let mut manifest = BTreeMap::new();
    for (name, parameter_path) in raw {
        if !parameter_path.starts_with('/') {
            return Err(ConfigError::Manifest(format!(
                "{}: パラメータパスは'/'で始まる必要があります: {}",
                name, parameter_path
            )));
        }
        manifest.insert(name.to_ascii_uppercase(), parameter_path);
    }
    if manifest.is_empty() {
        return Err(ConfigError::Manifest(format!("{}: 空のマニフェスト", display)));
    }
    Ok(manifest)
}

/// マニフェストの全パラメータをSSMから取得し、論理名で返す
pub async fn load_from_ssm<S: ParameterSource>(
    manifest: &BTreeMap<String, String>,
    store: &SsmParameterStore<S>,
) -> Result<HashMap<String, String>, SsmConfigError> {
    let paths: Vec<&str> = manifest.values().map(String::as_str).collect();
    let values = store.fetch_many(&paths, &[]).await?;

    // パスから論理名へ対応付ける（取得順に依存しない）
    Ok(manifest
        .iter()
        .filter_map(|(name, path)| values.get(path).map(|value| (name.clone(), value.clone())))
        .collect())
}

/// マニフェストの論理名を検索関数で解決する（SAM local用）
fn load_from_lookup(
    manifest: &BTreeMap<String, String>,
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<HashMap<String, String>, ConfigError> {
    manifest
        .keys()
        .map(|name| {
            lookup(name)
                .map(|value| (name.clone(), value))
                .ok_or_else(|| ConfigError::MissingValue(name.clone()))
        })
        .collect()
}

/// APIホスト設定をマニフェスト経由で解決する
///
/// マニフェストが指定されなければ実行時設定（ファイル/環境変数）を使う。
pub async fn resolve_api_hosts(
    runtime: &RuntimeConfig,
    manifest: Option<&Path>,
) -> Result<ApiHostsConfig, SsmConfigError> {
    let Some(explicit) = manifest else {
        return Ok(runtime.api_hosts());
    };

    let manifest = read_manifest(&manifest_path(Some(explicit)))?;
    let values = if is_sam_local() {
        info!("SAM local環境のため環境変数からマニフェストを解決");
        load_from_lookup(&manifest, &|key| std::env::var(key).ok())?
    } else {
        let store = SsmParameterStore::from_region(runtime.env(), runtime.region()).await;
        load_from_ssm(&manifest, &store).await?
    };
    Ok(ApiHostsConfig::from_lookup(&|key| values.get(key).cloned()))
}

/// MySQL接続情報をSSMから組み立てる
///
/// `db`/`host`/`rw-user`/`rw-password`は必須、`port`は任意。
pub async fn load_mysql_config<S: ParameterSource>(
    store: MySqlStore,
    parameters: &SsmParameterStore<S>,
) -> Result<MySqlConfig, SsmConfigError> {
    let prefix = store.ssm_prefix();
    let database_key = format!("{}/db", prefix);
    let host_key = format!("{}/host", prefix);
    let user_key = format!("{}/rw-user", prefix);
    let password_key = format!("{}/rw-password", prefix);
    let port_key = format!("{}/port", prefix);

    let mut values = parameters
        .fetch_many(
            &[
                database_key.as_str(),
                host_key.as_str(),
                user_key.as_str(),
                password_key.as_str(),
            ],
            &[port_key.as_str()],
        )
        .await?;

    let port = match values.remove(&port_key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: port_key.clone(),
            value: raw,
        })?,
        None => {
            warn!(store = store.label(), "SSMにポートがないためデフォルトを使用");
            DEFAULT_MYSQL_PORT
        }
    };

    let mut take = |key: &str| {
        values
            .remove(key)
            .ok_or_else(|| ConfigError::MissingValue(key.to_string()))
    };
    let host = take(&host_key)?;
    let user = take(&user_key)?;
    let password = SecretString::from(take(&password_key)?);
    let database = take(&database_key)?;

    info!(store = store.label(), host = %host, "SSMからMySQL接続情報を取得");
    Ok(MySqlConfig::new(host, port, user, password, database))
}
