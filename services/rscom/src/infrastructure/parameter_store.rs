//! SSMパラメータストアモジュール
//!
//! 環境名をプレフィックスにしたパラメータ（`/<env><key>`）を
//! 最大10件ずつのバッチで復号付き取得する。
//! 必須パラメータの欠落は全バッチ取得後にまとめて報告する。

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_ssm::Client as SsmClient;
use aws_sdk_ssm::config::Region;
use thiserror::Error;
use tracing::{debug, error, info};

/// GetParameters APIの1回あたりの最大件数
pub const MAX_BATCH_SIZE: usize = 10;

/// パラメータストアのエラー型
#[derive(Debug, Error)]
pub enum ParameterStoreError {
    /// AWS SDK エラー
    #[error("AWS SSM APIエラー: {0}")]
    AwsSdkError(String),
    /// 必須パラメータが見つからない
    #[error("必須パラメータが見つかりません (env={env}): {}", keys.join(", "))]
    MissingParameters { env: String, keys: Vec<String> },
    /// 取得するキーが一つも指定されていない
    #[error("取得するパラメータが指定されていません")]
    NoKeys,
}

/// 取得したパラメータ
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// フルネーム（`/<env><key>`）
    pub name: String,
    /// 復号済みの値
    pub value: String,
}

/// パラメータ取得トレイト（テスト用の抽象化）
#[async_trait]
pub trait ParameterSource: Send + Sync {
    /// フルネームのリストでパラメータを取得する（存在しない名前は結果に含まれない）
    async fn get_parameters(&self, names: &[String])
    -> Result<Vec<Parameter>, ParameterStoreError>;
}

/// 実際のAWS SSM SDKを使用した実装
pub struct AwsParameterSource {
    client: SsmClient,
}

impl AwsParameterSource {
    pub fn new(client: SsmClient) -> Self {
        Self { client }
    }

    /// 指定リージョンのデフォルト設定からクライアントを作成
    pub async fn from_region(region: &str) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self::new(SsmClient::new(&config))
    }
}

#[async_trait]
impl ParameterSource for AwsParameterSource {
    async fn get_parameters(
        &self,
        names: &[String],
    ) -> Result<Vec<Parameter>, ParameterStoreError> {
        let response = self
            .client
            .get_parameters()
            .set_names(Some(names.to_vec()))
            .with_decryption(true)
            .send()
            .await
            .map_err(|e| {
                error!(names = ?names, error = %e, "GetParametersエラー");
                ParameterStoreError::AwsSdkError(e.to_string())
            })?;

        if !response.invalid_parameters().is_empty() {
            debug!(
                invalid = ?response.invalid_parameters(),
                "存在しないパラメータがあります"
            );
        }

        Ok(response
            .parameters()
            .iter()
            .filter_map(|p| {
                Some(Parameter {
                    name: p.name()?.to_string(),
                    value: p.value()?.to_string(),
                })
            })
            .collect())
    }
}

/// 環境名付きのパラメータストアクライアント
pub struct SsmParameterStore<S: ParameterSource> {
    env: String,
    source: S,
}

impl SsmParameterStore<AwsParameterSource> {
    /// AWS SSMに接続するクライアントを作成
    pub async fn from_region(env: impl Into<String>, region: &str) -> Self {
        Self::new(env, AwsParameterSource::from_region(region).await)
    }
}

impl<S: ParameterSource> SsmParameterStore<S> {
    pub fn new(env: impl Into<String>, source: S) -> Self {
        Self {
            env: env.into(),
            source,
        }
    }

    pub fn env(&self) -> &str {
        &self.env
    }

    /// キー（`/`始まり）からフルネームを作る
    fn full_name(&self, key: &str) -> String {
        format!("/{}{}", self.env, key)
    }

    /// フルネームから環境プレフィックスを取り除く
    fn strip_env<'a>(&self, name: &'a str) -> &'a str {
        name.strip_prefix('/')
            .and_then(|rest| rest.strip_prefix(self.env.as_str()))
            .unwrap_or(name)
    }

    /// パラメータを1件取得する
    ///
    /// `required`がtrueで見つからない場合はエラー。
    pub async fn fetch(
        &self,
        key: &str,
        required: bool,
    ) -> Result<Option<String>, ParameterStoreError> {
        let (required_keys, optional_keys): (Vec<&str>, Vec<&str>) = if required {
            (vec![key], vec![])
        } else {
            (vec![], vec![key])
        };
        let mut values = self.fetch_many(&required_keys, &optional_keys).await?;
        Ok(values.remove(key))
    }

    /// 複数パラメータを取得する
    ///
    /// 戻り値のキーは環境プレフィックスを除いたもの（引数のキーと同じ形）。
    /// 全バッチを取得してから、欠落した必須キーをまとめてエラーにする。
    pub async fn fetch_many(
        &self,
        required: &[&str],
        optional: &[&str],
    ) -> Result<HashMap<String, String>, ParameterStoreError> {
        if required.is_empty() && optional.is_empty() {
            return Err(ParameterStoreError::NoKeys);
        }

        let names: Vec<String> = required
            .iter()
            .chain(optional.iter())
            .map(|key| self.full_name(key))
            .collect();

        let mut values = HashMap::new();
        for (index, batch) in names.chunks(MAX_BATCH_SIZE).enumerate() {
            debug!(
                env = %self.env,
                batch = index,
                size = batch.len(),
                "パラメータバッチ取得"
            );
            for parameter in self.source.get_parameters(batch).await? {
                let key = self.strip_env(&parameter.name).to_string();
                values.insert(key, parameter.value);
            }
        }

        let missing: Vec<String> = required
            .iter()
            .filter(|key| !values.contains_key(**key))
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            error!(env = %self.env, missing = ?missing, "必須パラメータが見つかりません");
            return Err(ParameterStoreError::MissingParameters {
                env: self.env.clone(),
                keys: missing,
            });
        }

        info!(env = %self.env, count = values.len(), "パラメータ取得完了");
        Ok(values)
    }
}
