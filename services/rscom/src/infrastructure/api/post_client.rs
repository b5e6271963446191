// PostClient - Post Service APIのクライアント

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::client::{ApiClient, ApiClientError};

/// 投稿のrstyleリンク取得トレイト（テスト用の抽象化）
#[async_trait]
pub trait PostLinksSource: Send + Sync {
    /// 投稿のrstyleリンク一覧（レスポンスのJSONそのまま）
    async fn get_links_for_post_id(&self, post_id: &str) -> Result<Value, ApiClientError>;
}

/// Post Service APIクライアント
#[derive(Debug, Clone)]
pub struct PostClient {
    api: ApiClient,
    base_url: String,
}

impl PostClient {
    pub fn new(api: ApiClient, base_url: impl Into<String>) -> Self {
        Self {
            api,
            base_url: base_url.into(),
        }
    }

    /// `GET {host}/v1/posts/{id}/rstyle_links`のURL
    pub fn links_url(&self, post_id: &str) -> String {
        format!(
            "{}/v1/posts/{}/rstyle_links",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(post_id)
        )
    }
}

#[async_trait]
impl PostLinksSource for PostClient {
    async fn get_links_for_post_id(&self, post_id: &str) -> Result<Value, ApiClientError> {
        let response = self.api.get(&self.links_url(post_id), None).await?;
        let value: Value = ApiClient::json(response).await?;
        debug!(post_id = %post_id, response = %value, "Post Service APIレスポンス");
        Ok(value)
    }
}
