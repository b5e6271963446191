// HyperlinkClient - Hyperlink API（リンク・商品情報）のクライアント

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error};

use super::client::{ApiClient, ApiClientError};
use crate::domain::Link;

/// リンク検索トレイト（テスト用の抽象化）
#[async_trait]
pub trait LinkLookup: Send + Sync {
    /// rstyleリンクのURLからリンク情報を取得する
    async fn get_link(&self, link: &str) -> Result<Link, ApiClientError>;
}

/// パスセグメントごとにパーセントエンコードする（`/`は残す）
pub fn quote_path(value: &str) -> String {
    value
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Hyperlink APIクライアント
#[derive(Debug, Clone)]
pub struct HyperlinkClient {
    api: ApiClient,
    base_url: String,
}

impl HyperlinkClient {
    pub fn new(api: ApiClient, base_url: impl Into<String>) -> Self {
        Self {
            api,
            base_url: base_url.into(),
        }
    }

    /// `GET {host}/api/links/{quoted link}`のURL
    pub fn link_url(&self, link: &str) -> String {
        format!(
            "{}/api/links/{}",
            self.base_url.trim_end_matches('/'),
            quote_path(link)
        )
    }
}

#[async_trait]
impl LinkLookup for HyperlinkClient {
    async fn get_link(&self, link: &str) -> Result<Link, ApiClientError> {
        let response = self.api.get(&self.link_url(link), None).await?;
        let value: Value = ApiClient::json(response).await?;
        debug!(link = %link, response = %value, "Hyperlink APIレスポンス");

        serde_json::from_value(value).map_err(|e| {
            error!(link = %link, error = %e, "リンク情報のデコードに失敗");
            ApiClientError::Decode(e.to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::api::spawn_server;
    use axum::Router;
    use axum::http::{StatusCode, Uri};
    use serde_json::json;

    // ==================== quote_path テスト ====================

    #[test]
    fn test_quote_path_keeps_slash_and_encodes_colon() {
        assert_eq!(
            quote_path("https://rstyle.me/n/abc"),
            "https%3A//rstyle.me/n/abc"
        );
    }

    #[test]
    fn test_quote_path_encodes_reserved_characters() {
        assert_eq!(quote_path("a b?c=d&e"), "a%20b%3Fc%3Dd%26e");
        assert_eq!(quote_path("A-z_0.9~"), "A-z_0.9~");
    }

    #[test]
    fn test_link_url_trims_trailing_slash() {
        let client = HyperlinkClient::new(ApiClient::new().unwrap(), "https://hyperlink.local/");
        assert_eq!(
            client.link_url("https://rstyle.me/n/abc"),
            "https://hyperlink.local/api/links/https%3A//rstyle.me/n/abc"
        );
    }

    // ==================== get_link テスト ====================

    async fn link_handler(uri: Uri) -> (StatusCode, axum::Json<serde_json::Value>) {
        if uri.path() == "/api/links/https%3A//rstyle.me/n/abc" {
            (
                StatusCode::OK,
                axum::Json(json!({
                    "id": 101,
                    "url": "https://rstyle.me/n/abc",
                    "item": { "id": 7, "name": "Tote", "price": 12.0 },
                    "publisher": { "Id": "pub-1" }
                })),
            )
        } else {
            (
                StatusCode::NOT_FOUND,
                axum::Json(json!({ "error": uri.path() })),
            )
        }
    }

    #[tokio::test]
    async fn test_get_link_decodes_response() {
        let base = spawn_server(Router::new().fallback(link_handler)).await;
        let client = HyperlinkClient::new(ApiClient::new().unwrap(), base);

        let link = client.get_link("https://rstyle.me/n/abc").await.unwrap();

        assert_eq!(link.id, "101");
        assert_eq!(link.item.name.as_deref(), Some("Tote"));
        assert_eq!(link.publisher.id.as_deref(), Some("pub-1"));
    }

    #[tokio::test]
    async fn test_get_link_not_found() {
        let base = spawn_server(Router::new().fallback(link_handler)).await;
        let client = HyperlinkClient::new(ApiClient::new().unwrap(), base);

        let result = client.get_link("https://rstyle.me/n/missing").await;

        assert!(matches!(
            result,
            Err(ApiClientError::HttpStatus { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_get_link_rejects_response_without_id() {
        let router = Router::new().fallback(|| async { axum::Json(json!({ "url": "x" })) });
        let base = spawn_server(router).await;
        let client = HyperlinkClient::new(ApiClient::new().unwrap(), base);

        let result = client.get_link("x").await;

        assert!(matches!(result, Err(ApiClientError::Decode(_))));
    }
}
