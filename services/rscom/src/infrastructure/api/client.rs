// ApiClient - REST API用の共通HTTPクライアント
//
// 全レスポンスをcheck_for_errorsで検査し、2xx以外はHttpStatusエラーにする。
// 再試行は行わず、タイムアウトはreqwestのデフォルトに従う。

use reqwest::{Client, Method, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, error, info};

/// クエリパラメータ
pub type QueryParams<'a> = &'a [(&'a str, &'a str)];

/// APIクライアント用エラー型
///
/// # エラー種別
/// - `Transport`: 接続失敗・タイムアウトなどのネットワークエラー
/// - `HttpStatus`: 2xx以外のレスポンス
/// - `Request`: リクエストの構築失敗（不正なURLなど）
/// - `Decode`: レスポンスボディのデコード失敗
#[derive(Debug, Error)]
pub enum ApiClientError {
    /// ネットワークエラー
    #[error("ネットワークエラー: {0}")]
    Transport(String),

    /// HTTPエラー（ステータスコードとボディ付き）
    #[error("HTTPエラー: status={status}, body={body}")]
    HttpStatus {
        /// HTTPステータスコード
        status: u16,
        /// レスポンスボディ
        body: String,
    },

    /// リクエスト構築エラー
    #[error("リクエスト構築エラー: {0}")]
    Request(String),

    /// デコードエラー
    #[error("レスポンスのデコードに失敗: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiClientError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_builder() {
            ApiClientError::Request(error.to_string())
        } else if error.is_decode() {
            ApiClientError::Decode(error.to_string())
        } else {
            ApiClientError::Transport(error.to_string())
        }
    }
}

/// レスポンスのステータスを検査する
///
/// 2xx以外はボディをログに出してから`HttpStatus`エラーを返す。
pub async fn check_for_errors(response: Response) -> Result<Response, ApiClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().to_string();
    let body = response.text().await.unwrap_or_default();
    error!(
        status = %status,
        url = %url,
        body = %body,
        "APIエラーレスポンス"
    );

    Err(ApiClientError::HttpStatus {
        status: status.as_u16(),
        body,
    })
}

/// 共通HTTPクライアント
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
}

impl ApiClient {
    /// デフォルト設定のクライアントを作成
    pub fn new() -> Result<Self, ApiClientError> {
        let client = Client::builder()
            .build()
            .map_err(|e| ApiClientError::Transport(e.to_string()))?;
        Ok(Self::with_client(client))
    }

    /// 既存のreqwestクライアントを使う
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    pub async fn get(
        &self,
        endpoint: &str,
        params: Option<QueryParams<'_>>,
    ) -> Result<Response, ApiClientError> {
        self.send(Method::GET, endpoint, None::<&()>, params).await
    }

    pub async fn post<T: Serialize + ?Sized + Sync>(
        &self,
        endpoint: &str,
        data: Option<&T>,
        params: Option<QueryParams<'_>>,
    ) -> Result<Response, ApiClientError> {
        self.send(Method::POST, endpoint, data, params).await
    }

    pub async fn put<T: Serialize + ?Sized + Sync>(
        &self,
        endpoint: &str,
        data: Option<&T>,
        params: Option<QueryParams<'_>>,
    ) -> Result<Response, ApiClientError> {
        self.send(Method::PUT, endpoint, data, params).await
    }

    pub async fn patch<T: Serialize + ?Sized + Sync>(
        &self,
        endpoint: &str,
        data: Option<&T>,
        params: Option<QueryParams<'_>>,
    ) -> Result<Response, ApiClientError> {
        self.send(Method::PATCH, endpoint, data, params).await
    }

    pub async fn delete<T: Serialize + ?Sized + Sync>(
        &self,
        endpoint: &str,
        data: Option<&T>,
        params: Option<QueryParams<'_>>,
    ) -> Result<Response, ApiClientError> {
        self.send(Method::DELETE, endpoint, data, params).await
    }

    /// JSONレスポンスをデコードする
    pub async fn json<R: DeserializeOwned>(response: Response) -> Result<R, ApiClientError> {
        response.json::<R>().await.map_err(|e| {
            error!(error = %e, "レスポンスのデコードに失敗");
            ApiClientError::from(e)
        })
    }

    async fn send<T: Serialize + ?Sized + Sync>(
        &self,
        method: Method,
        endpoint: &str,
        data: Option<&T>,
        params: Option<QueryParams<'_>>,
    ) -> Result<Response, ApiClientError> {
        info!(method = %method, endpoint = %endpoint, "APIリクエスト送信");

        let mut request = self.client.request(method.clone(), endpoint);
        if let Some(params) = params {
            request = request.query(params);
        }
        if let Some(data) = data {
            request = request.json(data);
        }

        let response = request.send().await.map_err(|e| {
            error!(method = %method, endpoint = %endpoint, error = %e, "APIリクエスト失敗");
            ApiClientError::from(e)
        })?;
        debug!(status = %response.status(), endpoint = %endpoint, "APIレスポンス受信");

        check_for_errors(response).await
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use axum::Router;
    use axum::extract::{Path, Query};
    use axum::http::{Method as HttpMethod, StatusCode};
    use axum::routing::any;
    use serde_json::{Value, json};
    use std::collections::HashMap;

    /// テスト用HTTPサーバーをランダムポートで起動し、ベースURLを返す
    pub async fn spawn_server(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn respond_with(Path(code): Path<u16>) -> (StatusCode, String) {
        (StatusCode::from_u16(code).unwrap(), format!("status {}", code))
    }

    async fn echo(
        method: HttpMethod,
        Query(query): Query<HashMap<String, String>>,
        body: String,
    ) -> axum::Json<Value> {
        let body: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
        axum::Json(json!({ "method": method.as_str(), "query": query, "body": body }))
    }

    fn router() -> Router {
        Router::new()
            .route("/status/{code}", any(respond_with))
            .route("/echo", any(echo))
    }

    async fn call(client: &ApiClient, verb: &str, url: &str) -> Result<Response, ApiClientError> {
        let data = json!({ "key": "value" });
        match verb {
            "GET" => client.get(url, None).await,
            "POST" => client.post(url, Some(&data), None).await,
            "PUT" => client.put(url, Some(&data), None).await,
            "PATCH" => client.patch(url, Some(&data), None).await,
            "DELETE" => client.delete(url, Some(&data), None).await,
            other => panic!("unknown verb {}", other),
        }
    }

    // ==================== ステータス判定 テスト ====================

    #[tokio::test]
    async fn test_every_verb_maps_status_codes() {
        let base = spawn_server(router()).await;
        let client = ApiClient::new().unwrap();

        for code in [200u16, 201, 204, 400, 404, 500] {
            for verb in ["GET", "POST", "PUT", "PATCH", "DELETE"] {
                let url = format!("{}/status/{}", base, code);
                let result = call(&client, verb, &url).await;

                if code < 300 {
                    let response = result.unwrap();
                    assert_eq!(response.status().as_u16(), code, "{} {}", verb, code);
                } else {
                    match result {
                        Err(ApiClientError::HttpStatus { status, body }) => {
                            assert_eq!(status, code, "{} {}", verb, code);
                            assert_eq!(body, format!("status {}", code));
                        }
                        other => panic!("{} {}: unexpected result {:?}", verb, code, other),
                    }
                }
            }
        }
    }

    #[tokio::test]
    async fn test_redirect_without_location_is_error() {
        let base = spawn_server(router()).await;
        let client = ApiClient::new().unwrap();

        let result = client.get(&format!("{}/status/302", base), None).await;
        assert!(matches!(
            result,
            Err(ApiClientError::HttpStatus { status: 302, .. })
        ));
    }

    // ==================== リクエスト内容 テスト ====================

    #[tokio::test]
    async fn test_post_sends_json_body_and_query() {
        let base = spawn_server(router()).await;
        let client = ApiClient::new().unwrap();

        let response = client
            .post(
                &format!("{}/echo", base),
                Some(&json!({ "links": ["a", "b"] })),
                Some(&[("page", "2")]),
            )
            .await
            .unwrap();
        let echoed: Value = ApiClient::json(response).await.unwrap();

        assert_eq!(echoed["method"], "POST");
        assert_eq!(echoed["query"]["page"], "2");
        assert_eq!(echoed["body"]["links"], json!(["a", "b"]));
    }

    #[tokio::test]
    async fn test_delete_sends_optional_json_body() {
        let base = spawn_server(router()).await;
        let client = ApiClient::new().unwrap();
        let url = format!("{}/echo", base);

        let response = client
            .delete(&url, Some(&json!({ "ids": [1, 2] })), Some(&[("force", "true")]))
            .await
            .unwrap();
        let echoed: Value = ApiClient::json(response).await.unwrap();
        assert_eq!(echoed["method"], "DELETE");
        assert_eq!(echoed["query"]["force"], "true");
        assert_eq!(echoed["body"]["ids"], json!([1, 2]));

        let response = client.delete(&url, None::<&Value>, None).await.unwrap();
        let echoed: Value = ApiClient::json(response).await.unwrap();
        assert_eq!(echoed["body"], Value::Null);
    }

    #[tokio::test]
    async fn test_json_decode_error() {
        let base = spawn_server(router()).await;
        let client = ApiClient::new().unwrap();

        let response = client
            .get(&format!("{}/status/200", base), None)
            .await
            .unwrap();
        let result: Result<Value, _> = ApiClient::json(response).await;

        assert!(matches!(result, Err(ApiClientError::Decode(_))));
    }

    // ==================== ネットワークエラー テスト ====================

    #[tokio::test]
    async fn test_connection_refused_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = ApiClient::new().unwrap();
        let result = client.get(&format!("http://{}/status/200", addr), None).await;

        assert!(matches!(result, Err(ApiClientError::Transport(_))));
    }

    #[tokio::test]
    async fn test_invalid_url_is_request_error() {
        let client = ApiClient::new().unwrap();
        let result = client.get("not a url", None).await;

        assert!(matches!(result, Err(ApiClientError::Request(_))));
    }

    #[test]
    fn test_http_status_display() {
        let error = ApiClientError::HttpStatus {
            status: 404,
            body: "not found".to_string(),
        };
        assert_eq!(error.to_string(), "HTTPエラー: status=404, body=not found");
    }
}
