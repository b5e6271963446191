/// obligationのrstyleリンク同期ジョブ
///
/// Post Service APIから投稿のrstyleリンクを取得し、
/// 投稿のobligationに紐づけてobligation_rstyle_linksへカンマ区切りで保存する。
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::infrastructure::{ApiClientError, CollabsRepository, ConnectorError, PostLinksSource};

/// 同期ジョブのエラー型
#[derive(Debug, Error)]
pub enum ObligationLinkSyncError {
    #[error("Post Service APIエラー: {0}")]
    Api(#[from] ApiClientError),
    #[error("Collabs DBエラー: {0}")]
    Collabs(#[from] ConnectorError),
}

/// 同期結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObligationLinkSyncReport {
    pub post_id: String,
    pub obligation_id: Option<i64>,
    pub links: Vec<String>,
}

/// レスポンスからリンクURLを取り出す
///
/// 文字列の配列、`url`を持つオブジェクトの配列、
/// またはそれらを`rstyle_links`に入れたオブジェクトを受け付ける。
pub fn extract_link_urls(value: &Value) -> Vec<String> {
    let items = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("rstyle_links") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };

    items
        .iter()
        .filter_map(|item| match item {
            Value::String(url) => Some(url.clone()),
            Value::Object(map) => map.get("url").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .filter(|url| !url.is_empty())
        .collect()
}

/// obligationのrstyleリンク同期ジョブ
pub struct ObligationLinkSyncJob<'a, S, C>
where
    S: PostLinksSource,
    C: CollabsRepository,
{
    post_links: &'a S,
    collabs: &'a C,
}

impl<'a, S, C> ObligationLinkSyncJob<'a, S, C>
where
    S: PostLinksSource,
    C: CollabsRepository,
{
    pub fn new(post_links: &'a S, collabs: &'a C) -> Self {
        Self {
            post_links,
            collabs,
        }
    }

    /// 投稿1件分を同期する（リンクがなければ保存しない）
    pub async fn sync_post(
        &self,
        post_id: &str,
    ) -> Result<ObligationLinkSyncReport, ObligationLinkSyncError> {
        let response = self.post_links.get_links_for_post_id(post_id).await?;
        let links = extract_link_urls(&response);
        if links.is_empty() {
            warn!(post_id = %post_id, "投稿にrstyleリンクがありません");
            return Ok(ObligationLinkSyncReport {
                post_id: post_id.to_string(),
                obligation_id: None,
                links,
            });
        }

        let obligation_id = self.collabs.get_obligation_id_by_post_id(post_id).await?;
        self.collabs
            .save_rstyle_links_for_obligation_id(&links.join(","), obligation_id)
            .await?;
        info!(
            post_id = %post_id,
            obligation_id = obligation_id,
            link_count = links.len(),
            "obligationにrstyleリンクを同期"
        );

        Ok(ObligationLinkSyncReport {
            post_id: post_id.to_string(),
            obligation_id: Some(obligation_id),
            links,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Obligation;
    use crate::infrastructure::mysql::repository::tests::MockCollabsRepository;
    use async_trait::async_trait;
    use serde_json::json;

    struct StaticPostLinks(Value);

    #[async_trait]
    impl PostLinksSource for StaticPostLinks {
        async fn get_links_for_post_id(&self, _post_id: &str) -> Result<Value, ApiClientError> {
            Ok(self.0.clone())
        }
    }

    fn collabs_with_obligation() -> MockCollabsRepository {
        MockCollabsRepository::new().with_obligation(Obligation {
            id: 77,
            post_id: "P1".to_string(),
            campaign_id: 1,
            collaboration_id: 5,
        })
    }

    // ==================== extract_link_urls テスト ====================

    #[test]
    fn test_extract_from_object_array() {
        let value = json!([{ "url": "https://rstyle.me/n/a" }, { "url": "https://rstyle.me/n/b" }]);
        assert_eq!(
            extract_link_urls(&value),
            vec!["https://rstyle.me/n/a", "https://rstyle.me/n/b"]
        );
    }

    #[test]
    fn test_extract_from_wrapped_string_array() {
        let value = json!({ "rstyle_links": ["https://rstyle.me/n/a", ""] });
        assert_eq!(extract_link_urls(&value), vec!["https://rstyle.me/n/a"]);
    }

    #[test]
    fn test_extract_ignores_unknown_shapes() {
        assert!(extract_link_urls(&json!({ "data": [] })).is_empty());
        assert!(extract_link_urls(&json!(null)).is_empty());
        assert!(extract_link_urls(&json!([1, { "href": "x" }])).is_empty());
    }

    // ==================== sync_post テスト ====================

    #[tokio::test]
    async fn test_sync_saves_comma_joined_links() {
        let source = StaticPostLinks(json!([
            { "url": "https://rstyle.me/n/a" },
            { "url": "https://rstyle.me/n/b" }
        ]));
        let collabs = collabs_with_obligation();

        let report = ObligationLinkSyncJob::new(&source, &collabs)
            .sync_post("P1")
            .await
            .unwrap();

        assert_eq!(report.obligation_id, Some(77));
        assert_eq!(
            collabs.saved_links(77).as_deref(),
            Some("https://rstyle.me/n/a,https://rstyle.me/n/b")
        );
    }

    #[tokio::test]
    async fn test_sync_without_links_does_not_touch_collabs() {
        let source = StaticPostLinks(json!([]));
        let collabs = collabs_with_obligation();

        let report = ObligationLinkSyncJob::new(&source, &collabs)
            .sync_post("P1")
            .await
            .unwrap();

        assert_eq!(report.obligation_id, None);
        assert_eq!(collabs.saved_links(77), None);
    }

    #[tokio::test]
    async fn test_sync_post_without_obligation_is_not_found() {
        let source = StaticPostLinks(json!(["https://rstyle.me/n/a"]));
        let collabs = collabs_with_obligation();

        let result = ObligationLinkSyncJob::new(&source, &collabs)
            .sync_post("P404")
            .await;

        assert!(matches!(
            result,
            Err(ObligationLinkSyncError::Collabs(ConnectorError::NotFound { .. }))
        ));
    }
}
