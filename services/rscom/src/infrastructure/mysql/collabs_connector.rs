/// collaboration-serviceデータベースの名前付きクエリ
use async_trait::async_trait;
use sqlx::Row;
use sqlx::mysql::MySqlRow;
use tracing::{error, info};

use super::connector::{ConnectorError, MySqlConnector, SqlParam, decode_error, in_placeholders};
use super::repository::CollabsRepository;
use crate::domain::{BrandAdvertiser, Campaign, PostCampaign, REPORTING_OFFSET_WEEKS};
use crate::infrastructure::config::{MySqlConfig, MySqlStore};

/// collaboration-serviceデータベースへのコネクタ
///
/// ID列は型の差異を吸収するためCASTして取得する。
pub struct CollabsConnector {
    db: MySqlConnector,
}

impl CollabsConnector {
    pub async fn connect(config: &MySqlConfig) -> Result<Self, ConnectorError> {
        let db = MySqlConnector::connect(MySqlStore::Collabs.label(), config).await?;
        Ok(Self { db })
    }

    /// 任意のクエリを実行する
    pub async fn execute(
        &self,
        query: &str,
        params: &[SqlParam],
    ) -> Result<Vec<MySqlRow>, ConnectorError> {
        self.db.execute("collabs.execute", query, params).await
    }

    pub async fn close(self) {
        self.db.close().await;
    }

    /// obligationsとcampaignsを結合するSELECT文（空リストは`None`）
    pub(crate) fn campaigns_query(post_ids: &[String]) -> Option<(String, Vec<SqlParam>)> {
        if post_ids.is_empty() {
            return None;
        }
        let sql = format!(
            "SELECT CAST(obligations.post_id AS CHAR) AS post_id, \
             CAST(campaigns.id AS SIGNED) AS campaign_id, \
             CAST(campaigns.start_date AS DATETIME) AS start_date, \
             CAST(campaigns.end_date AS DATETIME) AS end_date \
             FROM obligations JOIN campaigns ON campaigns.id = obligations.campaign_id \
             WHERE obligations.post_id IN ({}) ORDER BY obligations.id",
            in_placeholders(post_ids.len())
        );
        let params = post_ids
            .iter()
            .map(|id| SqlParam::from(id.as_str()))
            .collect();
        Some((sql, params))
    }

    /// キャンペーンのレポート期間を更新するUPDATE文（空リストは`None`）
    pub(crate) fn campaign_reporting_statement(
        campaign_ids: &[i64],
    ) -> Option<(String, Vec<SqlParam>)> {
        if campaign_ids.is_empty() {
            return None;
        }
        let sql = format!(
            "UPDATE campaigns SET reporting_start_date = start_date, \
             reporting_end_date = DATE_ADD(start_date, INTERVAL ? WEEK) \
             WHERE id IN ({})",
            in_placeholders(campaign_ids.len())
        );
        let mut params = vec![SqlParam::Int(REPORTING_OFFSET_WEEKS)];
        params.extend(campaign_ids.iter().map(|id| SqlParam::Int(*id)));
        Some((sql, params))
    }

    /// 広告主IDを含む行を探すLIKEパターン（ワイルドカードはエスケープする）
    pub(crate) fn advertiser_like_pattern(advertiser_id: &str) -> String {
        let escaped = advertiser_id
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        format!("%{}%", escaped)
    }

    async fn fetch_i64(
        &self,
        operation: &'static str,
        key: String,
        query: &str,
        params: &[SqlParam],
    ) -> Result<i64, ConnectorError> {
        let row = self.db.fetch_one(operation, &key, query, params).await?;
        row.try_get("id").map_err(decode_error(operation))
    }

    async fn fetch_brand_id(
        &self,
        operation: &'static str,
        key: String,
        query: &str,
        params: &[SqlParam],
    ) -> Result<String, ConnectorError> {
        let row = self.db.fetch_one(operation, &key, query, params).await?;
        row.try_get("brand_id").map_err(decode_error(operation))
    }

    fn brand_from_row(row: &MySqlRow) -> Result<BrandAdvertiser, ConnectorError> {
        let decode = decode_error("collabs.decode_brand");
        let advertiser_ids: Option<String> = row.try_get("advertiser_ids").map_err(&decode)?;
        Ok(BrandAdvertiser {
            brand_id: row.try_get("brand_id").map_err(&decode)?,
            advertiser_ids: advertiser_ids.unwrap_or_default(),
        })
    }

    fn post_campaign_from_row(row: &MySqlRow) -> Result<PostCampaign, ConnectorError> {
        let decode = decode_error("campaigns_for_posts");
        Ok(PostCampaign {
            post_id: row.try_get("post_id").map_err(&decode)?,
            campaign: Campaign {
                id: row.try_get("campaign_id").map_err(&decode)?,
                start_date: row.try_get("start_date").map_err(&decode)?,
                end_date: row.try_get("end_date").map_err(&decode)?,
            },
        })
    }
}

#[async_trait]
impl CollabsRepository for CollabsConnector {
    async fn campaigns_for_posts(
        &self,
        post_ids: &[String],
    ) -> Result<Vec<PostCampaign>, ConnectorError> {
        let Some((sql, params)) = Self::campaigns_query(post_ids) else {
            return Ok(Vec::new());
        };
        let rows = self.db.execute("campaigns_for_posts", &sql, &params).await?;
        let campaigns = rows
            .iter()
            .map(Self::post_campaign_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        info!(
            post_count = post_ids.len(),
            row_count = campaigns.len(),
            "投稿のキャンペーンを取得"
        );
        Ok(campaigns)
    }

    async fn get_advertiser_ids(&self, brand_id: &str) -> Result<BrandAdvertiser, ConnectorError> {
        let row = self
            .db
            .fetch_one(
                "get_advertiser_ids",
                &format!("brand_id={}", brand_id),
                "SELECT CAST(brand_id AS CHAR) AS brand_id, CAST(advertiser_ids AS CHAR) AS advertiser_ids \
                 FROM brand_advertisers WHERE brand_id = ?",
                &[SqlParam::from(brand_id)],
            )
            .await?;
        Self::brand_from_row(&row)
    }

    async fn get_brand_id(&self, collaboration_id: i64) -> Result<String, ConnectorError> {
        self.fetch_brand_id(
            "get_brand_id",
            format!("collaboration_id={}", collaboration_id),
            "SELECT CAST(brand_id AS CHAR) AS brand_id FROM collaborations WHERE id = ?",
            &[SqlParam::Int(collaboration_id)],
        )
        .await
    }

    /// LIKEで候補を絞り、カンマ区切りの完全一致で確定する
    async fn get_brand_id_by_advertiser_id(
        &self,
        advertiser_id: &str,
    ) -> Result<String, ConnectorError> {
        let operation = "get_brand_id_by_advertiser_id";
        let rows = self
            .db
            .execute(
                operation,
                "SELECT CAST(brand_id AS CHAR) AS brand_id, CAST(advertiser_ids AS CHAR) AS advertiser_ids \
                 FROM brand_advertisers WHERE advertiser_ids LIKE ?",
                &[SqlParam::from(Self::advertiser_like_pattern(advertiser_id))],
            )
            .await?;

        for row in &rows {
            let brand = Self::brand_from_row(row)?;
            if brand.owns(advertiser_id) {
                return Ok(brand.brand_id);
            }
        }

        error!(operation = operation, advertiser_id = %advertiser_id, "結果が見つかりません");
        Err(ConnectorError::NotFound {
            operation,
            key: format!("advertiser_id={}", advertiser_id),
        })
    }

    async fn get_collaboration_id_by_obligation_id(
        &self,
        obligation_id: i64,
    ) -> Result<i64, ConnectorError> {
        self.fetch_i64(
            "get_collaboration_id_by_obligation_id",
            format!("obligation_id={}", obligation_id),
            "SELECT CAST(collaboration_id AS SIGNED) AS id FROM obligations WHERE id = ?",
            &[SqlParam::Int(obligation_id)],
        )
        .await
    }

    async fn get_obligation_id_by_post_id(&self, post_id: &str) -> Result<i64, ConnectorError> {
        self.fetch_i64(
            "get_obligation_id_by_post_id",
            format!("post_id={}", post_id),
            "SELECT CAST(id AS SIGNED) AS id FROM obligations WHERE post_id = ?",
            &[SqlParam::from(post_id)],
        )
        .await
    }

    async fn save_rstyle_links_for_obligation_id(
        &self,
        links_csv: &str,
        obligation_id: i64,
    ) -> Result<u64, ConnectorError> {
        let affected = self
            .db
            .execute_statement(
                "save_rstyle_links_for_obligation_id",
                "INSERT INTO obligation_rstyle_links (obligation_id, rstyle_links) VALUES (?, ?)",
                &[SqlParam::Int(obligation_id), SqlParam::from(links_csv)],
            )
            .await?;
        info!(obligation_id = obligation_id, "obligationのrstyleリンクを保存");
        Ok(affected)
    }

    async fn update_campaign_reporting_dates(
        &self,
        campaign_ids: &[i64],
    ) -> Result<u64, ConnectorError> {
        let Some((sql, params)) = Self::campaign_reporting_statement(campaign_ids) else {
            return Ok(0);
        };
        let affected = self
            .db
            .execute_statement("update_campaign_reporting_dates", &sql, &params)
            .await?;
        info!(
            campaign_count = campaign_ids.len(),
            affected = affected,
            "キャンペーンのレポート期間を更新"
        );
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== campaigns_for_posts クエリ テスト ====================

    #[test]
    fn test_campaigns_query_empty_is_none() {
        assert!(CollabsConnector::campaigns_query(&[]).is_none());
    }

    #[test]
    fn test_campaigns_query_uses_placeholders_only() {
        let ids = vec!["p-1".to_string(), "p\"2".to_string()];
        let (sql, params) = CollabsConnector::campaigns_query(&ids).unwrap();

        assert!(sql.contains("WHERE obligations.post_id IN (?, ?)"));
        // 値はSQL文字列に埋め込まれない
        assert!(!sql.contains("p-1"));
        assert_eq!(params, vec![SqlParam::from("p-1"), SqlParam::from("p\"2")]);
    }

    // ==================== update_campaign_reporting_dates テスト ====================

    #[test]
    fn test_campaign_reporting_statement() {
        let (sql, params) = CollabsConnector::campaign_reporting_statement(&[3, 5]).unwrap();

        assert!(sql.contains("reporting_start_date = start_date"));
        assert!(sql.contains("DATE_ADD(start_date, INTERVAL ? WEEK)"));
        assert!(sql.ends_with("WHERE id IN (?, ?)"));
        assert_eq!(
            params,
            vec![SqlParam::Int(6), SqlParam::Int(3), SqlParam::Int(5)]
        );
    }

    #[test]
    fn test_campaign_reporting_statement_empty_is_none() {
        assert!(CollabsConnector::campaign_reporting_statement(&[]).is_none());
    }

    // ==================== LIKEパターン テスト ====================

    #[test]
    fn test_advertiser_like_pattern_escapes_wildcards() {
        assert_eq!(CollabsConnector::advertiser_like_pattern("123"), "%123%");
        assert_eq!(
            CollabsConnector::advertiser_like_pattern("a%b_c\\d"),
            "%a\\%b\\_c\\\\d%"
        );
    }
}
