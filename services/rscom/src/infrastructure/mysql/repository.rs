/// バッチジョブから使うリポジトリトレイト
///
/// 実装はMySQLコネクタ、テストでは`tests`モジュールのモックを使う。
use async_trait::async_trait;

use super::connector::ConnectorError;
use crate::domain::{
    BrandAdvertiser, Post, PostCampaign, RepairFilter, ReportingWindowUpdate,
};

/// post-serviceデータベースの操作
#[async_trait]
pub trait PostsRepository: Send + Sync {
    /// 修復対象の投稿を取得する
    async fn find_posts_for_repair(&self, filter: RepairFilter)
    -> Result<Vec<Post>, ConnectorError>;

    /// 投稿に紐づくrstyleリンクURLを取得する
    async fn get_rstyle_links_for_post_id(&self, post_id: &str)
    -> Result<Vec<String>, ConnectorError>;

    /// 投稿ごとに1文ずつレポート期間を更新する
    async fn update_reporting_windows(
        &self,
        updates: &[ReportingWindowUpdate],
    ) -> Result<u64, ConnectorError>;

    /// 1文のCASE式でレポート期間をまとめて更新する
    async fn bulk_update_reporting_windows(
        &self,
        updates: &[ReportingWindowUpdate],
    ) -> Result<u64, ConnectorError>;
}

/// collaboration-serviceデータベースの操作
#[async_trait]
pub trait CollabsRepository: Send + Sync {
    /// 投稿IDに対応するobligationとcampaignの組を取得する
    async fn campaigns_for_posts(
        &self,
        post_ids: &[String],
    ) -> Result<Vec<PostCampaign>, ConnectorError>;

    /// ブランドの広告主ID一覧
    async fn get_advertiser_ids(&self, brand_id: &str) -> Result<BrandAdvertiser, ConnectorError>;

    /// コラボレーションのブランドID
    async fn get_brand_id(&self, collaboration_id: i64) -> Result<String, ConnectorError>;

    /// 広告主IDを含むブランドID
    async fn get_brand_id_by_advertiser_id(
        &self,
        advertiser_id: &str,
    ) -> Result<String, ConnectorError>;

    /// obligationのコラボレーションID
    async fn get_collaboration_id_by_obligation_id(
        &self,
        obligation_id: i64,
    ) -> Result<i64, ConnectorError>;

    /// 投稿のobligation ID
    async fn get_obligation_id_by_post_id(&self, post_id: &str) -> Result<i64, ConnectorError>;

    /// obligationにrstyleリンク（カンマ区切り）を保存する
    async fn save_rstyle_links_for_obligation_id(
        &self,
        links_csv: &str,
        obligation_id: i64,
    ) -> Result<u64, ConnectorError>;

    /// キャンペーンのレポート期間をキャンペーン開始日から再計算する
    async fn update_campaign_reporting_dates(
        &self,
        campaign_ids: &[i64],
    ) -> Result<u64, ConnectorError>;
}
