/// コラボレーション情報の参照
///
/// obligation → collaboration → brand → 広告主ID、
/// または広告主ID → brandを辿る。キャンペーンのレポート期間の再計算も扱う。
use serde::Serialize;
use tracing::info;

use crate::infrastructure::{CollabsRepository, ConnectorError};

/// obligationから辿ったブランド情報
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObligationBrand {
    pub obligation_id: i64,
    pub collaboration_id: i64,
    pub brand_id: String,
    pub advertiser_ids: Vec<String>,
}

/// コラボレーション参照
pub struct CollabLookup<'a, C>
where
    C: CollabsRepository,
{
    collabs: &'a C,
}

impl<'a, C> CollabLookup<'a, C>
where
    C: CollabsRepository,
{
    pub fn new(collabs: &'a C) -> Self {
        Self { collabs }
    }

    /// obligationのブランドと広告主IDを取得する
    pub async fn describe_obligation(
        &self,
        obligation_id: i64,
    ) -> Result<ObligationBrand, ConnectorError> {
        let collaboration_id = self
            .collabs
            .get_collaboration_id_by_obligation_id(obligation_id)
            .await?;
        let brand_id = self.collabs.get_brand_id(collaboration_id).await?;
        let brand = self.collabs.get_advertiser_ids(&brand_id).await?;

        Ok(ObligationBrand {
            obligation_id,
            collaboration_id,
            advertiser_ids: brand
                .advertiser_id_list()
                .into_iter()
                .map(str::to_string)
                .collect(),
            brand_id,
        })
    }

    /// 投稿のobligationからブランド情報を取得する
    pub async fn describe_post(&self, post_id: &str) -> Result<ObligationBrand, ConnectorError> {
        let obligation_id = self.collabs.get_obligation_id_by_post_id(post_id).await?;
        self.describe_obligation(obligation_id).await
    }

    /// 広告主IDのブランドIDを取得する
    pub async fn brand_for_advertiser(
        &self,
        advertiser_id: &str,
    ) -> Result<String, ConnectorError> {
        self.collabs.get_brand_id_by_advertiser_id(advertiser_id).await
    }

    /// キャンペーンのレポート期間を開始日から再計算する
    pub async fn reset_campaign_windows(
        &self,
        campaign_ids: &[i64],
    ) -> Result<u64, ConnectorError> {
        let affected = self
            .collabs
            .update_campaign_reporting_dates(campaign_ids)
            .await?;
        info!(campaign_ids = ?campaign_ids, affected = affected, "キャンペーンのレポート期間を再計算");
        Ok(affected)
    }
}
