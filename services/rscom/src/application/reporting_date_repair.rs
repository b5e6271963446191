/// レポート期間修復ジョブ
///
/// 1. 条件に合う投稿をpostsから取得
/// 2. obligations × campaignsから投稿のキャンペーンを取得
/// 3. キャンペーン日付 + 6週間でレポート期間を計算
/// 4. 指定の書き込み方式でpostsへ書き戻す
///
/// 行単位の復旧は行わず、最初の失敗でジョブ全体を中断する。
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{RepairFilter, WriteStrategy, plan_updates, unmatched_post_ids};
use crate::infrastructure::{CollabsRepository, ConnectorError, PostsRepository};

/// 修復ジョブのエラー型
#[derive(Debug, Error)]
pub enum ReportingDateRepairError {
    #[error("データベース操作に失敗しました: {0}")]
    Connector(#[from] ConnectorError),
}

/// 修復ジョブの実行パラメータ
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepairOptions {
    /// 対象投稿の条件
    pub filter: RepairFilter,
    /// 書き込み方式
    pub write_strategy: WriteStrategy,
    /// obligationのない投稿をログに出すか
    pub report_unmatched: bool,
}

impl Default for RepairOptions {
    fn default() -> Self {
        Self {
            filter: RepairFilter::NullReportingWindow,
            write_strategy: WriteStrategy::Individual,
            report_unmatched: true,
        }
    }
}

/// 修復ジョブの実行結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepairReport {
    /// 条件に合った投稿数
    pub matched_posts: usize,
    /// obligations × campaignsの行数
    pub campaign_rows: usize,
    /// obligationと突き合わなかった投稿ID（report_unmatched時のみ）
    pub unmatched_post_ids: Vec<String>,
    /// 書き込んだ投稿数
    pub updated_posts: usize,
    /// DBが報告した影響行数
    pub rows_affected: u64,
}

/// レポート期間修復ジョブ
pub struct ReportingDateRepairJob<'a, P, C>
where
    P: PostsRepository,
    C: CollabsRepository,
{
    posts: &'a P,
    collabs: &'a C,
    options: RepairOptions,
}

impl<'a, P, C> ReportingDateRepairJob<'a, P, C>
where
    P: PostsRepository,
    C: CollabsRepository,
{
    pub fn new(posts: &'a P, collabs: &'a C, options: RepairOptions) -> Self {
        Self {
            posts,
            collabs,
            options,
        }
    }

    /// ジョブを実行する
    pub async fn run(&self) -> Result<RepairReport, ReportingDateRepairError> {
        let RepairOptions {
            filter,
            write_strategy,
            report_unmatched,
        } = self.options;
        info!(filter = %filter, write_strategy = %write_strategy, "レポート期間修復を開始");

        let posts = self.posts.find_posts_for_repair(filter).await?;
        if posts.is_empty() {
            info!(filter = %filter, "修復対象の投稿がありません");
            return Ok(RepairReport::default());
        }
        info!(post_count = posts.len(), "修復対象の投稿を取得");

        let post_ids: Vec<String> = posts.into_iter().map(|post| post.id).collect();
        let rows = self.collabs.campaigns_for_posts(&post_ids).await?;
        info!(obligation_count = rows.len(), "obligationを取得");

        let unmatched = if report_unmatched {
            let obligation_post_ids: Vec<String> =
                rows.iter().map(|row| row.post_id.clone()).collect();
            let unmatched = unmatched_post_ids(&post_ids, &obligation_post_ids);
            if !unmatched.is_empty() {
                warn!(
                    count = unmatched.len(),
                    post_ids = ?unmatched,
                    "obligationに紐づかない投稿があります"
                );
            }
            unmatched
        } else {
            Vec::new()
        };

        let updates = plan_updates(filter, &rows);
        let rows_affected = match write_strategy {
            WriteStrategy::Individual => self.posts.update_reporting_windows(&updates).await?,
            WriteStrategy::Bulk => self.posts.bulk_update_reporting_windows(&updates).await?,
        };
        info!(
            updated_posts = updates.len(),
            rows_affected = rows_affected,
            "レポート期間の修復が完了"
        );

        Ok(RepairReport {
            matched_posts: post_ids.len(),
            campaign_rows: rows.len(),
            unmatched_post_ids: unmatched,
            updated_posts: updates.len(),
            rows_affected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Campaign, Obligation, Post, PostStatus};
    use crate::infrastructure::logging::init_test_logging;
    use crate::infrastructure::mysql::repository::tests::{
        MockCollabsRepository, MockPostsRepository,
    };
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn post(id: &str, channel: &str) -> Post {
        Post {
            id: id.to_string(),
            status: PostStatus::parse("PUBLISHED"),
            channel: channel.to_string(),
            created_at: at(2021, 1, 5),
            reporting_start_time: None,
            reporting_end_time: None,
        }
    }

    fn obligation(id: i64, post_id: &str, campaign_id: i64) -> Obligation {
        Obligation {
            id,
            post_id: post_id.to_string(),
            campaign_id,
            collaboration_id: 900 + id,
        }
    }

    fn campaign(id: i64, start: NaiveDateTime, end: NaiveDateTime) -> Campaign {
        Campaign {
            id,
            start_date: start,
            end_date: end,
        }
    }

    fn options(filter: RepairFilter, write_strategy: WriteStrategy) -> RepairOptions {
        RepairOptions {
            filter,
            write_strategy,
            report_unmatched: true,
        }
    }

    // ==================== null-window テスト ====================

    #[tokio::test]
    async fn test_null_window_repair_skips_excluded_channel() {
        init_test_logging();
        let posts = MockPostsRepository::new()
            .with_post(post("P1", "IG"))
            .with_post(post("P2", "LTK"));
        let collabs = MockCollabsRepository::new()
            .with_campaign(campaign(10, at(2021, 1, 1), at(2021, 1, 1)))
            .with_obligation(obligation(1, "P1", 10))
            .with_obligation(obligation(2, "P2", 10));

        let job = ReportingDateRepairJob::new(
            &posts,
            &collabs,
            options(RepairFilter::NullReportingWindow, WriteStrategy::Individual),
        );
        let report = job.run().await.unwrap();

        assert_eq!(report.matched_posts, 1);
        assert_eq!(report.updated_posts, 1);
        let p1 = posts.get("P1").unwrap();
        assert_eq!(p1.reporting_start_time, Some(at(2021, 2, 12)));
        assert_eq!(p1.reporting_end_time, Some(at(2021, 2, 12)));
        let p2 = posts.get("P2").unwrap();
        assert_eq!(p2.reporting_end_time, None);
    }

    #[tokio::test]
    async fn test_bulk_strategy_issues_single_write() {
        let posts = MockPostsRepository::new()
            .with_post(post("P1", "IG"))
            .with_post(post("P3", "TIKTOK"));
        let collabs = MockCollabsRepository::new()
            .with_campaign(campaign(10, at(2020, 9, 1), at(2020, 10, 1)))
            .with_obligation(obligation(1, "P1", 10))
            .with_obligation(obligation(3, "P3", 10));

        let job = ReportingDateRepairJob::new(
            &posts,
            &collabs,
            options(RepairFilter::NullReportingWindow, WriteStrategy::Bulk),
        );
        let report = job.run().await.unwrap();

        assert_eq!(report.updated_posts, 2);
        assert_eq!(posts.bulk_calls(), 1);
        assert_eq!(posts.individual_statements(), 0);
        assert_eq!(
            posts.get("P3").unwrap().reporting_start_time,
            Some(at(2020, 10, 13))
        );
    }

    #[tokio::test]
    async fn test_individual_strategy_one_statement_per_post() {
        let posts = MockPostsRepository::new()
            .with_post(post("P1", "IG"))
            .with_post(post("P3", "TIKTOK"));
        let collabs = MockCollabsRepository::new()
            .with_campaign(campaign(10, at(2020, 9, 1), at(2020, 10, 1)))
            .with_obligation(obligation(1, "P1", 10))
            .with_obligation(obligation(3, "P3", 10));

        let job = ReportingDateRepairJob::new(
            &posts,
            &collabs,
            options(RepairFilter::NullReportingWindow, WriteStrategy::Individual),
        );
        job.run().await.unwrap();

        assert_eq!(posts.individual_statements(), 2);
        assert_eq!(posts.bulk_calls(), 0);
    }

    #[tokio::test]
    async fn test_unmatched_posts_reported() {
        let posts = MockPostsRepository::new()
            .with_post(post("P1", "IG"))
            .with_post(post("P4", "IG"));
        let collabs = MockCollabsRepository::new()
            .with_campaign(campaign(10, at(2021, 1, 1), at(2021, 1, 31)))
            .with_obligation(obligation(1, "P1", 10));

        let job = ReportingDateRepairJob::new(&posts, &collabs, RepairOptions::default());
        let report = job.run().await.unwrap();

        assert_eq!(report.unmatched_post_ids, vec!["P4".to_string()]);
        assert_eq!(report.updated_posts, 1);
        assert_eq!(posts.get("P4").unwrap().reporting_end_time, None);
    }

    #[tokio::test]
    async fn test_unmatched_report_can_be_disabled() {
        let posts = MockPostsRepository::new().with_post(post("P4", "IG"));
        let collabs = MockCollabsRepository::new();

        let job = ReportingDateRepairJob::new(
            &posts,
            &collabs,
            RepairOptions {
                report_unmatched: false,
                ..RepairOptions::default()
            },
        );
        let report = job.run().await.unwrap();

        assert!(report.unmatched_post_ids.is_empty());
        assert_eq!(report.updated_posts, 0);
    }

    // ==================== year-0001 テスト ====================

    #[tokio::test]
    async fn test_year_0001_repair_updates_end_only() {
        let mut broken = post("P5", "IG");
        broken.reporting_start_time = Some(at(2020, 9, 20));
        broken.reporting_end_time = Some(at(1, 1, 1));
        let posts = MockPostsRepository::new()
            .with_post(broken)
            .with_post(post("P6", "IG"));
        let collabs = MockCollabsRepository::new()
            .with_campaign(campaign(11, at(2020, 9, 1), at(2020, 9, 30)))
            .with_obligation(obligation(5, "P5", 11))
            .with_obligation(obligation(6, "P6", 11));

        let job = ReportingDateRepairJob::new(
            &posts,
            &collabs,
            options(RepairFilter::EndYear0001, WriteStrategy::Individual),
        );
        let report = job.run().await.unwrap();

        assert_eq!(report.matched_posts, 1);
        let repaired = posts.get("P5").unwrap();
        assert_eq!(repaired.reporting_start_time, Some(at(2020, 9, 20)));
        assert_eq!(repaired.reporting_end_time, Some(at(2020, 11, 11)));
        // null-windowの投稿はこのフィルタでは対象外
        assert_eq!(posts.get("P6").unwrap().reporting_end_time, None);
    }

    // ==================== 境界条件 テスト ====================

    #[tokio::test]
    async fn test_no_matching_posts_skips_collabs() {
        let posts = MockPostsRepository::new();
        let collabs = MockCollabsRepository::new();

        let report = ReportingDateRepairJob::new(&posts, &collabs, RepairOptions::default())
            .run()
            .await
            .unwrap();

        assert_eq!(report, RepairReport::default());
    }

    #[tokio::test]
    async fn test_write_failure_aborts_job() {
        let posts = MockPostsRepository::new()
            .with_post(post("P1", "IG"))
            .failing_writes();
        let collabs = MockCollabsRepository::new()
            .with_campaign(campaign(10, at(2021, 1, 1), at(2021, 1, 1)))
            .with_obligation(obligation(1, "P1", 10));

        let result = ReportingDateRepairJob::new(&posts, &collabs, RepairOptions::default())
            .run()
            .await;

        assert!(matches!(
            result,
            Err(ReportingDateRepairError::Connector(_))
        ));
    }

    #[test]
    fn test_repair_options_deserialize_with_defaults() {
        let options: RepairOptions =
            serde_json::from_str(r#"{"filter": "year-0001", "write_strategy": "bulk"}"#).unwrap();

        assert_eq!(options.filter, RepairFilter::EndYear0001);
        assert_eq!(options.write_strategy, WriteStrategy::Bulk);
        assert!(options.report_unmatched);
    }
}
