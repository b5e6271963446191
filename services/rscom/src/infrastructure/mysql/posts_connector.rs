/// post-serviceデータベースの名前付きクエリ
use async_trait::async_trait;
use sqlx::Row;
use sqlx::mysql::MySqlRow;
use tracing::info;

use super::connector::{ConnectorError, MySqlConnector, SqlParam, decode_error, in_placeholders};
use super::repository::PostsRepository;
use crate::domain::{Post, PostStatus, RepairFilter, ReportingWindowUpdate};
use crate::infrastructure::config::{MySqlConfig, MySqlStore};

const POST_COLUMNS: &str = "CAST(id AS CHAR) AS id, CAST(status AS CHAR) AS status, \
     CAST(channel AS CHAR) AS channel, created_at, reporting_start_time, reporting_end_time";

/// post-serviceデータベースへのコネクタ
pub struct PostsConnector {
    db: MySqlConnector,
}

impl PostsConnector {
    pub async fn connect(config: &MySqlConfig) -> Result<Self, ConnectorError> {
        let db = MySqlConnector::connect(MySqlStore::Posts.label(), config).await?;
        Ok(Self { db })
    }

    /// 任意のクエリを実行する
    pub async fn execute(
        &self,
        query: &str,
        params: &[SqlParam],
    ) -> Result<Vec<MySqlRow>, ConnectorError> {
        self.db.execute("posts.execute", query, params).await
    }

    pub async fn close(self) {
        self.db.close().await;
    }

    /// 修復対象を選ぶSELECT文
    pub(crate) fn repair_query(filter: RepairFilter) -> (String, Vec<SqlParam>) {
        match filter {
            RepairFilter::NullReportingWindow => {
                let channels = RepairFilter::EXCLUDED_CHANNELS;
                let mut params = vec![SqlParam::from(PostStatus::DELETED)];
                params.extend(channels.iter().map(|c| SqlParam::from(*c)));
                params.push(SqlParam::from(RepairFilter::created_since()));
                let sql = format!(
                    "SELECT {} FROM posts WHERE status != ? AND reporting_end_time IS NULL \
                     AND channel NOT IN ({}) AND created_at >= ?",
                    POST_COLUMNS,
                    in_placeholders(channels.len())
                );
                (sql, params)
            }
            RepairFilter::EndYear0001 => (
                format!(
                    "SELECT {} FROM posts WHERE YEAR(reporting_end_time) = ?",
                    POST_COLUMNS
                ),
                vec![SqlParam::Int(i64::from(RepairFilter::PLACEHOLDER_YEAR))],
            ),
        }
    }

    /// 1投稿分のUPDATE文（開始日時を更新しない場合は終了日時のみ）
    pub(crate) fn update_statement(
        update: &ReportingWindowUpdate,
    ) -> (&'static str, Vec<SqlParam>) {
        match update.reporting_start_time {
            Some(start) => (
                "UPDATE posts SET reporting_start_time = ?, reporting_end_time = ? WHERE id = ?",
                vec![
                    SqlParam::from(start),
                    SqlParam::from(update.reporting_end_time),
                    SqlParam::from(update.post_id.as_str()),
                ],
            ),
            None => (
                "UPDATE posts SET reporting_end_time = ? WHERE id = ?",
                vec![
                    SqlParam::from(update.reporting_end_time),
                    SqlParam::from(update.post_id.as_str()),
                ],
            ),
        }
    }

    /// 個別更新を同じUPDATE文の連続ごとにまとめる（投稿の順序は保つ）
    pub(crate) fn individual_batches(
        updates: &[ReportingWindowUpdate],
    ) -> Vec<(&'static str, Vec<Vec<SqlParam>>)> {
        let mut batches: Vec<(&'static str, Vec<Vec<SqlParam>>)> = Vec::new();
        for update in updates {
            let (sql, params) = Self::update_statement(update);
            if let Some((last_sql, param_sets)) = batches.last_mut() {
                if *last_sql == sql {
                    param_sets.push(params);
                    continue;
                }
            }
            batches.push((sql, vec![params]));
        }
        batches
    }

    /// 全投稿分をまとめたCASE式のUPDATE文（空なら`None`）
    ///
    /// パラメータは開始日時のWHEN句、終了日時のWHEN句、IN句の順にバインドする。
    pub(crate) fn bulk_update_statement(
        updates: &[ReportingWindowUpdate],
    ) -> Option<(String, Vec<SqlParam>)> {
        if updates.is_empty() {
            return None;
        }

        let mut params = Vec::new();
        let mut assignments = Vec::new();

        let starts: Vec<_> = updates
            .iter()
            .filter_map(|u| u.reporting_start_time.map(|start| (u.post_id.as_str(), start)))
            .collect();
        if !starts.is_empty() {
            let whens = vec!["WHEN ? THEN ?"; starts.len()].join(" ");
            assignments.push(format!(
                "reporting_start_time = CASE id {} ELSE reporting_start_time END",
                whens
            ));
            for (post_id, start) in starts {
                params.push(SqlParam::from(post_id));
                params.push(SqlParam::from(start));
            }
        }

        let whens = vec!["WHEN ? THEN ?"; updates.len()].join(" ");
        assignments.push(format!(
            "reporting_end_time = CASE id {} ELSE reporting_end_time END",
            whens
        ));
        for update in updates {
            params.push(SqlParam::from(update.post_id.as_str()));
            params.push(SqlParam::from(update.reporting_end_time));
        }

        params.extend(updates.iter().map(|u| SqlParam::from(u.post_id.as_str())));
        let sql = format!(
            "UPDATE posts SET {} WHERE id IN ({})",
            assignments.join(", "),
            in_placeholders(updates.len())
        );
        Some((sql, params))
    }

    fn post_from_row(row: &MySqlRow) -> Result<Post, ConnectorError> {
        let decode = decode_error("posts.decode_post");
        let status: String = row.try_get("status").map_err(&decode)?;
        let channel: Option<String> = row.try_get("channel").map_err(&decode)?;
        Ok(Post {
            id: row.try_get("id").map_err(&decode)?,
            status: PostStatus::parse(&status),
            channel: channel.unwrap_or_default(),
            created_at: row.try_get("created_at").map_err(&decode)?,
            reporting_start_time: row.try_get("reporting_start_time").map_err(&decode)?,
            reporting_end_time: row.try_get("reporting_end_time").map_err(&decode)?,
        })
    }
}

#[async_trait]
impl PostsRepository for PostsConnector {
    async fn find_posts_for_repair(
        &self,
        filter: RepairFilter,
    ) -> Result<Vec<Post>, ConnectorError> {
        let (sql, params) = Self::repair_query(filter);
        let rows = self
            .db
            .execute("find_posts_for_repair", &sql, &params)
            .await?;
        let posts = rows
            .iter()
            .map(Self::post_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        info!(filter = %filter, count = posts.len(), "修復対象の投稿を取得");
        Ok(posts)
    }

    async fn get_rstyle_links_for_post_id(
        &self,
        post_id: &str,
    ) -> Result<Vec<String>, ConnectorError> {
        let decode = decode_error("get_rstyle_links_for_post_id");
        let rows = self
            .db
            .execute(
                "get_rstyle_links_for_post_id",
                "SELECT url FROM rstyle_links WHERE post_id = ?",
                &[SqlParam::from(post_id)],
            )
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("url").map_err(&decode))
            .collect()
    }

    async fn update_reporting_windows(
        &self,
        updates: &[ReportingWindowUpdate],
    ) -> Result<u64, ConnectorError> {
        let mut affected = 0;
        for (sql, param_sets) in Self::individual_batches(updates) {
            affected += self
                .db
                .execute_many("update_reporting_windows", sql, &param_sets)
                .await?;
        }
        Ok(affected)
    }

    async fn bulk_update_reporting_windows(
        &self,
        updates: &[ReportingWindowUpdate],
    ) -> Result<u64, ConnectorError> {
        let Some((sql, params)) = Self::bulk_update_statement(updates) else {
            return Ok(0);
        };
        self.db
            .execute_statement("bulk_update_reporting_windows", &sql, &params)
            .await
    }
}
