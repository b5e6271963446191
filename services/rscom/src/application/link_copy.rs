/// リンクコピージョブ
///
/// Hyperlink APIからリンク情報を取得し、linksテーブルへ書き込む。
/// 投稿を指定した場合はpostsのrstyle_linksにある全URLをコピーする。
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::domain::Link;
use crate::infrastructure::{
    ApiClientError, ConnectorError, LinkLookup, LinkStore, LinksConnectorError, PostsRepository,
};

/// リンクコピーのエラー型
#[derive(Debug, Error)]
pub enum LinkCopyError {
    #[error("Hyperlink APIエラー: {0}")]
    Api(#[from] ApiClientError),
    #[error("Posts DBエラー: {0}")]
    Posts(#[from] ConnectorError),
    #[error("linksテーブルエラー: {0}")]
    LinkStore(#[from] LinksConnectorError),
}

/// コピー結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkCopyReport {
    /// コピーしたリンクのID
    pub copied_link_ids: Vec<String>,
}

/// リンクコピージョブ
pub struct LinkCopyJob<'a, H, L>
where
    H: LinkLookup,
    L: LinkStore,
{
    hyperlink: &'a H,
    links: &'a L,
}

impl<'a, H, L> LinkCopyJob<'a, H, L>
where
    H: LinkLookup,
    L: LinkStore,
{
    pub fn new(hyperlink: &'a H, links: &'a L) -> Self {
        Self { hyperlink, links }
    }

    /// 1リンクをコピーする
    pub async fn copy_link(&self, url: &str) -> Result<Link, LinkCopyError> {
        let link = self.hyperlink.get_link(url).await?;
        self.links.add_link(&link).await?;
        info!(link_id = %link.id, url = %url, "リンクをコピー");
        Ok(link)
    }

    /// 投稿のrstyleリンクをすべてコピーする（最初の失敗で中断）
    pub async fn copy_post_links<P: PostsRepository>(
        &self,
        posts: &P,
        post_id: &str,
    ) -> Result<LinkCopyReport, LinkCopyError> {
        let urls = posts.get_rstyle_links_for_post_id(post_id).await?;
        info!(post_id = %post_id, link_count = urls.len(), "投稿のrstyleリンクを取得");

        let mut report = LinkCopyReport::default();
        for url in &urls {
            let link = self.copy_link(url).await?;
            report.copied_link_ids.push(link.id);
        }
        Ok(report)
    }
}
