/// Hyperlinkのlinksテーブル（Cassandra/ScyllaDB）へのコネクタ
///
/// リンクは商品・パブリッシャー情報を非正規化した1行として書き込む。
/// 同じidでの再書き込みはCassandraのupsertで上書きされる。
use async_trait::async_trait;
use scylla::prepared_statement::PreparedStatement;
use scylla::transport::errors::{NewSessionError, QueryError};
use scylla::{Session, SessionBuilder};
use secrecy::ExposeSecret;
use thiserror::Error;
use tracing::{error, info};

use crate::domain::Link;
use crate::infrastructure::config::CassandraConfig;

const INSERT_LINK: &str = "INSERT INTO links (id, link_url, product_id, product_id_v2, \
     product_name, product_price, product_sku, product_type, publisher_id, redirect_url, version) \
     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)";

/// linksコネクタのエラー型
#[derive(Debug, Error)]
pub enum LinksConnectorError {
    /// セッション作成失敗
    #[error("Cassandraセッションの作成に失敗しました: {0}")]
    NewSession(#[from] NewSessionError),
    /// キースペース選択失敗
    #[error("キースペース {keyspace} を選択できません: {source}")]
    Keyspace {
        keyspace: String,
        #[source]
        source: QueryError,
    },
    /// ステートメント準備失敗
    #[error("INSERT文の準備に失敗しました: {0}")]
    Prepare(#[source] QueryError),
    /// 書き込み失敗
    #[error("リンクの書き込みに失敗しました ({url}): {source}")]
    Write {
        url: String,
        #[source]
        source: QueryError,
    },
}

/// linksテーブルの1行（INSERT文のバインド順）
pub type LinkRow<'a> = (
    &'a str,
    &'a str,
    Option<&'a str>,
    Option<&'a str>,
    Option<&'a str>,
    Option<f64>,
    Option<&'a str>,
    Option<&'a str>,
    Option<&'a str>,
    Option<&'a str>,
    Option<i32>,
);

/// リンクを非正規化した行に変換する
pub fn link_row(link: &Link) -> LinkRow<'_> {
    (
        link.id.as_str(),
        link.url.as_str(),
        link.item.id.as_deref(),
        link.item.product_id_v2.as_deref(),
        link.item.name.as_deref(),
        link.item.price,
        link.item.sku.as_deref(),
        link.item.product_type.as_deref(),
        link.publisher.id.as_deref(),
        link.redirect_url.as_deref(),
        link.version,
    )
}

/// リンク保存トレイト（テスト用の抽象化）
#[async_trait]
pub trait LinkStore: Send + Sync {
    /// リンクを1件書き込む
    async fn add_link(&self, link: &Link) -> Result<(), LinksConnectorError>;
}

/// ScyllaDBドライバーを使用した実装
pub struct LinksConnector {
    session: Session,
    insert_link: PreparedStatement,
}

impl LinksConnector {
    /// セッションを作成し、キースペースを選択してINSERT文を準備する
    pub async fn connect(config: &CassandraConfig) -> Result<Self, LinksConnectorError> {
        let contact_points = config.contact_points();
        let mut builder = SessionBuilder::new().known_nodes(&contact_points);
        if let Some((user, password)) = config.credentials() {
            builder = builder.user(user, password.expose_secret());
        }

        let session = builder.build().await.map_err(|e| {
            error!(hosts = ?contact_points, error = %e, "Cassandra接続エラー");
            LinksConnectorError::NewSession(e)
        })?;

        session
            .use_keyspace(config.keyspace(), false)
            .await
            .map_err(|e| LinksConnectorError::Keyspace {
                keyspace: config.keyspace().to_string(),
                source: e,
            })?;

        let insert_link = session
            .prepare(INSERT_LINK)
            .await
            .map_err(LinksConnectorError::Prepare)?;

        info!(hosts = ?contact_points, keyspace = %config.keyspace(), "Cassandraに接続");
        Ok(Self {
            session,
            insert_link,
        })
    }
}

#[async_trait]
impl LinkStore for LinksConnector {
    async fn add_link(&self, link: &Link) -> Result<(), LinksConnectorError> {
        self.session
            .execute_unpaged(&self.insert_link, link_row(link))
            .await
            .map_err(|e| {
                error!(url = %link.url, error = %e, "リンクの書き込みエラー");
                LinksConnectorError::Write {
                    url: link.url.clone(),
                    source: e,
                }
            })?;
        info!(link_id = %link.id, url = %link.url, "リンクを書き込み");
        Ok(())
    }
}
