//! MySQLコネクタ
//!
//! - `connector`: プール・パラメータバインド・行取得の共通処理
//! - `posts_connector`: post-serviceの名前付きクエリ
//! - `collabs_connector`: collaboration-serviceの名前付きクエリ
//! - `repository`: ジョブから使うリポジトリトレイト

mod collabs_connector;
mod connector;
mod posts_connector;
pub mod repository;

pub use collabs_connector::CollabsConnector;
pub use connector::{ConnectorError, MySqlConnector, SqlParam, in_placeholders};
pub use posts_connector::PostsConnector;
pub use repository::{CollabsRepository, PostsRepository};
