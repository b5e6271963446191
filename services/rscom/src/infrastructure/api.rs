//! REST APIクライアント
//!
//! - `client`: 共通のHTTPクライアントとエラー判定
//! - `hyperlink_client`: Hyperlink API（リンク情報）
//! - `post_client`: Post Service API（投稿のrstyleリンク）

mod client;
mod hyperlink_client;
mod post_client;

pub use client::{ApiClient, ApiClientError, QueryParams, check_for_errors};
pub use hyperlink_client::{HyperlinkClient, LinkLookup, quote_path};
pub use post_client::{PostClient, PostLinksSource};

#[cfg(test)]
pub(crate) use client::tests::spawn_server;
