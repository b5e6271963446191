/// ログ基盤モジュール
///
/// バッチスクリプトとLambda双方で使う構造化ログ設定を提供する。
/// CloudWatchで検索しやすいようJSON形式で出力する。
use std::sync::Once;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// ログサブスクライバー初期化用の同期プリミティブ
static INIT: Once = Once::new();

/// デフォルトのログレベル（`RUST_LOG`未設定時）
const DEFAULT_LEVEL: &str = "info";

/// ログサブスクライバーを初期化する
///
/// 環境変数`RUST_LOG`でレベルを上書きできる。
/// 複数回呼び出しても最初の一回だけ初期化される。
///
/// # 使用例
/// ```ignore
/// use rscom::infrastructure::init_logging;
///
/// init_logging();
/// tracing::info!(post_id = "p-1", "レポート期間を更新");
/// ```
pub fn init_logging() {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));

        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .flatten_event(true)
            .with_current_span(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(json_layer)
            .init();
    });
}

/// テスト用のログサブスクライバーを初期化する（人間が読みやすい形式）
#[cfg(test)]
pub fn init_test_logging() {
    static TEST_INIT: Once = Once::new();

    TEST_INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_test_writer()
            .with_target(true)
            .compact();

        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init();
    });
}
