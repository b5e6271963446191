/// obligationのrstyleリンク同期スクリプト
///
/// Post Service APIから投稿のrstyleリンクを取得し、
/// collaboration-serviceのobligation_rstyle_linksへ保存する。
///
/// # ローカル実行
/// ```bash
/// cargo run --bin sync_obligation_links -- -c config.json -p 12345
/// ```
use std::path::PathBuf;

use clap::Parser;
use lambda_runtime::Error;
use rscom::application::ObligationLinkSyncJob;
use rscom::infrastructure::{
    ApiClient, CollabsConnector, MySqlStore, PostClient, RuntimeConfig, init_logging,
    resolve_api_hosts,
};
use tracing::{error, info};

/// コマンドライン引数
#[derive(Debug, Parser)]
#[command(name = "sync_obligation_links", about = "投稿のrstyleリンクをobligationへ同期する")]
struct CliArgs {
    /// 接続情報のJSONファイル
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 同期する投稿ID
    #[arg(short, long)]
    post: String,

    /// APIホストを解決するSSMマニフェスト
    #[arg(long)]
    ssm_manifest: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    init_logging();

    let args = CliArgs::parse();
    info!(args = ?args, "obligationリンク同期を開始");
    let result = run(&args).await;
    if let Err(e) = &result {
        error!(error = %e, "obligationリンク同期に失敗");
    }
    println!("finished");
    result
}

async fn run(args: &CliArgs) -> Result<(), Error> {
    let runtime = RuntimeConfig::load(args.config.as_deref())?;
    let hosts = resolve_api_hosts(&runtime, args.ssm_manifest.as_deref()).await?;
    let post_links = PostClient::new(ApiClient::new()?, hosts.post_service()?);
    let collabs = CollabsConnector::connect(&runtime.mysql(MySqlStore::Collabs)?).await?;

    let result = ObligationLinkSyncJob::new(&post_links, &collabs)
        .sync_post(&args.post)
        .await;
    collabs.close().await;

    let report = result?;
    info!(
        post_id = %report.post_id,
        obligation_id = ?report.obligation_id,
        link_count = report.links.len(),
        "obligationリンク同期完了"
    );
    Ok(())
}
