/// Hyperlinkリンクコピースクリプト
///
/// Hyperlink APIからリンク情報を取得し、Cassandraのlinksテーブルへ書き込む。
///
/// # ローカル実行
/// ```bash
/// cargo run --bin cp_hyperlink_links -- -c config.json -l https://rstyle.me/n/abc
/// cargo run --bin cp_hyperlink_links -- -c config.json -p 12345
/// ```
use std::path::PathBuf;

use clap::Parser;
use lambda_runtime::Error;
use rscom::application::LinkCopyJob;
use rscom::infrastructure::{
    ApiClient, HyperlinkClient, LinksConnector, MySqlStore, PostsConnector, RuntimeConfig,
    init_logging, resolve_api_hosts,
};
use tracing::{error, info};

/// コマンドライン引数
#[derive(Debug, Parser)]
#[command(name = "cp_hyperlink_links", about = "Hyperlinkのリンクをlinksテーブルへコピーする")]
#[command(group = clap::ArgGroup::new("target").required(true).args(["link", "post"]))]
struct CliArgs {
    /// 接続情報のJSONファイル
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// コピーするrstyleリンク
    #[arg(short, long)]
    link: Option<String>,

    /// rstyleリンクをコピーする投稿ID
    #[arg(short, long)]
    post: Option<String>,

    /// APIホストを解決するSSMマニフェスト
    #[arg(long)]
    ssm_manifest: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    init_logging();

    let args = CliArgs::parse();
    info!(args = ?args, "リンクコピーを開始");
    let result = run(&args).await;
    if let Err(e) = &result {
        error!(error = %e, "リンクコピーに失敗");
    }
    println!("finished");
    result
}

async fn run(args: &CliArgs) -> Result<(), Error> {
    let runtime = RuntimeConfig::load(args.config.as_deref())?;
    let hosts = resolve_api_hosts(&runtime, args.ssm_manifest.as_deref()).await?;
    let hyperlink = HyperlinkClient::new(ApiClient::new()?, hosts.hyperlink_service()?);
    let links = LinksConnector::connect(&runtime.cassandra()?).await?;
    let job = LinkCopyJob::new(&hyperlink, &links);

    if let Some(link) = &args.link {
        let copied = job.copy_link(link).await?;
        info!(link_id = %copied.id, "リンクコピー完了");
    }

    if let Some(post_id) = &args.post {
        let posts = PostsConnector::connect(&runtime.mysql(MySqlStore::Posts)?).await?;
        let result = job.copy_post_links(&posts, post_id).await;
        posts.close().await;
        let report = result?;
        info!(
            post_id = %post_id,
            copied_count = report.copied_link_ids.len(),
            "投稿のリンクコピー完了"
        );
    }

    Ok(())
}
