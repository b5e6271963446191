/// コラボレーション情報参照スクリプト
///
/// # ローカル実行
/// ```bash
/// cargo run --bin collab_lookup -- -c config.json obligation 123
/// cargo run --bin collab_lookup -- -c config.json post 12345
/// cargo run --bin collab_lookup -- -c config.json advertiser 1010
/// cargo run --bin collab_lookup -- -c config.json reset-campaign-windows 10 11
/// ```
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use lambda_runtime::Error;
use rscom::application::CollabLookup;
use rscom::infrastructure::{CollabsConnector, MySqlStore, RuntimeConfig, init_logging};
use tracing::{error, info};

/// コマンドライン引数
#[derive(Debug, Parser)]
#[command(name = "collab_lookup", about = "obligation・ブランド・広告主の対応を参照する")]
struct CliArgs {
    /// 接続情報のJSONファイル
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// obligationのブランドと広告主IDを表示
    Obligation { obligation_id: i64 },
    /// 投稿のobligationのブランドと広告主IDを表示
    Post { post_id: String },
    /// 広告主IDのブランドIDを表示
    Advertiser { advertiser_id: String },
    /// キャンペーンのレポート期間を開始日から再計算
    ResetCampaignWindows {
        #[arg(required = true)]
        campaign_ids: Vec<i64>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    init_logging();

    let args = CliArgs::parse();
    let result = run(&args).await;
    if let Err(e) = &result {
        error!(error = %e, command = ?args.command, "コラボレーション参照に失敗");
    }
    println!("finished");
    result
}

async fn run(args: &CliArgs) -> Result<(), Error> {
    let runtime = RuntimeConfig::load(args.config.as_deref())?;
    let collabs = CollabsConnector::connect(&runtime.mysql(MySqlStore::Collabs)?).await?;
    let result = execute(&CollabLookup::new(&collabs), &args.command).await;
    collabs.close().await;
    result
}

async fn execute(
    lookup: &CollabLookup<'_, CollabsConnector>,
    command: &Command,
) -> Result<(), Error> {
    match command {
        Command::Obligation { obligation_id } => {
            let brand = lookup.describe_obligation(*obligation_id).await?;
            println!("{}", serde_json::to_string_pretty(&brand)?);
        }
        Command::Post { post_id } => {
            let brand = lookup.describe_post(post_id).await?;
            println!("{}", serde_json::to_string_pretty(&brand)?);
        }
        Command::Advertiser { advertiser_id } => {
            let brand_id = lookup.brand_for_advertiser(advertiser_id).await?;
            info!(advertiser_id = %advertiser_id, brand_id = %brand_id, "ブランドを特定");
            println!("{}", brand_id);
        }
        Command::ResetCampaignWindows { campaign_ids } => {
            let affected = lookup.reset_campaign_windows(campaign_ids).await?;
            println!("{}", affected);
        }
    }
    Ok(())
}
