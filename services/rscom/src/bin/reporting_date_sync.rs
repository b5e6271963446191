/// レポート期間修復バッチ
///
/// postsのレポート期間をキャンペーン日付 + 6週間で埋め直す。
/// Lambda関数としても、ローカルスクリプトとしても実行可能。
///
/// # Lambda実行
/// ペイロードに`filter`/`write_strategy`/`report_unmatched`を指定する（省略時はデフォルト）。
/// DB接続情報はSSM Parameter Storeから取得する。
///
/// # ローカル実行
/// ```bash
/// cargo run --bin reporting_date_sync -- -c config.json --filter year-0001 --write bulk
/// ```
use std::path::PathBuf;

use clap::Parser;
use lambda_runtime::{Error, LambdaEvent, service_fn};
use rscom::application::{RepairOptions, RepairReport, ReportingDateRepairJob};
use rscom::domain::{RepairFilter, WriteStrategy};
use rscom::infrastructure::{
    CollabsConnector, MySqlConfig, MySqlStore, PostsConnector, RuntimeConfig, SsmParameterStore,
    init_logging, load_mysql_config,
};
use serde::Serialize;
use tracing::{error, info};

/// コマンドライン引数
#[derive(Debug, Parser)]
#[command(name = "reporting_date_sync", about = "postsのレポート期間を修復する")]
struct CliArgs {
    /// 接続情報のJSONファイル
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 対象投稿の条件（null-window / year-0001）
    #[arg(long, default_value = "null-window")]
    filter: RepairFilter,

    /// 書き込み方式（individual / bulk）
    #[arg(long = "write", default_value = "individual")]
    write_strategy: WriteStrategy,

    /// obligationのない投稿をログに出さない
    #[arg(long)]
    no_report_unmatched: bool,

    /// DB接続情報をSSM Parameter Storeから取得する
    #[arg(long)]
    ssm: bool,
}

impl CliArgs {
    fn options(&self) -> RepairOptions {
        RepairOptions {
            filter: self.filter,
            write_strategy: self.write_strategy,
            report_unmatched: !self.no_report_unmatched,
        }
    }
}

/// Lambda関数の出力
#[derive(Debug, Serialize)]
struct RepairOutput {
    /// 処理成功フラグ
    success: bool,
    #[serde(flatten)]
    report: RepairReport,
    /// エラーメッセージ（エラー時のみ）
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    // 構造化ログを初期化
    init_logging();

    // Lambda環境かどうかを判定
    if std::env::var("AWS_LAMBDA_FUNCTION_NAME").is_ok() {
        info!("Lambda関数として起動");
        let func = service_fn(handler);
        lambda_runtime::run(func).await?;
        return Ok(());
    }

    let args = CliArgs::parse();
    info!(args = ?args, "ローカルスクリプトとして起動");
    let result = run_local(&args).await;
    println!("finished");
    result
}

/// Lambda関数のメインハンドラー
async fn handler(event: LambdaEvent<RepairOptions>) -> Result<RepairOutput, Error> {
    let options = event.payload;
    info!(options = ?options, "レポート期間修復を開始");

    match repair_with_ssm(options).await {
        Ok(report) => Ok(RepairOutput {
            success: true,
            report,
            error_message: None,
        }),
        Err(e) => {
            error!(error = %e, "レポート期間修復に失敗");
            Ok(RepairOutput {
                success: false,
                report: RepairReport::default(),
                error_message: Some(e.to_string()),
            })
        }
    }
}

/// ローカル実行用関数
async fn run_local(args: &CliArgs) -> Result<(), Error> {
    match repair_with_args(args).await {
        Ok(report) => {
            info!(
                matched_posts = report.matched_posts,
                updated_posts = report.updated_posts,
                rows_affected = report.rows_affected,
                unmatched_count = report.unmatched_post_ids.len(),
                "レポート期間修復完了"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "レポート期間修復に失敗");
            Err(e)
        }
    }
}

/// SSMの接続情報で修復する（Lambda用）
async fn repair_with_ssm(options: RepairOptions) -> Result<RepairReport, Error> {
    let runtime = RuntimeConfig::load(None)?;
    let (posts_config, collabs_config) = load_from_ssm(&runtime).await?;
    run_repair(&posts_config, &collabs_config, options).await
}

/// 引数で指定された接続情報で修復する
async fn repair_with_args(args: &CliArgs) -> Result<RepairReport, Error> {
    let runtime = RuntimeConfig::load(args.config.as_deref())?;
    let (posts_config, collabs_config) = if args.ssm {
        load_from_ssm(&runtime).await?
    } else {
        (
            runtime.mysql(MySqlStore::Posts)?,
            runtime.mysql(MySqlStore::Collabs)?,
        )
    };
    run_repair(&posts_config, &collabs_config, args.options()).await
}

/// Posts/Collabsの接続情報をSSMから取得
async fn load_from_ssm(runtime: &RuntimeConfig) -> Result<(MySqlConfig, MySqlConfig), Error> {
    let store = SsmParameterStore::from_region(runtime.env(), runtime.region()).await;
    let posts = load_mysql_config(MySqlStore::Posts, &store).await?;
    let collabs = load_mysql_config(MySqlStore::Collabs, &store).await?;
    Ok((posts, collabs))
}

/// 接続を開いて修復ジョブを実行し、成否に関わらず接続を閉じる
async fn run_repair(
    posts_config: &MySqlConfig,
    collabs_config: &MySqlConfig,
    options: RepairOptions,
) -> Result<RepairReport, Error> {
    let posts = PostsConnector::connect(posts_config).await?;
    let collabs = match CollabsConnector::connect(collabs_config).await {
        Ok(collabs) => collabs,
        Err(e) => {
            posts.close().await;
            return Err(e.into());
        }
    };

    let result = ReportingDateRepairJob::new(&posts, &collabs, options)
        .run()
        .await;

    collabs.close().await;
    posts.close().await;
    Ok(result?)
}
