//! Stock price downloader CLI.

use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use stock_collector::modules::{self, CollectOptions};
use stock_collector::CollectorConfig;
use stock_core::{init_logging, LogConfig, LogFormat};

#[derive(Parser)]
#[command(name = "stock-collector")]
#[command(about = "Daily stock price downloader for ArangoDB", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 로그 레벨 (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// 로그 형식 (pretty, json, compact). 없으면 LOG_FORMAT 환경변수
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// 데이터베이스, 사용자, 공유 컬렉션 초기화 (root 계정 필요)
    InitDb,

    /// 다운로드 계획만 출력 (저장하지 않음)
    Plan {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// 일봉 가격 수집 (1회 실행)
    Collect {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// 공유 컬렉션 현황
    Status,

    /// 데몬 모드: 주기적으로 수집 실행
    Daemon,
}

#[derive(clap::Args)]
struct TargetArgs {
    /// 특정 종목만 수집 (쉼표로 구분, 예: "AAPL,MSFT")
    #[arg(long)]
    tickers: Option<String>,

    /// 종목별 마지막 저장일 대신 사용할 시작일 (YYYY-MM-DD)
    #[arg(long)]
    start: Option<NaiveDate>,

    /// 지수 구성 종목 캐시를 무시하고 다시 수집
    #[arg(long)]
    refresh_indexes: bool,
}

impl From<TargetArgs> for CollectOptions {
    fn from(args: TargetArgs) -> Self {
        Self {
            tickers: args.tickers,
            start: args.start,
            refresh_indexes: args.refresh_indexes,
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();

    // 로깅 초기화
    let format = match cli.log_format {
        Some(format) => format,
        None => std::env::var("LOG_FORMAT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default(),
    };
    init_logging(LogConfig::new(cli.log_level).with_format(format))?;

    tracing::info!("Stock Collector 시작");

    // 설정 로드
    let config = CollectorConfig::from_env()?;
    tracing::debug!(
        url = %config.arango.url(),
        database = %config.arango.database,
        collection = %config.collection,
        "설정 로드 완료"
    );

    // 명령 실행
    match cli.command {
        Commands::InitDb => {
            let repo = modules::init_database(&config).await?;
            tracing::info!(collection = %repo.collection(), "초기화 완료");
        }
        Commands::Plan { target } => {
            let repo = modules::repository(&config)?;
            let plan = modules::build_plan(&repo, &config, &target.into(), Utc::now()).await?;

            for batch in &plan.batches {
                let tickers: Vec<&str> = batch.tickers.iter().map(|t| t.as_str()).collect();
                println!("{} ~ {}  ({})  {}", batch.start, batch.end, tickers.len(), tickers.join(" "));
            }
            println!(
                "download: {}, up to date: {}, last session: {}",
                plan.ticker_count(),
                plan.up_to_date.len(),
                plan.end
            );
        }
        Commands::Collect { target } => {
            let repo = modules::connect(&config).await?;
            let stats = modules::collect(&repo, &config, &target.into()).await?;
            stats.log_summary("가격 수집");
        }
        Commands::Status => {
            let repo = modules::repository(&config)?;
            let summary = repo.summary().await?;
            println!("collection: {}", repo.collection());
            println!("documents:  {}", summary.documents);
            println!("tickers:    {}", summary.tickers);
            match (summary.first_date, summary.last_date) {
                (Some(first), Some(last)) => println!("range:      {} ~ {}", first, last),
                _ => println!("range:      (empty)"),
            }
        }
        Commands::Daemon => {
            tracing::info!(
                "=== 데몬 모드 시작 (주기: {}분) ===",
                config.daemon.interval_minutes
            );

            let repo = modules::connect(&config).await?;
            let options = CollectOptions::default();

            let mut interval = tokio::time::interval(config.daemon.interval());
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("종료 신호 수신, 데몬 종료 중...");
                        break;
                    }
                    _ = interval.tick() => {
                        tracing::info!("=== 수집 실행 시작 ===");

                        match modules::collect(&repo, &config, &options).await {
                            Ok(stats) => {
                                stats.log_summary("가격 수집");
                            }
                            Err(e) => {
                                tracing::error!("가격 수집 실패: {}", e);
                            }
                        }

                        tracing::info!(
                            "=== 수집 완료, 다음 실행: {}분 후 ===",
                            config.daemon.interval_minutes
                        );
                    }
                }
            }
        }
    }

    tracing::info!("Stock Collector 종료");

    Ok(())
}
