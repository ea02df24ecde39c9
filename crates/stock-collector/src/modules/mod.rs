//! 데이터 수집 모듈.

pub mod db_init;
pub mod download_plan;
pub mod price_collect;
pub mod ticker_list;

pub use db_init::{connect, init_database, repository};
pub use download_plan::{plan_downloads, plan_from_start, DownloadBatch, DownloadPlan};
pub use price_collect::{build_plan, collect, collect_prices, CollectOptions};
pub use ticker_list::{build_ticker_list, TickerSources};
