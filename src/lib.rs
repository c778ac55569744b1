//! PharmaLex Sentinel
//!
//! 規制資料スプレッドシートのOCR補正（ワークブック入出力とレポート）。
//! 補正判定そのものは `sentinel_common` にある。

pub mod cli;
pub mod config;
pub mod error;
pub mod inputs;
pub mod report;
pub mod runner;
pub mod workbook;

pub use error::{Result, SentinelError};
