//! PharmaLex Sentinel 共通ライブラリ
//!
//! 規制資料スプレッドシートのOCR補正判定エンジン。
//! ワークブックの入出力に依存しない部分をまとめる。

pub mod applicator;
pub mod classifier;
pub mod config;
pub mod error;
pub mod patterns;
pub mod pipeline;
pub mod policy;
pub mod resolver;
pub mod scan;
pub mod types;

pub use applicator::{apply_edits, apply_mapping, normalize_ascii_micro, normalize_gram, Edit, MappingPair};
pub use classifier::{classify, scan_page, scan_pages, Anomaly, AnomalyRow, Classification};
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use patterns::{TokenKind, MICRO_SYMBOL, REPLACEMENT_CHAR};
pub use pipeline::{AnomalyIndex, CellOutcome, CellScoreTable, CorrectionReport, CorrectionStats, Corrector};
pub use policy::{Confidence, GramVerdict, ResolutionPolicy, UnitPolicy};
pub use resolver::{ContextResolver, ReferenceDocument, ScoreTable};
pub use scan::{find_invalid_chars, scan_suspicious_chars, CharFrequency, CharSample, CharScan, InvalidCharRow};
pub use types::{Cell, CellRef, Decision, LogRecord, ReviewRecord, Rule};
