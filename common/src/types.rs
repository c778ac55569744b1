//! 共通データ型
//!
//! セル参照・マッチ・判定・ログ記録など、エンジン全体で共有する型。

use serde::{Deserialize, Serialize};

/// 検査対象セルの位置（シート・行・列）
///
/// `row` はスプレッドシート上の表示行番号（ヘッダ行を1行目とする）。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellRef {
    pub sheet: String,
    pub row: usize,
    pub column: String,
}

impl CellRef {
    pub fn new(sheet: impl Into<String>, row: usize, column: impl Into<String>) -> Self {
        Self {
            sheet: sheet.into(),
            row,
            column: column.into(),
        }
    }
}

impl std::fmt::Display for CellRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}!{}:{}", self.sheet, self.column, self.row)
    }
}

/// 入力セル（値が空の場合は `None`）
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub reference: CellRef,
    pub value: Option<String>,
}

impl Cell {
    pub fn new(reference: CellRef, value: Option<String>) -> Self {
        Self { reference, value }
    }
}

/// パターンがセル/ページ内で発火した1件
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOccurrence {
    /// マッチした部分文字列
    pub matched: String,
    /// 数値部分（パターンが捕捉する場合）
    pub number: Option<String>,
    /// バイトオフセット
    pub start: usize,
    pub end: usize,
    /// 前後の文脈（空白は1つに畳む）
    pub context: String,
}

/// 10進数の解釈。ASCII数字以外（全角数字など）は値不明として扱う。
pub fn parse_decimal(text: &str) -> Option<f64> {
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return None;
    }
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// 適用/保留された補正のルール名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    /// 手動マッピング表による文字列置換
    ManualMapping,
    /// 参照文書の頻度による � の自動確定
    FffdAutoBest,
    /// 文脈ルールによる � の補正
    FffdHeuristic,
    /// � が解決できず残った
    FffdUnresolved,
    /// ASCII ug/mcg → ㎍
    AsciiMicro,
    /// 条件付き g → ㎍
    #[serde(rename = "g_to_micro_conditional")]
    GramToMicro,
    /// g → ㎍ の検討（自動適用しない）
    #[serde(rename = "g_to_micro_review")]
    GramReview,
}

impl Rule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Rule::ManualMapping => "manual_mapping",
            Rule::FffdAutoBest => "fffd_auto_best",
            Rule::FffdHeuristic => "fffd_heuristic",
            Rule::FffdUnresolved => "fffd_unresolved",
            Rule::AsciiMicro => "ascii_micro",
            Rule::GramToMicro => "g_to_micro_conditional",
            Rule::GramReview => "g_to_micro_review",
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 1件のマッチに対する最終判定
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// 自動適用
    Applied { replacement: String, rationale: String },
    /// 人による検討へ回す
    Deferred { suggested: String, rationale: String },
    /// 自動確定を見送る（後段に任せ、この段では変更しない）
    Rejected { rationale: String },
}

/// 適用済み補正の記録（作成後は変更しない）
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    pub cell: CellRef,
    pub rule: Rule,
    pub before: String,
    pub after: String,
    pub detail: String,
    /// 事前のOCR異常スキャンに同じ文字列があったか（統計用）
    pub had_anomaly_match: bool,
}

/// 検討待ち補正の記録
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewRecord {
    pub cell: CellRef,
    pub rule: Rule,
    pub before: String,
    pub suggested: String,
    pub detail: String,
    /// 元セル値の先頭部分
    pub context_excerpt: String,
}

/// 先頭 `max_chars` 文字を取り出す
pub fn excerpt(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
