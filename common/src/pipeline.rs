//! セル単位の補正パイプライン
//!
//! ## 処理順
//! 1. 手動マッピング（リテラル置換）
//! 2. � の解決（参照文書のスコア → 文脈ルール）
//! 3. ASCII ug/mcg → ㎍
//! 4. 条件付き g → ㎍
//!
//! 各段のマッチはその段に入る時点のテキストに対して求める。3 の出力 `N ㎍` は
//! 4 のパターン（数値の直後の g）に当たらないため、段をまたいだ重なりも起きない。

use crate::applicator::{
    apply_mapping, normalize_ascii_micro, normalize_gram, resolve_replacements, Deferral,
    MappingPair, StepOutcome, Substitution,
};
use crate::classifier::AnomalyRow;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::patterns::REPLACEMENT_CHAR;
use crate::policy::{ResolutionPolicy, UnitPolicy};
use crate::resolver::{locate_replacements, ContextResolver, ReferenceDocument, ScoreTable};
use crate::types::{excerpt, Cell, CellRef, LogRecord, ReviewRecord, Rule};
use std::collections::{BTreeMap, HashSet};

/// 事前のOCR異常スキャン結果（照合のみに使い、判定には使わない）
#[derive(Debug, Clone, Default)]
pub struct AnomalyIndex {
    matches: HashSet<String>,
}

impl AnomalyIndex {
    pub fn from_rows(rows: &[AnomalyRow]) -> Self {
        Self {
            matches: rows
                .iter()
                .map(|r| r.matched.clone())
                .filter(|m| !m.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, text: &str) -> bool {
        self.matches.contains(text)
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

/// セルの � 1件分のスコア表
#[derive(Debug, Clone)]
pub struct CellScoreTable {
    pub cell: CellRef,
    /// � 解決に入る時点のセル値
    pub value: String,
    pub table: ScoreTable,
    /// 判定結果の説明
    pub decision: String,
}

/// セル1件の処理結果
#[derive(Debug, Clone)]
pub struct CellOutcome {
    pub cell: CellRef,
    pub original: String,
    pub corrected: String,
    pub logs: Vec<LogRecord>,
    pub reviews: Vec<ReviewRecord>,
    pub tables: Vec<CellScoreTable>,
}

impl CellOutcome {
    pub fn is_changed(&self) -> bool {
        self.original != self.corrected
    }
}

/// 集計
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrectionStats {
    /// 値のあるセル数
    pub total_cells: usize,
    pub changed_cells: usize,
    /// 元の値に � を含むセル数
    pub replacement_cells: usize,
    /// ルール別の適用件数
    pub applied_by_rule: BTreeMap<Rule, usize>,
    /// ルール別の検討件数
    pub deferred_by_rule: BTreeMap<Rule, usize>,
}

/// 実行全体の記録（追記のみ）
#[derive(Debug, Clone, Default)]
pub struct CorrectionReport {
    pub logs: Vec<LogRecord>,
    pub reviews: Vec<ReviewRecord>,
    pub tables: Vec<CellScoreTable>,
    pub stats: CorrectionStats,
}

impl CorrectionReport {
    /// セル1件の結果を取り込み、補正後の値を返す
    pub fn absorb(&mut self, outcome: CellOutcome) -> String {
        self.stats.total_cells += 1;
        if outcome.is_changed() {
            self.stats.changed_cells += 1;
        }
        if outcome.original.contains(REPLACEMENT_CHAR) {
            self.stats.replacement_cells += 1;
        }
        for log in &outcome.logs {
            *self.stats.applied_by_rule.entry(log.rule).or_insert(0) += 1;
        }
        for review in &outcome.reviews {
            *self.stats.deferred_by_rule.entry(review.rule).or_insert(0) += 1;
        }

        self.logs.extend(outcome.logs);
        self.reviews.extend(outcome.reviews);
        self.tables.extend(outcome.tables);
        outcome.corrected
    }
}

/// 補正エンジン
pub struct Corrector<'a> {
    config: &'a EngineConfig,
    unit_policy: UnitPolicy,
    resolution: ResolutionPolicy,
    reference: Option<&'a ReferenceDocument>,
    mapping: &'a [MappingPair],
    anomalies: Option<&'a AnomalyIndex>,
}

impl<'a> Corrector<'a> {
    /// 設定からエンジンを作る（検査値パターンが不正ならエラー）
    pub fn new(config: &'a EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            unit_policy: UnitPolicy::from_config(config)?,
            resolution: ResolutionPolicy::from_config(config),
            reference: None,
            mapping: &[],
            anomalies: None,
        })
    }

    pub fn with_reference(mut self, reference: &'a ReferenceDocument) -> Self {
        self.reference = Some(reference);
        self
    }

    pub fn with_mapping(mut self, mapping: &'a [MappingPair]) -> Self {
        self.mapping = mapping;
        self
    }

    pub fn with_anomalies(mut self, anomalies: &'a AnomalyIndex) -> Self {
        self.anomalies = Some(anomalies);
        self
    }

    /// テキスト中の � ごとのスコア表（参照文書がなければスコアは空）
    pub fn score_tables(&self, text: &str) -> Vec<ScoreTable> {
        match self.reference {
            Some(reference) => ContextResolver::new(reference, self.config).resolve_cell(text),
            None => locate_replacements(text, self.config)
                .into_iter()
                .map(|occurrence| ScoreTable {
                    occurrence,
                    scores: Vec::new(),
                })
                .collect(),
        }
    }

    /// テキストだけを補正する（記録なし）
    pub fn correct_text(&self, text: &str) -> String {
        let cell = Cell::new(CellRef::new("", 0, ""), Some(text.to_string()));
        self.correct_cell(&cell)
            .map(|o| o.corrected)
            .unwrap_or_else(|| text.to_string())
    }

    /// セル1件を補正する。値が空なら `None`。
    pub fn correct_cell(&self, cell: &Cell) -> Option<CellOutcome> {
        let original = cell.value.as_deref()?;
        let reference = &cell.reference;
        let mut logs = Vec::new();
        let mut reviews = Vec::new();

        let mapped = apply_mapping(original, self.mapping);
        let text = self.collect(mapped, reference, original, &mut logs, &mut reviews);

        let mut tables = Vec::new();
        let text = if text.contains(REPLACEMENT_CHAR) {
            let outcome = resolve_replacements(&text, self.score_tables(&text), &self.resolution);
            tables.extend(
                outcome
                    .tables
                    .into_iter()
                    .zip(outcome.confidences.iter())
                    .map(|(table, confidence)| CellScoreTable {
                        cell: reference.clone(),
                        value: text.clone(),
                        table,
                        decision: confidence.describe(),
                    }),
            );
            self.collect(outcome.step, reference, original, &mut logs, &mut reviews)
        } else {
            text
        };

        let text = self.collect(normalize_ascii_micro(&text), reference, original, &mut logs, &mut reviews);
        let text = self.collect(
            normalize_gram(&text, &self.unit_policy),
            reference,
            original,
            &mut logs,
            &mut reviews,
        );

        if text != original {
            tracing::debug!("{}: {:?} → {:?}", reference, original, text);
        }

        Some(CellOutcome {
            cell: reference.clone(),
            original: original.to_string(),
            corrected: text,
            logs,
            reviews,
            tables,
        })
    }

    fn collect(
        &self,
        step: StepOutcome,
        cell: &CellRef,
        original: &str,
        logs: &mut Vec<LogRecord>,
        reviews: &mut Vec<ReviewRecord>,
    ) -> String {
        logs.extend(step.substitutions.into_iter().map(|s| self.log_record(cell, s)));
        reviews.extend(
            step.deferrals
                .into_iter()
                .map(|d| self.review_record(cell, original, d)),
        );
        step.text
    }

    fn log_record(&self, cell: &CellRef, substitution: Substitution) -> LogRecord {
        let had_anomaly_match = self
            .anomalies
            .is_some_and(|a| a.contains(&substitution.before));
        LogRecord {
            cell: cell.clone(),
            rule: substitution.rule,
            before: substitution.before,
            after: substitution.after,
            detail: substitution.detail,
            had_anomaly_match,
        }
    }

    fn review_record(&self, cell: &CellRef, original: &str, deferral: Deferral) -> ReviewRecord {
        ReviewRecord {
            cell: cell.clone(),
            rule: deferral.rule,
            before: deferral.before,
            suggested: deferral.suggested,
            detail: deferral.detail,
            context_excerpt: excerpt(original, self.config.review_excerpt_chars),
        }
    }

    /// セル列を順に処理する。戻り値のセルは入力と同じ並び。
    pub fn run(&self, cells: &[Cell]) -> (Vec<Cell>, CorrectionReport) {
        self.run_with(cells, |_| {})
    }

    /// `run` と同じだが、セルを1件処理するごとに `on_cell` を呼ぶ
    pub fn run_with<F>(&self, cells: &[Cell], mut on_cell: F) -> (Vec<Cell>, CorrectionReport)
    where
        F: FnMut(&Cell),
    {
        let mut report = CorrectionReport::default();
        let corrected = cells
            .iter()
            .map(|cell| {
                let result = match self.correct_cell(cell) {
                    Some(outcome) => Cell::new(cell.reference.clone(), Some(report.absorb(outcome))),
                    None => cell.clone(),
                };
                on_cell(cell);
                result
            })
            .collect();
        (corrected, report)
    }
}
