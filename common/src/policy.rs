//! 判定ポリシー
//!
//! - 単位正規化: g → ㎍ を自動適用してよいか（値・剤形キーワード・検査値文脈）
//! - � 解決: スコア表の1位を自動確定してよいか、だめなら文脈ルール

use crate::classifier::find_keyword;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::patterns::MICRO_SYMBOL;
use crate::resolver::ScoreTable;
use crate::types::{parse_decimal, Decision};
use lazy_static::lazy_static;
use regex::{Regex, RegexBuilder};

/// g トークン1件の判定結果
#[derive(Debug, Clone, PartialEq)]
pub enum GramVerdict {
    /// 3条件をすべて満たす
    Convert { value: String, form_keyword: String },
    /// 数値を解釈できない
    Unparseable { value: String },
    /// 閾値より大きい（実際の g の可能性が高い）
    TooLarge { value: String },
    /// 検査値の文脈と衝突する
    LabContext { value: String, pattern: String, form_keyword: Option<String> },
    /// 剤形キーワードがない
    NoFormHint { value: String },
}

impl GramVerdict {
    pub fn is_convert(&self) -> bool {
        matches!(self, GramVerdict::Convert { .. })
    }

    /// ログ/検討記録に残す理由
    pub fn detail(&self, threshold: f64) -> String {
        match self {
            GramVerdict::Convert { value, form_keyword } => format!(
                "value={}<={} & has_form({}) & no_lab",
                value, threshold, form_keyword
            ),
            GramVerdict::Unparseable { value } => {
                format!("unparseable_value: value={:?} を数値として解釈できない", value)
            }
            GramVerdict::TooLarge { value } => format!(
                "value_too_large: value={}>{} → 実際の g の可能性が高い",
                value, threshold
            ),
            GramVerdict::LabContext { value, pattern, form_keyword } => format!(
                "lab_context: value={}<={}, form={}, lab={} → 検査値の文脈と衝突",
                value,
                threshold,
                form_keyword.as_deref().unwrap_or("-"),
                pattern
            ),
            GramVerdict::NoFormHint { value } => format!(
                "no_form_hint: value={}<={} だが剤形キーワードなし",
                value, threshold
            ),
        }
    }
}

/// 単位正規化ポリシー（検査値パターンはコンパイル済み）
#[derive(Debug, Clone)]
pub struct UnitPolicy {
    threshold: f64,
    form_keywords: Vec<String>,
    lab_patterns: Vec<(String, Regex)>,
}

impl UnitPolicy {
    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        let lab_patterns = config
            .lab_negative_patterns
            .iter()
            .map(|p| -> Result<(String, Regex)> {
                let re = RegexBuilder::new(p).case_insensitive(true).build()?;
                Ok((p.clone(), re))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            threshold: config.gram_suspect_threshold,
            form_keywords: config.form_keywords.clone(),
            lab_patterns,
        })
    }

    /// 文脈に最初に当たる検査値パターン
    pub fn find_lab_pattern(&self, context: &str) -> Option<&str> {
        self.lab_patterns
            .iter()
            .find(|(_, re)| re.is_match(context))
            .map(|(p, _)| p.as_str())
    }

    /// g トークンを判定する
    ///
    /// # Arguments
    /// * `number` - マッチした数値部分
    /// * `context` - セル全体のテキスト
    pub fn judge_gram(&self, number: &str, context: &str) -> GramVerdict {
        let value = number.to_string();
        let Some(parsed) = parse_decimal(number) else {
            return GramVerdict::Unparseable { value };
        };
        if parsed > self.threshold {
            return GramVerdict::TooLarge { value };
        }

        let form = find_keyword(context, &self.form_keywords).map(|k| k.to_string());
        if let Some(pattern) = self.find_lab_pattern(context) {
            return GramVerdict::LabContext {
                value,
                pattern: pattern.to_string(),
                form_keyword: form,
            };
        }

        match form {
            Some(form_keyword) => GramVerdict::Convert { value, form_keyword },
            None => GramVerdict::NoFormHint { value },
        }
    }

    /// 判定を補正の決定に変換する
    pub fn decide_gram(&self, number: &str, context: &str) -> Decision {
        let verdict = self.judge_gram(number, context);
        let rationale = verdict.detail(self.threshold);
        if verdict.is_convert() {
            Decision::Applied {
                replacement: format!("{} {}", number, MICRO_SYMBOL),
                rationale,
            }
        } else {
            Decision::Deferred {
                suggested: format!("{} {} (要確認)", number, MICRO_SYMBOL),
                rationale,
            }
        }
    }
}

/// スコア表に対する確信度
#[derive(Debug, Clone, PartialEq)]
pub enum Confidence {
    /// 1位を自動確定
    Confident { candidate: String, top: usize, second: usize },
    /// 1位のヒット数が最小ヒット数に届かない
    BelowMinHits { candidate: String, top: usize },
    /// 2位との差が小さい
    Ambiguous { candidate: String, top: usize, second: usize },
    /// どの候補もヒットしない
    NoCandidates,
}

impl Confidence {
    pub fn is_confident(&self) -> bool {
        matches!(self, Confidence::Confident { .. })
    }

    /// 自動確定しなくても人に示す1位の候補
    pub fn best_candidate(&self) -> Option<&str> {
        match self {
            Confidence::Confident { candidate, .. }
            | Confidence::BelowMinHits { candidate, .. }
            | Confidence::Ambiguous { candidate, .. } => Some(candidate),
            Confidence::NoCandidates => None,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Confidence::Confident { candidate, top, second } => {
                format!("auto-best:{} (top={}, second={})", candidate, top, second)
            }
            Confidence::BelowMinHits { candidate, top } => {
                format!("below_min_hits: {} top={}", candidate, top)
            }
            Confidence::Ambiguous { candidate, top, second } => {
                format!("ambiguous: {} top={} second={}", candidate, top, second)
            }
            Confidence::NoCandidates => "no_candidates".to_string(),
        }
    }
}

/// � の自動確定ポリシー
#[derive(Debug, Clone, Copy)]
pub struct ResolutionPolicy {
    pub min_hits: usize,
    pub margin_ratio: f64,
}

impl ResolutionPolicy {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            min_hits: config.min_hits,
            margin_ratio: config.margin_ratio,
        }
    }

    /// 1位のヒット数 >= min_hits かつ（2位が0 または 1位 >= ratio × 2位）なら確定
    pub fn judge(&self, table: &ScoreTable) -> Confidence {
        let Some(best) = table.best() else {
            return Confidence::NoCandidates;
        };
        let top = best.total;
        let second = table.second_total();
        let candidate = best.candidate.clone();

        if top < self.min_hits {
            return Confidence::BelowMinHits { candidate, top };
        }
        if second == 0 || top as f64 >= self.margin_ratio * second as f64 {
            Confidence::Confident { candidate, top, second }
        } else {
            Confidence::Ambiguous { candidate, top, second }
        }
    }

    /// 確信度を決定に変換する。確定できなければ `Rejected`。
    pub fn decide(&self, confidence: &Confidence) -> Decision {
        match confidence {
            Confidence::Confident { candidate, .. } => Decision::Applied {
                replacement: candidate.clone(),
                rationale: confidence.describe(),
            },
            _ => Decision::Rejected {
                rationale: confidence.describe(),
            },
        }
    }
}

/// 確信が得られないときに使う保守的な文脈ルール
pub struct FallbackRule {
    pub name: &'static str,
    pub pattern: Regex,
    /// `$1` 形式の置換テンプレート
    pub replacement: &'static str,
}

const NUM: &str = r"(?:\d+(?:\.\d+)?)";

lazy_static! {
    /// 適用順に並べた文脈ルール
    pub static ref FALLBACK_RULES: Vec<FallbackRule> = vec![
        // 700�g, 10 � g
        FallbackRule {
            name: "num_fffd_g",
            pattern: Regex::new(&format!(r"(?i)({})\s*\x{{FFFD}}\s*g", NUM)).unwrap(),
            replacement: "${1} ㎍ g",
        },
        // 5 � m l のように分かれたもの
        FallbackRule {
            name: "num_fffd_m_l",
            pattern: Regex::new(&format!(r"(?i)({})\s*\x{{FFFD}}\s*m\s*l", NUM)).unwrap(),
            replacement: "${1} ㎖",
        },
        FallbackRule {
            name: "num_fffd_l",
            pattern: Regex::new(&format!(r"(?i)({})\s*\x{{FFFD}}l", NUM)).unwrap(),
            replacement: "${1} ㎖",
        },
        FallbackRule {
            name: "fffd_blocker",
            pattern: Regex::new(r"(?i)\x{FFFD}-?\s*blocker").unwrap(),
            replacement: "α-blocker",
        },
        FallbackRule {
            name: "peginterferon_fffd",
            pattern: Regex::new(r"(?i)\bpeginterferon\s+\x{FFFD}-?1").unwrap(),
            replacement: "peginterferon α-1",
        },
        FallbackRule {
            name: "fffd_interferon",
            pattern: Regex::new(r"(?i)\x{FFFD}-?\s*interferon").unwrap(),
            replacement: "α-interferon",
        },
    ];
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{CandidateScore, ReplacementOccurrence};

    fn policy() -> UnitPolicy {
        UnitPolicy::from_config(&EngineConfig::default()).unwrap()
    }

    fn table(totals: &[(&str, usize)]) -> ScoreTable {
        ScoreTable {
            occurrence: ReplacementOccurrence {
                ordinal: 0,
                byte_offset: 0,
                excerpt: "\u{FFFD}".into(),
                left: String::new(),
                right: String::new(),
            },
            scores: totals
                .iter()
                .map(|(c, t)| CandidateScore {
                    candidate: c.to_string(),
                    total: *t,
                    top_pages: vec![],
                })
                .collect(),
        }
    }

    #[test]
    fn test_judge_gram_convert() {
        let verdict = policy().judge_gram("3", "3g 주사");
        assert!(verdict.is_convert());
        let detail = verdict.detail(100.0);
        assert!(detail.contains("value=3<=100"));
        assert!(detail.contains("has_form"));
        assert!(detail.contains("no_lab"));
    }

    #[test]
    fn test_judge_gram_lab_context_wins_over_missing_form() {
        let verdict = policy().judge_gram("80", "80g/dL");
        assert_eq!(
            verdict,
            GramVerdict::LabContext {
                value: "80".into(),
                pattern: "g/dl".into(),
                form_keyword: None
            }
        );
        assert!(verdict.detail(100.0).contains("lab_context"));
    }

    #[test]
    fn test_judge_gram_lab_blocks_even_with_form() {
        let verdict = policy().judge_gram("12", "헤모글로빈 12g 이하 정");
        assert!(matches!(verdict, GramVerdict::LabContext { .. }));
    }

    #[test]
    fn test_judge_gram_too_large_and_no_form() {
        assert!(matches!(policy().judge_gram("250", "250g 정"), GramVerdict::TooLarge { .. }));
        assert!(matches!(policy().judge_gram("50", "50g"), GramVerdict::NoFormHint { .. }));
        assert!(matches!(policy().judge_gram("５", "５g 정"), GramVerdict::Unparseable { .. }));
    }

    #[test]
    fn test_decide_gram() {
        let decision = policy().decide_gram("3", "3g 주사");
        assert_eq!(
            decision,
            Decision::Applied {
                replacement: "3 ㎍".into(),
                rationale: "value=3<=100 & has_form(주) & no_lab".into()
            }
        );
        let deferred = policy().decide_gram("80", "80g/dL");
        assert!(matches!(deferred, Decision::Deferred { ref suggested, .. } if suggested == "80 ㎍ (要確認)"));
    }

    #[test]
    fn test_invalid_lab_pattern_is_error() {
        let config = EngineConfig {
            lab_negative_patterns: vec!["g/(".into()],
            ..Default::default()
        };
        assert!(UnitPolicy::from_config(&config).is_err());
    }

    #[test]
    fn test_resolution_confident_with_ratio() {
        let policy = ResolutionPolicy::from_config(&EngineConfig::default());
        let confidence = policy.judge(&table(&[("㎍", 5), ("㎎", 1)]));
        assert_eq!(
            confidence,
            Confidence::Confident { candidate: "㎍".into(), top: 5, second: 1 }
        );
    }

    #[test]
    fn test_resolution_below_min_hits() {
        let policy = ResolutionPolicy::from_config(&EngineConfig::default());
        let confidence = policy.judge(&table(&[("㎍", 2)]));
        assert!(matches!(confidence, Confidence::BelowMinHits { top: 2, .. }));
        assert_eq!(confidence.best_candidate(), Some("㎍"));
    }

    #[test]
    fn test_resolution_ambiguous_and_boundary() {
        let policy = ResolutionPolicy::from_config(&EngineConfig::default());
        assert!(matches!(policy.judge(&table(&[("㎍", 5), ("㎎", 3)])), Confidence::Ambiguous { .. }));
        assert!(policy.judge(&table(&[("㎍", 6), ("㎎", 3)])).is_confident());
        assert!(policy.judge(&table(&[("㎍", 3)])).is_confident());
        assert_eq!(policy.judge(&table(&[])), Confidence::NoCandidates);
    }

    #[test]
    fn test_resolution_decide() {
        let policy = ResolutionPolicy::from_config(&EngineConfig::default());
        let applied = policy.decide(&policy.judge(&table(&[("㎍", 5), ("㎎", 1)])));
        assert_eq!(
            applied,
            Decision::Applied {
                replacement: "㎍".into(),
                rationale: "auto-best:㎍ (top=5, second=1)".into()
            }
        );
        let rejected = policy.decide(&policy.judge(&table(&[("㎍", 2)])));
        assert_eq!(
            rejected,
            Decision::Rejected {
                rationale: "below_min_hits: ㎍ top=2".into()
            }
        );
    }

    #[test]
    fn test_fallback_rules() {
        let apply = |name: &str, text: &str| {
            let rule = FALLBACK_RULES.iter().find(|r| r.name == name).unwrap();
            rule.pattern.replace_all(text, rule.replacement).into_owned()
        };
        assert_eq!(apply("num_fffd_g", "700\u{FFFD}g"), "700 ㎍ g");
        assert_eq!(apply("num_fffd_m_l", "5 \u{FFFD} m l"), "5 ㎖");
        assert_eq!(apply("num_fffd_l", "5 \u{FFFD}l"), "5 ㎖");
        assert_eq!(apply("fffd_blocker", "\u{FFFD}-blocker"), "α-blocker");
        assert_eq!(apply("fffd_interferon", "\u{FFFD} interferon"), "α-interferon");
        assert_eq!(apply("peginterferon_fffd", "peginterferon \u{FFFD}-1b"), "peginterferon α-1b");
    }
}
