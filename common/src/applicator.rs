//! 補正の適用
//!
//! マッチは常に適用前のテキストに対して求め、重ならない区間を左から右へ
//! 一度に置き換える。置換結果を再走査しない。

use crate::patterns::{followed_by_ascii_letter, ASCII_MICRO_RE, GRAM_VALUE_RE, MICRO_SYMBOL, REPLACEMENT_CHAR};
use crate::policy::{Confidence, FallbackRule, ResolutionPolicy, UnitPolicy, FALLBACK_RULES};
use crate::resolver::{ReplacementOccurrence, ScoreTable};
use crate::types::{Decision, Rule};
use serde::Deserialize;

/// 置換区間（バイト位置）
#[derive(Debug, Clone, PartialEq)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub replacement: String,
}

/// 区間を左から順に置き換える
///
/// `edits` は開始位置の昇順で互いに重ならないこと。
pub fn apply_edits(text: &str, edits: &[Edit]) -> String {
    debug_assert!(
        edits.windows(2).all(|w| w[0].end <= w[1].start),
        "edits must be sorted and non-overlapping"
    );

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for edit in edits {
        out.push_str(&text[last..edit.start]);
        out.push_str(&edit.replacement);
        last = edit.end;
    }
    out.push_str(&text[last..]);
    out
}

/// 適用した置換1件
#[derive(Debug, Clone, PartialEq)]
pub struct Substitution {
    pub rule: Rule,
    pub before: String,
    pub after: String,
    pub detail: String,
}

/// 検討に回した置換1件
#[derive(Debug, Clone, PartialEq)]
pub struct Deferral {
    pub rule: Rule,
    pub before: String,
    pub suggested: String,
    pub detail: String,
}

/// 1段階分の処理結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepOutcome {
    pub text: String,
    pub substitutions: Vec<Substitution>,
    pub deferrals: Vec<Deferral>,
}

/// 手動マッピングの1組（リテラル置換）
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MappingPair {
    pub before: String,
    pub after: String,
}

impl MappingPair {
    pub fn new(before: impl Into<String>, after: impl Into<String>) -> Self {
        Self {
            before: before.into(),
            after: after.into(),
        }
    }
}

/// 手動マッピングを表の順に適用する
pub fn apply_mapping(text: &str, pairs: &[MappingPair]) -> StepOutcome {
    let mut current = text.to_string();
    let mut substitutions = Vec::new();

    for pair in pairs.iter().filter(|p| !p.before.is_empty()) {
        let count = current.matches(pair.before.as_str()).count();
        if count == 0 {
            continue;
        }
        current = current.replace(pair.before.as_str(), &pair.after);
        substitutions.extend((0..count).map(|_| Substitution {
            rule: Rule::ManualMapping,
            before: pair.before.clone(),
            after: pair.after.clone(),
            detail: "mapping".to_string(),
        }));
    }

    StepOutcome {
        text: current,
        substitutions,
        deferrals: Vec::new(),
    }
}

/// ASCII ug/mcg を ㎍ に置き換える（常に安全）
pub fn normalize_ascii_micro(text: &str) -> StepOutcome {
    let mut edits = Vec::new();
    let mut substitutions = Vec::new();

    for caps in ASCII_MICRO_RE.captures_iter(text) {
        let (Some(m), Some(value), Some(unit)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        let after = format!("{} {}", value.as_str(), MICRO_SYMBOL);
        substitutions.push(Substitution {
            rule: Rule::AsciiMicro,
            before: m.as_str().to_string(),
            after: after.clone(),
            detail: format!("{} -> {}", unit.as_str(), MICRO_SYMBOL),
        });
        edits.push(Edit {
            start: m.start(),
            end: m.end(),
            replacement: after,
        });
    }

    StepOutcome {
        text: apply_edits(text, &edits),
        substitutions,
        deferrals: Vec::new(),
    }
}

/// g → ㎍ の条件付き置換。条件を満たさないものは検討に回す。
///
/// 文脈判定には置換前のセル全体を使う。
pub fn normalize_gram(text: &str, policy: &UnitPolicy) -> StepOutcome {
    let mut edits = Vec::new();
    let mut substitutions = Vec::new();
    let mut deferrals = Vec::new();

    for caps in GRAM_VALUE_RE.captures_iter(text) {
        let (Some(m), Some(value)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        if followed_by_ascii_letter(text, m.end()) {
            continue;
        }

        let before = m.as_str().to_string();
        match policy.decide_gram(value.as_str(), text) {
            Decision::Applied { replacement, rationale } => {
                tracing::debug!("g→㎍: {} → {} ({})", before, replacement, rationale);
                substitutions.push(Substitution {
                    rule: Rule::GramToMicro,
                    before,
                    after: replacement.clone(),
                    detail: rationale,
                });
                edits.push(Edit {
                    start: m.start(),
                    end: m.end(),
                    replacement,
                });
            }
            Decision::Deferred { suggested, rationale } => {
                deferrals.push(Deferral {
                    rule: Rule::GramReview,
                    before,
                    suggested,
                    detail: rationale,
                });
            }
            Decision::Rejected { .. } => {}
        }
    }

    StepOutcome {
        text: apply_edits(text, &edits),
        substitutions,
        deferrals,
    }
}

/// � 解決の結果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReplacementOutcome {
    pub step: StepOutcome,
    /// 各 � に対するスコア表（参照文書がなければ空）
    pub tables: Vec<ScoreTable>,
    /// 各 � の確信度判定（`tables` と同じ順）
    pub confidences: Vec<Confidence>,
}

/// � を解決する
///
/// 1. スコア表の1位が確信できるものを、その位置だけ置き換える
/// 2. 残りに文脈ルールを順に適用する
/// 3. それでも残るものは置き換えずに検討記録へ
pub fn resolve_replacements(
    text: &str,
    tables: Vec<ScoreTable>,
    policy: &ResolutionPolicy,
) -> ReplacementOutcome {
    let confidences: Vec<Confidence> = tables.iter().map(|t| policy.judge(t)).collect();

    let mut edits = Vec::new();
    let mut substitutions = Vec::new();
    let mut pending: Vec<usize> = Vec::new();

    for (idx, (table, confidence)) in tables.iter().zip(confidences.iter()).enumerate() {
        match policy.decide(confidence) {
            Decision::Applied { replacement, rationale } => {
                let occurrence = &table.occurrence;
                substitutions.push(Substitution {
                    rule: Rule::FffdAutoBest,
                    before: occurrence.excerpt.clone(),
                    after: occurrence.excerpt_with(&replacement),
                    detail: format!("{} [{}]", rationale, table.format_scores()),
                });
                edits.push(Edit {
                    start: occurrence.byte_offset,
                    end: occurrence.byte_offset + REPLACEMENT_CHAR.len_utf8(),
                    replacement,
                });
            }
            Decision::Rejected { rationale } | Decision::Deferred { rationale, .. } => {
                tracing::trace!("自動確定を見送り: {}", rationale);
                pending.push(idx);
            }
        }
    }

    let mut current = apply_edits(text, &edits);

    for rule in FALLBACK_RULES.iter() {
        if pending.is_empty() {
            break;
        }
        let (next, applied, resolved) = apply_fallback_rule(&current, rule);
        if applied.is_empty() {
            continue;
        }
        // resolved は現在残っている � の何番目かを指す
        pending = pending
            .into_iter()
            .enumerate()
            .filter(|(i, _)| !resolved.contains(i))
            .map(|(_, idx)| idx)
            .collect();
        substitutions.extend(applied);
        current = next;
    }

    let deferrals = pending
        .iter()
        .map(|&idx| unresolved_deferral(&tables[idx].occurrence, &confidences[idx]))
        .collect();

    ReplacementOutcome {
        step: StepOutcome {
            text: current,
            substitutions,
            deferrals,
        },
        tables,
        confidences,
    }
}

/// ルールを1つ適用し、置換後テキスト・置換記録・解決した � の番号を返す
fn apply_fallback_rule(text: &str, rule: &FallbackRule) -> (String, Vec<Substitution>, Vec<usize>) {
    let mut edits = Vec::new();
    let mut substitutions = Vec::new();
    let mut resolved = Vec::new();
    let mut seen = 0;
    let mut last = 0;

    for caps in rule.pattern.captures_iter(text) {
        let Some(m) = caps.get(0) else { continue };
        seen += text[last..m.start()].matches(REPLACEMENT_CHAR).count();
        let inside = m.as_str().matches(REPLACEMENT_CHAR).count();
        resolved.extend(seen..seen + inside);
        seen += inside;
        last = m.end();

        let mut after = String::new();
        caps.expand(rule.replacement, &mut after);
        substitutions.push(Substitution {
            rule: Rule::FffdHeuristic,
            before: m.as_str().to_string(),
            after: after.clone(),
            detail: format!("heuristics:{}", rule.name),
        });
        edits.push(Edit {
            start: m.start(),
            end: m.end(),
            replacement: after,
        });
    }

    (apply_edits(text, &edits), substitutions, resolved)
}

fn unresolved_deferral(occurrence: &ReplacementOccurrence, confidence: &Confidence) -> Deferral {
    Deferral {
        rule: Rule::FffdUnresolved,
        before: occurrence.excerpt.clone(),
        suggested: confidence
            .best_candidate()
            .map(|c| occurrence.excerpt_with(c))
            .unwrap_or_default(),
        detail: format!("{}; 文脈ルールも該当なし", confidence.describe()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::resolver::{locate_replacements, CandidateScore};

    fn unit_policy() -> UnitPolicy {
        UnitPolicy::from_config(&EngineConfig::default()).unwrap()
    }

    fn tables_with(text: &str, scores: Vec<Vec<(&str, usize)>>) -> Vec<ScoreTable> {
        locate_replacements(text, &EngineConfig::default())
            .into_iter()
            .zip(scores)
            .map(|(occurrence, s)| ScoreTable {
                occurrence,
                scores: s
                    .into_iter()
                    .map(|(c, total)| CandidateScore {
                        candidate: c.into(),
                        total,
                        top_pages: vec![],
                    })
                    .collect(),
            })
            .collect()
    }

    #[test]
    fn test_apply_edits() {
        let edits = vec![
            Edit { start: 0, end: 1, replacement: "X".into() },
            Edit { start: 2, end: 3, replacement: "YY".into() },
        ];
        assert_eq!(apply_edits("abcd", &edits), "XbYYd");
        assert_eq!(apply_edits("abcd", &[]), "abcd");
    }

    #[test]
    fn test_mapping_in_order() {
        let pairs = vec![MappingPair::new("\u{FFFD}", "㎍"), MappingPair::new("㎍g", "㎍")];
        let outcome = apply_mapping("10\u{FFFD}g, 20\u{FFFD}g", &pairs);
        assert_eq!(outcome.text, "10㎍, 20㎍");
        assert_eq!(outcome.substitutions.len(), 4);
        assert!(outcome.substitutions.iter().all(|s| s.rule == Rule::ManualMapping));
    }

    #[test]
    fn test_mapping_ignores_empty_before() {
        let outcome = apply_mapping("abc", &[MappingPair::new("", "x")]);
        assert_eq!(outcome.text, "abc");
        assert!(outcome.substitutions.is_empty());
    }

    #[test]
    fn test_ascii_micro() {
        let outcome = normalize_ascii_micro("20mcg 정, 0.7 UG 주");
        assert_eq!(outcome.text, "20 ㎍ 정, 0.7 ㎍ 주");
        assert_eq!(outcome.substitutions.len(), 2);
        assert_eq!(outcome.substitutions[0].before, "20mcg");
        assert_eq!(outcome.substitutions[0].after, "20 ㎍");
        assert_eq!(outcome.substitutions[1].detail, "UG -> ㎍");
    }

    #[test]
    fn test_gram_span_local() {
        let outcome = normalize_gram("3g 주사, 250g 정", &unit_policy());
        assert_eq!(outcome.text, "3 ㎍ 주사, 250g 정");
        assert_eq!(outcome.substitutions.len(), 1);
        assert_eq!(outcome.deferrals.len(), 1);
        assert_eq!(outcome.deferrals[0].before, "250g");
        assert!(outcome.deferrals[0].detail.starts_with("value_too_large"));
    }

    #[test]
    fn test_gram_skips_mg_and_words() {
        let outcome = normalize_gram("5mg 정, 2 gamma", &unit_policy());
        assert_eq!(outcome.text, "5mg 정, 2 gamma");
        assert!(outcome.substitutions.is_empty());
        assert!(outcome.deferrals.is_empty());
    }

    #[test]
    fn test_resolve_confident_only_replaces_its_occurrence() {
        let text = "abc\u{FFFD}def xyz\u{FFFD}uvw";
        let tables = tables_with(text, vec![vec![("㎍", 5), ("㎎", 1)], vec![("㎎", 2)]]);
        let outcome = resolve_replacements(text, tables, &ResolutionPolicy { min_hits: 3, margin_ratio: 2.0 });

        assert_eq!(outcome.step.text, "abc㎍def xyz\u{FFFD}uvw");
        assert_eq!(outcome.step.substitutions.len(), 1);
        assert_eq!(outcome.step.substitutions[0].rule, Rule::FffdAutoBest);
        assert_eq!(outcome.step.deferrals.len(), 1);
        assert_eq!(outcome.step.deferrals[0].rule, Rule::FffdUnresolved);
        assert!(outcome.step.deferrals[0].suggested.contains("xyz㎎uvw"));
    }

    #[test]
    fn test_resolve_falls_back_to_heuristics() {
        let text = "700\u{FFFD}g";
        let tables = tables_with(text, vec![vec![]]);
        let outcome = resolve_replacements(text, tables, &ResolutionPolicy { min_hits: 3, margin_ratio: 2.0 });

        assert_eq!(outcome.step.text, "700 ㎍ g");
        assert_eq!(outcome.step.substitutions.len(), 1);
        assert_eq!(outcome.step.substitutions[0].rule, Rule::FffdHeuristic);
        assert_eq!(outcome.step.substitutions[0].detail, "heuristics:num_fffd_g");
        assert!(outcome.step.deferrals.is_empty());
        assert_eq!(outcome.confidences, vec![Confidence::NoCandidates]);
    }

    #[test]
    fn test_resolve_tracks_which_occurrence_heuristic_fixed() {
        let text = "x\u{FFFD}y then 10\u{FFFD}g";
        let tables = tables_with(text, vec![vec![("-", 2)], vec![("㎍", 2)]]);
        let outcome = resolve_replacements(text, tables, &ResolutionPolicy { min_hits: 3, margin_ratio: 2.0 });

        assert_eq!(outcome.step.text, "x\u{FFFD}y then 10 ㎍ g");
        assert_eq!(outcome.step.deferrals.len(), 1);
        assert_eq!(outcome.step.deferrals[0].before, "x\u{FFFD}y then 10");
        assert!(outcome.step.deferrals[0].detail.starts_with("below_min_hits"));
    }

    #[test]
    fn test_resolve_without_tables_changes_nothing() {
        let outcome = resolve_replacements("plain", Vec::new(), &ResolutionPolicy { min_hits: 3, margin_ratio: 2.0 });
        assert_eq!(outcome.step.text, "plain");
        assert!(outcome.step.substitutions.is_empty());
    }
}
