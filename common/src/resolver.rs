//! � (U+FFFD) の文脈解決
//!
//! セル内の � ごとに左右の局所文脈を取り、候補文字を当てはめた
//! ゆるい正規表現で参照文書の全ページを検索する。ページごとのヒット数を
//! 候補ごとに集計し、頻度順のスコア表を返す。

use crate::config::EngineConfig;
use crate::patterns::{collapse_whitespace, relax_whitespace, REPLACEMENT_CHAR};
use rayon::prelude::*;
use regex::RegexBuilder;
use serde::Serialize;

/// 参照文書（ページ単位の抽出テキスト）
#[derive(Debug, Clone, Default)]
pub struct ReferenceDocument {
    normalized: Vec<String>,
}

impl ReferenceDocument {
    pub fn new(pages: Vec<String>, case_insensitive: bool) -> Self {
        let normalized = pages
            .iter()
            .map(|p| normalize_text(p, case_insensitive))
            .collect();
        Self { normalized }
    }

    /// 空白を畳み（必要なら小文字化した）テキスト
    pub fn normalized_pages(&self) -> &[String] {
        &self.normalized
    }

    pub fn len(&self) -> usize {
        self.normalized.len()
    }

    pub fn is_empty(&self) -> bool {
        self.normalized.is_empty()
    }
}

/// 改行・連続空白を1つのスペースに畳み、必要なら小文字化する
pub fn normalize_text(text: &str, case_insensitive: bool) -> String {
    let collapsed = collapse_whitespace(text);
    if case_insensitive {
        collapsed.to_lowercase()
    } else {
        collapsed
    }
}

/// セル内の � 1件
#[derive(Debug, Clone, PartialEq)]
pub struct ReplacementOccurrence {
    /// セル内で何番目の � か（0始まり）
    pub ordinal: usize,
    /// 元テキスト上のバイト位置
    pub byte_offset: usize,
    /// 元テキストの前後文脈（記録用、隣の � の手前で切る）
    pub excerpt: String,
    /// 正規化テキスト上の左文脈（隣の � の手前で切る）
    pub left: String,
    /// 正規化テキスト上の右文脈（隣の � の手前で切る）
    pub right: String,
}

impl ReplacementOccurrence {
    /// 文脈が空白しかなく、検索の手掛かりがない
    pub fn has_context(&self) -> bool {
        !self.left.trim().is_empty() || !self.right.trim().is_empty()
    }

    /// 記録用の文脈で � を候補に差し替えた文字列
    pub fn excerpt_with(&self, replacement: &str) -> String {
        self.excerpt.replacen(REPLACEMENT_CHAR, replacement, 1)
    }
}

/// ページごとのヒット数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageHits {
    /// 1始まりのページ番号
    pub page: usize,
    pub hits: usize,
}

/// 候補1文字のスコア
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateScore {
    pub candidate: String,
    pub total: usize,
    /// ヒット数上位のページ
    pub top_pages: Vec<PageHits>,
}

/// 1件の � に対するスコア表（合計の多い順、ヒット0の候補は含まない）
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTable {
    pub occurrence: ReplacementOccurrence,
    pub scores: Vec<CandidateScore>,
}

impl ScoreTable {
    pub fn best(&self) -> Option<&CandidateScore> {
        self.scores.first()
    }

    pub fn second_total(&self) -> usize {
        self.scores.get(1).map(|s| s.total).unwrap_or(0)
    }

    /// `㎍:12(p459×3, p461×1) | ㎎:3(p21×3)` 形式
    pub fn format_scores(&self) -> String {
        self.scores
            .iter()
            .map(|s| {
                let pages = s
                    .top_pages
                    .iter()
                    .map(|p| format!("p{}×{}", p.page, p.hits))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}:{}({})", s.candidate, s.total, pages)
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }
}

/// セル内の � を列挙し、それぞれの局所文脈を切り出す
///
/// 文脈はすべて元のセルテキストから取り、隣の � を越えない。
pub fn locate_replacements(text: &str, config: &EngineConfig) -> Vec<ReplacementOccurrence> {
    let width = config.context_chars;
    let raw: Vec<(usize, char)> = text.char_indices().collect();
    let raw_positions: Vec<usize> = positions_of_replacement(raw.iter().map(|(_, c)| *c));

    let normalized: Vec<char> = normalize_text(text, config.case_insensitive).chars().collect();
    let norm_positions = positions_of_replacement(normalized.iter().copied());

    // 正規化は � を増減させない
    debug_assert_eq!(raw_positions.len(), norm_positions.len());

    let raw_chars: Vec<char> = raw.iter().map(|(_, c)| *c).collect();
    raw_positions
        .iter()
        .zip(norm_positions.iter())
        .enumerate()
        .map(|(ordinal, (&raw_pos, &norm_pos))| {
            let prev = ordinal.checked_sub(1).map(|i| norm_positions[i] + 1).unwrap_or(0);
            let next = norm_positions.get(ordinal + 1).copied().unwrap_or(normalized.len());

            let left_start = norm_pos.saturating_sub(width).max(prev);
            let right_end = (norm_pos + 1 + width).min(next);

            let raw_prev = ordinal.checked_sub(1).map(|i| raw_positions[i] + 1).unwrap_or(0);
            let raw_next = raw_positions.get(ordinal + 1).copied().unwrap_or(raw_chars.len());
            let excerpt_start = raw_pos.saturating_sub(width).max(raw_prev);
            let excerpt_end = (raw_pos + 1 + width).min(raw_next);

            ReplacementOccurrence {
                ordinal,
                byte_offset: raw[raw_pos].0,
                excerpt: raw_chars[excerpt_start..excerpt_end].iter().collect(),
                left: normalized[left_start..norm_pos].iter().collect(),
                right: normalized[norm_pos + 1..right_end].iter().collect(),
            }
        })
        .collect()
}

fn positions_of_replacement(chars: impl Iterator<Item = char>) -> Vec<usize> {
    chars
        .enumerate()
        .filter(|(_, c)| *c == REPLACEMENT_CHAR)
        .map(|(i, _)| i)
        .collect()
}

/// 参照文書に対して候補をスコアリングする
pub struct ContextResolver<'a> {
    document: &'a ReferenceDocument,
    config: &'a EngineConfig,
}

impl<'a> ContextResolver<'a> {
    pub fn new(document: &'a ReferenceDocument, config: &'a EngineConfig) -> Self {
        Self { document, config }
    }

    /// 1件の � について全候補のスコアを求める
    pub fn score(&self, occurrence: &ReplacementOccurrence) -> Vec<CandidateScore> {
        if !occurrence.has_context() || self.document.is_empty() {
            return Vec::new();
        }

        let left = relax_whitespace(&occurrence.left);
        let right = relax_whitespace(&occurrence.right);

        let mut scores: Vec<CandidateScore> = self
            .config
            .candidates
            .iter()
            .filter_map(|candidate| self.score_candidate(&left, candidate, &right))
            .filter(|s| s.total > 0)
            .collect();

        // 同点は候補リストの順を保つ
        scores.sort_by(|a, b| b.total.cmp(&a.total));
        tracing::trace!(
            "� #{} ({}|{}): {}件の候補がヒット",
            occurrence.ordinal,
            occurrence.left,
            occurrence.right,
            scores.len()
        );
        scores
    }

    fn score_candidate(&self, left: &str, candidate: &str, right: &str) -> Option<CandidateScore> {
        let pattern = format!("{}{}{}", left, regex::escape(candidate), right);
        let re = match RegexBuilder::new(&pattern)
            .case_insensitive(self.config.case_insensitive)
            .build()
        {
            Ok(re) => re,
            Err(e) => {
                tracing::warn!("候補パターンを構築できません ({}): {}", candidate, e);
                return None;
            }
        };

        // ページ単位に分割して並列に数える（加算のみなので順序に依存しない）
        let mut page_hits: Vec<PageHits> = self
            .document
            .normalized_pages()
            .par_iter()
            .enumerate()
            .map(|(idx, page)| PageHits {
                page: idx + 1,
                hits: re.find_iter(page).count(),
            })
            .filter(|p| p.hits > 0)
            .collect();

        let total = page_hits.iter().map(|p| p.hits).sum();
        page_hits.sort_by(|a, b| b.hits.cmp(&a.hits).then(a.page.cmp(&b.page)));
        page_hits.truncate(self.config.top_pages);

        Some(CandidateScore {
            candidate: candidate.to_string(),
            total,
            top_pages: page_hits,
        })
    }

    /// セル内のすべての � についてスコア表を作る
    pub fn resolve_cell(&self, text: &str) -> Vec<ScoreTable> {
        locate_replacements(text, self.config)
            .into_iter()
            .map(|occurrence| ScoreTable {
                scores: self.score(&occurrence),
                occurrence,
            })
            .collect()
    }
}
