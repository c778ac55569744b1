//! 補正エンジンの設定
//!
//! 閾値・キーワード・否定パターン・候補文字などをまとめて持つ。
//! JSONで部分的に上書きでき、省略した項目は既定値になる。

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// 既定の剤形キーワード（あれば g→㎍ 補正の信頼度が上がる）
pub const DEFAULT_FORM_KEYWORDS: &[&str] = &[
    "정", "주", "주사", "시럽", "이식제", "캡슐", "패치", "외용제", "점안액", "연고",
    "겔", "로션", "현탁", "현탁액", "흡입", "분무", "스프레이", "장용", "서방", "좌제",
    "과립", "산제", "분말", "점비",
];

/// 既定の検査値文脈パターン（あれば g→㎍ 補正を行わない）
pub const DEFAULT_LAB_NEGATIVE_PATTERNS: &[&str] = &[
    r"g/dl", r"g/l", r"g/24h", r"g/day", r"g/g", r"g/m2", r"g/m²",
    r"\bhb\b", r"\bhct\b", "헤모글로빈", "혈장", "단백뇨", "경구당부하",
];

/// 既定の � 置換候補
pub const DEFAULT_CANDIDATES: &[&str] = &[
    "㎍", "㎎", "㎖", "α", "β", "γ", "μ", "-", "·", "×", "~", "/",
];

/// 補正エンジン設定
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// この値以下の g を ㎍ の誤認と疑う
    pub gram_suspect_threshold: f64,
    pub form_keywords: Vec<String>,
    /// 大文字小文字を無視する正規表現
    pub lab_negative_patterns: Vec<String>,
    /// � の置換候補（1文字ずつ）
    pub candidates: Vec<String>,
    /// � の左右それぞれに使う文脈の文字数
    pub context_chars: usize,
    /// 自動確定に必要な最小ヒット数
    pub min_hits: usize,
    /// 1位が2位のこの倍率以上なら自動確定
    pub margin_ratio: f64,
    /// 参照文書スキャン時の文脈幅
    pub scan_context_window: usize,
    /// 検討記録に残すセル値の文字数
    pub review_excerpt_chars: usize,
    pub case_insensitive: bool,
    /// 候補ごとに残す上位ページ数
    pub top_pages: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            gram_suspect_threshold: 100.0,
            form_keywords: to_strings(DEFAULT_FORM_KEYWORDS),
            lab_negative_patterns: to_strings(DEFAULT_LAB_NEGATIVE_PATTERNS),
            candidates: to_strings(DEFAULT_CANDIDATES),
            context_chars: 12,
            min_hits: 3,
            margin_ratio: 2.0,
            scan_context_window: 60,
            review_excerpt_chars: 120,
            case_insensitive: true,
            top_pages: 3,
        }
    }
}

impl EngineConfig {
    /// JSON文字列から読み込み
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 値の整合性を確認する
    pub fn validate(&self) -> Result<()> {
        if !self.gram_suspect_threshold.is_finite() {
            return Err(Error::Config("gram_suspect_threshold must be finite".into()));
        }
        if !self.margin_ratio.is_finite() || self.margin_ratio < 1.0 {
            return Err(Error::Config(format!(
                "margin_ratio must be >= 1.0 (got {})",
                self.margin_ratio
            )));
        }
        if let Some(bad) = self.candidates.iter().find(|c| c.chars().count() != 1) {
            return Err(Error::Config(format!(
                "candidate must be a single character: {:?}",
                bad
            )));
        }
        if self.candidates.iter().any(|c| c == "\u{FFFD}") {
            return Err(Error::Config("candidate must not be U+FFFD".into()));
        }
        Ok(())
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = EngineConfig::default();
        assert_eq!(config.gram_suspect_threshold, 100.0);
        assert_eq!(config.context_chars, 12);
        assert_eq!(config.min_hits, 3);
        assert_eq!(config.margin_ratio, 2.0);
        assert_eq!(config.candidates.len(), 12);
        assert!(config.form_keywords.iter().any(|k| k == "주사"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{"min_hits": 5, "form_keywords": ["tablet"]}"#).unwrap();
        assert_eq!(config.min_hits, 5);
        assert_eq!(config.form_keywords, vec!["tablet".to_string()]);
        assert_eq!(config.margin_ratio, 2.0);
        assert_eq!(config.lab_negative_patterns.len(), DEFAULT_LAB_NEGATIVE_PATTERNS.len());
    }

    #[test]
    fn test_validate_rejects_multi_char_candidate() {
        let result = EngineConfig::from_json(r#"{"candidates": ["㎍", "mg"]}"#);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_small_margin() {
        let result = EngineConfig::from_json(r#"{"margin_ratio": 0.5}"#);
        assert!(result.is_err());
    }
}
