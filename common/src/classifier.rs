//! 単位トークンの分類
//!
//! マッチしたトークンと周辺文脈からラベル・修正案・理由を決める。
//! 参照文書の全ページを走査する異常スキャンもここで行う。

use crate::config::EngineConfig;
use crate::patterns::{self, TokenKind, GREEK_SIGNATURES, MICRO_SYMBOL, SCAN_PATTERNS};
use crate::types::{parse_decimal, MatchOccurrence};
use serde::{Deserialize, Serialize};

/// 正しい単位表記の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OkKind {
    MicroSymbol,
    MilliAscii,
    MilliSymbol,
    Milliliter,
    InternationalUnit,
    Greek,
}

/// 分類結果（閉じたラベル集合）
#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    /// ASCII ug/mcg → ㎍
    Normalize { value: String },
    /// 既に正しい表記
    Ok { kind: OkKind, canonical: String },
    /// 少量の g + 剤形キーワード → ㎍ の誤認
    SuspectMicroAsG { value: String, form_keyword: String },
    /// 少量の g だが剤形キーワードなし、または値不明
    ReviewMicroAsG { value: String, parsed: Option<f64> },
    /// 値が大きく実際の g と見られる
    OkOrLargeG { value: String },
    /// a-/b-/g- や alpha/beta/gamma がギリシャ文字の崩れと疑われる
    SuspectGreekBroken { letter: char },
    /// 単位記号を伴わない μ
    SuspectMuAlone,
    /// 既知パターンに該当しない
    Info,
}

impl Classification {
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Normalize { .. } => "normalize",
            Classification::Ok { .. } => "ok",
            Classification::SuspectMicroAsG { .. } => "suspect_micro_as_g",
            Classification::ReviewMicroAsG { .. } => "review_micro_as_g",
            Classification::OkOrLargeG { .. } => "ok_or_large_g",
            Classification::SuspectGreekBroken { .. } => "suspect_greek_broken",
            Classification::SuspectMuAlone => "suspect_mu_alone",
            Classification::Info => "info",
        }
    }

    pub fn suggested_fix(&self) -> String {
        match self {
            Classification::Normalize { value } => format!("{} {}", value, MICRO_SYMBOL),
            Classification::Ok { canonical, .. } => canonical.clone(),
            Classification::SuspectMicroAsG { value, .. } => format!("{} {}", value, MICRO_SYMBOL),
            Classification::ReviewMicroAsG { value, .. } => {
                format!("{} {} (要確認)", value, MICRO_SYMBOL)
            }
            Classification::OkOrLargeG { value } => format!("{} g", value),
            Classification::SuspectGreekBroken { letter } => format!("(文脈上 {} を確認)", letter),
            Classification::SuspectMuAlone => format!("(文脈上 {} または ㎖ を確認)", MICRO_SYMBOL),
            Classification::Info => String::new(),
        }
    }

    pub fn reason(&self) -> String {
        match self {
            Classification::Normalize { .. } => "ASCII 'ug/mcg' → 記号 '㎍' に正規化".to_string(),
            Classification::Ok { kind, .. } => match kind {
                OkKind::MicroSymbol => "正常なマイクログラム表記".to_string(),
                OkKind::MilliAscii => "正常なミリグラム表記(ASCII)".to_string(),
                OkKind::MilliSymbol => "正常なミリグラム表記(記号)".to_string(),
                OkKind::Milliliter => "正常なミリリットル表記".to_string(),
                OkKind::InternationalUnit => "正常な国際単位表記".to_string(),
                OkKind::Greek => "ギリシャ文字を正常に検出".to_string(),
            },
            Classification::SuspectMicroAsG { value, form_keyword } => format!(
                "g としてOCRされたが剤形「{}」+少量({}g) → ㎍ の誤認の可能性",
                form_keyword, value
            ),
            Classification::ReviewMicroAsG { value, parsed: Some(_) } => format!(
                "g としてOCRされたが少量({}g) → ㎍ の誤認の可能性、文脈の確認が必要",
                value
            ),
            Classification::ReviewMicroAsG { value, parsed: None } => {
                format!("数値「{}」を解釈できないため要確認", value)
            }
            Classification::OkOrLargeG { .. } => "値が大きく実際の g(グラム)の可能性が高い".to_string(),
            Classification::SuspectGreekBroken { letter } => {
                format!("a/b/g の形が {} の崩れである可能性", letter)
            }
            Classification::SuspectMuAlone => "μ の単独検出 → 単位記号の崩れの可能性".to_string(),
            Classification::Info => "その他の情報".to_string(),
        }
    }

    /// 一覧の並べ替え順（疑わしいものほど小さい）
    pub fn priority(&self) -> u8 {
        match self {
            Classification::SuspectMicroAsG { .. } => 1,
            Classification::ReviewMicroAsG { .. } => 2,
            Classification::SuspectGreekBroken { .. } => 3,
            Classification::SuspectMuAlone => 4,
            Classification::Normalize { .. } => 5,
            Classification::Ok { .. } => 6,
            Classification::OkOrLargeG { .. } => 7,
            Classification::Info => 9,
        }
    }
}

/// 最初に見つかったキーワードを返す
pub fn find_keyword<'a>(text: &str, keywords: &'a [String]) -> Option<&'a str> {
    keywords
        .iter()
        .find(|k| !k.is_empty() && text.contains(k.as_str()))
        .map(|k| k.as_str())
}

/// トークンを分類する
///
/// # Arguments
/// * `kind` - トークンの種類
/// * `value` - 数値部分（数値を捕捉しないパターンではマッチ文字列）
/// * `context` - 周辺文脈
pub fn classify(kind: TokenKind, value: &str, context: &str, config: &EngineConfig) -> Classification {
    match kind {
        TokenKind::MicroAscii => Classification::Normalize { value: value.to_string() },
        TokenKind::MicroSymbol => ok(OkKind::MicroSymbol, format!("{} ㎍", value)),
        TokenKind::MilliAscii => ok(OkKind::MilliAscii, format!("{} mg", value)),
        TokenKind::MilliSymbol => ok(OkKind::MilliSymbol, format!("{} ㎎", value)),
        TokenKind::MlAscii => ok(OkKind::Milliliter, format!("{} mL", value)),
        TokenKind::MlSymbol => ok(OkKind::Milliliter, format!("{} ㎖", value)),
        TokenKind::IuAscii => ok(OkKind::InternationalUnit, format!("{} IU", value)),
        TokenKind::GreekLetter => ok(OkKind::Greek, "(そのまま)".to_string()),
        TokenKind::GramAscii => classify_gram(value, context, config),
        TokenKind::AlphaLike => Classification::SuspectGreekBroken { letter: 'α' },
        TokenKind::BetaLike => Classification::SuspectGreekBroken { letter: 'β' },
        TokenKind::GammaLike => Classification::SuspectGreekBroken { letter: 'γ' },
        TokenKind::MuAlone => Classification::SuspectMuAlone,
    }
}

fn ok(kind: OkKind, canonical: String) -> Classification {
    Classification::Ok { kind, canonical }
}

fn classify_gram(value: &str, context: &str, config: &EngineConfig) -> Classification {
    let Some(parsed) = parse_decimal(value) else {
        return Classification::ReviewMicroAsG {
            value: value.to_string(),
            parsed: None,
        };
    };

    if parsed > config.gram_suspect_threshold {
        return Classification::OkOrLargeG { value: value.to_string() };
    }

    match find_keyword(context, &config.form_keywords) {
        Some(keyword) => Classification::SuspectMicroAsG {
            value: value.to_string(),
            form_keyword: keyword.to_string(),
        },
        None => Classification::ReviewMicroAsG {
            value: value.to_string(),
            parsed: Some(parsed),
        },
    }
}

/// 参照文書スキャンで見つかった1件
#[derive(Debug, Clone)]
pub struct Anomaly {
    /// 1始まりのページ番号
    pub page: usize,
    pub occurrence: MatchOccurrence,
    pub classification: Classification,
}

/// CSV入出力用の平坦な行
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnomalyRow {
    pub page: usize,
    #[serde(rename = "match")]
    pub matched: String,
    pub classification: String,
    pub suggested_fix: String,
    pub reason: String,
    pub context: String,
}

impl From<&Anomaly> for AnomalyRow {
    fn from(anomaly: &Anomaly) -> Self {
        Self {
            page: anomaly.page,
            matched: anomaly.occurrence.matched.clone(),
            classification: anomaly.classification.label().to_string(),
            suggested_fix: anomaly.classification.suggested_fix(),
            reason: anomaly.classification.reason(),
            context: anomaly.occurrence.context.clone(),
        }
    }
}

/// 1ページ分のテキストを走査して分類する
pub fn scan_page(page: usize, text: &str, config: &EngineConfig) -> Vec<Anomaly> {
    let window = config.scan_context_window;
    let mut anomalies = Vec::new();

    for (kind, re) in SCAN_PATTERNS.iter().chain(GREEK_SIGNATURES.iter()) {
        for caps in re.captures_iter(text) {
            let Some(m) = caps.get(0) else { continue };
            let number = if kind.captures_number() {
                caps.get(1).map(|n| n.as_str().to_string())
            } else {
                None
            };
            let context = patterns::context_around(text, m.start(), m.end(), window);
            let value = number.clone().unwrap_or_else(|| m.as_str().to_string());
            let classification = classify(*kind, &value, &context, config);

            anomalies.push(Anomaly {
                page,
                occurrence: MatchOccurrence {
                    matched: m.as_str().to_string(),
                    number,
                    start: m.start(),
                    end: m.end(),
                    context,
                },
                classification,
            });
        }
    }

    anomalies
}

/// 全ページを走査し、疑わしい順・ページ順に並べる
pub fn scan_pages(pages: &[String], config: &EngineConfig) -> Vec<Anomaly> {
    let mut anomalies: Vec<Anomaly> = pages
        .iter()
        .enumerate()
        .flat_map(|(idx, text)| scan_page(idx + 1, text, config))
        .collect();

    anomalies.sort_by_key(|a| (a.classification.priority(), a.page));
    tracing::debug!("参照文書スキャン: {}件", anomalies.len());
    anomalies
}
