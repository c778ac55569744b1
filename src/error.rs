use thiserror::Error;

#[derive(Error, Debug)]
pub enum SentinelError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("入力データが不正: {0}")]
    InvalidInput(String),

    #[error("ワークブック読み込みエラー: {0}")]
    Workbook(String),

    #[error("Excel生成エラー: {0}")]
    XlsxWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("CSVエラー: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] sentinel_common::Error),
}

pub type Result<T> = std::result::Result<T, SentinelError>;

/// 必須入力の存在確認
pub fn require_file(path: &std::path::Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(SentinelError::FileNotFound(path.display().to_string()))
    }
}
