use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "sentinel")]
#[command(about = "規制資料スプレッドシートのOCR補正ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 設定ファイル（省略時: ~/.config/pharmalex-sentinel/config.json）
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 補正パイプラインを一括実行
    Run {
        /// 入力ワークブック (.xlsx)
        #[arg(required = true)]
        workbook: PathBuf,

        /// 参照文書のページテキスト（JSON配列 または \f 区切り）
        #[arg(short, long)]
        reference: Option<PathBuf>,

        /// 事前のOCR異常スキャンCSV
        #[arg(short, long)]
        anomalies: Option<PathBuf>,

        /// 手動マッピングCSV (before,after[,notes])
        #[arg(short, long)]
        mapping: Option<PathBuf>,

        /// 出力ディレクトリ
        #[arg(short, long, default_value = "out")]
        output: PathBuf,
    },

    /// � を含むセルを一覧化
    ScanInvalid {
        /// 入力ワークブック
        #[arg(required = true)]
        workbook: PathBuf,

        /// 出力CSV
        #[arg(short, long, default_value = "invalid_char_report.csv")]
        output: PathBuf,
    },

    /// 疑わしい文字の出現頻度を集計
    Freq {
        /// 入力ワークブック
        #[arg(required = true)]
        workbook: PathBuf,

        /// 出力ディレクトリ
        #[arg(short, long, default_value = "out_scan")]
        output: PathBuf,
    },

    /// 参照文書の単位表記・ギリシャ文字を分類
    ScanUnits {
        /// 参照文書のページテキスト
        #[arg(required = true)]
        pages: PathBuf,

        /// 出力CSV
        #[arg(short, long, default_value = "ocr_unit_anomalies_scan.csv")]
        output: PathBuf,
    },

    /// � ごとの候補スコア表を出力（補正は行わない）
    Candidates {
        /// 入力ワークブック
        #[arg(required = true)]
        workbook: PathBuf,

        /// 参照文書のページテキスト
        #[arg(short, long, required = true)]
        reference: PathBuf,

        /// 出力CSV
        #[arg(short, long, default_value = "fffd_candidates.csv")]
        output: PathBuf,
    },

    /// 設定を表示/初期化
    Config {
        /// 設定を表示
        #[arg(long)]
        show: bool,

        /// 既定値で設定ファイルを作成
        #[arg(long)]
        init: bool,
    },
}
