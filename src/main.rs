use clap::Parser;
use pharmalex_sentinel::{cli, config, error, runner};
use cli::{Cli, Commands};
use config::Config;
use error::Result;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = execute(cli) {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}

fn execute(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { workbook, reference, anomalies, mapping, output } => {
            println!("🛡 pharmalex-sentinel - OCR補正\n");

            println!("[1/3] 入力を確認中...");
            let options = runner::RunOptions {
                workbook,
                reference,
                anomalies,
                mapping,
                output_dir: output,
                show_progress: true,
            };
            if options.reference.is_none() {
                println!("- 参照文書なし: � は文脈ルールのみで解決します");
            }

            println!("[2/3] 補正中...");
            let result = runner::run(&options, &config.engine)?;
            let stats = &result.report.stats;
            println!(
                "✔ {}シート / {}セルを検査、{}セルを変更\n",
                result.sheets, stats.total_cells, stats.changed_cells
            );

            println!("[3/3] 結果を保存しました");
            println!("✔ 補正済みワークブック: {}", result.normalized.display());
            println!("✔ 補正ログ ({}件): {}", result.report.logs.len(), result.corrections.display());
            println!("✔ 要確認リスト ({}件): {}", result.report.reviews.len(), result.reviews.display());
            if let Some(path) = &result.candidates {
                println!("✔ 候補スコア表: {}", path.display());
            }
            println!("✔ サマリ: {}", result.summary.display());

            println!("\n✅ 完了");
        }

        Commands::ScanInvalid { workbook, output } => {
            println!("🔎 pharmalex-sentinel - 不正文字スキャン\n");
            let rows = runner::scan_invalid(&workbook, &output)?;
            let total: usize = rows.iter().map(|r| r.count_in_cell).sum();
            println!("✔ {}セル / {}箇所の � を検出", rows.len(), total);
            println!("✔ レポート: {}", output.display());
        }

        Commands::Freq { workbook, output } => {
            println!("🔎 pharmalex-sentinel - 文字頻度スキャン\n");
            let (freq, samples, kinds) = runner::frequency(&workbook, &output)?;
            println!("✔ {}種類の文字を集計", kinds);
            println!("✔ 頻度表: {}", freq.display());
            println!("✔ サンプル: {}", samples.display());
        }

        Commands::ScanUnits { pages, output } => {
            println!("🔎 pharmalex-sentinel - 単位表記スキャン\n");
            let rows = runner::scan_units(&pages, &output, &config.engine)?;
            println!("✔ {}件を分類", rows.len());
            println!("✔ レポート: {}", output.display());
        }

        Commands::Candidates { workbook, reference, output } => {
            println!("🔎 pharmalex-sentinel - � 候補スコア\n");
            let count = runner::candidates(&workbook, &reference, &output, &config.engine)?;
            println!("✔ {}件の � を評価", count);
            println!("✔ 候補スコア表: {}", output.display());
        }

        Commands::Config { show, init } => {
            if init {
                let path = Config::default().save()?;
                println!("✔ 既定の設定を作成しました: {}", path.display());
            }

            if show || !init {
                let engine = &config.engine;
                println!("設定:");
                println!("  g 閾値: {}", engine.gram_suspect_threshold);
                println!("  剤形キーワード: {}", engine.form_keywords.join(", "));
                println!("  検査値パターン: {}", engine.lab_negative_patterns.join(", "));
                println!("  候補文字: {}", engine.candidates.join(" "));
                println!("  文脈幅: {}文字", engine.context_chars);
                println!("  最小ヒット数: {}", engine.min_hits);
                println!("  差の倍率: {}", engine.margin_ratio);
                println!("  大文字小文字を無視: {}", engine.case_insensitive);
            }
        }
    }

    Ok(())
}
