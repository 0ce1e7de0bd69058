use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use summary_eval::cli::{Cli, Commands, ScorerKind};
use summary_eval::config::Config;
use summary_eval::evaluator::{self, EvalPlan};
use summary_eval::export;
use summary_eval::matcher::{self, RecordIndex};
use summary_eval::resolver::ContentResolver;
use summary_eval::scorer::{CachedScorer, CommandScorer, OverlapScorer, ScoreCache, Scorer};
use summary_eval::tabular;
use tracing_subscriber::EnvFilter;

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar().template("{msg} [{bar:40}] {pos}/{len}") {
        pb.set_style(style);
    }
    pb
}

/// 出力先の親フォルダ（相対ファイル名ならカレント）
fn parent_folder(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = Config::load().context("設定の読み込みに失敗しました")?;

    match cli.command {
        Commands::Extract {
            mapper,
            stats,
            output,
        } => {
            println!("📑 summary-eval - 要約抽出\n");

            // 1. 表の読み込み
            println!("[1/3] 表を読み込み中...");
            let mut table = tabular::read_table(&mapper)
                .with_context(|| format!("マッパーを読み込めません: {}", mapper.display()))?;
            let records = tabular::read_table(&stats)
                .with_context(|| format!("統計データを読み込めません: {}", stats.display()))?;
            let index = RecordIndex::from_table(&records, &config.columns)?;
            println!("✔ マッパー {}行 / 統計データ {}行", table.len(), index.len());
            let available: Vec<String> = index.available_params().iter().map(|p| p.label()).collect();
            println!("  統計データの温度: {}\n", available.join(", "));

            // 2. 照合と要約の読み込み
            println!("[2/3] 要約を照合中...");
            let params = config.params();
            let resolver = ContentResolver::new(config.path_remap.clone());
            let pb = progress_bar();
            pb.set_message("照合");
            let result =
                matcher::enrich_table(&mut table, &index, &params, &resolver, &config.columns, &pb)?;
            println!("✔ 一致: {}件", result.matched);
            println!("  不一致: {}件", result.missing);
            if result.duplicates > 0 {
                println!("  重複（先頭行を採用）: {}件", result.duplicates);
            }
            if result.invalid_params > 0 {
                println!("  温度が数値でない行: {}件", result.invalid_params);
            }
            println!();

            // 3. 保存
            println!("[3/3] 結果を保存中...");
            let output = output.unwrap_or_else(|| mapper.with_extension("xlsx"));
            tabular::write_table(&table, "mapper", &output)?;
            println!("✔ 結果を保存: {}", output.display());

            let url_col = table.column_index(&config.columns.url);
            let variant_cols: Vec<(String, Option<usize>)> = config
                .variant_columns()
                .into_iter()
                .map(|c| {
                    let idx = table.column_index(&c);
                    (c, idx)
                })
                .collect();
            println!("\nサンプル:");
            for row in 0..table.len().min(3) {
                let url = url_col.map(|c| table.cell(row, c).as_text()).unwrap_or_default();
                let lengths: Vec<String> = variant_cols
                    .iter()
                    .map(|(name, col)| {
                        let chars = col
                            .map(|c| table.cell(row, c).as_text().chars().count())
                            .unwrap_or(0);
                        format!("{}={}", name, chars)
                    })
                    .collect();
                println!("  {} {}", url, lengths.join(" "));
            }

            println!("\n✅ 抽出完了");
        }

        Commands::Evaluate {
            input,
            output,
            scorer,
            use_cache,
        } => {
            println!("📊 summary-eval - 要約評価\n");
            println!("開始: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));

            // 1. 入力
            println!("[1/3] 入力を読み込み中...");
            let table = tabular::read_table(&input)
                .with_context(|| format!("入力を読み込めません: {}", input.display()))?;
            let plan = EvalPlan::from_config(&config);
            let items = evaluator::load_items(&table, &config.columns, &plan)?;
            println!("✔ {}件の動画\n", items.len());

            // 2. スコア計算
            let output = export::output_path(
                &output.unwrap_or_else(|| PathBuf::from(export::DEFAULT_OUTPUT_NAME)),
            );
            let inner: Box<dyn Scorer> = match scorer {
                ScorerKind::Command => {
                    Box::new(CommandScorer::new(&config.resolved_scorer_command(), cli.verbose)?)
                }
                ScorerKind::Overlap => Box::new(OverlapScorer),
            };
            println!(
                "[2/3] スコア計算中... ({}){}",
                inner.name(),
                if use_cache { " (キャッシュ有効)" } else { "" }
            );
            let pb = progress_bar();
            let report = if use_cache {
                let mut cached = CachedScorer::new(inner, &parent_folder(&output));
                let report = evaluator::evaluate_items(&items, &plan, &mut cached, &pb);
                cached.flush().context("キャッシュの保存に失敗しました")?;
                println!("  キャッシュ: ヒット {}件 / 新規 {}件", cached.hits(), cached.misses());
                report
            } else {
                let mut inner = inner;
                evaluator::evaluate_items(&items, &plan, &mut *inner, &pb)
            };
            println!("✔ {}組を評価", report.results.len());
            println!("  スキップ（テキスト不足）: {}組", report.skipped);
            if report.failed > 0 {
                println!("  スキップ（スコアラー失敗）: {}組", report.failed);
            }
            println!();

            if report.results.is_empty() {
                bail!("評価結果がありません（出力は作成していません）");
            }

            // 3. 出力
            println!("[3/3] 結果を保存中...");
            export::export_evaluation(&report.results, &config.params(), &output)?;
            println!("✔ 結果を保存: {}", output.display());

            println!("\n温度×参照元の平均F1:");
            println!("{}", export::quick_summary(&report.results));

            println!("\n✅ 評価完了");
        }

        Commands::Averages { input } => {
            println!("📈 summary-eval - 平均シート追加\n");
            let sheets = export::add_averages(&input)
                .with_context(|| format!("平均シートを追加できません: {}", input.display()))?;
            for sheet in &sheets {
                println!("[{}]", sheet.name);
                println!("{}\n", export::format_table(&sheet.table));
            }
            println!("✅ 保存: {}", input.display());
        }

        Commands::Config {
            show,
            set_remap_from,
            set_remap_to,
            set_scorer_command,
            set_lang,
        } => {
            let mut config = config;

            if set_remap_from.is_some() || set_remap_to.is_some() {
                config.set_remap(set_remap_from, set_remap_to)?;
                println!("✔ パス置換を設定しました");
            }

            if let Some(command) = set_scorer_command {
                config.set_scorer_command(&command)?;
                println!("✔ スコアラーコマンドを設定しました");
            }

            if let Some(lang) = set_lang {
                config.set_lang(lang)?;
                println!("✔ 言語を設定しました");
            }

            if show {
                println!("設定: {}", Config::config_path()?.display());
                let temps: Vec<String> = config.params().iter().map(|p| p.label()).collect();
                println!("  温度: {}", temps.join(", "));
                println!("  参照列: {}", config.reference_columns.join(", "));
                match &config.path_remap {
                    Some(remap) => println!("  パス置換: {} → {}", remap.from, remap.to),
                    None => println!("  パス置換: なし"),
                }
                println!("  スコアラー: {}", config.scorer.command.join(" "));
                println!("  スコアラー（実行時）: {}", config.resolved_scorer_command().join(" "));
                println!("    相対パスはカレント → 実行ファイルの場所とその上位2階層 の順に探します");
                println!("  言語: {}", config.scorer.lang);
                println!("  ベースライン補正: {}", config.scorer.rescale_with_baseline);
                println!("  最小文字数: {}", config.min_text_chars);
            }
        }

        Commands::Cache { clear, folder, info } => {
            let target = folder.unwrap_or_else(|| PathBuf::from("."));
            let cache_path = ScoreCache::cache_path(&target);

            if info || !clear {
                if cache_path.exists() {
                    let cache = ScoreCache::load(&target);
                    println!("キャッシュ情報:");
                    println!("  パス: {}", cache_path.display());
                    println!("  件数: {}", cache.len());
                    if let Ok(meta) = std::fs::metadata(&cache_path) {
                        println!("  サイズ: {} bytes", meta.len());
                    }
                } else {
                    println!("キャッシュファイルが存在しません: {}", cache_path.display());
                }
            }

            if clear {
                match ScoreCache::clear(&target) {
                    Ok(true) => println!("✔ キャッシュを削除しました: {}", cache_path.display()),
                    Ok(false) => println!("キャッシュファイルが存在しません"),
                    Err(e) => println!("キャッシュ削除エラー: {}", e),
                }
            }
        }
    }

    Ok(())
}
