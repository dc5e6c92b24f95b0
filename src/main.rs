use anyhow::{Context, Result};
use caption_convert::config::{Config, SegmentationPolicy, SsmlConfig, VttConfig};
use caption_convert::converter::{run_batch, Conversion, ConvertJob};
use clap::{Args, Parser, Subcommand};
use env_logger::Env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

/// Amazon Transcribe の JSON や SRT を SRT / WebVTT / SSML に変換する
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// 設定ファイルのパス（存在しなければデフォルト設定を使用）
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// 詳細なログを出力
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 文字起こし JSON から SRT を生成
    SrtFromTranscript {
        #[command(flatten)]
        io: IoArgs,
        #[command(flatten)]
        segmentation: SegmentationArgs,
    },
    /// 文字起こし JSON から WebVTT を生成
    VttFromTranscript {
        #[command(flatten)]
        io: IoArgs,
        #[command(flatten)]
        segmentation: SegmentationArgs,
        #[command(flatten)]
        vtt: VttArgs,
    },
    /// 文字起こし JSON から単語単位のタイミング付き SSML を生成
    SsmlFromTranscript {
        #[command(flatten)]
        io: IoArgs,
        #[command(flatten)]
        ssml: SsmlArgs,
        /// 単語間の区切り文字
        #[arg(long)]
        word_separator: Option<String>,
    },
    /// SRT から SSML を生成
    SsmlFromSrt {
        #[command(flatten)]
        io: IoArgs,
        #[command(flatten)]
        ssml: SsmlArgs,
    },
    /// SRT から WebVTT を生成
    VttFromSrt {
        #[command(flatten)]
        io: IoArgs,
        #[command(flatten)]
        vtt: VttArgs,
    },
    /// デフォルト設定ファイルを生成
    GenerateConfig {
        /// 出力先のパス
        #[arg(default_value = "config.toml")]
        path: PathBuf,
    },
}

#[derive(Args, Debug)]
struct IoArgs {
    /// 入力ファイル
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// 出力ファイル（入力ファイルが1つの場合のみ）
    #[arg(short, long, conflicts_with = "output_dir")]
    output: Option<PathBuf>,

    /// 出力ディレクトリ（省略時は入力ファイルと同じディレクトリ）
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SegmentationArgs {
    /// セグメントの最大長（ミリ秒、0 で無効）
    #[arg(long)]
    max_duration_ms: Option<u64>,

    /// セグメントの最大文字数（0 で無効）
    #[arg(long)]
    max_chars: Option<usize>,

    /// セグメントの最大単語数（0 で無効）
    #[arg(long)]
    max_words: Option<usize>,

    /// 文末の句読点でセグメントを区切る
    #[arg(long)]
    sentence_boundary: bool,

    /// 単語間の区切り文字
    #[arg(long)]
    word_separator: Option<String>,
}

#[derive(Args, Debug)]
struct VttArgs {
    /// キュー設定（例: "align:middle line:90%"）
    #[arg(long)]
    cue_settings: Option<String>,

    /// 各キューに連番の識別子を付ける
    #[arg(long)]
    cue_identifiers: bool,
}

#[derive(Args, Debug)]
struct SsmlArgs {
    /// prosody duration に掛ける倍率（1.0 = 100%）
    #[arg(long)]
    time_padding: Option<f64>,

    /// xml:lang に指定する言語コード
    #[arg(long)]
    language: Option<String>,
}

impl SegmentationArgs {
    fn apply(&self, policy: &mut SegmentationPolicy) {
        if let Some(v) = self.max_duration_ms {
            policy.max_duration_ms = Some(v);
        }
        if let Some(v) = self.max_chars {
            policy.max_chars = Some(v);
        }
        if let Some(v) = self.max_words {
            policy.max_words = Some(v);
        }
        if self.sentence_boundary {
            policy.sentence_boundary = true;
        }
        if let Some(sep) = &self.word_separator {
            policy.word_separator = sep.clone();
        }
    }
}

impl VttArgs {
    fn apply(&self, vtt: &mut VttConfig) {
        if let Some(settings) = &self.cue_settings {
            vtt.cue_settings = settings.clone();
        }
        if self.cue_identifiers {
            vtt.cue_identifiers = true;
        }
    }
}

impl SsmlArgs {
    fn apply(&self, ssml: &mut SsmlConfig) {
        if let Some(padding) = self.time_padding {
            ssml.time_padding = padding;
        }
        if let Some(language) = &self.language {
            ssml.language = language.clone();
        }
    }
}

impl IoArgs {
    fn jobs(&self, conversion: Conversion) -> Result<Vec<ConvertJob>> {
        if let Some(output) = &self.output {
            if self.inputs.len() != 1 {
                anyhow::bail!("--output は入力ファイルが1つの場合のみ指定できます (--output-dir を使用してください)");
            }
            return Ok(vec![ConvertJob::new(&self.inputs[0], output)]);
        }

        Ok(self
            .inputs
            .iter()
            .map(|input| {
                let dir = match &self.output_dir {
                    Some(dir) => dir.as_path(),
                    None => input.parent().unwrap_or(Path::new("")),
                };
                ConvertJob::in_dir(input, dir, conversion)
            })
            .collect())
    }
}

impl Command {
    /// 変換の種類と入出力を取り出し、コマンドラインの指定を設定に反映する
    fn into_conversion(self, config: &mut Config) -> Option<(Conversion, IoArgs)> {
        match self {
            Command::SrtFromTranscript { io, segmentation } => {
                segmentation.apply(&mut config.segmentation);
                Some((Conversion::SrtFromTranscript, io))
            }
            Command::VttFromTranscript {
                io,
                segmentation,
                vtt,
            } => {
                segmentation.apply(&mut config.segmentation);
                vtt.apply(&mut config.vtt);
                Some((Conversion::VttFromTranscript, io))
            }
            Command::SsmlFromTranscript {
                io,
                ssml,
                word_separator,
            } => {
                ssml.apply(&mut config.ssml);
                if let Some(sep) = word_separator {
                    config.segmentation.word_separator = sep;
                }
                Some((Conversion::SsmlFromTranscript, io))
            }
            Command::SsmlFromSrt { io, ssml } => {
                ssml.apply(&mut config.ssml);
                Some((Conversion::SsmlFromSrt, io))
            }
            Command::VttFromSrt { io, vtt } => {
                vtt.apply(&mut config.vtt);
                Some((Conversion::VttFromSrt, io))
            }
            Command::GenerateConfig { .. } => None,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{:#}", e);
            eprintln!("エラー: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    // 設定ファイル生成モード
    if let Command::GenerateConfig { path } = &cli.command {
        init_logger(cli.verbose, "info");
        Config::write_default(path)?;
        println!("設定ファイルを生成しました: {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    // ログレベルは設定ファイルで決まるため、ロガー初期化は読み込み後になる
    let config_found = cli.config.exists();
    let mut config = Config::load_or_default(&cli.config)
        .with_context(|| format!("設定ファイル {:?} を読み込めません", cli.config))?;
    init_logger(cli.verbose, &config.output.log_level);
    if !config_found {
        log::warn!(
            "設定ファイルが見つかりません。デフォルト設定を使用します: {:?}",
            cli.config
        );
    }

    let Some((conversion, io)) = cli.command.into_conversion(&mut config) else {
        return Ok(ExitCode::SUCCESS);
    };
    config.validate()?;
    log::debug!("設定: {:?}", config);

    let jobs = io.jobs(conversion)?;
    let report = run_batch(conversion, &jobs, &config);

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        for (path, err) in &report.failed {
            eprintln!("{}: {}", path.display(), err);
        }
        Ok(ExitCode::FAILURE)
    }
}

fn init_logger(verbose: bool, level: &str) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}
