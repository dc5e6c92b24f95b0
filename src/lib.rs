//! caption-convert - 字幕・音声合成マークアップ変換ツール
//!
//! このクレートは、Amazon Transcribe の出力 JSON や SRT ファイルを読み込み、
//! SRT・WebVTT・SSML 形式に変換する機能を提供します。
//!
//! # 主な機能
//!
//! - **SRT パース/出力**: インデックス・タイムコード・テキストのブロックを相互変換
//! - **文字起こし JSON パース**: 単語単位のタイムスタンプと信頼度を取り込み
//! - **セグメント分割**: 単語数・文字数・長さ・文末で字幕セグメントにまとめる
//! - **WebVTT 出力**: キュー設定（位置指定）付きで出力
//! - **SSML 出力**: セグメント単位または単語単位のタイミング情報付きで出力
//!
//! # アーキテクチャ
//!
//! ```text
//! [Transcribe JSON] → [transcript] → [segmenter] ─┐
//!                                                 ├→ [Segment列] → [srt / vtt / ssml] → [出力ファイル]
//! [SRT]             → [srt::parse_srt] ───────────┘
//! ```
//!
//! 出力は一時ファイルに書き込んでから置き換えるため、
//! 変換に失敗した場合に書きかけのファイルは残りません。
//!
//! # 使用例
//!
//! ```no_run
//! use caption_convert::config::Config;
//! use caption_convert::converter::{run_job, Conversion, ConvertJob};
//!
//! let config = Config::load_or_default("config.toml").unwrap();
//! let job = ConvertJob::new("interview.json", "interview.srt");
//! run_job(Conversion::SrtFromTranscript, &job, &config).unwrap();
//! ```

pub mod config;
pub mod converter;
pub mod error;
pub mod segmenter;
pub mod srt;
pub mod ssml;
pub mod transcript;
pub mod types;
pub mod vtt;
