use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub segmentation: SegmentationPolicy,
    #[serde(default)]
    pub vtt: VttConfig,
    #[serde(default)]
    pub ssml: SsmlConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// セグメント分割ポリシー
///
/// 文字起こし JSON の単語トークンを字幕セグメントにまとめる際の閾値。
/// いずれかの閾値を超える場合に新しいセグメントを開始する。
/// 閾値に 0 を指定するとその閾値は無効になる。
///
/// # デフォルト値
///
/// - `max_duration_ms`: なし
/// - `max_chars`: なし
/// - `max_words`: 10 語
/// - `sentence_boundary`: false
/// - `word_separator`: " "
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SegmentationPolicy {
    /// セグメントの最大長（ミリ秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_duration_ms: Option<u64>,
    /// セグメントの最大文字数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chars: Option<usize>,
    /// セグメントの最大単語数（句読点は数えない）
    #[serde(default = "default_max_words", skip_serializing_if = "Option::is_none")]
    pub max_words: Option<usize>,
    /// 文末の句読点でセグメントを区切る
    #[serde(default)]
    pub sentence_boundary: bool,
    /// 単語間の区切り文字（日本語など分かち書きしない言語では ""）
    #[serde(default = "default_word_separator")]
    pub word_separator: String,
}

/// WebVTT 出力設定
///
/// # デフォルト値
///
/// - `cue_settings`: "" (なし)
/// - `cue_identifiers`: false
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct VttConfig {
    /// タイムコード行の後ろに付けるキュー設定（例: "align:middle line:90%"）
    #[serde(default)]
    pub cue_settings: String,
    /// 各キューに連番の識別子を付ける
    #[serde(default)]
    pub cue_identifiers: bool,
}

/// SSML 出力設定
///
/// # デフォルト値
///
/// - `language`: "en-US"
/// - `time_padding`: 1.0 (セグメント長の 100%)
/// - `prosody_duration`: true
/// - `breaks`: true
/// - `min_break_ms`: 250 ms
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct SsmlConfig {
    #[serde(default = "default_language")]
    pub language: String,
    /// prosody duration に掛ける倍率
    #[serde(default = "default_time_padding")]
    pub time_padding: f64,
    /// セグメントを `<prosody duration>` で囲む
    #[serde(default = "default_true")]
    pub prosody_duration: bool,
    /// 無音区間に `<break>` を出力する
    #[serde(default = "default_true")]
    pub breaks: bool,
    /// これより短い無音区間には `<break>` を出力しない
    #[serde(default = "default_min_break_ms")]
    pub min_break_ms: u64,
}

/// 出力設定
///
/// # デフォルト値
///
/// - `log_level`: "info"
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct OutputConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default functions
fn default_max_words() -> Option<usize> {
    Some(10)
}

fn default_word_separator() -> String {
    " ".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_time_padding() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

fn default_min_break_ms() -> u64 {
    250
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SegmentationPolicy {
    fn default() -> Self {
        Self {
            max_duration_ms: None,
            max_chars: None,
            max_words: default_max_words(),
            sentence_boundary: false,
            word_separator: default_word_separator(),
        }
    }
}

impl Default for SsmlConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            time_padding: default_time_padding(),
            prosody_duration: default_true(),
            breaks: default_true(),
            min_break_ms: default_min_break_ms(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl Config {
    /// 設定ファイルから読み込み
    ///
    /// TOML形式の設定ファイルをパースしてConfig構造体を生成する。
    ///
    /// # Errors
    ///
    /// ファイルの読み込み・パース・検証に失敗した場合にエラーを返す。
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use caption_convert::config::Config;
    /// let config = Config::from_file("config.toml").unwrap();
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("設定ファイルの読み込みに失敗: {:?}", path.as_ref()))?;
        let config: Config =
            toml::from_str(&content).with_context(|| "設定ファイルのパースに失敗")?;
        config.validate()?;
        Ok(config)
    }

    /// デフォルト設定をファイルに書き出し
    ///
    /// 既存のファイルは上書きされる。
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use caption_convert::config::Config;
    /// Config::write_default("config.toml").unwrap();
    /// ```
    pub fn write_default<P: AsRef<Path>>(path: P) -> Result<()> {
        let config = Config::default();
        let content =
            toml::to_string_pretty(&config).with_context(|| "設定のシリアライズに失敗")?;
        fs::write(path.as_ref(), content)
            .with_context(|| format!("設定ファイルの書き込みに失敗: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// 設定ファイルがあれば読み込み、なければデフォルトを使用
    ///
    /// # Errors
    ///
    /// ファイルが存在するがパースに失敗した場合にエラーを返す。
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            log::warn!(
                "設定ファイルが見つかりません。デフォルト設定を使用します: {:?}",
                path.as_ref()
            );
            Ok(Config::default())
        }
    }

    /// 設定値の整合性を検証
    pub fn validate(&self) -> Result<()> {
        let cue_settings = &self.vtt.cue_settings;
        if cue_settings.contains('\n') || cue_settings.contains('\r') {
            anyhow::bail!("vtt.cue_settings に改行は指定できません");
        }
        if cue_settings.contains("-->") {
            anyhow::bail!("vtt.cue_settings に \"-->\" は指定できません");
        }

        if !self.ssml.time_padding.is_finite() || self.ssml.time_padding <= 0.0 {
            anyhow::bail!(
                "ssml.time_padding は正の数である必要があります: {}",
                self.ssml.time_padding
            );
        }
        Ok(())
    }
}
