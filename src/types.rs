use std::fmt;

/// ミリ秒精度のタイムスタンプ
///
/// メディア先頭からの経過時間を表す。負の値は持たない。
///
/// # Examples
///
/// ```
/// # use caption_convert::types::Timestamp;
/// let ts = Timestamp::from_millis(5_025_678); // 1時間23分45.678秒
/// assert_eq!(ts.srt(), "01:23:45,678");
/// assert_eq!(ts.vtt(), "01:23:45.678");
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// 時・分・秒・ミリ秒から作成
    ///
    /// ミリ秒に換算して `u64` に収まらない場合は None を返す。
    pub fn from_parts(hours: u64, minutes: u64, seconds: u64, millis: u64) -> Option<Self> {
        let millis = hours
            .checked_mul(60)?
            .checked_add(minutes)?
            .checked_mul(60)?
            .checked_add(seconds)?
            .checked_mul(1000)?
            .checked_add(millis)?;
        Some(Self(millis))
    }

    /// 秒数から作成（ミリ秒未満は四捨五入）
    ///
    /// 負の値・NaN・無限大の場合は None を返す。
    pub fn from_secs_f64(seconds: f64) -> Option<Self> {
        if !seconds.is_finite() || seconds < 0.0 {
            return None;
        }
        Some(Self((seconds * 1000.0).round() as u64))
    }

    pub const fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    /// 2つのタイムスタンプの差（負になる場合は 0）
    pub fn saturating_sub(&self, other: Timestamp) -> u64 {
        self.0.saturating_sub(other.0)
    }

    /// SRT形式 `HH:MM:SS,mmm`
    pub fn srt(&self) -> String {
        self.format_with(',')
    }

    /// WebVTT形式 `HH:MM:SS.mmm`
    pub fn vtt(&self) -> String {
        self.format_with('.')
    }

    fn format_with(&self, decimal_separator: char) -> String {
        let millis = self.0 % 1000;
        let total_seconds = self.0 / 1000;
        let seconds = total_seconds % 60;
        let minutes = (total_seconds / 60) % 60;
        let hours = total_seconds / 3600;
        format!(
            "{:02}:{:02}:{:02}{}{:03}",
            hours, minutes, seconds, decimal_separator, millis
        )
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.as_secs_f64())
    }
}

/// 字幕セグメント
///
/// 字幕1件分のテキストと表示区間。`start < end` を満たす。
/// セグメント同士の重なりはそのまま保持する（補正しない）。
///
/// # Examples
///
/// ```
/// # use caption_convert::types::{Segment, Timestamp};
/// let segment = Segment::new(
///     1,
///     Timestamp::from_millis(1_000),
///     Timestamp::from_millis(3_500),
///     "Hello world",
/// );
/// assert_eq!(segment.duration_ms(), 2_500);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Segment {
    /// 1 始まりの連番
    pub index: usize,

    /// 表示開始時刻
    pub start: Timestamp,

    /// 表示終了時刻
    pub end: Timestamp,

    /// 字幕テキスト（複数行可）
    pub text: String,
}

impl Segment {
    pub fn new(index: usize, start: Timestamp, end: Timestamp, text: impl Into<String>) -> Self {
        Self {
            index,
            start,
            end,
            text: text.into(),
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    /// 空白のみの行を除いたテキスト行
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text
            .lines()
            .map(|line| line.trim_end_matches('\r'))
            .filter(|line| !is_blank_line(line))
    }
}

/// ASCII 空白のみの行か（U+00A0 などは本文として扱う）
pub(crate) fn is_blank_line(line: &str) -> bool {
    line.trim_matches(|c: char| c.is_ascii_whitespace()).is_empty()
}

/// 単語トークンの種別
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    /// 発話された単語（タイムスタンプを持つ）
    Pronunciation,
    /// 句読点（タイムスタンプを持たず、直前の単語に連結される）
    Punctuation,
}

/// 文字起こし結果の単語トークン
#[derive(Clone, Debug, PartialEq)]
pub struct WordToken {
    /// 単語または句読点の文字列
    pub content: String,

    /// 発話開始時刻
    pub start: Option<Timestamp>,

    /// 発話終了時刻
    pub end: Option<Timestamp>,

    /// 信頼度 (0.0〜1.0)
    ///
    /// None は「不明」を表し、Some(0.0) とは区別する。
    pub confidence: Option<f32>,

    pub kind: TokenKind,
}

impl WordToken {
    pub fn is_punctuation(&self) -> bool {
        self.kind == TokenKind::Punctuation
    }

    /// 開始・終了の両方がわかっている場合のみ区間を返す
    pub fn timing(&self) -> Option<(Timestamp, Timestamp)> {
        match (self.start, self.end) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }
}

/// 文字起こし結果
///
/// サービスが返した全文テキストと、単語トークン列。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transcript {
    /// `results.transcripts[].transcript` を連結した全文
    pub text: String,

    /// 出現順の単語トークン
    pub tokens: Vec<WordToken>,
}

impl Transcript {
    /// 発話トークン（句読点以外）の数
    pub fn word_count(&self) -> usize {
        self.tokens.iter().filter(|t| !t.is_punctuation()).count()
    }
}
