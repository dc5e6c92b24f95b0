use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// 入力ドキュメント内のエラー発生位置
///
/// 行番号・ブロック番号・セグメント番号は 1 始まり、
/// トークン番号は JSON の `items` 配列の添字 (0 始まり)。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Location {
    /// ドキュメント全体
    Document,
    /// 行番号
    Line(usize),
    /// SRT のブロック番号と、その先頭行の行番号
    Block { block: usize, line: usize },
    /// 文字起こし JSON の `items` 添字
    Token(usize),
    /// 出力対象のセグメント番号
    Segment(usize),
    /// 設定値
    Config,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Document => write!(f, "ドキュメント"),
            Location::Line(line) => write!(f, "{} 行目", line),
            Location::Block { block, line } => write!(f, "ブロック {} ({} 行目)", block, line),
            Location::Token(index) => write!(f, "items[{}]", index),
            Location::Segment(index) => write!(f, "セグメント {}", index),
            Location::Config => write!(f, "設定"),
        }
    }
}

/// 変換処理のエラー
///
/// どのエラーもそのファイルの変換を中断させる。リトライは行わない。
#[derive(Debug, Error)]
pub enum ConvertError {
    /// ファイルが存在しない・読めない・書けない
    #[error("ファイル入出力エラー {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// 入力の構造が不正
    #[error("フォーマットエラー ({location}): {message}")]
    Format { location: Location, message: String },

    /// 入力が UTF-8 でない、または出力先のエンコーディングで表現できない文字を含む
    #[error("エンコーディングエラー ({location}): {message}")]
    Encoding { location: Location, message: String },
}

impl ConvertError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConvertError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn format(location: Location, message: impl Into<String>) -> Self {
        ConvertError::Format {
            location,
            message: message.into(),
        }
    }

    pub fn encoding(location: Location, message: impl Into<String>) -> Self {
        ConvertError::Encoding {
            location,
            message: message.into(),
        }
    }

    /// エラー位置（I/O エラーの場合は None）
    pub fn location(&self) -> Option<Location> {
        match self {
            ConvertError::Io { .. } => None,
            ConvertError::Format { location, .. } | ConvertError::Encoding { location, .. } => {
                Some(*location)
            }
        }
    }
}
