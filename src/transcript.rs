use crate::error::{ConvertError, Location};
use crate::types::{Timestamp, TokenKind, Transcript, WordToken};
use serde::Deserialize;

/// Amazon Transcribe の出力 JSON（必要な部分のみ）
///
/// フィールドはすべて Option で受け取り、[`parse_transcript`] で検証してから
/// ドメイン型に変換する。
#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(rename = "jobName")]
    job_name: Option<String>,
    status: Option<String>,
    results: Option<RawResults>,
}

#[derive(Debug, Deserialize)]
struct RawResults {
    #[serde(default)]
    transcripts: Vec<RawTranscriptText>,
    items: Option<Vec<RawItem>>,
}

#[derive(Debug, Deserialize)]
struct RawTranscriptText {
    #[serde(default)]
    transcript: String,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    start_time: Option<NumberOrString>,
    end_time: Option<NumberOrString>,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    alternatives: Vec<RawAlternative>,
}

#[derive(Debug, Deserialize)]
struct RawAlternative {
    content: Option<String>,
    confidence: Option<NumberOrString>,
}

/// 数値は文字列（"0.04"）で出力されるが、数値リテラルも受け付ける
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    String(String),
}

impl NumberOrString {
    fn as_f64(&self) -> Option<f64> {
        match self {
            NumberOrString::Number(n) => Some(*n),
            NumberOrString::String(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

/// Amazon Transcribe の出力 JSON をパース
///
/// # Errors
///
/// JSON として不正な場合、`results` / `items` がない場合、
/// 各 item の必須フィールドが欠けている・不正な場合に
/// [`ConvertError::Format`] を返す。
///
/// # Examples
///
/// ```
/// # use caption_convert::transcript::parse_transcript;
/// let json = r#"{"results": {"transcripts": [{"transcript": "Hi."}], "items": [
///     {"start_time": "0.0", "end_time": "0.4", "type": "pronunciation",
///      "alternatives": [{"confidence": "0.98", "content": "Hi"}]},
///     {"type": "punctuation", "alternatives": [{"content": "."}]}
/// ]}}"#;
/// let transcript = parse_transcript(json).unwrap();
/// assert_eq!(transcript.tokens.len(), 2);
/// assert_eq!(transcript.text, "Hi.");
/// ```
pub fn parse_transcript(input: &str) -> Result<Transcript, ConvertError> {
    let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);
    let raw: RawDocument = serde_json::from_str(input).map_err(|e| {
        ConvertError::format(
            Location::Line(e.line()),
            format!("JSONのパースに失敗 ({} 列目): {}", e.column(), e),
        )
    })?;

    if let Some(status) = raw.status.as_deref() {
        if status != "COMPLETED" {
            log::warn!(
                "文字起こしジョブが完了していません: {} (job: {})",
                status,
                raw.job_name.as_deref().unwrap_or("-")
            );
        }
    }

    let results = raw.results.ok_or_else(|| {
        ConvertError::format(Location::Document, "\"results\" がありません")
    })?;
    let items = results.items.ok_or_else(|| {
        ConvertError::format(Location::Document, "\"results.items\" がありません")
    })?;

    let text = results
        .transcripts
        .iter()
        .map(|t| t.transcript.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let tokens = items
        .into_iter()
        .enumerate()
        .map(|(index, item)| map_item(index, item))
        .collect::<Result<Vec<_>, _>>()?;

    log::debug!(
        "文字起こしJSONパース完了: {} トークン (ジョブ: {})",
        tokens.len(),
        raw.job_name.as_deref().unwrap_or("-")
    );

    Ok(Transcript { text, tokens })
}

fn map_item(index: usize, item: RawItem) -> Result<WordToken, ConvertError> {
    let location = Location::Token(index);

    let kind = match item.kind.as_deref() {
        Some("pronunciation") => TokenKind::Pronunciation,
        Some("punctuation") => TokenKind::Punctuation,
        Some(other) => {
            return Err(ConvertError::format(
                location,
                format!("不明な type です: {:?}", other),
            ));
        }
        None => return Err(ConvertError::format(location, "\"type\" がありません")),
    };

    // 先頭の候補が最も確からしい
    let alternative = item
        .alternatives
        .into_iter()
        .next()
        .ok_or_else(|| ConvertError::format(location, "\"alternatives\" が空です"))?;
    let content = alternative
        .content
        .ok_or_else(|| ConvertError::format(location, "\"alternatives[0].content\" がありません"))?;

    let confidence = match alternative.confidence {
        None => None,
        Some(raw) => {
            let value = raw
                .as_f64()
                .filter(|v| (0.0..=1.0).contains(v))
                .ok_or_else(|| ConvertError::format(location, format!("confidence が不正です: {:?}", raw)))?;
            Some(value as f32)
        }
    };

    // 句読点はタイムスタンプを持たない
    let (start, end) = match kind {
        TokenKind::Punctuation => (None, None),
        TokenKind::Pronunciation => {
            let start = parse_time(location, "start_time", item.start_time.as_ref())?;
            let end = parse_time(location, "end_time", item.end_time.as_ref())?;
            if let (Some(s), Some(e)) = (start, end) {
                if e < s {
                    return Err(ConvertError::format(
                        location,
                        format!("end_time が start_time より前です: {} < {}", e, s),
                    ));
                }
            }
            (start, end)
        }
    };

    Ok(WordToken {
        content,
        start,
        end,
        confidence,
        kind,
    })
}

fn parse_time(
    location: Location,
    field: &str,
    raw: Option<&NumberOrString>,
) -> Result<Option<Timestamp>, ConvertError> {
    match raw {
        None => Ok(None),
        Some(raw) => raw
            .as_f64()
            .and_then(Timestamp::from_secs_f64)
            .map(Some)
            .ok_or_else(|| ConvertError::format(location, format!("{} が不正です: {:?}", field, raw))),
    }
}
