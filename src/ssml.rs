use crate::config::SsmlConfig;
use crate::error::{ConvertError, Location};
use crate::types::{Segment, Timestamp, Transcript};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
const SSML_NAMESPACE: &str = "http://www.w3.org/2001/10/synthesis";

/// XML 1.0 で表現できる文字か
fn is_xml_char(c: char) -> bool {
    matches!(c,
        '\t' | '\n' | '\r'
        | '\u{20}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// テキストをエスケープしつつ XML で表現できない文字を検出する
fn escape_text(text: &str, location: Location) -> Result<String, ConvertError> {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            c if is_xml_char(c) => escaped.push(c),
            c => {
                return Err(ConvertError::encoding(
                    location,
                    format!("SSML (XML 1.0) で表現できない文字 U+{:04X} を含みます", c as u32),
                ));
            }
        }
    }
    Ok(escaped)
}

fn escape_attribute(value: &str, location: Location) -> Result<String, ConvertError> {
    Ok(escape_text(value, location)?.replace('"', "&quot;"))
}

fn open_speak(config: &SsmlConfig) -> Result<String, ConvertError> {
    Ok(format!(
        "{}<speak version=\"1.1\" xmlns=\"{}\" xml:lang=\"{}\">\n",
        XML_DECLARATION,
        SSML_NAMESPACE,
        escape_attribute(&config.language, Location::Config)?
    ))
}

fn close_speak(out: &mut String) {
    out.push_str("</speak>\n");
}

/// 無音区間が閾値以上なら `<break>` を返す
fn break_tag(config: &SsmlConfig, gap_ms: u64) -> Option<String> {
    if config.breaks && gap_ms > 0 && gap_ms >= config.min_break_ms {
        Some(format!("<break time=\"{}ms\"/>", gap_ms))
    } else {
        None
    }
}

/// セグメント列から SSML を生成
///
/// セグメントごとに `<mark>` を出力し、テキストをセグメント長に
/// `time_padding` を掛けた `<prosody duration>` で囲む。
/// セグメント間の無音区間には `<break>` を出力する。
///
/// # Errors
///
/// XML で表現できない文字を含む場合に [`ConvertError::Encoding`] を返す。
///
/// # Examples
///
/// ```
/// # use caption_convert::config::SsmlConfig;
/// # use caption_convert::ssml::write_ssml_segments;
/// # use caption_convert::types::{Segment, Timestamp};
/// let segments = vec![Segment::new(
///     1,
///     Timestamp::from_millis(0),
///     Timestamp::from_millis(2_500),
///     "Fish & chips",
/// )];
/// let ssml = write_ssml_segments(&segments, &SsmlConfig::default()).unwrap();
/// assert!(ssml.contains("<prosody duration=\"2.50s\">Fish &amp; chips</prosody>"));
/// ```
pub fn write_ssml_segments(segments: &[Segment], config: &SsmlConfig) -> Result<String, ConvertError> {
    let mut out = open_speak(config)?;
    let mut previous_end = Timestamp::ZERO;
    let mut counter = 0usize;

    for segment in segments {
        counter += 1;
        let location = Location::Segment(counter);
        let text = segment
            .lines()
            .map(|line| line.trim())
            .collect::<Vec<_>>()
            .join(" ");
        let text = escape_text(&text, location)?;

        if let Some(tag) = break_tag(config, segment.start.saturating_sub(previous_end)) {
            out.push_str(&tag);
            out.push('\n');
        }

        out.push_str(&format!("<mark name=\"segment-{}\"/>", counter));
        if config.prosody_duration {
            let seconds = segment.duration_ms() as f64 * config.time_padding / 1000.0;
            out.push_str(&format!("<prosody duration=\"{:.2}s\">{}</prosody>", seconds, text));
        } else {
            out.push_str(&text);
        }
        out.push('\n');

        previous_end = previous_end.max(segment.end);
    }

    close_speak(&mut out);
    Ok(out)
}

/// 文字起こし結果から単語単位のタイミング付き SSML を生成
///
/// タイムスタンプを持つ単語の前に `word-N-Tms` という名前の `<mark>` を出力し、
/// 直前の単語との間の無音区間には `<break>` を出力する。
/// タイムスタンプのない単語にはタイミング情報を付けない。
/// 単語トークンがない場合は全文テキストをそのまま出力する。
///
/// # Errors
///
/// XML で表現できない文字を含む場合に [`ConvertError::Encoding`] を返す。
pub fn write_ssml_transcript(
    transcript: &Transcript,
    config: &SsmlConfig,
    word_separator: &str,
) -> Result<String, ConvertError> {
    let mut out = open_speak(config)?;

    if transcript.tokens.is_empty() {
        let text = escape_text(transcript.text.trim(), Location::Document)?;
        if !text.is_empty() {
            out.push_str(&text);
            out.push('\n');
        }
        close_speak(&mut out);
        return Ok(out);
    }

    let separator = escape_text(word_separator, Location::Config)?;
    let mut body = String::new();
    let mut words = 0usize;
    let mut previous_end: Option<Timestamp> = None;

    for (i, token) in transcript.tokens.iter().enumerate() {
        let content = escape_text(&token.content, Location::Token(i))?;

        if token.is_punctuation() {
            body.push_str(&content);
            continue;
        }

        words += 1;
        if words > 1 {
            body.push_str(&separator);
        }

        if let Some((start, end)) = token.timing() {
            if let Some(prev) = previous_end {
                if let Some(tag) = break_tag(config, start.saturating_sub(prev)) {
                    body.push_str(&tag);
                }
            }
            body.push_str(&format!(
                "<mark name=\"word-{}-{}ms\"/>",
                words,
                start.as_millis()
            ));
            previous_end = Some(previous_end.map_or(end, |p| p.max(end)));
        }

        body.push_str(&content);
    }

    out.push_str(&body);
    out.push('\n');
    close_speak(&mut out);
    Ok(out)
}
