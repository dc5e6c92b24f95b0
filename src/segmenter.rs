use crate::config::SegmentationPolicy;
use crate::error::{ConvertError, Location};
use crate::types::{Segment, Timestamp, Transcript, WordToken};

/// 文末とみなす句読点
const SENTENCE_TERMINATORS: [char; 6] = ['.', '?', '!', '。', '？', '！'];

fn is_sentence_end(content: &str) -> bool {
    content
        .trim_end()
        .chars()
        .last()
        .is_some_and(|c| SENTENCE_TERMINATORS.contains(&c))
}

/// 0 は無効扱い
fn limit<T: Copy + PartialOrd + Default>(value: Option<T>) -> Option<T> {
    value.filter(|v| *v > T::default())
}

/// 組み立て中のセグメント
struct OpenSegment {
    first_token: usize,
    text: String,
    words: usize,
    start: Option<Timestamp>,
    end: Option<Timestamp>,
    sentence_closed: bool,
}

impl OpenSegment {
    fn new(first_token: usize, prefix: String) -> Self {
        Self {
            first_token,
            text: prefix,
            words: 0,
            start: None,
            end: None,
            sentence_closed: false,
        }
    }

    fn push_word(&mut self, token: &WordToken, separator: &str) {
        if self.words > 0 {
            self.text.push_str(separator);
        }
        self.text.push_str(&token.content);
        self.words += 1;
        self.sentence_closed = false;

        if let Some((start, end)) = token.timing() {
            if self.start.is_none() {
                self.start = Some(start);
            }
            self.end = Some(self.end.map_or(end, |e| e.max(end)));
        }
    }

    fn push_punctuation(&mut self, token: &WordToken) {
        self.text.push_str(&token.content);
        if is_sentence_end(&token.content) {
            self.sentence_closed = true;
        }
    }

    /// 次の単語を追加すると閾値を超えるか
    fn should_break_before(&self, token: &WordToken, policy: &SegmentationPolicy) -> bool {
        if self.words == 0 {
            return false;
        }
        if policy.sentence_boundary && self.sentence_closed {
            return true;
        }
        if let Some(max_words) = limit(policy.max_words) {
            if self.words + 1 > max_words {
                return true;
            }
        }
        if let Some(max_chars) = limit(policy.max_chars) {
            let chars = self.text.chars().count()
                + policy.word_separator.chars().count()
                + token.content.chars().count();
            if chars > max_chars {
                return true;
            }
        }
        if let Some(max_duration_ms) = limit(policy.max_duration_ms) {
            if let (Some(start), Some(end)) = (self.start, token.end) {
                if end.saturating_sub(start) > max_duration_ms {
                    return true;
                }
            }
        }
        false
    }

    /// タイムスタンプを持つ単語がない、または長さ 0 の場合は自身を返す
    fn finish(self, index: usize) -> Result<Segment, OpenSegment> {
        match (self.start, self.end) {
            (Some(start), Some(end)) if start < end => Ok(Segment::new(index, start, end, self.text)),
            _ => Err(self),
        }
    }

    /// 直前の（長さを持たない）セグメントを先頭に取り込む
    fn absorb(&mut self, earlier: OpenSegment, separator: &str) {
        self.text = format!("{}{}{}", earlier.text, separator, self.text);
        self.first_token = earlier.first_token;
        self.words += earlier.words;
        if let Some(start) = earlier.start {
            self.start = Some(self.start.map_or(start, |s| s.min(start)));
        }
        if let Some(end) = earlier.end {
            self.end = Some(self.end.map_or(end, |e| e.max(end)));
        }
    }

    fn into_error(self) -> ConvertError {
        let message = match (self.start, self.end) {
            (Some(start), Some(end)) => {
                format!("長さ 0 のセグメントになります: {} --> {}", start.srt(), end.srt())
            }
            _ => format!("タイムスタンプを持つ単語がないセグメントです: {:?}", self.text),
        };
        ConvertError::format(Location::Token(self.first_token), message)
    }
}

/// セグメントを確定する
///
/// 長さを持たないセグメントは直前のセグメントに連結する。
/// 直前がなければ保留し、次のセグメントの先頭に連結する。
fn close(
    mut segment: OpenSegment,
    segments: &mut Vec<Segment>,
    pending: &mut Option<OpenSegment>,
    separator: &str,
) {
    if let Some(earlier) = pending.take() {
        segment.absorb(earlier, separator);
    }
    let degenerate = match segment.finish(segments.len() + 1) {
        Ok(finished) => {
            segments.push(finished);
            return;
        }
        Err(degenerate) => degenerate,
    };

    match segments.last_mut() {
        Some(previous) => {
            log::warn!(
                "長さを持たないセグメントを直前のセグメント {} に連結しました: {:?}",
                previous.index,
                degenerate.text
            );
            previous.text.push_str(separator);
            previous.text.push_str(&degenerate.text);
            if let Some(end) = degenerate.end {
                previous.end = previous.end.max(end);
            }
        }
        None => *pending = Some(degenerate),
    }
}

/// 単語トークン列を字幕セグメントにまとめる
///
/// 句読点は直前の単語に区切り文字なしで連結し、単独のセグメントにはしない。
/// 発話トークンを追加すると閾値を超える場合、または文末の句読点の後
/// （`sentence_boundary` 有効時）に新しいセグメントを開始する。
///
/// タイムスタンプを持つ単語がない、または長さ 0 のセグメントは
/// 隣接するセグメントに連結する。
///
/// # Errors
///
/// 単語はあるが長さを持つセグメントを1つも作れない場合に
/// [`ConvertError::Format`] を返す。
///
/// # Examples
///
/// ```
/// # use caption_convert::config::SegmentationPolicy;
/// # use caption_convert::segmenter::segment_transcript;
/// # use caption_convert::transcript::parse_transcript;
/// let json = r#"{"results": {"items": [
///     {"start_time": "0.0", "end_time": "0.4", "type": "pronunciation",
///      "alternatives": [{"content": "Hello"}]},
///     {"type": "punctuation", "alternatives": [{"content": ","}]},
///     {"start_time": "0.5", "end_time": "0.9", "type": "pronunciation",
///      "alternatives": [{"content": "world"}]},
///     {"type": "punctuation", "alternatives": [{"content": "."}]}
/// ]}}"#;
/// let transcript = parse_transcript(json).unwrap();
/// let segments = segment_transcript(&transcript, &SegmentationPolicy::default()).unwrap();
/// assert_eq!(segments[0].text, "Hello, world.");
/// ```
pub fn segment_transcript(
    transcript: &Transcript,
    policy: &SegmentationPolicy,
) -> Result<Vec<Segment>, ConvertError> {
    let mut segments = Vec::new();
    let mut open: Option<OpenSegment> = None;
    let mut pending: Option<OpenSegment> = None;
    // 最初の単語より前に現れた句読点
    let mut leading = String::new();

    for (i, token) in transcript.tokens.iter().enumerate() {
        if token.is_punctuation() {
            match open.as_mut() {
                Some(segment) => segment.push_punctuation(token),
                None => leading.push_str(&token.content),
            }
            continue;
        }

        if let Some(segment) = open.take() {
            if segment.should_break_before(token, policy) {
                close(segment, &mut segments, &mut pending, &policy.word_separator);
            } else {
                open = Some(segment);
            }
        }

        open.get_or_insert_with(|| OpenSegment::new(i, std::mem::take(&mut leading)))
            .push_word(token, &policy.word_separator);
    }

    if let Some(segment) = open {
        close(segment, &mut segments, &mut pending, &policy.word_separator);
    } else if !leading.is_empty() {
        log::warn!("単語を含まない句読点を無視しました: {:?}", leading);
    }

    if let Some(degenerate) = pending {
        return Err(degenerate.into_error());
    }

    log::debug!(
        "セグメント分割完了: {} 単語 → {} セグメント",
        transcript.word_count(),
        segments.len()
    );
    Ok(segments)
}
