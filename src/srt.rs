use crate::error::{ConvertError, Location};
use crate::types::{is_blank_line, Segment, Timestamp};
use regex_lite::Regex;
use std::sync::OnceLock;

/// `HH:MM:SS,mmm`（区切りはピリオドも許容）
fn timecode_regex() -> &'static Regex {
    static TIMECODE_REGEX: OnceLock<Regex> = OnceLock::new();
    TIMECODE_REGEX.get_or_init(|| {
        Regex::new(r"^(\d+):(\d{2}):(\d{2})[,.](\d{3})$").expect("Failed to compile timecode regex")
    })
}

/// タイムコード文字列をパース
///
/// 分・秒が 60 以上の場合は None を返す。
///
/// # Examples
///
/// ```
/// # use caption_convert::srt::parse_timecode;
/// # use caption_convert::types::Timestamp;
/// assert_eq!(parse_timecode("00:00:03,500"), Some(Timestamp::from_millis(3_500)));
/// assert_eq!(parse_timecode("00:61:00,000"), None);
/// ```
pub fn parse_timecode(timecode: &str) -> Option<Timestamp> {
    let caps = timecode_regex().captures(timecode.trim())?;
    let field = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u64>().ok());

    let hours = field(1)?;
    let minutes = field(2)?;
    let seconds = field(3)?;
    let millis = field(4)?;
    if minutes >= 60 || seconds >= 60 {
        return None;
    }
    Timestamp::from_parts(hours, minutes, seconds, millis)
}

/// タイムコード行 `start --> end [座標など]` をパース
fn parse_timecode_line(line: &str) -> Result<(Timestamp, Timestamp), String> {
    let (start, rest) = line
        .split_once("-->")
        .ok_or_else(|| format!("タイムコード行に \"-->\" がありません: {:?}", line))?;

    // 終了タイムコードの後ろ（SRT の座標指定など）は無視する
    let end = rest
        .split_whitespace()
        .next()
        .ok_or_else(|| format!("終了タイムコードがありません: {:?}", line))?;

    let start_ts = parse_timecode(start)
        .ok_or_else(|| format!("開始タイムコードが不正です: {:?}", start.trim()))?;
    let end_ts =
        parse_timecode(end).ok_or_else(|| format!("終了タイムコードが不正です: {:?}", end))?;
    Ok((start_ts, end_ts))
}

/// SRT テキストをセグメント列にパース
///
/// ブロックは「インデックス行・タイムコード行・テキスト行・空行」で構成される。
/// 出力のインデックスは入力順に 1 から振り直す。
///
/// # Errors
///
/// タイムコード行がない・不正な場合、または開始 >= 終了の場合に
/// ブロック番号と行番号を含む [`ConvertError::Format`] を返す。
///
/// # Examples
///
/// ```
/// # use caption_convert::srt::parse_srt;
/// let segments = parse_srt("1\n00:00:01,000 --> 00:00:03,500\nHello world\n\n").unwrap();
/// assert_eq!(segments.len(), 1);
/// assert_eq!(segments[0].text, "Hello world");
/// ```
pub fn parse_srt(input: &str) -> Result<Vec<Segment>, ConvertError> {
    let input = input.strip_prefix('\u{FEFF}').unwrap_or(input);
    let mut lines = input
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
        .peekable();

    let mut segments: Vec<Segment> = Vec::new();
    let mut block = 0;

    loop {
        // ブロック間の空行をスキップ
        while let Some(&(_, line)) = lines.peek() {
            if !is_blank_line(line) {
                break;
            }
            lines.next();
        }

        let Some((header_line_no, header)) = lines.next() else {
            break;
        };
        block += 1;
        let location = Location::Block {
            block,
            line: header_line_no,
        };
        let header = header.trim();

        // インデックス行が省略されている場合は先頭行をタイムコード行とみなす
        let (source_index, timecode_line) = if header.contains("-->") {
            (None, header)
        } else if let Ok(index) = header.parse::<u64>() {
            match lines.peek() {
                Some(&(_, line)) if !is_blank_line(line) => {
                    lines.next();
                    (Some(index), line.trim())
                }
                _ => {
                    return Err(ConvertError::format(location, "タイムコード行がありません"));
                }
            }
        } else {
            return Err(ConvertError::format(
                location,
                format!("インデックス行が不正です: {:?}", header),
            ));
        };

        let (start, end) =
            parse_timecode_line(timecode_line).map_err(|msg| ConvertError::format(location, msg))?;
        if start >= end {
            return Err(ConvertError::format(
                location,
                format!("開始時刻が終了時刻以降です: {} --> {}", start.srt(), end.srt()),
            ));
        }

        let mut text_lines: Vec<&str> = Vec::new();
        while let Some(&(_, line)) = lines.peek() {
            if is_blank_line(line) {
                break;
            }
            text_lines.push(line);
            lines.next();
        }

        let index = segments.len() + 1;
        if let Some(source_index) = source_index {
            if source_index != index as u64 {
                log::debug!(
                    "SRTインデックスを振り直します: {} -> {} (ブロック {})",
                    source_index,
                    index,
                    block
                );
            }
        }

        segments.push(Segment::new(index, start, end, text_lines.join("\n")));
    }

    log::debug!("SRTパース完了: {} セグメント", segments.len());
    Ok(segments)
}

/// セグメント列を SRT テキストに書き出し
///
/// インデックスは呼び出しごとに 1 から振り直す。
/// 空白のみの行はブロックを途中で終端させてしまうため出力しない。
///
/// # Examples
///
/// ```
/// # use caption_convert::srt::write_srt;
/// # use caption_convert::types::{Segment, Timestamp};
/// let segments = vec![Segment::new(
///     7,
///     Timestamp::from_millis(1_000),
///     Timestamp::from_millis(3_500),
///     "Hello world",
/// )];
/// assert_eq!(write_srt(&segments), "1\n00:00:01,000 --> 00:00:03,500\nHello world\n\n");
/// ```
pub fn write_srt(segments: &[Segment]) -> String {
    let mut out = String::new();
    let mut counter = 0usize;

    for segment in segments {
        counter += 1;
        out.push_str(&format!("{}\n", counter));
        out.push_str(&format!("{} --> {}\n", segment.start.srt(), segment.end.srt()));
        for line in segment.lines() {
            out.push_str(line);
            out.push('\n');
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(index: usize, start: u64, end: u64, text: &str) -> Segment {
        Segment::new(
            index,
            Timestamp::from_millis(start),
            Timestamp::from_millis(end),
            text,
        )
    }

    #[test]
    fn test_parse_srt_basic() {
        let srt_data = "1
00:00:01,000 --> 00:00:04,000
Hello, world!

2
00:00:05,000 --> 00:00:07,000
This is a subtitle.

3
00:00:08,000 --> 00:00:10,000
Third subtitle line 1.
Third subtitle line 2.
";
        let segments = parse_srt(srt_data).unwrap();
        assert_eq!(segments.len(), 3);

        assert_eq!(segments[0], seg(1, 1000, 4000, "Hello, world!"));
        assert_eq!(segments[1], seg(2, 5000, 7000, "This is a subtitle."));
        assert_eq!(
            segments[2].text,
            "Third subtitle line 1.\nThird subtitle line 2."
        );
    }

    #[test]
    fn test_parse_srt_crlf_bom_and_trailing_blank_lines() {
        let srt_data = "\u{FEFF}1\r\n00:00:01,000 --> 00:00:02,000\r\nfirst\r\n\r\n\r\n\r\n2\r\n00:00:03,000 --> 00:00:04,000\r\nsecond\r\n\r\n\r\n";
        let segments = parse_srt(srt_data).unwrap();
        assert_eq!(segments, vec![seg(1, 1000, 2000, "first"), seg(2, 3000, 4000, "second")]);
    }

    #[test]
    fn test_parse_srt_renumbers_indices() {
        let srt_data = "5\n00:00:01,000 --> 00:00:02,000\na\n\n9\n00:00:03,000 --> 00:00:04,000\nb\n";
        let segments = parse_srt(srt_data).unwrap();
        assert_eq!(segments[0].index, 1);
        assert_eq!(segments[1].index, 2);
    }

    #[test]
    fn test_parse_srt_keeps_overlaps() {
        let srt_data = "1\n00:00:01,000 --> 00:00:05,000\na\n\n2\n00:00:02,000 --> 00:00:03,000\nb\n";
        let segments = parse_srt(srt_data).unwrap();
        assert_eq!(segments[1].start, Timestamp::from_millis(2000));
        assert_eq!(segments[1].end, Timestamp::from_millis(3000));
    }

    #[test]
    fn test_parse_srt_missing_index_and_coordinates() {
        let srt_data = "00:00:01.000 --> 00:00:04.000 X1:40 X2:600 Y1:20 Y2:50\nHello world\n";
        let segments = parse_srt(srt_data).unwrap();
        assert_eq!(segments, vec![seg(1, 1000, 4000, "Hello world")]);
    }

    #[test]
    fn test_parse_srt_missing_arrow() {
        let srt_data = "1\n00:00:01,000 --> 00:00:02,000\nok\n\n2\n00:00:03,000 00:00:04,000\nHello world\n";
        let err = parse_srt(srt_data).unwrap_err();
        match err {
            ConvertError::Format { location, message } => {
                assert_eq!(location, Location::Block { block: 2, line: 5 });
                assert!(message.contains("-->"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_parse_srt_missing_timecode_line() {
        let err = parse_srt("1\nHello world\n").unwrap_err();
        assert!(matches!(err, ConvertError::Format { .. }));

        let err = parse_srt("1\n\n00:00:01,000 --> 00:00:02,000\nx\n").unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Format {
                location: Location::Block { block: 1, line: 1 },
                ..
            }
        ));
    }

    #[test]
    fn test_parse_srt_invalid_header() {
        let err = parse_srt("This is not a valid SRT format at all").unwrap_err();
        assert!(matches!(err, ConvertError::Format { .. }));
    }

    #[test]
    fn test_parse_srt_start_not_before_end() {
        let err = parse_srt("1\n00:00:04,000 --> 00:00:04,000\nx\n").unwrap_err();
        assert!(matches!(err, ConvertError::Format { .. }));

        let err = parse_srt("1\n00:00:05,000 --> 00:00:04,000\nx\n").unwrap_err();
        assert!(matches!(err, ConvertError::Format { .. }));
    }

    #[test]
    fn test_parse_srt_malformed_time_values() {
        assert!(parse_srt("1\n25:99:99,999 --> 26:00:00,000\nx\n").is_err());
        assert!(parse_srt("1\n00:00:01,000 -->\nx\n").is_err());
        assert!(parse_srt("1\n00:00:01 --> 00:00:02\nx\n").is_err());
    }

    #[test]
    fn test_parse_srt_huge_hours_rejected() {
        let err = parse_srt("1\n9999999999999999:00:00,000 --> 9999999999999999:00:01,000\nx\n").unwrap_err();
        assert_eq!(err.location(), Some(Location::Block { block: 1, line: 1 }));
        assert_eq!(parse_timecode("9999999999999999:00:00,000"), None);
    }

    #[test]
    fn test_parse_srt_empty_input() {
        assert!(parse_srt("").unwrap().is_empty());
        assert!(parse_srt("\n\n  \n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_srt_empty_text() {
        let srt_data = "1\n00:00:01,000 --> 00:00:04,000\n\n2\n00:00:05,000 --> 00:00:08,000\nNext subtitle";
        let segments = parse_srt(srt_data).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "");
        assert_eq!(segments[1].text, "Next subtitle");
    }

    #[test]
    fn test_write_srt_renumbers() {
        let segments = vec![seg(10, 0, 1500, "one"), seg(3, 1500, 3000, "two\nlines")];
        let srt = write_srt(&segments);
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:01,500\none\n\n2\n00:00:01,500 --> 00:00:03,000\ntwo\nlines\n\n"
        );
    }

    #[test]
    fn test_write_srt_drops_blank_text_lines() {
        let segments = vec![seg(1, 0, 1000, "one\n\ntwo")];
        assert_eq!(write_srt(&segments), "1\n00:00:00,000 --> 00:00:01,000\none\ntwo\n\n");
    }

    #[test]
    fn test_srt_round_trip() {
        let segments = vec![
            seg(1, 0, 999, "zero"),
            seg(2, 500, 2_000, "overlapping\nsecond line"),
            seg(3, 3_723_004, 3_725_678, "an hour in, with --> arrow text"),
            seg(4, 4_000_000, 4_000_001, "1"),
            seg(5, 4_000_001, 4_000_500, "\u{a0}"),
        ];
        let parsed = parse_srt(&write_srt(&segments)).unwrap();
        assert_eq!(parsed, segments);
    }

    #[test]
    fn test_round_trip_normalises_indices() {
        let segments = vec![seg(42, 0, 1000, "a"), seg(7, 1000, 2000, "b")];
        let parsed = parse_srt(&write_srt(&segments)).unwrap();
        let indices: Vec<usize> = parsed.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(parsed[0].text, "a");
        assert_eq!(parsed[1].end, Timestamp::from_millis(2000));
    }
}
