use crate::config::VttConfig;
use crate::types::Segment;

/// キューテキストを WebVTT の構文と衝突しないようにエスケープ
///
/// `<` と `>` を実体参照にするため、`-->` がそのまま出力されることはない。
pub fn escape_cue_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// セグメント列を WebVTT テキストに書き出し
///
/// `WEBVTT` ヘッダと空行の後に、セグメントごとに1つのキューを出力する。
/// キュー識別子は `cue_identifiers` 有効時のみ、呼び出しごとの連番で付ける。
///
/// # Examples
///
/// ```
/// # use caption_convert::config::VttConfig;
/// # use caption_convert::types::{Segment, Timestamp};
/// # use caption_convert::vtt::write_vtt;
/// let segments = vec![Segment::new(
///     1,
///     Timestamp::from_millis(1_000),
///     Timestamp::from_millis(3_500),
///     "Hello world",
/// )];
/// assert_eq!(
///     write_vtt(&segments, &VttConfig::default()),
///     "WEBVTT\n\n00:00:01.000 --> 00:00:03.500\nHello world\n\n"
/// );
/// ```
pub fn write_vtt(segments: &[Segment], config: &VttConfig) -> String {
    let mut out = String::from("WEBVTT\n\n");
    let cue_settings = config.cue_settings.trim();
    let mut counter = 0usize;

    for segment in segments {
        counter += 1;
        if config.cue_identifiers {
            out.push_str(&format!("{}\n", counter));
        }

        out.push_str(&format!("{} --> {}", segment.start.vtt(), segment.end.vtt()));
        if !cue_settings.is_empty() {
            out.push(' ');
            out.push_str(cue_settings);
        }
        out.push('\n');

        for line in segment.lines() {
            out.push_str(&escape_cue_text(line));
            out.push('\n');
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;

    fn seg(start: u64, end: u64, text: &str) -> Segment {
        Segment::new(
            1,
            Timestamp::from_millis(start),
            Timestamp::from_millis(end),
            text,
        )
    }

    #[test]
    fn test_write_vtt_basic() {
        let segments = vec![seg(1000, 3500, "Hello world")];
        assert_eq!(
            write_vtt(&segments, &VttConfig::default()),
            "WEBVTT\n\n00:00:01.000 --> 00:00:03.500\nHello world\n\n"
        );
    }

    #[test]
    fn test_write_vtt_empty() {
        assert_eq!(write_vtt(&[], &VttConfig::default()), "WEBVTT\n\n");
    }

    #[test]
    fn test_write_vtt_hour_timecode() {
        let segments = vec![seg(5_025_678, 5_026_000, "x")];
        let vtt = write_vtt(&segments, &VttConfig::default());
        assert!(vtt.contains("01:23:45.678 --> 01:23:46.000\n"));
    }

    #[test]
    fn test_write_vtt_cue_identifiers_and_settings() {
        let config = VttConfig {
            cue_settings: "align:middle line:90%".to_string(),
            cue_identifiers: true,
        };
        let segments = vec![seg(0, 1000, "a"), seg(1000, 2000, "b")];
        assert_eq!(
            write_vtt(&segments, &config),
            "WEBVTT\n\n1\n00:00:00.000 --> 00:00:01.000 align:middle line:90%\na\n\n\
             2\n00:00:01.000 --> 00:00:02.000 align:middle line:90%\nb\n\n"
        );
    }

    #[test]
    fn test_write_vtt_neutralises_cue_syntax() {
        let segments = vec![seg(0, 1000, "--> not a timing line\nA & B <i>")];
        let vtt = write_vtt(&segments, &VttConfig::default());
        assert!(vtt.contains("--&gt; not a timing line\n"));
        assert!(vtt.contains("A &amp; B &lt;i&gt;\n"));
        // ヘッダ以外で "-->" を含むのはタイムコード行のみ
        assert_eq!(vtt.matches("-->").count(), 1);
    }

    #[test]
    fn test_write_vtt_drops_blank_lines() {
        let segments = vec![seg(0, 1000, "one\n\ntwo")];
        assert_eq!(
            write_vtt(&segments, &VttConfig::default()),
            "WEBVTT\n\n00:00:00.000 --> 00:00:01.000\none\ntwo\n\n"
        );
    }
}
