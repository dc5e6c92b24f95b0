use crate::config::Config;
use crate::error::{ConvertError, Location};
use crate::segmenter::segment_transcript;
use crate::srt::{parse_srt, write_srt};
use crate::ssml::{write_ssml_segments, write_ssml_transcript};
use crate::transcript::parse_transcript;
use crate::vtt::write_vtt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// 変換の種類
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Conversion {
    /// 文字起こし JSON → SRT
    SrtFromTranscript,
    /// 文字起こし JSON → WebVTT
    VttFromTranscript,
    /// 文字起こし JSON → SSML（単語単位のタイミング）
    SsmlFromTranscript,
    /// SRT → SSML
    SsmlFromSrt,
    /// SRT → WebVTT
    VttFromSrt,
}

impl Conversion {
    pub fn name(&self) -> &'static str {
        match self {
            Conversion::SrtFromTranscript => "srt-from-transcript",
            Conversion::VttFromTranscript => "vtt-from-transcript",
            Conversion::SsmlFromTranscript => "ssml-from-transcript",
            Conversion::SsmlFromSrt => "ssml-from-srt",
            Conversion::VttFromSrt => "vtt-from-srt",
        }
    }

    /// 出力ファイルの拡張子
    pub fn output_extension(&self) -> &'static str {
        match self {
            Conversion::SrtFromTranscript => "srt",
            Conversion::VttFromTranscript | Conversion::VttFromSrt => "vtt",
            Conversion::SsmlFromTranscript | Conversion::SsmlFromSrt => "ssml",
        }
    }

    /// 入力テキストを変換して出力テキストを返す
    ///
    /// ファイル入出力を伴わない純粋な変換。
    ///
    /// # Examples
    ///
    /// ```
    /// # use caption_convert::config::Config;
    /// # use caption_convert::converter::Conversion;
    /// let vtt = Conversion::VttFromSrt
    ///     .convert("1\n00:00:01,000 --> 00:00:03,500\nHello world\n\n", &Config::default())
    ///     .unwrap();
    /// assert_eq!(vtt, "WEBVTT\n\n00:00:01.000 --> 00:00:03.500\nHello world\n\n");
    /// ```
    pub fn convert(&self, input: &str, config: &Config) -> Result<String, ConvertError> {
        match self {
            Conversion::SrtFromTranscript => {
                let transcript = parse_transcript(input)?;
                let segments = segment_transcript(&transcript, &config.segmentation)?;
                log::info!("{} セグメントを SRT に書き出します", segments.len());
                Ok(write_srt(&segments))
            }
            Conversion::VttFromTranscript => {
                let transcript = parse_transcript(input)?;
                let segments = segment_transcript(&transcript, &config.segmentation)?;
                log::info!("{} セグメントを WebVTT に書き出します", segments.len());
                Ok(write_vtt(&segments, &config.vtt))
            }
            Conversion::SsmlFromTranscript => {
                let transcript = parse_transcript(input)?;
                log::info!("{} 単語を SSML に書き出します", transcript.word_count());
                write_ssml_transcript(&transcript, &config.ssml, &config.segmentation.word_separator)
            }
            Conversion::SsmlFromSrt => {
                let segments = parse_srt(input)?;
                log::info!("{} セグメントを SSML に書き出します", segments.len());
                write_ssml_segments(&segments, &config.ssml)
            }
            Conversion::VttFromSrt => {
                let segments = parse_srt(input)?;
                log::info!("{} セグメントを WebVTT に書き出します", segments.len());
                Ok(write_vtt(&segments, &config.vtt))
            }
        }
    }
}

/// 変換ジョブ（入力ファイル1つと出力ファイル1つの組）
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvertJob {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
}

impl ConvertJob {
    pub fn new(input_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
        }
    }

    /// 出力ディレクトリに「入力ファイル名 + 変換先の拡張子」で出力するジョブ
    ///
    /// ```
    /// # use caption_convert::converter::{Conversion, ConvertJob};
    /// # use std::path::Path;
    /// let job = ConvertJob::in_dir("in/talk.json", "out", Conversion::SrtFromTranscript);
    /// assert_eq!(job.output_path, Path::new("out/talk.srt"));
    /// ```
    pub fn in_dir(input_path: impl Into<PathBuf>, output_dir: impl AsRef<Path>, conversion: Conversion) -> Self {
        let input_path = input_path.into();
        let mut file_name = input_path
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_else(|| "output".into());
        file_name.push(".");
        file_name.push(conversion.output_extension());
        let output_path = output_dir.as_ref().join(file_name);
        Self {
            input_path,
            output_path,
        }
    }
}

/// 入力ファイルを UTF-8 テキストとして読み込み
pub fn read_input(path: &Path) -> Result<String, ConvertError> {
    let bytes = fs::read(path).map_err(|e| ConvertError::io(path, e))?;
    String::from_utf8(bytes).map_err(|e| {
        let valid = &e.as_bytes()[..e.utf8_error().valid_up_to()];
        let line = valid.iter().filter(|&&b| b == b'\n').count() + 1;
        ConvertError::encoding(
            Location::Line(line),
            format!("入力ファイルが UTF-8 ではありません: {:?}", path),
        )
    })
}

/// 出力ファイルを一時ファイル経由で書き込み
///
/// 同じディレクトリの一時ファイルに全内容を書いてから置き換えるため、
/// 失敗しても書きかけのファイルは残らない。
pub fn write_output(path: &Path, content: &str) -> Result<(), ConvertError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(|e| ConvertError::io(dir, e))?;
    if let Err(e) = temp.write_all(content.as_bytes()).and_then(|_| temp.flush()) {
        return Err(ConvertError::io(temp.path(), e));
    }
    temp.persist(path)
        .map_err(|e| ConvertError::io(path, e.error))?;
    Ok(())
}

/// ジョブを1件実行
///
/// 読み込み → 変換 → 書き込みの順に処理し、いずれかで失敗した場合は
/// 出力ファイルを作成せずにエラーを返す。
pub fn run_job(conversion: Conversion, job: &ConvertJob, config: &Config) -> Result<(), ConvertError> {
    log::info!("==> {}: {:?}", conversion.name(), job.input_path);

    let input = read_input(&job.input_path)?;
    log::debug!("読み込み完了: {} バイト", input.len());

    let output = conversion.convert(&input, config)?;

    write_output(&job.output_path, &output)?;
    log::info!("書き込み完了: {:?} ({} バイト)", job.output_path, output.len());
    Ok(())
}

/// 複数ジョブの実行結果
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, ConvertError)>,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// 複数ジョブを順番に実行
///
/// 各ファイルは独立して変換され、1件の失敗は他のファイルの処理に影響しない。
pub fn run_batch(conversion: Conversion, jobs: &[ConvertJob], config: &Config) -> BatchReport {
    let mut report = BatchReport::default();

    for job in jobs {
        match run_job(conversion, job, config) {
            Ok(()) => report.succeeded.push(job.output_path.clone()),
            Err(e) => {
                log::error!("{:?} の変換に失敗: {}", job.input_path, e);
                report.failed.push((job.input_path.clone(), e));
            }
        }
    }

    log::info!(
        "処理完了: 成功 {} 件, 失敗 {} 件",
        report.succeeded.len(),
        report.failed.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TRANSCRIPT_JSON: &str = r#"{
        "jobName": "demo",
        "status": "COMPLETED",
        "results": {
            "transcripts": [{"transcript": "Hello, world. Bye."}],
            "items": [
                {"start_time": "0.5", "end_time": "0.9", "type": "pronunciation",
                 "alternatives": [{"confidence": "0.99", "content": "Hello"}]},
                {"type": "punctuation", "alternatives": [{"confidence": "0.0", "content": ","}]},
                {"start_time": "1.0", "end_time": "1.5", "type": "pronunciation",
                 "alternatives": [{"confidence": "0.98", "content": "world"}]},
                {"type": "punctuation", "alternatives": [{"confidence": "0.0", "content": "."}]},
                {"start_time": "2.0", "end_time": "2.25", "type": "pronunciation",
                 "alternatives": [{"content": "Bye"}]},
                {"type": "punctuation", "alternatives": [{"content": "."}]}
            ]
        }
    }"#;

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .collect();
        files.sort();
        files
    }

    #[test]
    fn test_srt_to_vtt_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("in.srt");
        let output = temp_dir.path().join("out.vtt");
        fs::write(&input, "1\n00:00:01,000 --> 00:00:03,500\nHello world\n\n").unwrap();

        run_job(Conversion::VttFromSrt, &ConvertJob::new(&input, &output), &Config::default()).unwrap();

        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "WEBVTT\n\n00:00:01.000 --> 00:00:03.500\nHello world\n\n"
        );
    }

    #[test]
    fn test_transcript_to_srt() {
        let srt = Conversion::SrtFromTranscript
            .convert(TRANSCRIPT_JSON, &Config::default())
            .unwrap();
        assert_eq!(srt, "1\n00:00:00,500 --> 00:00:02,250\nHello, world. Bye.\n\n");
    }

    #[test]
    fn test_transcript_to_vtt_with_sentence_boundary() {
        let mut config = Config::default();
        config.segmentation.sentence_boundary = true;
        let vtt = Conversion::VttFromTranscript.convert(TRANSCRIPT_JSON, &config).unwrap();
        assert_eq!(
            vtt,
            "WEBVTT\n\n00:00:00.500 --> 00:00:01.500\nHello, world.\n\n\
             00:00:02.000 --> 00:00:02.250\nBye.\n\n"
        );
    }

    #[test]
    fn test_transcript_to_ssml() {
        let ssml = Conversion::SsmlFromTranscript
            .convert(TRANSCRIPT_JSON, &Config::default())
            .unwrap();
        assert!(ssml.starts_with("<?xml"));
        assert!(ssml.contains("<mark name=\"word-1-500ms\"/>Hello,"));
        assert!(ssml.contains("<break time=\"500ms\"/><mark name=\"word-3-2000ms\"/>Bye."));
    }

    #[test]
    fn test_srt_to_ssml() {
        let ssml = Conversion::SsmlFromSrt
            .convert("1\n00:00:00,000 --> 00:00:02,000\nA <b> & C\n", &Config::default())
            .unwrap();
        assert!(ssml.contains("<prosody duration=\"2.00s\">A &lt;b&gt; &amp; C</prosody>"));
    }

    #[test]
    fn test_malformed_srt_leaves_no_output() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("bad.srt");
        let output = temp_dir.path().join("bad.vtt");
        fs::write(&input, "1\n00:00:01,000 00:00:03,500\nHello world\n").unwrap();

        let err = run_job(Conversion::VttFromSrt, &ConvertJob::new(&input, &output), &Config::default())
            .unwrap_err();

        assert_eq!(err.location(), Some(Location::Block { block: 1, line: 1 }));
        assert!(!output.exists());
        // 一時ファイルも残らない
        assert_eq!(files_in(temp_dir.path()), vec![input]);
    }

    #[test]
    fn test_existing_output_is_replaced() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("in.srt");
        let output = temp_dir.path().join("out.vtt");
        fs::write(&input, "1\n00:00:01,000 --> 00:00:02,000\nnew\n").unwrap();
        fs::write(&output, "old content that is longer than the new one").unwrap();

        run_job(Conversion::VttFromSrt, &ConvertJob::new(&input, &output), &Config::default()).unwrap();
        assert_eq!(
            fs::read_to_string(&output).unwrap(),
            "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nnew\n\n"
        );
    }

    #[test]
    fn test_missing_input_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let job = ConvertJob::new(temp_dir.path().join("missing.srt"), temp_dir.path().join("out.vtt"));
        let err = run_job(Conversion::VttFromSrt, &job, &Config::default()).unwrap_err();
        assert!(matches!(err, ConvertError::Io { .. }));
    }

    #[test]
    fn test_non_utf8_input_is_encoding_error() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("latin1.srt");
        fs::write(&input, b"1\n00:00:01,000 --> 00:00:02,000\ncaf\xe9\n").unwrap();

        let err = read_input(&input).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Encoding {
                location: Location::Line(3),
                ..
            }
        ));
    }

    #[test]
    fn test_unwritable_output_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let input = temp_dir.path().join("in.srt");
        fs::write(&input, "1\n00:00:01,000 --> 00:00:02,000\nx\n").unwrap();
        let job = ConvertJob::new(&input, temp_dir.path().join("no_such_dir").join("out.vtt"));

        let err = run_job(Conversion::VttFromSrt, &job, &Config::default()).unwrap_err();
        assert!(matches!(err, ConvertError::Io { .. }));
    }

    #[test]
    fn test_batch_isolates_failures() {
        let temp_dir = TempDir::new().unwrap();
        let out_dir = temp_dir.path().join("out");
        fs::create_dir(&out_dir).unwrap();

        let good = temp_dir.path().join("good.json");
        let bad = temp_dir.path().join("bad.json");
        let also_good = temp_dir.path().join("also_good.json");
        fs::write(&good, TRANSCRIPT_JSON).unwrap();
        fs::write(&bad, r#"{"results": {}}"#).unwrap();
        fs::write(&also_good, TRANSCRIPT_JSON).unwrap();

        let jobs: Vec<ConvertJob> = [&good, &bad, &also_good]
            .iter()
            .map(|p| ConvertJob::in_dir(p.as_path(), &out_dir, Conversion::SrtFromTranscript))
            .collect();
        let report = run_batch(Conversion::SrtFromTranscript, &jobs, &Config::default());

        assert!(!report.is_success());
        assert_eq!(report.succeeded.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, bad);
        assert_eq!(
            files_in(&out_dir),
            vec![out_dir.join("also_good.srt"), out_dir.join("good.srt")]
        );
    }

    #[test]
    fn test_output_extension() {
        assert_eq!(Conversion::SrtFromTranscript.output_extension(), "srt");
        assert_eq!(Conversion::VttFromSrt.output_extension(), "vtt");
        assert_eq!(Conversion::SsmlFromSrt.output_extension(), "ssml");
    }
}
