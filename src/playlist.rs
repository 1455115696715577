use std::io::Read;
use std::path::{Path, PathBuf};

use m3u8_rs::{parse_playlist_res, Playlist};

use crate::config::AnalyzerConfig;
use crate::error::{DumpError, Result};
use crate::format::ps::analyze_program_stream;
use crate::format::report::{Diagnostic, Location, Report};
use crate::format::timeline::Timeline;
use crate::format::InputFormat;
use crate::format::ts::{analyze_program_streams, analyze_segment, DemuxState};
use crate::utils::ByteSource;

const SIGNATURE: &str = "#EXTM3U";

/// Everything an analysis run produced.
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub report: Report,
    pub timeline: Timeline,
}

/// Lists the segment paths of a media playlist, resolved against `base`.
pub fn parse_playlist(content: &[u8], base: &Path) -> Result<Vec<PathBuf>> {
    if !content.starts_with(SIGNATURE.as_bytes()) {
        return Err(DumpError::Playlist("not an m3u8 file".to_string()));
    }

    match parse_playlist_res(content) {
        Ok(Playlist::MediaPlaylist(playlist)) => Ok(playlist
            .segments
            .iter()
            .map(|segment| base.join(&segment.uri))
            .collect()),
        Ok(Playlist::MasterPlaylist(_)) => Err(DumpError::Playlist(
            "master playlists are not supported, pass a media playlist".to_string(),
        )),
        Err(e) => Err(DumpError::Playlist(format!("failed to parse playlist: {}", e))),
    }
}

/// Analyzes every segment of an HLS playlist as one logical transport stream.
///
/// A segment that cannot be read or is not a transport stream is reported
/// and skipped; the demux state carries over to the next segment either way.
pub async fn analyze_playlist<P: AsRef<Path>>(
    path: P,
    config: &AnalyzerConfig,
) -> Result<Analysis> {
    let path = path.as_ref();
    let content = tokio::fs::read(path).await?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let segments = parse_playlist(&content, base)?;

    let mut state = DemuxState::new();
    let mut report = Report::new();

    for segment in &segments {
        log::info!("Analyzing segment file '{}'...", segment.display());
        let outcome = match tokio::fs::read(segment).await {
            Ok(data) => analyze_segment_bytes(&data, &mut state, config, &mut report),
            Err(e) => Err(DumpError::MalformedSegment(format!(
                "cannot read {}: {}",
                segment.display(),
                e
            ))),
        };

        match outcome {
            Ok(()) => {}
            Err(DumpError::MalformedSegment(reason)) => {
                report_segment_failure(&segment.display().to_string(), &reason, &mut report);
            }
            Err(e) => return Err(e),
        }

        analyze_program_streams(&mut state, config, &mut report)?;
    }

    Ok(Analysis {
        timeline: state.timeline(),
        report,
    })
}

/// Analyzes a single TS or PS input, detected from its first byte.
///
/// A transport stream that loses sync is reported and the units buffered up
/// to that point are still reassembled.
pub fn analyze_input<R: Read>(
    name: &str,
    source: &mut ByteSource<R>,
    config: &AnalyzerConfig,
) -> Result<Analysis> {
    let mut report = Report::new();
    let format = InputFormat::detect(source.peek(1)?);
    log::info!("Analyzing '{}' as {:?}", name, format);

    let timeline = match format {
        InputFormat::TransportStream => {
            let mut state = DemuxState::new();
            match analyze_segment(source, &mut state, config, &mut report) {
                Ok(()) => {}
                Err(DumpError::MalformedSegment(reason)) => {
                    report_segment_failure(name, &reason, &mut report);
                }
                Err(e) => return Err(e),
            }
            analyze_program_streams(&mut state, config, &mut report)?;
            state.timeline()
        }
        InputFormat::ProgramStream => {
            analyze_program_stream(source, config, &mut report)?;
            Timeline::new()
        }
    };

    Ok(Analysis { report, timeline })
}

fn report_segment_failure(name: &str, reason: &str, report: &mut Report) {
    log::error!("Skipping segment '{}': {}", name, reason);
    report.diagnostic(
        Location::new(0, None),
        Diagnostic::SegmentFailed {
            reason: format!("{}: {}", name, reason),
        },
    );
}

fn analyze_segment_bytes(
    data: &[u8],
    state: &mut DemuxState,
    config: &AnalyzerConfig,
    report: &mut Report,
) -> Result<()> {
    let mut source = ByteSource::new(data).with_peek_size(config.initial_peek_size);
    analyze_segment(&mut source, state, config, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::report::RecordBody;
    use crate::format::ts::TS_PACKET_SIZE;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    /// A payload-only packet whose payload is a padding PES unit.
    fn padding_packet(pid: u16, cc: u8) -> Vec<u8> {
        let mut data = vec![0x47, 0x40 | (pid >> 8) as u8, pid as u8, 0x10 | cc];
        data.extend_from_slice(&[0x00, 0x00, 0x01, 0xBE, 0x00, 0xB2]);
        data.resize(TS_PACKET_SIZE, 0xFF);
        data
    }

    #[test]
    fn test_parse_playlist() {
        let content = b"#EXTM3U\n#EXT-X-TARGETDURATION:10\n\
            #EXTINF:10,\nseg0.ts\n#EXTINF:10,\nsub/seg1.ts\n#EXT-X-ENDLIST\n";
        let segments = parse_playlist(content, Path::new("/media")).unwrap();
        assert_eq!(
            segments,
            vec![PathBuf::from("/media/seg0.ts"), PathBuf::from("/media/sub/seg1.ts")]
        );
    }

    #[test]
    fn test_parse_playlist_requires_signature() {
        let err = parse_playlist(b"seg0.ts\n", Path::new(".")).unwrap_err();
        assert!(matches!(err, DumpError::Playlist(_)));
    }

    #[test]
    fn test_master_playlist_rejected() {
        let content = b"#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH=1280000\nlow/index.m3u8\n";
        let err = parse_playlist(content, Path::new(".")).unwrap_err();
        assert!(err.to_string().contains("master"));
    }

    #[tokio::test]
    async fn test_segments_share_demux_state() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("a.ts"), padding_packet(0x100, 0))
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("b.ts"), padding_packet(0x100, 1))
            .await
            .unwrap();
        let playlist = dir.path().join("index.m3u8");
        tokio::fs::write(&playlist, "#EXTM3U\n#EXTINF:1,\na.ts\n#EXTINF:1,\nb.ts\n")
            .await
            .unwrap();

        let analysis = analyze_playlist(&playlist, &AnalyzerConfig::default())
            .await
            .unwrap();

        assert_eq!(analysis.report.diagnostics().count(), 0);
        let offsets: Vec<u64> = analysis
            .report
            .records()
            .iter()
            .map(|r| r.location.offset)
            .collect();
        assert_eq!(offsets, vec![0, 184]);
        assert_eq!(analysis.timeline.events(0x100).len(), 2);
    }

    #[tokio::test]
    async fn test_bad_segment_is_skipped() {
        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("bad.ts"), [0x00u8, 0x00, 0x01, 0xBA])
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("good.ts"), padding_packet(0x100, 0))
            .await
            .unwrap();
        let playlist = dir.path().join("index.m3u8");
        let content = "#EXTM3U\n#EXTINF:1,\nbad.ts\n#EXTINF:1,\nmissing.ts\n#EXTINF:1,\ngood.ts\n";
        tokio::fs::write(&playlist, content).await.unwrap();

        let analysis = analyze_playlist(&playlist, &AnalyzerConfig::default())
            .await
            .unwrap();

        let failures = analysis
            .report
            .diagnostics()
            .filter(|d| matches!(d, Diagnostic::SegmentFailed { .. }))
            .count();
        assert_eq!(failures, 2);
        assert!(analysis
            .report
            .records()
            .iter()
            .any(|r| matches!(r.body, RecordBody::Pes(_))));
    }

    #[test]
    fn test_input_losing_sync_keeps_earlier_units() {
        let mut data = padding_packet(0x100, 0);
        data.extend(padding_packet(0x100, 1));
        data[TS_PACKET_SIZE] = 0x00;

        let mut source = ByteSource::new(&data[..]);
        let analysis = analyze_input("cut.ts", &mut source, &AnalyzerConfig::default()).unwrap();

        let failures: Vec<_> = analysis
            .report
            .diagnostics()
            .filter(|d| matches!(d, Diagnostic::SegmentFailed { .. }))
            .collect();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].to_string().contains("cut.ts"));
        assert_eq!(
            analysis
                .report
                .records()
                .iter()
                .filter(|r| matches!(r.body, RecordBody::Pes(_)))
                .count(),
            1
        );
        assert_eq!(analysis.timeline.events(0x100).len(), 1);
    }

    #[test]
    fn test_input_program_stream_detected() {
        let data = [0x00, 0x00, 0x01, 0xB9];
        let mut source = ByteSource::new(&data[..]);
        let analysis = analyze_input("end.mpg", &mut source, &AnalyzerConfig::default()).unwrap();

        assert_eq!(analysis.report.len(), 1);
        assert!(analysis.timeline.is_empty());
    }
}
