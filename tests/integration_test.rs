#[cfg(test)]
mod tests {
    use mpegdump::config::AnalyzerConfig;
    use mpegdump::format::ps::analyze_program_stream;
    use mpegdump::format::ps::types::StartCodeKind;
    use mpegdump::format::report::{Diagnostic, RecordBody, Report};
    use mpegdump::format::timeline::{EventKind, Timeline};
    use mpegdump::format::ts::{
        analyze_program_streams, analyze_segment, ClockReference, DemuxState, StreamKind,
        TS_PACKET_SIZE,
    };
    use mpegdump::playlist::analyze_playlist;
    use mpegdump::utils::ByteSource;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    const PCR_LEN: usize = 8;

    /// A transport packet whose payload fills whatever the optional PCR
    /// adaptation field leaves over.
    fn ts_packet(pid: u16, pusi: bool, cc: u8, pcr: Option<u64>, payload: &[u8]) -> Vec<u8> {
        let mut data = vec![0x47, ((pusi as u8) << 6) | (pid >> 8) as u8, pid as u8, cc & 0x0F];
        match pcr {
            Some(base) => {
                data[3] |= 0x30;
                data.extend_from_slice(&[
                    (PCR_LEN - 1) as u8,
                    0x10,
                    (base >> 25) as u8,
                    (base >> 17) as u8,
                    (base >> 9) as u8,
                    (base >> 1) as u8,
                    ((base & 1) << 7) as u8 | 0x7E,
                    0x00,
                ]);
            }
            None => data[3] |= 0x10,
        }
        data.extend_from_slice(payload);
        assert_eq!(data.len(), TS_PACKET_SIZE);
        data
    }

    fn timestamp(prefix: u8, ts: u64) -> [u8; 5] {
        [
            (prefix << 4) | (((ts >> 29) & 0x0E) as u8) | 1,
            (ts >> 22) as u8,
            (((ts >> 14) & 0xFE) as u8) | 1,
            (ts >> 7) as u8,
            ((ts << 1) as u8) | 1,
        ]
    }

    /// A video PES unit with a PTS-only optional header, padded with `fill`
    /// to `size` bytes in total.
    fn video_pes(declared: u16, pts: u64, size: usize, fill: u8) -> Vec<u8> {
        let mut data = vec![0x00, 0x00, 0x01, 0xE0];
        data.extend_from_slice(&declared.to_be_bytes());
        data.extend_from_slice(&[0x84, 0x80, 0x05]);
        data.extend_from_slice(&timestamp(0x2, pts));
        data.resize(size, fill);
        data
    }

    fn run_ts(data: &[u8]) -> (Report, Timeline, DemuxState) {
        let config = AnalyzerConfig::default();
        let mut state = DemuxState::new();
        let mut report = Report::new();
        analyze_segment(&mut ByteSource::new(data), &mut state, &config, &mut report).unwrap();
        analyze_program_streams(&mut state, &config, &mut report).unwrap();
        (report, state.timeline(), state)
    }

    #[test]
    fn test_interleaved_pids_demux_independently() {
        let mut data = Vec::new();
        for cc in 0..3u8 {
            data.extend(ts_packet(0x100, false, cc, None, &[0x10 + cc; 184]));
            data.extend(ts_packet(0x101, false, cc, None, &[0x20 + cc; 184]));
        }

        let config = AnalyzerConfig::default();
        let mut state = DemuxState::new();
        let mut report = Report::new();
        analyze_segment(&mut ByteSource::new(&data[..]), &mut state, &config, &mut report)
            .unwrap();

        assert!(report.is_empty());
        assert_eq!(state.pids().collect::<Vec<_>>(), vec![0x100, 0x101]);
        for (pid, base) in [(0x100u16, 0x10u8), (0x101, 0x20)] {
            let expected: Vec<u8> = (0..3u8).flat_map(|cc| [base + cc; 184]).collect();
            assert_eq!(state.stream(pid).unwrap().pending(), expected.as_slice());
        }
    }

    #[test]
    fn test_unbounded_pes_length_inferred_across_packets() {
        // 176 + 184 payload bytes before the next unit start at 360
        let first = video_pes(0, 2_700_000, 360, 0xEE);
        let second = video_pes(0, 2_703_600, 184, 0xEE);

        let mut data = ts_packet(0x100, true, 0, Some(1000), &first[..176]);
        data.extend(ts_packet(0x100, false, 1, None, &first[176..]));
        data.extend(ts_packet(0x100, true, 2, None, &second));

        let (report, timeline, state) = run_ts(&data);

        let units: Vec<_> = report
            .records()
            .iter()
            .filter_map(|r| match &r.body {
                RecordBody::Pes(unit) => Some((r.location.offset, unit.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].0, 0);
        assert_eq!(units[0].1.kind, StreamKind::Video);
        assert_eq!(units[0].1.length, 354);
        assert!(units[0].1.inferred);

        // The last unit waits for a boundary that never comes
        assert_eq!(
            report.diagnostics().cloned().collect::<Vec<_>>(),
            vec![Diagnostic::UndeterminedPesLength { stream_id: 0xE0 }]
        );
        assert_eq!(state.stream(0x100).unwrap().origin(), 360);

        let kinds: Vec<_> = timeline
            .events(0x100)
            .iter()
            .map(|e| (e.offset, e.kind))
            .collect();
        assert_eq!(kinds.len(), 4);
        assert_eq!(kinds[0], (0, EventKind::UnitStart));
        assert_eq!(kinds[1], (0, EventKind::Pcr(ClockReference::new(1000, 0))));
        assert_eq!(kinds[3], (360, EventKind::UnitStart));

        let rendered: Vec<String> = timeline.events(0x100).iter().map(|e| e.to_string()).collect();
        assert_eq!(rendered[1], "Offset:        0 - PCR: 0.011111");
        assert_eq!(rendered[2], "Offset:        0 - PES, PTS=30.000000");
    }

    #[test]
    fn test_analysis_is_repeatable() {
        let first = video_pes(0, 90_000, 184, 0x00);
        let second = video_pes(184 - 6, 93_600, 184, 0x11);
        let mut data = ts_packet(0x100, true, 0, None, &first);
        data.extend(ts_packet(0x100, true, 1, None, &second));
        data.extend(ts_packet(0x100, true, 2, None, &video_pes(0, 97_200, 184, 0x22)));

        let (report_a, timeline_a, _) = run_ts(&data);
        let (report_b, timeline_b, _) = run_ts(&data);

        assert!(!timeline_a.is_empty());
        assert_eq!(timeline_a, timeline_b);
        assert_eq!(report_a, report_b);
    }

    #[test]
    fn test_program_stream_headers() {
        let mut data = Vec::new();
        // Pack header, SCR 1s, no stuffing
        data.extend_from_slice(&[0x00, 0x00, 0x01, 0xBA]);
        data.extend_from_slice(&[0x44, 0x00, 0x16, 0xFC, 0x84, 0x01, 0x01, 0x89, 0xC3, 0xF8]);
        // System header with one video stream bound
        data.extend_from_slice(&[0x00, 0x00, 0x01, 0xBB, 0x00, 0x09]);
        data.extend_from_slice(&[0x80, 0x9D, 0x85, 0x04, 0xE1, 0xFF, 0xE0, 0xE0, 0xE8]);
        // 720x576 sequence header
        data.extend_from_slice(&[0x00, 0x00, 0x01, 0xB3]);
        data.extend_from_slice(&[0x2D, 0x02, 0x40, 0x23, 0x0E, 0xA6, 0x23, 0x80]);
        // GOP 01:02:03:04
        data.extend_from_slice(&[0x00, 0x00, 0x01, 0xB8, 0x04, 0x28, 0x62, 0x40]);
        // I picture
        data.extend_from_slice(&[0x00, 0x00, 0x01, 0x00, 0x00, 0x0F, 0xFF, 0xF8]);
        data.extend_from_slice(&[0x00, 0x00, 0x01, 0xB9]);

        let mut report = Report::new();
        analyze_program_stream(
            &mut ByteSource::new(&data[..]),
            &AnalyzerConfig::default(),
            &mut report,
        )
        .unwrap();

        assert_eq!(report.diagnostics().count(), 0);
        let summary: Vec<(u64, &str)> = report
            .records()
            .iter()
            .map(|r| (r.location.offset, r.body.kind()))
            .collect();
        assert_eq!(
            summary,
            vec![
                (0, "pack"),
                (14, "system"),
                (29, "sequence"),
                (41, "gop"),
                (49, "picture"),
                (57, "start-code"),
            ]
        );

        match &report.records()[0].body {
            RecordBody::Pack(pack) => assert_eq!(pack.scr.as_seconds(), 1.0),
            other => panic!("expected pack header, got {:?}", other),
        }
        match &report.records()[2].body {
            RecordBody::Sequence(seq) => assert_eq!((seq.width, seq.height), (720, 576)),
            other => panic!("expected sequence header, got {:?}", other),
        }
        assert_eq!(
            report.records()[5].body,
            RecordBody::StartCode(StartCodeKind::ProgramEnd)
        );
    }

    #[tokio::test]
    async fn test_playlist_unit_spans_segments() {
        let mut unit = vec![0x00, 0x00, 0x01, 0xBD, 0x01, 0x6A];
        unit.resize(2 * 184, 0x77);

        let dir = tempdir().unwrap();
        tokio::fs::write(dir.path().join("seg0.ts"), ts_packet(0x1E1, true, 0, None, &unit[..184]))
            .await
            .unwrap();
        tokio::fs::write(dir.path().join("seg1.ts"), ts_packet(0x1E1, false, 1, None, &unit[184..]))
            .await
            .unwrap();
        let playlist = dir.path().join("live.m3u8");
        tokio::fs::write(
            &playlist,
            "#EXTM3U\n#EXT-X-VERSION:3\n\
             #EXTINF:2.0,\nseg0.ts\n#EXTINF:2.0,\nseg1.ts\n#EXT-X-ENDLIST\n",
        )
        .await
        .unwrap();

        let analysis = analyze_playlist(&playlist, &AnalyzerConfig::default())
            .await
            .unwrap();

        assert_eq!(analysis.report.len(), 1);
        let record = &analysis.report.records()[0];
        assert_eq!(record.location.pid, Some(0x1E1));
        match &record.body {
            RecordBody::Pes(pes) => {
                assert_eq!(pes.stream_id, 0xBD);
                assert_eq!(pes.length, 362);
                assert!(!pes.inferred);
            }
            other => panic!("expected PES unit, got {:?}", other),
        }
        assert_eq!(analysis.timeline.events(0x1E1).len(), 1);
    }
}
