use std::collections::BTreeMap;
use std::fmt;

use crate::format::ts::pes::PesTiming;
use crate::format::ts::types::ClockReference;

/// What happened at a point of a PID's elementary byte stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventKind {
    /// A packet with the payload-unit-start indicator set.
    UnitStart,
    Pcr(ClockReference),
    PesTiming(PesTiming),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidEvent {
    /// Absolute offset within the PID's payload byte stream.
    pub offset: u64,
    pub kind: EventKind,
}

impl PidEvent {
    pub fn new(offset: u64, kind: EventKind) -> Self {
        Self { offset, kind }
    }

    pub fn is_unit_start(&self) -> bool {
        matches!(self.kind, EventKind::UnitStart)
    }
}

impl fmt::Display for PidEvent {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            EventKind::UnitStart => write!(f, "Offset: {:8} - PUSI", self.offset),
            EventKind::Pcr(pcr) => write!(f, "Offset: {:8} - PCR: {}", self.offset, pcr),
            EventKind::PesTiming(timing) => {
                write!(f, "Offset: {:8} - PES, {}", self.offset, timing)
            }
        }
    }
}

/// Per-PID events merged and ordered by offset for reporting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Timeline {
    streams: BTreeMap<u16, Vec<PidEvent>>,
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a timeline from per-PID event lists, sorting each by offset.
    ///
    /// The sort is stable, so events at the same offset keep the order in
    /// which they were recorded.
    pub fn from_events<'a, I>(events: I) -> Self
    where
        I: IntoIterator<Item = (u16, &'a [PidEvent])>,
    {
        let mut timeline = Self::new();
        for (pid, list) in events {
            timeline.extend(pid, list.iter().copied());
        }
        timeline
    }

    /// Adds events for `pid`, keeping its list sorted by offset.
    pub fn extend<I: IntoIterator<Item = PidEvent>>(&mut self, pid: u16, events: I) {
        let list = self.streams.entry(pid).or_default();
        list.extend(events);
        list.sort_by_key(|e| e.offset);
    }

    pub fn pids(&self) -> impl Iterator<Item = u16> + '_ {
        self.streams.keys().copied()
    }

    pub fn events(&self, pid: u16) -> &[PidEvent] {
        self.streams.get(&pid).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.streams.values().all(Vec::is_empty)
    }
}

impl fmt::Display for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (pid, events) in &self.streams {
            writeln!(f, "PID 0x{:04X}:", pid)?;
            for event in events {
                writeln!(f, "  {}", event)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_sort_is_stable_per_pid() {
        let pcr = ClockReference::new(1000, 0);
        let events = vec![
            PidEvent::new(184, EventKind::UnitStart),
            PidEvent::new(0, EventKind::UnitStart),
            PidEvent::new(0, EventKind::Pcr(pcr)),
        ];
        let timeline = Timeline::from_events(vec![(0x100, events.as_slice())]);

        assert_eq!(
            timeline.events(0x100),
            &[
                PidEvent::new(0, EventKind::UnitStart),
                PidEvent::new(0, EventKind::Pcr(pcr)),
                PidEvent::new(184, EventKind::UnitStart),
            ]
        );
        assert!(timeline.events(0x101).is_empty());
    }

    #[test]
    fn test_display_layout() {
        let mut timeline = Timeline::new();
        let timing = PesTiming {
            pts: Some(2_700_000),
            dts: Some(2_696_400),
            ..Default::default()
        };
        timeline.extend(
            0x44,
            vec![
                PidEvent::new(0, EventKind::UnitStart),
                PidEvent::new(0, EventKind::Pcr(ClockReference::new(1000, 0))),
                PidEvent::new(0, EventKind::PesTiming(timing)),
            ],
        );

        assert_eq!(
            timeline.to_string(),
            "PID 0x0044:\n\
             \x20 Offset:        0 - PUSI\n\
             \x20 Offset:        0 - PCR: 0.011111\n\
             \x20 Offset:        0 - PES, DTS=29.960000, PTS=30.000000\n"
        );
    }
}
