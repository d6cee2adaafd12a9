use log::{debug, info};

use crate::capture::buffer::{ChannelSet, Sample, CHANNEL_COUNT};
use crate::capture::parse::parse_measurement_line;
use crate::capture::{CaptureError, LineSource};

/// What one poll tick observed.
#[derive(Debug, Default)]
pub struct PollReport {
    /// Samples appended per channel, SMA1 first.
    pub appended: [usize; CHANNEL_COUNT],
    /// Lines that did not match the measurement format, verbatim, for the
    /// caller's log sink.
    pub unmatched: Vec<String>,
    /// Valid-looking readings whose channel number has no buffer.
    pub out_of_range: usize,
    /// The source ended or errored; the session is Idle again.
    pub closed: bool,
}

impl PollReport {
    pub fn total_appended(&self) -> usize {
        self.appended.iter().sum()
    }
}

/// Drives one measurement source into a [`ChannelSet`].
///
/// At most one source is active at a time. The caller owns the tick: it
/// invokes [`CaptureSession::poll`] at a fixed interval (100 ms in the CLI)
/// and reacts to the returned report. All buffer mutation happens inside
/// `poll`, so renderer and exporter always observe a consistent snapshot
/// between ticks.
pub struct CaptureSession {
    source: Option<Box<dyn LineSource>>,
    reset_on_start: bool,
}

impl CaptureSession {
    pub fn new(reset_on_start: bool) -> Self {
        Self {
            source: None,
            reset_on_start,
        }
    }

    pub fn is_active(&self) -> bool {
        self.source.is_some()
    }

    /// Opens a source and begins a session.
    ///
    /// Fails with [`CaptureError::AlreadyActive`] while a session is
    /// running. If `open` fails the session stays Idle and the buffers are
    /// left untouched; on success the buffers are reset first when the
    /// session was built with `reset_on_start`.
    pub fn start<F>(&mut self, channels: &mut ChannelSet, open: F) -> Result<(), CaptureError>
    where
        F: FnOnce() -> Result<Box<dyn LineSource>, CaptureError>,
    {
        if self.source.is_some() {
            return Err(CaptureError::AlreadyActive);
        }
        let source = open()?;
        if self.reset_on_start {
            channels.reset_all();
        }
        self.source = Some(source);
        info!("capture session started");
        Ok(())
    }

    /// Ends the session, closing the source. No-op while Idle.
    pub fn stop(&mut self) {
        if self.source.take().is_some() {
            info!("capture session stopped");
        }
    }

    /// Drains every line currently available from the source.
    ///
    /// A read error or end of stream is an implicit stop: the session
    /// transitions back to Idle and the report carries `closed = true`.
    pub fn poll(&mut self, channels: &mut ChannelSet) -> PollReport {
        let mut report = PollReport::default();
        let Some(source) = self.source.as_mut() else {
            return report;
        };
        loop {
            match source.try_read_line() {
                Ok(Some(line)) => match parse_measurement_line(&line) {
                    Some(reading) => {
                        if let Some(buffer) = channels.get_mut(reading.channel) {
                            buffer.push(Sample::now(reading.value_ns));
                            report.appended[reading.channel - 1] += 1;
                        } else {
                            debug!(
                                "dropping reading for unknown channel {}: {} ns",
                                reading.channel, reading.value_ns
                            );
                            report.out_of_range += 1;
                        }
                    }
                    None => report.unmatched.push(line),
                },
                Ok(None) => break,
                Err(_) => {
                    self.source = None;
                    report.closed = true;
                    info!("measurement source closed, session is idle");
                    break;
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::source::ScriptedSource;

    fn boxed(source: ScriptedSource) -> Box<dyn LineSource> {
        Box::new(source)
    }

    #[test]
    fn poll_routes_readings_to_wire_channels() {
        let mut channels = ChannelSet::new(16);
        let mut session = CaptureSession::new(true);
        session
            .start(&mut channels, || {
                Ok(boxed(ScriptedSource::new([
                    "*****Measurement channel 2: 150 ns",
                    "*****Measurement channel 3: -75 ns",
                    "garbage line",
                    "*****Measurement channel 2: 5 ns",
                ])))
            })
            .unwrap();
        let report = session.poll(&mut channels);
        assert_eq!(report.appended, [0, 2, 1, 0]);
        assert_eq!(report.total_appended(), 3);
        assert_eq!(report.unmatched, vec!["garbage line".to_owned()]);
        assert!(!report.closed);
        assert!(session.is_active());

        let sma2: Vec<i64> = channels
            .get(2)
            .unwrap()
            .iter_chronological()
            .map(|s| s.value_ns)
            .collect();
        assert_eq!(sma2, vec![150, 5]);
        assert_eq!(
            channels.get(3).unwrap().latest().map(|s| s.value_ns),
            Some(-75)
        );
    }

    #[test]
    fn out_of_range_channels_are_counted_not_stored() {
        let mut channels = ChannelSet::new(16);
        let mut session = CaptureSession::new(true);
        session
            .start(&mut channels, || {
                Ok(boxed(ScriptedSource::new([
                    "*****Measurement channel 9: 1 ns",
                ])))
            })
            .unwrap();
        let report = session.poll(&mut channels);
        assert_eq!(report.out_of_range, 1);
        assert_eq!(report.total_appended(), 0);
    }

    #[test]
    fn start_while_active_is_rejected_and_leaves_buffers_alone() {
        let mut channels = ChannelSet::new(16);
        let mut session = CaptureSession::new(true);
        session
            .start(&mut channels, || {
                Ok(boxed(ScriptedSource::new([
                    "*****Measurement channel 1: 1 ns",
                ])))
            })
            .unwrap();
        session.poll(&mut channels);

        let second = session.start(&mut channels, || {
            panic!("open must not run while a session is active")
        });
        assert!(matches!(second, Err(CaptureError::AlreadyActive)));
        assert_eq!(channels.get(1).unwrap().count(), 1);
    }

    #[test]
    fn failed_open_stays_idle_with_buffers_untouched() {
        let mut channels = ChannelSet::new(16);
        channels.get_mut(1).unwrap().push(Sample::new(7, 0));
        let mut session = CaptureSession::new(true);
        let result = session.start(&mut channels, || {
            Err(CaptureError::SourceUnavailable(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no instrument",
            )))
        });
        assert!(matches!(result, Err(CaptureError::SourceUnavailable(_))));
        assert!(!session.is_active());
        assert_eq!(channels.get(1).unwrap().count(), 1);
    }

    #[test]
    fn reset_on_start_clears_previous_data() {
        let mut channels = ChannelSet::new(16);
        channels.get_mut(1).unwrap().push(Sample::new(7, 0));
        let mut session = CaptureSession::new(true);
        session
            .start(&mut channels, || Ok(boxed(ScriptedSource::new(Vec::<String>::new()))))
            .unwrap();
        assert_eq!(channels.get(1).unwrap().count(), 0);
        assert_eq!(channels.get(1).unwrap().total_count(), 0);
    }

    #[test]
    fn accumulate_across_sessions_when_reset_disabled() {
        let mut channels = ChannelSet::new(16);
        channels.get_mut(1).unwrap().push(Sample::new(7, 0));
        let mut session = CaptureSession::new(false);
        session
            .start(&mut channels, || Ok(boxed(ScriptedSource::new(Vec::<String>::new()))))
            .unwrap();
        assert_eq!(channels.get(1).unwrap().count(), 1);
    }

    #[test]
    fn stop_while_idle_is_a_no_op() {
        let mut session = CaptureSession::new(true);
        session.stop();
        assert!(!session.is_active());
    }

    #[test]
    fn source_close_is_an_implicit_stop() {
        let mut channels = ChannelSet::new(16);
        let mut session = CaptureSession::new(true);
        session
            .start(&mut channels, || {
                Ok(boxed(ScriptedSource::closing([
                    "*****Measurement channel 1: 42 ns",
                ])))
            })
            .unwrap();
        let report = session.poll(&mut channels);
        assert_eq!(report.appended[0], 1);
        assert!(report.closed);
        assert!(!session.is_active());
        // Buffers keep their last consistent state after the implicit stop.
        assert_eq!(
            channels.get(1).unwrap().latest().map(|s| s.value_ns),
            Some(42)
        );

        let idle_report = session.poll(&mut channels);
        assert_eq!(idle_report.total_appended(), 0);
        assert!(!idle_report.closed);
    }
}
