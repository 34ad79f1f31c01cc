//! Frame streaming.
//!
//! One *cycle* is a `GNFD` request carrying the selected kinds as a bit
//! mask, followed by one packet per selected kind in ascending bit order.
//! A `DONE` packet ends its cycle early. [`FrameStream`] runs cycles until
//! a count is reached, the stream is stopped, or an error occurs.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use kld7_frame::{
    decode_frame, Detection, FrameData, FrameKind, FrameKinds, RawAdcFrame, RawFftFrame, Tag,
    Target,
};
use kld7_transport::SerialLink;
use tracing::{debug, trace};

use crate::error::{Result, SessionError};
use crate::session::Session;

/// Cancels a running stream, possibly from another thread.
///
/// The flag is checked between cycles only; a cycle that has started runs
/// to completion.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the stream stop before its next cycle.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Bounds and pacing for a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamOptions {
    /// Stop after this many cycles. `None` runs until stopped.
    pub max_count: Option<u64>,
    /// Minimum time between the starts of consecutive cycles.
    pub min_interval: Option<Duration>,
}

impl StreamOptions {
    pub fn count(max_count: u64) -> Self {
        Self {
            max_count: Some(max_count),
            min_interval: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.min_interval = Some(interval);
        self
    }
}

/// Observable stream state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Waiting to start the next cycle.
    Idle,
    /// `remaining` packets of the current cycle are still due.
    InCycle { remaining: usize },
    /// The stream has ended and will yield nothing more.
    Finished,
}

/// Iterator over decoded frames, borrowing the session for its lifetime.
///
/// Yields `Err` at most once; the stream is finished afterwards.
pub struct FrameStream<'s, L: SerialLink> {
    session: &'s mut Session<L>,
    kinds: FrameKinds,
    options: StreamOptions,
    stop: StopHandle,
    state: StreamState,
    cycles: u64,
    last_start: Option<Instant>,
}

impl<L: SerialLink> FrameStream<'_, L> {
    pub fn kinds(&self) -> FrameKinds {
        self.kinds
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Cycles started so far.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Stop before the next cycle.
    pub fn stop(&self) {
        self.stop.stop();
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    fn begin_cycle(&mut self) -> Result<bool> {
        if self.stop.is_stopped() || self.options.max_count.is_some_and(|max| self.cycles >= max)
        {
            return Ok(false);
        }

        if let (Some(interval), Some(last)) = (self.options.min_interval, self.last_start) {
            let elapsed = last.elapsed();
            if elapsed < interval {
                thread::sleep(interval - elapsed);
            }
            if self.stop.is_stopped() {
                return Ok(false);
            }
        }

        self.last_start = Some(Instant::now());
        self.session.command(Tag::GNFD, self.kinds.bits())?;
        self.cycles += 1;
        self.state = StreamState::InCycle {
            remaining: self.kinds.count(),
        };
        trace!(cycle = self.cycles, kinds = %self.kinds, "cycle started");
        Ok(true)
    }

    fn next_frame(&mut self) -> Result<Option<FrameData>> {
        if self.state == StreamState::Idle && !self.begin_cycle()? {
            return Ok(None);
        }

        let packet = self.session.read_packet()?;
        let frame = decode_frame(packet.tag, packet.payload)?;

        self.state = match self.state {
            StreamState::InCycle { remaining } if remaining > 1 && !frame.is_done() => {
                StreamState::InCycle {
                    remaining: remaining - 1,
                }
            }
            _ => StreamState::Idle,
        };
        Ok(Some(frame))
    }
}

impl<L: SerialLink> Iterator for FrameStream<'_, L> {
    type Item = Result<FrameData>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state == StreamState::Finished {
            return None;
        }
        match self.next_frame() {
            Ok(Some(frame)) => Some(Ok(frame)),
            Ok(None) => {
                debug!(cycles = self.cycles, "stream finished");
                self.state = StreamState::Finished;
                None
            }
            Err(err) => {
                debug!(error = %err, cycles = self.cycles, "stream failed");
                self.state = StreamState::Finished;
                Some(Err(err))
            }
        }
    }
}

impl<L: SerialLink> fmt::Debug for FrameStream<'_, L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameStream")
            .field("kinds", &self.kinds)
            .field("options", &self.options)
            .field("state", &self.state)
            .field("cycles", &self.cycles)
            .finish()
    }
}

fn unexpected(expected: Tag, frame: &FrameData) -> SessionError {
    SessionError::UnexpectedTag {
        expected,
        actual: frame.tag(),
    }
}

fn into_raw_adc(frame: FrameData) -> Result<Box<RawAdcFrame>> {
    match frame {
        FrameData::RawAdc(data) => Ok(data),
        other => Err(unexpected(Tag::RADC, &other)),
    }
}

fn into_raw_fft(frame: FrameData) -> Result<Box<RawFftFrame>> {
    match frame {
        FrameData::RawFft(data) => Ok(data),
        other => Err(unexpected(Tag::RFFT, &other)),
    }
}

fn into_targets(frame: FrameData) -> Result<Vec<Target>> {
    match frame {
        FrameData::Targets(targets) => Ok(targets),
        other => Err(unexpected(Tag::PDAT, &other)),
    }
}

fn into_tracked_target(frame: FrameData) -> Result<Option<Target>> {
    match frame {
        FrameData::TrackedTarget(target) => Ok(target),
        other => Err(unexpected(Tag::TDAT, &other)),
    }
}

fn into_detection(frame: FrameData) -> Result<Detection> {
    match frame {
        FrameData::Detection(detection) => Ok(detection),
        other => Err(unexpected(Tag::DDAT, &other)),
    }
}

impl<L: SerialLink> Session<L> {
    /// Start streaming the selected frame kinds.
    ///
    /// Nothing is sent until the first call to `next`. Starting a stream
    /// clears any earlier stop request.
    pub fn stream(
        &mut self,
        kinds: impl Into<FrameKinds>,
        options: StreamOptions,
    ) -> Result<FrameStream<'_, L>> {
        let kinds = kinds.into();
        if kinds.is_empty() {
            return Err(SessionError::EmptyFrameSelection);
        }
        self.ensure_open()?;

        let stop = self.stop.clone();
        stop.reset();
        debug!(%kinds, ?options, "stream started");
        Ok(FrameStream {
            session: self,
            kinds,
            options,
            stop,
            state: StreamState::Idle,
            cycles: 0,
            last_start: None,
        })
    }

    /// Run one cycle for a single kind and return its frame.
    pub fn read_frame(&mut self, kind: FrameKind) -> Result<FrameData> {
        self.stream(kind, StreamOptions::count(1))?
            .next()
            .unwrap_or(Err(SessionError::Cancelled))
    }

    pub fn read_raw_adc(&mut self) -> Result<Box<RawAdcFrame>> {
        self.read_frame(FrameKind::RawAdc).and_then(into_raw_adc)
    }

    pub fn read_raw_fft(&mut self) -> Result<Box<RawFftFrame>> {
        self.read_frame(FrameKind::RawFft).and_then(into_raw_fft)
    }

    /// Candidate targets; empty when none were seen.
    pub fn read_targets(&mut self) -> Result<Vec<Target>> {
        self.read_frame(FrameKind::Targets).and_then(into_targets)
    }

    /// The tracked target, or `None` when nothing is being tracked.
    pub fn read_tracked_target(&mut self) -> Result<Option<Target>> {
        self.read_frame(FrameKind::TrackedTarget)
            .and_then(into_tracked_target)
    }

    pub fn read_detection(&mut self) -> Result<Detection> {
        self.read_frame(FrameKind::Detection).and_then(into_detection)
    }

    fn typed_stream<T: 'static>(
        &mut self,
        kind: FrameKind,
        options: StreamOptions,
        extract: fn(FrameData) -> Result<T>,
    ) -> Result<impl Iterator<Item = Result<T>> + '_> {
        Ok(self
            .stream(kind, options)?
            .map(move |frame| frame.and_then(extract)))
    }

    pub fn stream_raw_adc(
        &mut self,
        options: StreamOptions,
    ) -> Result<impl Iterator<Item = Result<Box<RawAdcFrame>>> + '_> {
        self.typed_stream(FrameKind::RawAdc, options, into_raw_adc)
    }

    pub fn stream_raw_fft(
        &mut self,
        options: StreamOptions,
    ) -> Result<impl Iterator<Item = Result<Box<RawFftFrame>>> + '_> {
        self.typed_stream(FrameKind::RawFft, options, into_raw_fft)
    }

    pub fn stream_targets(
        &mut self,
        options: StreamOptions,
    ) -> Result<impl Iterator<Item = Result<Vec<Target>>> + '_> {
        self.typed_stream(FrameKind::Targets, options, into_targets)
    }

    pub fn stream_tracked_targets(
        &mut self,
        options: StreamOptions,
    ) -> Result<impl Iterator<Item = Result<Option<Target>>> + '_> {
        self.typed_stream(FrameKind::TrackedTarget, options, into_tracked_target)
    }

    pub fn stream_detections(
        &mut self,
        options: StreamOptions,
    ) -> Result<impl Iterator<Item = Result<Detection>> + '_> {
        self.typed_stream(FrameKind::Detection, options, into_detection)
    }
}

#[cfg(test)]
mod tests {
    use kld7_frame::FrameError;

    use super::*;
    use crate::config::SessionConfig;
    use crate::mock::{wire, MockSensor};
    use crate::response::Response;

    fn open(sensor: &MockSensor) -> Session<MockSensor> {
        Session::with_link(sensor.clone(), SessionConfig::default()).unwrap()
    }

    fn gnfd_count(sensor: &MockSensor) -> usize {
        sensor
            .commands()
            .iter()
            .filter(|c| c.tag == Tag::GNFD)
            .count()
    }

    #[test]
    fn full_cycle_yields_kinds_in_bit_order() {
        let sensor = MockSensor::new();
        let mut session = open(&sensor);

        let kinds = FrameKind::Detection | FrameKind::Targets | FrameKind::TrackedTarget;
        let tags: Vec<Tag> = session
            .stream(kinds, StreamOptions::count(1))
            .unwrap()
            .map(|frame| frame.unwrap().tag())
            .collect();

        assert_eq!(tags, vec![Tag::PDAT, Tag::TDAT, Tag::DDAT]);
        let gnfd = sensor.commands().into_iter().find(|c| c.tag == Tag::GNFD);
        assert_eq!(gnfd.and_then(|c| c.value()), Some(4 | 8 | 16));
    }

    #[test]
    fn done_ends_cycle_early() {
        let sensor = MockSensor::new();
        let mut session = open(&sensor);
        sensor.script_cycle(vec![wire(Tag::PDAT, &[]), wire(Tag::DONE, &[1, 0, 0, 0])]);

        let kinds = FrameKind::Targets | FrameKind::TrackedTarget | FrameKind::Done;
        let frames: Vec<FrameData> = session
            .stream(kinds, StreamOptions::count(1))
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], FrameData::Targets(Vec::new()));
        assert!(frames[1].is_done());
        assert_eq!(gnfd_count(&sensor), 1);
    }

    #[test]
    fn done_starts_next_cycle() {
        let sensor = MockSensor::new();
        let mut session = open(&sensor);
        sensor.script_cycle(vec![wire(Tag::DONE, &[])]);

        let kinds = FrameKind::Detection | FrameKind::Done;
        let tags: Vec<Tag> = session
            .stream(kinds, StreamOptions::count(2))
            .unwrap()
            .map(|frame| frame.unwrap().tag())
            .collect();

        assert_eq!(tags, vec![Tag::DONE, Tag::DDAT, Tag::DONE]);
        assert_eq!(gnfd_count(&sensor), 2);
    }

    #[test]
    fn max_count_bounds_cycles() {
        let sensor = MockSensor::new();
        let mut session = open(&sensor);

        let mut stream = session
            .stream(FrameKind::Targets, StreamOptions::count(3))
            .unwrap();
        let yielded = stream.by_ref().count();
        assert_eq!(yielded, 3);
        assert_eq!(stream.cycles(), 3);
        assert_eq!(stream.state(), StreamState::Finished);
        drop(stream);
        assert_eq!(gnfd_count(&sensor), 3);
    }

    #[test]
    fn min_interval_spaces_cycle_starts() {
        let sensor = MockSensor::new();
        let mut session = open(&sensor);
        let interval = Duration::from_millis(100);

        let frames = session
            .stream(
                FrameKind::Detection,
                StreamOptions::count(3).with_interval(interval),
            )
            .unwrap()
            .count();
        assert_eq!(frames, 3);

        let starts: Vec<Instant> = sensor
            .commands()
            .into_iter()
            .filter(|c| c.tag == Tag::GNFD)
            .map(|c| c.at)
            .collect();
        assert_eq!(starts.len(), 3);
        for pair in starts.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= interval);
        }
    }

    #[test]
    fn stop_between_cycles_sends_no_further_requests() {
        let sensor = MockSensor::new();
        let mut session = open(&sensor);

        let mut stream = session
            .stream(FrameKind::Targets | FrameKind::Detection, StreamOptions::default())
            .unwrap();
        assert!(stream.next().unwrap().is_ok());
        assert!(stream.next().unwrap().is_ok());
        assert_eq!(stream.state(), StreamState::Idle);

        stream.stop_handle().stop();
        assert!(stream.next().is_none());
        assert!(stream.next().is_none());
        drop(stream);
        assert_eq!(gnfd_count(&sensor), 1);
    }

    #[test]
    fn stop_before_first_cycle_sends_nothing() {
        let sensor = MockSensor::new();
        let mut session = open(&sensor);

        let mut stream = session
            .stream(FrameKind::Targets, StreamOptions::default())
            .unwrap();
        stream.stop_handle().stop();

        assert!(stream.next().is_none());
        assert_eq!(stream.cycles(), 0);
        drop(stream);
        assert_eq!(gnfd_count(&sensor), 0);
    }

    #[test]
    fn stop_requested_before_stream_starts_is_cleared() {
        let sensor = MockSensor::new();
        let mut session = open(&sensor);
        session.stop_handle().stop();

        let mut stream = session
            .stream(FrameKind::Targets, StreamOptions::count(1))
            .unwrap();
        assert!(stream.next().unwrap().is_ok());
    }

    #[test]
    fn stop_mid_cycle_finishes_the_cycle() {
        let sensor = MockSensor::new();
        let mut session = open(&sensor);

        let mut stream = session
            .stream(FrameKind::Targets | FrameKind::Detection, StreamOptions::default())
            .unwrap();
        assert!(stream.next().unwrap().is_ok());
        stream.stop();

        let last = stream.next().unwrap().unwrap();
        assert_eq!(last.tag(), Tag::DDAT);
        assert!(stream.next().is_none());
    }

    #[test]
    fn stop_from_another_thread() {
        let sensor = MockSensor::new();
        let mut session = open(&sensor);
        let handle = session.stop_handle();

        let stream = session
            .stream(
                FrameKind::Detection,
                StreamOptions::default().with_interval(Duration::from_millis(20)),
            )
            .unwrap();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(70));
            handle.stop();
        });

        let frames = stream.take(1000).count();
        stopper.join().unwrap();
        assert!(frames >= 1);
        assert!(frames < 1000);
    }

    #[test]
    fn new_stream_clears_stop_request() {
        let sensor = MockSensor::new();
        let mut session = open(&sensor);
        session.stop_handle().stop();

        let frames = session
            .stream(FrameKind::Targets, StreamOptions::count(2))
            .unwrap()
            .count();
        assert_eq!(frames, 2);
    }

    #[test]
    fn error_ends_stream() {
        let sensor = MockSensor::new();
        let mut session = open(&sensor);
        sensor.script_cycle(vec![wire(Tag::PDAT, &[])]);

        let mut stream = session
            .stream(FrameKind::Targets | FrameKind::Detection, StreamOptions::default())
            .unwrap();
        assert!(stream.next().unwrap().is_ok());
        let err = stream.next().unwrap().unwrap_err();
        assert!(err.is_timeout());
        assert!(stream.next().is_none());
        assert_eq!(stream.state(), StreamState::Finished);
    }

    #[test]
    fn rejected_request_surfaces_as_error() {
        let sensor = MockSensor::new();
        let mut session = open(&sensor);
        sensor.reject(Tag::GNFD, Response::SensorBusy);

        let mut stream = session
            .stream(FrameKind::Targets, StreamOptions::default())
            .unwrap();
        assert!(matches!(
            stream.next(),
            Some(Err(SessionError::DeviceRejected {
                response: Response::SensorBusy,
                ..
            }))
        ));
        assert!(stream.next().is_none());
    }

    #[test]
    fn unknown_tag_in_stream_is_unsupported() {
        let sensor = MockSensor::new();
        let mut session = open(&sensor);
        sensor.script_cycle(vec![wire(Tag::from_bytes(*b"XXXX"), &[])]);

        let err = session.read_frame(FrameKind::Targets).unwrap_err();
        assert!(matches!(
            err,
            SessionError::Frame(FrameError::UnsupportedFrameTag(tag)) if tag.as_bytes() == b"XXXX"
        ));
    }

    #[test]
    fn empty_selection_is_rejected() {
        let sensor = MockSensor::new();
        let mut session = open(&sensor);

        assert!(matches!(
            session.stream(FrameKinds::EMPTY, StreamOptions::default()),
            Err(SessionError::EmptyFrameSelection)
        ));
        assert_eq!(gnfd_count(&sensor), 0);
    }

    #[test]
    fn stream_after_close_is_closed_error() {
        let sensor = MockSensor::new();
        let mut session = open(&sensor);
        session.close();

        assert!(matches!(
            session.stream(FrameKind::Targets, StreamOptions::default()),
            Err(SessionError::TransportClosed)
        ));
    }

    #[test]
    fn raw_adc_request_and_decode_agree_on_tag() {
        let sensor = MockSensor::new();
        let mut session = open(&sensor);

        let frame = session.read_raw_adc().unwrap();
        let gnfd = sensor.commands().into_iter().find(|c| c.tag == Tag::GNFD);
        assert_eq!(gnfd.and_then(|c| c.value()), Some(1));
        // Mock fills samples with their running index.
        assert_eq!(frame.sample(0, 0, 0), 0);
        assert_eq!(frame.sample(2, 1, 255), 1535);
    }

    #[test]
    fn typed_reads() {
        let sensor = MockSensor::new();
        let mut session = open(&sensor);

        assert_eq!(session.read_raw_fft().unwrap().bin(1, 0), 0);
        let targets = session.read_targets().unwrap();
        assert_eq!(targets, vec![Target::from_raw(250, -120, 1500, 3000)]);
        let tracked = session.read_tracked_target().unwrap().unwrap();
        assert!((tracked.distance - 2.5).abs() < 1e-9);
        assert!(tracked.is_approaching());
        let detection = session.read_detection().unwrap();
        assert!(detection.detection);
        assert!(!detection.micro_detection);
    }

    #[test]
    fn tracked_target_absent_when_payload_empty() {
        let sensor = MockSensor::new();
        let mut session = open(&sensor);
        sensor.script_cycle(vec![wire(Tag::TDAT, &[])]);

        assert_eq!(session.read_tracked_target().unwrap(), None);
    }

    #[test]
    fn typed_read_rejects_other_frame() {
        let sensor = MockSensor::new();
        let mut session = open(&sensor);
        sensor.script_cycle(vec![wire(Tag::DONE, &[])]);

        let err = session.read_targets().unwrap_err();
        assert!(matches!(
            err,
            SessionError::UnexpectedTag { expected, actual }
                if expected == Tag::PDAT && actual == Tag::DONE
        ));
    }

    #[test]
    fn typed_stream_targets() {
        let sensor = MockSensor::new();
        let mut session = open(&sensor);

        let batches: Vec<Vec<Target>> = session
            .stream_targets(StreamOptions::count(2))
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|targets| targets.len() == 1));

        let detections = session
            .stream_detections(StreamOptions::count(2))
            .unwrap()
            .filter_map(Result::ok)
            .count();
        assert_eq!(detections, 2);
    }
}
