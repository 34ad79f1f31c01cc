//! In-memory sensor used by the session tests.
//!
//! Commands written to the link are parsed as whole packets and answered
//! the way the sensor does: one `RESP`, then `RPST` for `GRPS` or one packet
//! per selected kind for `GNFD`. Tests can script rejections, replacement
//! replies and whole cycles.

use std::collections::{HashMap, VecDeque};
use std::io::{self, ErrorKind, Read, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use bytes::{Bytes, BytesMut};
use kld7_frame::params::PARAM_RECORD_SIZE;
use kld7_frame::{
    decode_header, encode_command, CommandPayload, FrameKind, FrameKinds, Tag, HEADER_SIZE,
};
use kld7_transport::{Result as TransportResult, SerialLink};

use crate::response::Response;

/// Encode one packet as it appears on the wire.
pub(crate) fn wire(tag: Tag, payload: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    encode_command(tag, &CommandPayload::from(payload), &mut buf);
    buf.to_vec()
}

/// A command as the sensor received it.
#[derive(Debug, Clone)]
pub(crate) struct SentCommand {
    pub tag: Tag,
    pub payload: Bytes,
    pub at: Instant,
}

impl SentCommand {
    pub fn value(&self) -> Option<u32> {
        let bytes: [u8; 4] = self.payload.as_ref().try_into().ok()?;
        Some(u32::from_le_bytes(bytes))
    }
}

struct State {
    rx: VecDeque<u8>,
    tx: Vec<u8>,
    commands: Vec<SentCommand>,
    record: [u8; PARAM_RECORD_SIZE],
    parameter_tag: Tag,
    rejections: HashMap<Tag, Response>,
    replies: VecDeque<Vec<u8>>,
    cycles: VecDeque<Vec<Vec<u8>>>,
    baud_rate: u32,
    timeout: Duration,
    silent: bool,
    fail_writes: bool,
    closed: bool,
    done_counter: u32,
}

impl State {
    fn new() -> Self {
        let mut record = [0u8; PARAM_RECORD_SIZE];
        record[..10].copy_from_slice(b"K-LD7_MOCK");
        record[19] = 0; // RBFR
        record[20] = 1; // RSPI
        record[21] = 1; // RRAI
        record[22] = 30; // THOF
        record[26] = 50; // MARA
        record[27] = (-90i8) as u8; // MIAN
        record[28] = 90; // MAAN
        record[38..40].copy_from_slice(&300u16.to_le_bytes()); // HOLD
        record[41] = 5; // MIDS

        Self {
            rx: VecDeque::new(),
            tx: Vec::new(),
            commands: Vec::new(),
            record,
            parameter_tag: Tag::RPST,
            rejections: HashMap::new(),
            replies: VecDeque::new(),
            cycles: VecDeque::new(),
            baud_rate: 115_200,
            timeout: Duration::from_millis(200),
            silent: false,
            fail_writes: false,
            closed: false,
            done_counter: 0,
        }
    }

    fn process_input(&mut self) {
        while self.tx.len() >= HEADER_SIZE {
            let header: [u8; HEADER_SIZE] = match self.tx[..HEADER_SIZE].try_into() {
                Ok(header) => header,
                Err(_) => return,
            };
            let (tag, length) = decode_header(&header);
            let end = HEADER_SIZE + length as usize;
            if self.tx.len() < end {
                return;
            }
            let payload = Bytes::copy_from_slice(&self.tx[HEADER_SIZE..end]);
            self.tx.drain(..end);
            self.handle(tag, payload);
        }
    }

    fn handle(&mut self, tag: Tag, payload: Bytes) {
        self.commands.push(SentCommand {
            tag,
            payload: payload.clone(),
            at: Instant::now(),
        });
        if self.silent {
            return;
        }
        if let Some(reply) = self.replies.pop_front() {
            self.rx.extend(reply);
            return;
        }

        let response = self.rejections.get(&tag).copied().unwrap_or(Response::Ok);
        self.rx.extend(wire(Tag::RESP, &[u8::from(response)]));
        if !response.is_ok() {
            return;
        }

        match tag {
            Tag::GRPS => {
                let record = self.record;
                self.rx.extend(wire(self.parameter_tag, &record));
            }
            Tag::GNFD => {
                if let Some(cycle) = self.cycles.pop_front() {
                    for packet in cycle {
                        self.rx.extend(packet);
                    }
                    return;
                }
                let mask = payload
                    .as_ref()
                    .try_into()
                    .map(u32::from_le_bytes)
                    .unwrap_or(0);
                for kind in FrameKinds::from_bits_truncate(mask).iter() {
                    let packet = self.frame_for(kind);
                    self.rx.extend(packet);
                }
            }
            _ => {}
        }
    }

    fn frame_for(&mut self, kind: FrameKind) -> Vec<u8> {
        match kind {
            FrameKind::RawAdc => {
                let samples: Vec<u8> = (0..1536u16).flat_map(u16::to_le_bytes).collect();
                wire(Tag::RADC, &samples)
            }
            FrameKind::RawFft => wire(Tag::RFFT, &[0u8; 1024]),
            FrameKind::Targets => wire(Tag::PDAT, &target_record()),
            FrameKind::TrackedTarget => wire(Tag::TDAT, &target_record()),
            FrameKind::Detection => wire(Tag::DDAT, &[1, 0, 1, 0, 0, 1]),
            FrameKind::Done => {
                self.done_counter += 1;
                wire(Tag::DONE, &self.done_counter.to_le_bytes())
            }
        }
    }
}

fn target_record() -> Vec<u8> {
    let mut record = Vec::with_capacity(8);
    record.extend(250u16.to_le_bytes());
    record.extend((-120i16).to_le_bytes());
    record.extend(1500i16.to_le_bytes());
    record.extend(3000u16.to_le_bytes());
    record
}

/// Cloneable handle: each clone talks to the same simulated sensor, so a
/// test can keep one while the session owns another.
#[derive(Clone)]
pub(crate) struct MockSensor(Arc<Mutex<State>>);

impl MockSensor {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(State::new())))
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.0.lock().unwrap()
    }

    pub fn commands(&self) -> Vec<SentCommand> {
        self.state().commands.clone()
    }

    pub fn baud_rate(&self) -> u32 {
        self.state().baud_rate
    }

    pub fn link_timeout(&self) -> Duration {
        self.state().timeout
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Answer every future `tag` command with `response`.
    pub fn reject(&self, tag: Tag, response: Response) {
        self.state().rejections.insert(tag, response);
    }

    /// Replace the whole answer to the next command with one packet.
    pub fn reply_once(&self, tag: Tag, payload: &[u8]) {
        self.state().replies.push_back(wire(tag, payload));
    }

    /// Answer the next accepted `GNFD` with these packets instead.
    pub fn script_cycle(&self, packets: Vec<Vec<u8>>) {
        self.state().cycles.push_back(packets);
    }

    pub fn set_parameter_tag(&self, tag: Tag) {
        self.state().parameter_tag = tag;
    }

    pub fn set_silent(&self, silent: bool) {
        self.state().silent = silent;
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    /// Queue raw bytes for the host to read.
    pub fn inject(&self, bytes: &[u8]) {
        self.state().rx.extend(bytes.iter().copied());
    }

    pub fn inject_packet(&self, tag: Tag, payload: &[u8]) {
        self.state().rx.extend(wire(tag, payload));
    }
}

impl Read for MockSensor {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state();
        if state.closed {
            return Err(ErrorKind::NotConnected.into());
        }
        if state.rx.is_empty() {
            return Err(ErrorKind::TimedOut.into());
        }
        let n = buf.len().min(state.rx.len());
        for (slot, byte) in buf.iter_mut().zip(state.rx.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for MockSensor {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut state = self.state();
        if state.closed {
            return Err(ErrorKind::NotConnected.into());
        }
        if state.fail_writes {
            return Err(ErrorKind::BrokenPipe.into());
        }
        state.tx.extend_from_slice(buf);
        state.process_input();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SerialLink for MockSensor {
    fn timeout(&self) -> Duration {
        self.state().timeout
    }

    fn set_timeout(&mut self, timeout: Duration) -> TransportResult<()> {
        self.state().timeout = timeout;
        Ok(())
    }

    fn baud_rate(&self) -> TransportResult<u32> {
        Ok(self.state().baud_rate)
    }

    fn set_baud_rate(&mut self, baud_rate: u32) -> TransportResult<()> {
        self.state().baud_rate = baud_rate;
        Ok(())
    }

    fn name(&self) -> Option<String> {
        Some("mock".to_string())
    }

    fn close(&mut self) -> TransportResult<()> {
        self.state().closed = true;
        Ok(())
    }
}
