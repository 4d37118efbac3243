// SPDX-License-Identifier: MPL-2.0

//! Checks what the transport logs with every level enabled.
//!
//! The logger is process-wide, so this file holds a single test.

mod common;

use std::sync::Mutex;

use common::{ScriptHandle, push_segment};
use log::{Level, LevelFilter, Metadata, Record};
use nl_transport::{GroupIdSet, NLMSG_HDRLEN, NetlinkSocket, NetlinkSocketAddr};

const RTM_NEWLINK: u16 = 16;
const RTM_DELLINK: u16 = 17;

struct RecordingLogger {
    records: Mutex<Vec<(Level, String)>>,
}

static LOGGER: RecordingLogger = RecordingLogger {
    records: Mutex::new(Vec::new()),
};

impl log::Log for RecordingLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !record.target().starts_with("nl_transport") {
            return;
        }
        self.records
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

fn take_records(level: Level) -> Vec<String> {
    let mut records = LOGGER.records.lock().unwrap();
    let (taken, kept): (Vec<_>, Vec<_>) = records.drain(..).partition(|(lvl, _)| *lvl == level);
    *records = kept;
    taken.into_iter().map(|(_, message)| message).collect()
}

#[test]
fn malformed_datagram_is_reported_once_with_trace_enabled() {
    log::set_logger(&LOGGER).unwrap();
    log::set_max_level(LevelFilter::Trace);

    let script = ScriptHandle::new();
    let mut socket = NetlinkSocket::from_raw(
        0,
        script.socket(),
        &NetlinkSocketAddr::new(0, GroupIdSet::new_empty()),
    );

    // A valid segment followed by one that claims more bytes than remain.
    let mut malformed = Vec::new();
    push_segment(&mut malformed, RTM_DELLINK, 1, &[]);
    push_segment(&mut malformed, RTM_NEWLINK, 2, &[]);
    malformed[NLMSG_HDRLEN..NLMSG_HDRLEN + 4].copy_from_slice(&64u32.to_ne_bytes());
    script.push_datagram(malformed);

    let mut valid = Vec::new();
    push_segment(&mut valid, RTM_NEWLINK, 3, &[]);
    script.push_datagram(valid);

    take_records(Level::Warn);
    let segment = socket.receive_types(&[RTM_NEWLINK], 256).unwrap();
    assert_eq!(segment.seq(), 3);

    let warnings = take_records(Level::Warn);
    assert_eq!(warnings.len(), 2, "{:?}", warnings);
    assert!(warnings[0].starts_with("ignoring unexpected netlink segment"));
    assert!(warnings[1].starts_with("malformed netlink segment"));

    let traces = take_records(Level::Trace);
    assert!(traces.iter().any(|message| message.ends_with("32 bytes")));
    assert!(traces.iter().any(|message| message.ends_with("16 bytes")));
}
