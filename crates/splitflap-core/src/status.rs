//! Status slots shared between tasks.
//!
//! Each slot holds the latest human-readable line written by the task that
//! owns it. Writers never wait on readers: the board lock is only held for
//! the copy of a bounded string.

use core::{
    cell::RefCell,
    fmt::{self, Write},
    sync::atomic::{AtomicU32, Ordering},
};

use critical_section::Mutex;
use heapless::String as HeaplessString;

pub const STATUS_MESSAGE_BYTES: usize = 64;
pub const SLOT_COUNT: usize = 3;

pub type StatusMessage = HeaplessString<STATUS_MESSAGE_BYTES>;

/// Logical status channel. Every slot has exactly one writing task.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum SlotId {
    /// Data-fetch summary, written by the fetch task.
    DataSummary = 0,
    /// Link state, written by the connectivity task.
    Connectivity = 1,
    /// Text currently shown on the flaps, written by the fetch task.
    Flaps = 2,
}

impl SlotId {
    pub const ALL: [SlotId; SLOT_COUNT] = [Self::DataSummary, Self::Connectivity, Self::Flaps];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::DataSummary => "data",
            Self::Connectivity => "wifi",
            Self::Flaps => "flaps",
        }
    }
}

/// Fire-and-forget status reporting.
pub trait StatusSink {
    fn set_status(&self, slot: SlotId, text: &str);
}

impl<T: StatusSink + ?Sized> StatusSink for &T {
    fn set_status(&self, slot: SlotId, text: &str) {
        (**self).set_status(slot, text);
    }
}

/// Copies `text` into a bounded message, cutting at the last char boundary
/// that fits.
pub fn bounded_message(text: &str) -> StatusMessage {
    let mut end = text.len().min(STATUS_MESSAGE_BYTES);
    while !text.is_char_boundary(end) {
        end -= 1;
    }

    let mut message = StatusMessage::new();
    let _ = message.push_str(&text[..end]);
    message
}

/// Formats into a bounded message, dropping whatever does not fit.
pub fn format_message(args: fmt::Arguments<'_>) -> StatusMessage {
    let mut writer = TruncatingWriter::default();
    let _ = writer.write_fmt(args);
    writer.message
}

pub fn set_status_fmt<S: StatusSink + ?Sized>(sink: &S, slot: SlotId, args: fmt::Arguments<'_>) {
    sink.set_status(slot, format_message(args).as_str());
}

#[derive(Default)]
struct TruncatingWriter {
    message: StatusMessage,
}

impl Write for TruncatingWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            if self.message.push(ch).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Latest message per slot with a change counter, readable from any task.
pub struct StatusBoard {
    slots: Mutex<RefCell<[StatusMessage; SLOT_COUNT]>>,
    revisions: [AtomicU32; SLOT_COUNT],
}

impl StatusBoard {
    pub const fn new() -> Self {
        Self {
            slots: Mutex::new(RefCell::new([
                StatusMessage::new(),
                StatusMessage::new(),
                StatusMessage::new(),
            ])),
            revisions: [AtomicU32::new(0), AtomicU32::new(0), AtomicU32::new(0)],
        }
    }

    pub fn message(&self, slot: SlotId) -> StatusMessage {
        critical_section::with(|cs| self.slots.borrow_ref(cs)[slot.index()].clone())
    }

    /// Incremented on every write to the slot, even if the text is unchanged.
    pub fn revision(&self, slot: SlotId) -> u32 {
        self.revisions[slot.index()].load(Ordering::Acquire)
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusSink for StatusBoard {
    fn set_status(&self, slot: SlotId, text: &str) {
        let message = bounded_message(text);
        critical_section::with(|cs| {
            self.slots.borrow_ref_mut(cs)[slot.index()] = message;
        });
        self.revisions[slot.index()].fetch_add(1, Ordering::AcqRel);
    }
}
