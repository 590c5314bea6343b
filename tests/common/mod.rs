//! Shared fakes for the integration tests.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use oemkey::clipboard::ClipboardApi;
use oemkey::errors::OemKeyResult;
use oemkey::firmware::{FirmwareInterface, Signature, TableProvider};
use oemkey::notify::{Notice, Presenter};

/// Build an MSDM table: 36 byte ACPI header, 20 byte licensing header, key.
pub fn msdm_table(key: &[u8]) -> Vec<u8> {
    let length = (56 + key.len()) as u32;
    let mut raw = Vec::new();
    raw.extend_from_slice(b"MSDM");
    raw.extend_from_slice(&length.to_le_bytes());
    raw.extend_from_slice(&[3, 0]);
    raw.extend_from_slice(b"LENOVO");
    raw.extend_from_slice(b"TP-N2H  ");
    raw.extend_from_slice(&1u32.to_le_bytes());
    raw.extend_from_slice(b"PTEC");
    raw.extend_from_slice(&2u32.to_le_bytes());
    raw.extend_from_slice(&1u64.to_le_bytes());
    raw.extend_from_slice(&1u64.to_le_bytes());
    raw.extend_from_slice(&(key.len() as u32).to_le_bytes());
    raw.extend_from_slice(key);

    let sum = raw.iter().fold(0u8, |s, &b| s.wrapping_add(b));
    raw[9] = 0u8.wrapping_sub(sum);
    raw
}

/// Firmware with a fixed table list and one table body.
pub struct FakeFirmware {
    pub signatures: Vec<Signature>,
    pub table: Vec<u8>,
    /// Report zero when asked for the enumeration size
    pub enum_size_fails: bool,
    /// Return one byte less than declared when fetching the table
    pub short_fetch: bool,
    pub enumerate_calls: Cell<usize>,
    pub table_calls: Cell<usize>,
}

impl FakeFirmware {
    pub fn new(signatures: &[&[u8; 4]], table: Vec<u8>) -> Self {
        Self {
            signatures: signatures.iter().map(|s| Signature(**s)).collect(),
            table,
            enum_size_fails: false,
            short_fetch: false,
            enumerate_calls: Cell::new(0),
            table_calls: Cell::new(0),
        }
    }
}

impl FirmwareInterface for FakeFirmware {
    fn enumerate(&self, _provider: TableProvider, buffer: &mut [u8]) -> u32 {
        self.enumerate_calls.set(self.enumerate_calls.get() + 1);
        if self.enum_size_fails {
            return 0;
        }

        let raw: Vec<u8> = self
            .signatures
            .iter()
            .flat_map(|s| s.as_bytes().to_vec())
            .collect();
        if buffer.len() >= raw.len() {
            buffer[..raw.len()].copy_from_slice(&raw);
        }
        raw.len() as u32
    }

    fn table(&self, _provider: TableProvider, signature: Signature, buffer: &mut [u8]) -> u32 {
        self.table_calls.set(self.table_calls.get() + 1);
        if signature != Signature::MSDM {
            return 0;
        }

        let size = self.table.len();
        if buffer.is_empty() {
            return size as u32;
        }
        let written = if self.short_fetch { size - 1 } else { size };
        let written = written.min(buffer.len());
        buffer[..written].copy_from_slice(&self.table[..written]);
        written as u32
    }
}

/// Clipboard that can be told to fail allocation.
#[derive(Default)]
pub struct FakeClipboard {
    pub fail_alloc: bool,
    pub contents: RefCell<Vec<u8>>,
    staged: RefCell<Vec<u8>>,
    pub freed: Cell<usize>,
    pub closed: Cell<usize>,
}

impl FakeClipboard {
    /// A clipboard whose memory allocation always fails.
    pub fn failing_alloc() -> Self {
        Self {
            fail_alloc: true,
            ..Self::default()
        }
    }
}

impl ClipboardApi for FakeClipboard {
    type Handle = usize;

    fn open(&self) -> bool {
        true
    }

    fn close(&self) {
        self.closed.set(self.closed.get() + 1);
    }

    fn empty(&self) -> bool {
        self.contents.borrow_mut().clear();
        true
    }

    fn alloc(&self, _len: usize) -> Option<usize> {
        (!self.fail_alloc).then_some(1)
    }

    fn free(&self, _handle: usize) {
        self.freed.set(self.freed.get() + 1);
    }

    fn write(&self, _handle: usize, bytes: &[u8]) -> bool {
        *self.staged.borrow_mut() = bytes.to_vec();
        true
    }

    fn set_text(&self, _handle: usize) -> bool {
        *self.contents.borrow_mut() = self.staged.borrow().clone();
        true
    }
}

/// What a presenter was asked to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shown {
    Key { key: Vec<u8>, status: String },
    Error(String),
}

/// Presenter that records notices instead of showing them.
#[derive(Clone, Default)]
pub struct RecordingPresenter {
    pub shown: Rc<RefCell<Vec<Shown>>>,
}

impl RecordingPresenter {
    pub fn shown(&self) -> Vec<Shown> {
        self.shown.borrow().clone()
    }
}

impl Presenter for RecordingPresenter {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn supports(&self, _notice: &Notice<'_>) -> bool {
        true
    }

    fn show(&self, notice: &Notice<'_>) -> OemKeyResult<()> {
        let shown = match notice {
            Notice::Key { key, clipboard } => Shown::Key {
                key: key.as_bytes().to_vec(),
                status: clipboard.message().to_string(),
            },
            Notice::Error { message } => Shown::Error(message.clone()),
        };
        self.shown.borrow_mut().push(shown);
        Ok(())
    }
}
