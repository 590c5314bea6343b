//! Plain-text clipboard transfer.
//!
//! The transfer follows the platform's open / empty / allocate / set / close
//! sequence. Two guards keep the resource rules straight:
//!
//! - [`ClipboardSession`] closes the clipboard on every exit path.
//! - [`OwnedBlock`] frees the allocated memory on drop, unless it has been
//!   [released](OwnedBlock::release) to the clipboard, which then owns it.
//!
//! [`ClipboardApi`] is the seam over the raw primitives. Any implementation
//! gets [`TextClipboard`] for free, which is what the application uses.

use std::mem;

use crate::errors::{ClipboardStep, OemKeyError, OemKeyResult};

#[cfg(target_os = "windows")]
pub mod windows;

/// Raw clipboard primitives.
///
/// Methods take `&self` so the guards below can share the api while a
/// transfer is in progress.
pub trait ClipboardApi {
    /// Handle to a block of movable shared memory.
    type Handle: Copy;

    /// Take exclusive access to the clipboard.
    fn open(&self) -> bool;
    fn close(&self);
    /// Remove the current clipboard contents.
    fn empty(&self) -> bool;
    /// Allocate `len` bytes of movable shared memory.
    fn alloc(&self, len: usize) -> Option<Self::Handle>;
    fn free(&self, handle: Self::Handle);
    /// Copy `bytes` into the block. False if the block cannot be locked.
    fn write(&self, handle: Self::Handle, bytes: &[u8]) -> bool;
    /// Hand the block to the clipboard as plain text.
    fn set_text(&self, handle: Self::Handle) -> bool;
}

/// Exclusive clipboard access, released on drop.
pub struct ClipboardSession<'a, A: ClipboardApi + ?Sized> {
    api: &'a A,
}

impl<'a, A: ClipboardApi + ?Sized> ClipboardSession<'a, A> {
    pub fn open(api: &'a A) -> OemKeyResult<Self> {
        if api.open() {
            Ok(Self { api })
        } else {
            Err(OemKeyError::ClipboardFailed {
                step: ClipboardStep::Open,
            })
        }
    }
}

impl<A: ClipboardApi + ?Sized> Drop for ClipboardSession<'_, A> {
    fn drop(&mut self) {
        self.api.close();
    }
}

/// A move-only memory block, freed on drop until released.
pub struct OwnedBlock<'a, A: ClipboardApi + ?Sized> {
    api: &'a A,
    handle: A::Handle,
}

impl<'a, A: ClipboardApi + ?Sized> OwnedBlock<'a, A> {
    pub fn alloc(api: &'a A, len: usize) -> OemKeyResult<Self> {
        let handle = api.alloc(len).ok_or(OemKeyError::ClipboardFailed {
            step: ClipboardStep::Allocate,
        })?;
        Ok(Self { api, handle })
    }

    pub fn handle(&self) -> A::Handle {
        self.handle
    }

    /// Give up ownership of the block. It will not be freed.
    pub fn release(self) -> A::Handle {
        let handle = self.handle;
        mem::forget(self);
        handle
    }
}

impl<A: ClipboardApi + ?Sized> Drop for OwnedBlock<'_, A> {
    fn drop(&mut self) {
        self.api.free(self.handle);
    }
}

/// Place `text` on the clipboard as NUL-terminated plain text.
pub fn copy_text<A: ClipboardApi + ?Sized>(api: &A, text: &[u8]) -> OemKeyResult<()> {
    let fail = |step| OemKeyError::ClipboardFailed { step };

    let _session = ClipboardSession::open(api)?;
    if !api.empty() {
        return Err(fail(ClipboardStep::Empty));
    }

    let mut payload = Vec::with_capacity(text.len() + 1);
    payload.extend_from_slice(text);
    payload.push(0);

    let block = OwnedBlock::alloc(api, payload.len())?;
    let handle = block.handle();
    if !api.write(handle, &payload) {
        return Err(fail(ClipboardStep::Lock));
    }
    if !api.set_text(handle) {
        return Err(fail(ClipboardStep::SetData));
    }

    // The clipboard owns the block now.
    block.release();
    log::debug!("Copied {} bytes to the clipboard", text.len());
    Ok(())
}

/// Object-safe clipboard used by the application.
pub trait TextClipboard {
    fn copy_text(&self, text: &[u8]) -> OemKeyResult<()>;
}

impl<A: ClipboardApi> TextClipboard for A {
    fn copy_text(&self, text: &[u8]) -> OemKeyResult<()> {
        copy_text(self, text)
    }
}

/// Clipboard for platforms without one. Every copy fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unavailable;

impl TextClipboard for Unavailable {
    fn copy_text(&self, _text: &[u8]) -> OemKeyResult<()> {
        Err(OemKeyError::ClipboardFailed {
            step: ClipboardStep::Unavailable,
        })
    }
}

/// The clipboard of the running platform.
pub fn platform() -> Box<dyn TextClipboard> {
    #[cfg(target_os = "windows")]
    {
        Box::new(windows::Win32Clipboard)
    }
    #[cfg(not(target_os = "windows"))]
    {
        Box::new(Unavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records every primitive call and fails at a chosen step.
    #[derive(Default)]
    struct Recorder {
        fail_at: Option<ClipboardStep>,
        calls: RefCell<Vec<String>>,
        written: RefCell<Vec<u8>>,
    }

    impl Recorder {
        fn failing(step: ClipboardStep) -> Self {
            Self {
                fail_at: Some(step),
                ..Self::default()
            }
        }

        fn ok(&self, step: ClipboardStep, call: &str) -> bool {
            self.calls.borrow_mut().push(call.to_string());
            self.fail_at != Some(step)
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl ClipboardApi for Recorder {
        type Handle = u32;

        fn open(&self) -> bool {
            self.ok(ClipboardStep::Open, "open")
        }

        fn close(&self) {
            self.calls.borrow_mut().push("close".to_string());
        }

        fn empty(&self) -> bool {
            self.ok(ClipboardStep::Empty, "empty")
        }

        fn alloc(&self, len: usize) -> Option<u32> {
            self.ok(ClipboardStep::Allocate, &format!("alloc({len})"))
                .then_some(7)
        }

        fn free(&self, handle: u32) {
            self.calls.borrow_mut().push(format!("free({handle})"));
        }

        fn write(&self, _handle: u32, bytes: &[u8]) -> bool {
            *self.written.borrow_mut() = bytes.to_vec();
            self.ok(ClipboardStep::Lock, "write")
        }

        fn set_text(&self, _handle: u32) -> bool {
            self.ok(ClipboardStep::SetData, "set_text")
        }
    }

    #[test]
    fn successful_copy_hands_block_to_clipboard() {
        let api = Recorder::default();
        copy_text(&api, b"KEY").expect("copy should succeed");

        assert_eq!(
            api.calls(),
            ["open", "empty", "alloc(4)", "write", "set_text", "close"]
        );
        assert_eq!(*api.written.borrow(), b"KEY\0");
    }

    #[test]
    fn failed_set_frees_block_then_closes() {
        let api = Recorder::failing(ClipboardStep::SetData);
        let result = copy_text(&api, b"KEY");

        assert!(matches!(
            result,
            Err(OemKeyError::ClipboardFailed {
                step: ClipboardStep::SetData
            })
        ));
        assert_eq!(
            api.calls(),
            ["open", "empty", "alloc(4)", "write", "set_text", "free(7)", "close"]
        );
    }

    #[test]
    fn failed_lock_frees_block() {
        let api = Recorder::failing(ClipboardStep::Lock);
        assert!(copy_text(&api, b"KEY").is_err());

        let calls = api.calls();
        assert!(calls.contains(&"free(7)".to_string()));
        assert_eq!(calls.last().map(String::as_str), Some("close"));
    }

    #[test]
    fn failed_alloc_has_nothing_to_free() {
        let api = Recorder::failing(ClipboardStep::Allocate);
        let result = copy_text(&api, b"KEY");

        assert!(matches!(
            result,
            Err(OemKeyError::ClipboardFailed {
                step: ClipboardStep::Allocate
            })
        ));
        assert_eq!(api.calls(), ["open", "empty", "alloc(4)", "close"]);
    }

    #[test]
    fn failed_empty_still_closes() {
        let api = Recorder::failing(ClipboardStep::Empty);
        assert!(copy_text(&api, b"KEY").is_err());
        assert_eq!(api.calls(), ["open", "empty", "close"]);
    }

    #[test]
    fn failed_open_does_not_close() {
        let api = Recorder::failing(ClipboardStep::Open);
        let result = copy_text(&api, b"KEY");

        assert!(matches!(
            result,
            Err(OemKeyError::ClipboardFailed {
                step: ClipboardStep::Open
            })
        ));
        assert_eq!(api.calls(), ["open"]);
    }

    #[test]
    fn released_block_is_not_freed() {
        let api = Recorder::default();
        let block = OwnedBlock::alloc(&api, 1).expect("alloc");
        assert_eq!(block.release(), 7);

        assert_eq!(api.calls(), ["alloc(1)"]);
    }

    #[test]
    fn dropped_block_is_freed_once() {
        let api = Recorder::default();
        let block = OwnedBlock::alloc(&api, 2).expect("alloc");
        assert_eq!(block.handle(), 7);
        drop(block);

        assert_eq!(api.calls(), ["alloc(2)", "free(7)"]);
    }

    #[test]
    fn unavailable_clipboard_fails() {
        assert!(matches!(
            Unavailable.copy_text(b"KEY"),
            Err(OemKeyError::ClipboardFailed {
                step: ClipboardStep::Unavailable
            })
        ));
    }
}
