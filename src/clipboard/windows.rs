use std::ptr;

use windows_sys::Win32::Foundation::HGLOBAL;
use windows_sys::Win32::System::DataExchange::{
    CloseClipboard, EmptyClipboard, OpenClipboard, SetClipboardData,
};
use windows_sys::Win32::System::Memory::{
    GlobalAlloc, GlobalFree, GlobalLock, GlobalSize, GlobalUnlock, GMEM_MOVEABLE,
};
use windows_sys::Win32::System::Ole::CF_TEXT;

use super::ClipboardApi;

/// The Win32 clipboard, fed with `GlobalAlloc` memory in `CF_TEXT` format.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Clipboard;

impl ClipboardApi for Win32Clipboard {
    type Handle = HGLOBAL;

    fn open(&self) -> bool {
        // SAFETY: no owner window; the clipboard is tied to this task.
        unsafe { OpenClipboard(ptr::null_mut()) != 0 }
    }

    fn close(&self) {
        // SAFETY: only called by the session guard after a successful open.
        unsafe {
            CloseClipboard();
        }
    }

    fn empty(&self) -> bool {
        // SAFETY: only called while the session guard holds the clipboard open.
        unsafe { EmptyClipboard() != 0 }
    }

    fn alloc(&self, len: usize) -> Option<HGLOBAL> {
        // SAFETY: plain allocation, the result is checked for null.
        let handle = unsafe { GlobalAlloc(GMEM_MOVEABLE, len) };
        (!handle.is_null()).then_some(handle)
    }

    fn free(&self, handle: HGLOBAL) {
        // SAFETY: `handle` came from `alloc` and was never handed to the clipboard.
        unsafe {
            GlobalFree(handle);
        }
    }

    fn write(&self, handle: HGLOBAL, bytes: &[u8]) -> bool {
        // SAFETY: the block is locked for the duration of the copy and the
        // copy is bounded by the block size.
        unsafe {
            if GlobalSize(handle) < bytes.len() {
                return false;
            }
            let data = GlobalLock(handle) as *mut u8;
            if data.is_null() {
                return false;
            }
            ptr::copy_nonoverlapping(bytes.as_ptr(), data, bytes.len());
            GlobalUnlock(handle);
        }
        true
    }

    fn set_text(&self, handle: HGLOBAL) -> bool {
        // SAFETY: the clipboard is open and emptied by this task.
        unsafe { !SetClipboardData(CF_TEXT as u32, handle).is_null() }
    }
}
