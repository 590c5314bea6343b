use std::mem;
use std::ptr;

use windows_sys::core::{HRESULT, PCWSTR};
use windows_sys::Win32::Foundation::{
    FreeLibrary, HANDLE, HINSTANCE, HMODULE, HWND, INVALID_HANDLE_VALUE,
};
use windows_sys::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_APARTMENTTHREADED};
use windows_sys::Win32::System::Console::{
    AttachConsole, GetStdHandle, ATTACH_PARENT_PROCESS, STD_ERROR_HANDLE, STD_HANDLE, STD_OUTPUT_HANDLE,
};
use windows_sys::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};
use windows_sys::Win32::UI::Controls::{
    TASKDIALOG_COMMON_BUTTON_FLAGS, TDCBF_OK_BUTTON, TD_INFORMATION_ICON,
};
use windows_sys::Win32::UI::WindowsAndMessaging::{
    MessageBoxA, MB_ICONASTERISK, MB_ICONSTOP, MB_OK,
};

use super::{key_text, to_narrow, to_wide, Notice, Presenter, ERROR_TITLE, INFO_TITLE};
use crate::errors::{OemKeyError, OemKeyResult};

/// Single-threaded COM apartment for the lifetime of the guard.
pub struct ComApartment {
    initialized: bool,
}

impl ComApartment {
    pub fn init() -> Self {
        // SAFETY: paired with CoUninitialize in Drop when it succeeds.
        let hr = unsafe { CoInitializeEx(ptr::null(), COINIT_APARTMENTTHREADED as _) };
        if hr < 0 {
            log::debug!("CoInitializeEx failed: {:#x}", hr);
        }
        Self {
            initialized: hr >= 0,
        }
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        if self.initialized {
            unsafe { CoUninitialize() };
        }
    }
}

/// Attach to the console of the process that started us, if it has one.
///
/// A GUI-subsystem binary starts without standard handles. After a
/// successful attach, stdout and stderr reach the parent's console.
pub fn attach_parent_console() -> bool {
    // SAFETY: no pointers involved; fails harmlessly if already attached.
    unsafe { AttachConsole(ATTACH_PARENT_PROCESS) != 0 }
}

/// Whether stdout and stderr have usable handles.
pub fn std_streams_attached() -> (bool, bool) {
    (usable(STD_OUTPUT_HANDLE), usable(STD_ERROR_HANDLE))
}

fn usable(which: STD_HANDLE) -> bool {
    // SAFETY: only reads the process's standard handle table.
    let handle: HANDLE = unsafe { GetStdHandle(which) };
    !handle.is_null() && handle != INVALID_HANDLE_VALUE
}

type TaskDialogFn = unsafe extern "system" fn(
    HWND,
    HINSTANCE,
    PCWSTR,
    PCWSTR,
    PCWSTR,
    TASKDIALOG_COMMON_BUTTON_FLAGS,
    PCWSTR,
    *mut i32,
) -> HRESULT;

/// A loaded module, freed on drop.
struct Library(HMODULE);

impl Library {
    fn load(name: &str) -> Option<Self> {
        let wide = to_wide(name);
        // SAFETY: `wide` is NUL-terminated.
        let module = unsafe { LoadLibraryW(wide.as_ptr()) };
        (!module.is_null()).then_some(Library(module))
    }

    /// Look up an exported function. `name` must be NUL-terminated.
    fn proc(&self, name: &[u8]) -> Option<unsafe extern "system" fn() -> isize> {
        debug_assert_eq!(name.last(), Some(&0));
        unsafe { GetProcAddress(self.0, name.as_ptr()) }
    }
}

impl Drop for Library {
    fn drop(&mut self) {
        unsafe { FreeLibrary(self.0) };
    }
}

/// Two-line task dialog: key as main instruction, clipboard status as content.
///
/// `TaskDialog` lives in comctl32 v6 only, so it is resolved at run time and
/// the presenter fails if the process did not get that version.
#[derive(Debug, Default, Clone, Copy)]
pub struct TaskDialogPresenter;

impl Presenter for TaskDialogPresenter {
    fn name(&self) -> &'static str {
        "task-dialog"
    }

    fn supports(&self, notice: &Notice<'_>) -> bool {
        matches!(notice, Notice::Key { .. })
    }

    fn show(&self, notice: &Notice<'_>) -> OemKeyResult<()> {
        let Notice::Key { key, clipboard } = notice else {
            return Err(OemKeyError::PresentationFailed);
        };

        let title = to_wide(INFO_TITLE);
        let main = to_wide(&key_text(key)?);
        let content = to_wide(clipboard.message());

        let comctl = Library::load("comctl32.dll").ok_or(OemKeyError::PresentationFailed)?;
        let proc = comctl
            .proc(b"TaskDialog\0")
            .ok_or(OemKeyError::PresentationFailed)?;

        // SAFETY: `TaskDialog` has exactly this signature, all strings are
        // NUL-terminated and outlive the call, and `comctl` stays loaded.
        let hr = unsafe {
            let task_dialog: TaskDialogFn = mem::transmute(proc);
            task_dialog(
                ptr::null_mut(),
                ptr::null_mut(),
                title.as_ptr(),
                main.as_ptr(),
                content.as_ptr(),
                TDCBF_OK_BUTTON,
                TD_INFORMATION_ICON,
                ptr::null_mut(),
            )
        };

        if hr < 0 {
            log::debug!("TaskDialog failed: {:#x}", hr);
            return Err(OemKeyError::PresentationFailed);
        }
        Ok(())
    }
}

/// Plain message box: the key alone, or an error with a stop icon.
#[derive(Debug, Default, Clone, Copy)]
pub struct MessageBoxPresenter;

impl Presenter for MessageBoxPresenter {
    fn name(&self) -> &'static str {
        "message-box"
    }

    fn supports(&self, _notice: &Notice<'_>) -> bool {
        true
    }

    fn show(&self, notice: &Notice<'_>) -> OemKeyResult<()> {
        let (text, caption, style) = match notice {
            Notice::Key { key, .. } => (
                to_narrow(key.as_bytes()),
                to_narrow(INFO_TITLE.as_bytes()),
                MB_OK | MB_ICONASTERISK,
            ),
            Notice::Error { message } => (
                to_narrow(message.as_bytes()),
                to_narrow(ERROR_TITLE.as_bytes()),
                MB_OK | MB_ICONSTOP,
            ),
        };

        // SAFETY: both strings are NUL-terminated and outlive the call.
        let result = unsafe { MessageBoxA(ptr::null_mut(), text.as_ptr(), caption.as_ptr(), style) };
        if result == 0 {
            return Err(OemKeyError::PresentationFailed);
        }
        Ok(())
    }
}
