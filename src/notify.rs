//! User notification.
//!
//! A [`Notice`] is shown by the first [`Presenter`] in a [`PresenterChain`]
//! that supports it and succeeds. The platform chain prefers a rich task
//! dialog and falls back to a plain message box, then the console. With
//! dialogs turned off the console goes first and the message box is kept as
//! a last resort, since a GUI-subsystem binary may have no console at all.

use std::borrow::Cow;
use std::cell::RefCell;
use std::io::{self, Write};

use crate::errors::{OemKeyError, OemKeyResult};
use crate::msdm::ProductKey;

#[cfg(target_os = "windows")]
pub mod windows;

/// Title of the key dialog.
pub const INFO_TITLE: &str = "Info";
/// Title of the error dialog.
pub const ERROR_TITLE: &str = "Error";

/// What happened to the key on its way to the clipboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipboardStatus {
    Copied,
    Failed,
    /// Clipboard copy turned off in the configuration
    Disabled,
}

impl ClipboardStatus {
    pub fn message(&self) -> &'static str {
        match self {
            ClipboardStatus::Copied => "This data has been copied to the clipboard.",
            ClipboardStatus::Failed => "Could not copy data to clipboard.",
            ClipboardStatus::Disabled => "Clipboard copy is disabled.",
        }
    }
}

/// Something to show the user.
#[derive(Debug, Clone)]
pub enum Notice<'a> {
    /// The extracted key and the clipboard outcome.
    Key {
        key: &'a ProductKey,
        clipboard: ClipboardStatus,
    },
    /// A fatal error.
    Error { message: String },
}

/// Convert key text for presenters that need Unicode.
///
/// Invalid UTF-8 sequences become U+FFFD. An empty key has no text to show,
/// which sends the notice on to the next presenter.
pub fn key_text(key: &ProductKey) -> OemKeyResult<Cow<'_, str>> {
    if key.is_empty() {
        return Err(OemKeyError::TextConversionFailed);
    }
    Ok(String::from_utf8_lossy(key.as_bytes()))
}

/// NUL-terminated UTF-16 for wide-string platform calls.
pub fn to_wide(text: &str) -> Vec<u16> {
    text.encode_utf16().chain(std::iter::once(0)).collect()
}

/// NUL-terminated bytes for narrow-string platform calls.
///
/// Interior NULs would end the string early; they are dropped.
pub fn to_narrow(bytes: &[u8]) -> Vec<u8> {
    bytes
        .iter()
        .copied()
        .filter(|&b| b != 0)
        .chain(std::iter::once(0))
        .collect()
}

/// One way of showing notices.
pub trait Presenter {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Whether this presenter can show `notice` at all.
    fn supports(&self, notice: &Notice<'_>) -> bool;

    fn show(&self, notice: &Notice<'_>) -> OemKeyResult<()>;
}

/// Presenters tried in order until one succeeds.
#[derive(Default)]
pub struct PresenterChain {
    presenters: Vec<Box<dyn Presenter>>,
}

impl PresenterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a presenter with lower priority than those already present.
    pub fn with(mut self, presenter: impl Presenter + 'static) -> Self {
        self.presenters.push(Box::new(presenter));
        self
    }

    pub fn push(&mut self, presenter: Box<dyn Presenter>) {
        self.presenters.push(presenter);
    }

    pub fn len(&self) -> usize {
        self.presenters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presenters.is_empty()
    }

    /// Show `notice` and return the name of the presenter that showed it.
    pub fn present(&self, notice: &Notice<'_>) -> OemKeyResult<&'static str> {
        for presenter in self.presenters.iter().filter(|p| p.supports(notice)) {
            match presenter.show(notice) {
                Ok(()) => {
                    log::debug!("Notice shown by {}", presenter.name());
                    return Ok(presenter.name());
                }
                Err(e) => {
                    log::debug!("{} could not show notice: {}", presenter.name(), e);
                }
            }
        }
        Err(OemKeyError::PresentationFailed)
    }
}

/// Build the presenter chain for the running platform.
///
/// With `dialogs` off the console is tried first. On Windows the message box
/// stays behind it so a detached process still shows the key.
#[cfg(target_os = "windows")]
pub fn platform_chain(dialogs: bool) -> PresenterChain {
    if dialogs {
        PresenterChain::new()
            .with(windows::TaskDialogPresenter)
            .with(windows::MessageBoxPresenter)
            .with(ConsolePresenter::stdio())
    } else {
        PresenterChain::new()
            .with(ConsolePresenter::stdio())
            .with(windows::MessageBoxPresenter)
    }
}

/// Build the presenter chain for the running platform.
///
/// There are no dialogs here, so `dialogs` has no effect.
#[cfg(not(target_os = "windows"))]
pub fn platform_chain(_dialogs: bool) -> PresenterChain {
    PresenterChain::new().with(ConsolePresenter::stdio())
}

/// Writes key notices to one stream and errors to another.
///
/// A stream marked detached is never written: notices for it are left to
/// the next presenter instead of vanishing into a missing handle.
pub struct ConsolePresenter<O, E> {
    out: RefCell<O>,
    err: RefCell<E>,
    out_attached: bool,
    err_attached: bool,
}

impl ConsolePresenter<io::Stdout, io::Stderr> {
    pub fn stdio() -> Self {
        let (out, err) = stdio_attached();
        Self::new(io::stdout(), io::stderr()).attached(out, err)
    }
}

#[cfg(target_os = "windows")]
fn stdio_attached() -> (bool, bool) {
    windows::std_streams_attached()
}

#[cfg(not(target_os = "windows"))]
fn stdio_attached() -> (bool, bool) {
    (true, true)
}

impl<O: Write, E: Write> ConsolePresenter<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self {
            out: RefCell::new(out),
            err: RefCell::new(err),
            out_attached: true,
            err_attached: true,
        }
    }

    /// Mark which of the two streams actually reach a console or file.
    pub fn attached(mut self, out: bool, err: bool) -> Self {
        self.out_attached = out;
        self.err_attached = err;
        self
    }

    pub fn into_inner(self) -> (O, E) {
        (self.out.into_inner(), self.err.into_inner())
    }

    fn write(&self, notice: &Notice<'_>) -> io::Result<()> {
        match notice {
            Notice::Key { key, clipboard } => {
                let mut out = self.out.borrow_mut();
                out.write_all(key.as_bytes())?;
                writeln!(out)?;
                writeln!(out, "{}", clipboard.message())?;
                out.flush()
            }
            Notice::Error { message } => {
                let mut err = self.err.borrow_mut();
                writeln!(err, "{}: {}", ERROR_TITLE, message)?;
                err.flush()
            }
        }
    }
}

impl<O: Write, E: Write> Presenter for ConsolePresenter<O, E> {
    fn name(&self) -> &'static str {
        "console"
    }

    fn supports(&self, notice: &Notice<'_>) -> bool {
        match notice {
            Notice::Key { .. } => self.out_attached,
            Notice::Error { .. } => self.err_attached,
        }
    }

    fn show(&self, notice: &Notice<'_>) -> OemKeyResult<()> {
        self.write(notice).map_err(|e| {
            log::debug!("Console write failed: {}", e);
            OemKeyError::PresentationFailed
        })
    }
}
