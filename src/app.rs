//! The key extraction run.
//!
//! 1. Enumerate the ACPI tables.
//! 2. Confirm `MSDM` is among them.
//! 3. Fetch the table.
//! 4. Parse out the key.
//! 5. Try to copy it to the clipboard.
//! 6. Show the key and the clipboard outcome.
//!
//! Steps 1 to 4 are fatal on failure: the error is shown and returned. The
//! clipboard step only changes the status line shown in step 6.

use crate::clipboard::TextClipboard;
use crate::errors::OemKeyResult;
use crate::firmware::{fetch_table, find_table, FirmwareInterface, Signature, TableProvider};
use crate::msdm::{extract_key, ProductKey};
use crate::notify::{ClipboardStatus, Notice, PresenterChain};

/// The result of a successful run.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub key: ProductKey,
    pub clipboard: ClipboardStatus,
    /// Name of the presenter that showed the key
    pub presenter: &'static str,
}

/// Locate, fetch and parse the MSDM table.
pub fn extract_product_key(fw: &dyn FirmwareInterface) -> OemKeyResult<ProductKey> {
    let provider = TableProvider::Acpi;

    find_table(fw, provider, Signature::MSDM)?;
    let table = fetch_table(fw, provider, Signature::MSDM)?;
    extract_key(&table)
}

/// Copy `key` to `clipboard`, or skip when there is none.
pub fn transfer_to_clipboard(
    key: &ProductKey,
    clipboard: Option<&dyn TextClipboard>,
) -> ClipboardStatus {
    let Some(clipboard) = clipboard else {
        return ClipboardStatus::Disabled;
    };

    match clipboard.copy_text(key.as_bytes()) {
        Ok(()) => ClipboardStatus::Copied,
        Err(e) => {
            log::warn!("{}", e);
            ClipboardStatus::Failed
        }
    }
}

/// Run every step, reporting fatal errors through `presenters`.
///
/// Pass `None` for `clipboard` to leave the clipboard alone.
pub fn run(
    fw: &dyn FirmwareInterface,
    clipboard: Option<&dyn TextClipboard>,
    presenters: &PresenterChain,
) -> OemKeyResult<Outcome> {
    let key = match extract_product_key(fw) {
        Ok(key) => key,
        Err(e) => {
            log::error!("{}", e);
            let notice = Notice::Error {
                message: e.to_string(),
            };
            if let Err(report) = presenters.present(&notice) {
                log::error!("{}", report);
            }
            return Err(e);
        }
    };
    log::info!("Extracted {}-byte product key", key.len());

    let status = transfer_to_clipboard(&key, clipboard);
    let presenter = presenters.present(&Notice::Key {
        key: &key,
        clipboard: status,
    })?;

    Ok(Outcome {
        key,
        clipboard: status,
        presenter,
    })
}
