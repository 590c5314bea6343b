//! oemkey - read the OEM product key from the ACPI MSDM table.
//!
//! PCs that ship with an OEM Windows license carry the product key in the
//! Microsoft Software Licensing (`MSDM`) ACPI table. This crate locates that
//! table through the platform firmware table interface, extracts the key,
//! optionally places it on the clipboard and shows it to the user.
//!
//! # Example
//!
//! ```rust,no_run
//! use oemkey::{app, clipboard, firmware, notify};
//!
//! let fw = firmware::platform();
//! let clip = clipboard::platform();
//! let chain = notify::platform_chain(true);
//!
//! match app::run(fw.as_ref(), Some(clip.as_ref()), &chain) {
//!     Ok(outcome) => println!("{} bytes", outcome.key.len()),
//!     Err(e) => eprintln!("{e}"),
//! }
//! ```

pub mod app;
pub mod clipboard;
pub mod config;
pub mod errors;
pub mod firmware;
pub mod logging;
pub mod msdm;
pub mod notify;
