//! Firmware table discovery and retrieval.
//!
//! The platform exposes firmware tables through two calls that share the same
//! size-then-fetch protocol:
//!
//! 1. Call with an empty buffer to learn the required byte count (zero means
//!    failure).
//! 2. Call again with a buffer of exactly that size; the returned count must
//!    match the declared one.
//!
//! [`FirmwareInterface`] is the seam over those two raw calls. Everything
//! above it ([`list_tables`], [`find_table`], [`fetch_table`]) goes through
//! [`query_sized`], so the two-call dance lives in one place.

use std::fmt;

use crate::errors::{OemKeyError, OemKeyResult, QueryFailure};

#[cfg(target_os = "windows")]
pub mod windows;

/// Name of the enumeration call, used in error messages.
pub const ENUM_TABLES_CALL: &str = "EnumSystemFirmwareTables";
/// Name of the retrieval call, used in error messages.
pub const GET_TABLE_CALL: &str = "GetSystemFirmwareTable";

/// A four byte firmware table tag, kept in its on-disk byte order.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; 4]);

impl Signature {
    /// Microsoft Software Licensing table.
    pub const MSDM: Signature = Signature(*b"MSDM");

    pub const fn new(bytes: [u8; 4]) -> Self {
        Signature(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// The table id DWORD the platform expects for this signature.
    ///
    /// ACPI table ids are the tag bytes read as a little-endian integer.
    pub fn as_table_id(&self) -> u32 {
        u32::from_le_bytes(self.0)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &b in &self.0 {
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "\\x{:02x}", b)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature(\"{}\")", self)
    }
}

/// A class of firmware tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableProvider {
    Acpi,
}

impl TableProvider {
    /// The provider signature DWORD the platform expects.
    ///
    /// Unlike table ids, provider tags are read big-endian.
    pub fn id(&self) -> u32 {
        match self {
            TableProvider::Acpi => u32::from_be_bytes(*b"ACPI"),
        }
    }
}

impl fmt::Display for TableProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableProvider::Acpi => write!(f, "ACPI"),
        }
    }
}

/// Raw access to the platform's firmware table calls.
///
/// Both methods follow the platform convention: an empty `buffer` asks for the
/// required size, otherwise the data is written into `buffer`. The return
/// value is a byte count, and zero signals failure.
pub trait FirmwareInterface {
    /// Write the signatures of every table in `provider` as packed 4 byte tags.
    fn enumerate(&self, provider: TableProvider, buffer: &mut [u8]) -> u32;

    /// Write the raw bytes of one table.
    fn table(&self, provider: TableProvider, signature: Signature, buffer: &mut [u8]) -> u32;
}

/// Firmware interface for platforms that do not expose firmware tables.
///
/// Every query reports zero bytes, which surfaces as `QueryFailed`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unsupported;

impl FirmwareInterface for Unsupported {
    fn enumerate(&self, _provider: TableProvider, _buffer: &mut [u8]) -> u32 {
        0
    }

    fn table(&self, _provider: TableProvider, _signature: Signature, _buffer: &mut [u8]) -> u32 {
        0
    }
}

/// The firmware interface of the running platform.
pub fn platform() -> Box<dyn FirmwareInterface> {
    #[cfg(target_os = "windows")]
    {
        Box::new(windows::Win32Firmware)
    }
    #[cfg(not(target_os = "windows"))]
    {
        log::debug!("No firmware table interface on this platform");
        Box::new(Unsupported)
    }
}

/// Run the size-then-fetch protocol and return a buffer of the declared size.
///
/// `call` is invoked once with an empty buffer and once with the sized one.
pub fn query_sized<F>(name: &'static str, mut call: F) -> OemKeyResult<Vec<u8>>
where
    F: FnMut(&mut [u8]) -> u32,
{
    let declared = call(&mut []);
    if declared == 0 {
        return Err(OemKeyError::QueryFailed {
            call: name,
            reason: QueryFailure::ZeroSize,
        });
    }

    let mut buffer = vec![0u8; declared as usize];
    let returned = call(&mut buffer);
    if returned != declared {
        return Err(OemKeyError::QueryFailed {
            call: name,
            reason: QueryFailure::SizeMismatch { declared, returned },
        });
    }

    log::trace!("{} returned {} bytes", name, declared);
    Ok(buffer)
}

/// List the signatures of every table the provider exposes, in platform order.
pub fn list_tables(
    fw: &(impl FirmwareInterface + ?Sized),
    provider: TableProvider,
) -> OemKeyResult<Vec<Signature>> {
    let raw = query_sized(ENUM_TABLES_CALL, |buf| fw.enumerate(provider, buf))?;

    // A trailing partial tag is not a signature.
    let signatures: Vec<Signature> = raw
        .chunks_exact(4)
        .map(|chunk| Signature([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    log::debug!(
        "{} provider lists {} tables: {}",
        provider,
        signatures.len(),
        signatures
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    Ok(signatures)
}

/// Confirm the provider exposes `signature`.
pub fn find_table(
    fw: &(impl FirmwareInterface + ?Sized),
    provider: TableProvider,
    signature: Signature,
) -> OemKeyResult<()> {
    if list_tables(fw, provider)?.contains(&signature) {
        Ok(())
    } else {
        Err(OemKeyError::NotFound {
            provider,
            signature,
        })
    }
}

/// Fetch the raw bytes of one table.
pub fn fetch_table(
    fw: &(impl FirmwareInterface + ?Sized),
    provider: TableProvider,
    signature: Signature,
) -> OemKeyResult<Vec<u8>> {
    let table = query_sized(GET_TABLE_CALL, |buf| fw.table(provider, signature, buf))?;
    log::debug!("Fetched {} table ({} bytes)", signature, table.len());
    Ok(table)
}
