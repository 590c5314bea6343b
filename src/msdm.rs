//! MSDM table layout and product key extraction.
//!
//! The table is a standard 36 byte ACPI header followed by the licensing
//! payload header and the key itself:
//!
//! ```text
//! offset  size  field
//!      0    36  ACPI table header
//!     36     8  version        (1)
//!     44     8  data version   (1)
//!     52     4  key length (L)
//!     56     L  key bytes, no terminator
//! ```
//!
//! All integers are little-endian. Parsing only borrows the table buffer.

use std::fmt;
use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::errors::{OemKeyError, OemKeyResult};
use crate::firmware::Signature;

/// Size of the ACPI table header.
pub const ACPI_HEADER_LEN: usize = 36;
/// Size of the licensing payload header.
pub const LICENSING_HEADER_LEN: usize = 20;
/// Offset of the first key byte.
pub const KEY_OFFSET: usize = ACPI_HEADER_LEN + LICENSING_HEADER_LEN;

/// Value both licensing version fields normally carry.
pub const EXPECTED_VERSION: u64 = 1;

/// The standard ACPI system description table header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcpiTableHeader {
    pub signature: Signature,
    /// Length of the whole table, header included
    pub length: u32,
    pub revision: u8,
    pub checksum: u8,
    pub oem_id: [u8; 6],
    pub oem_table_id: [u8; 8],
    pub oem_revision: u32,
    pub creator_id: u32,
    pub creator_revision: u32,
}

impl AcpiTableHeader {
    fn read(mut rdr: &[u8]) -> io::Result<Self> {
        let mut signature = [0u8; 4];
        rdr.read_exact(&mut signature)?;
        let length = rdr.read_u32::<LittleEndian>()?;
        let revision = rdr.read_u8()?;
        let checksum = rdr.read_u8()?;
        let mut oem_id = [0u8; 6];
        rdr.read_exact(&mut oem_id)?;
        let mut oem_table_id = [0u8; 8];
        rdr.read_exact(&mut oem_table_id)?;

        Ok(Self {
            signature: Signature(signature),
            length,
            revision,
            checksum,
            oem_id,
            oem_table_id,
            oem_revision: rdr.read_u32::<LittleEndian>()?,
            creator_id: rdr.read_u32::<LittleEndian>()?,
            creator_revision: rdr.read_u32::<LittleEndian>()?,
        })
    }

    /// OEM id as text, trailing padding removed.
    pub fn oem_id_str(&self) -> String {
        padded_ascii(&self.oem_id)
    }

    pub fn oem_table_id_str(&self) -> String {
        padded_ascii(&self.oem_table_id)
    }
}

fn padded_ascii(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(['\0', ' '])
        .to_string()
}

/// Header of the software licensing payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LicensingHeader {
    pub version: u64,
    pub data_version: u64,
    /// Number of key bytes that follow the header
    pub key_length: u32,
}

impl LicensingHeader {
    fn read(mut rdr: &[u8]) -> io::Result<Self> {
        Ok(Self {
            version: rdr.read_u64::<LittleEndian>()?,
            data_version: rdr.read_u64::<LittleEndian>()?,
            key_length: rdr.read_u32::<LittleEndian>()?,
        })
    }
}

/// A parsed MSDM table borrowing the raw buffer.
#[derive(Debug, Clone, Copy)]
pub struct MsdmTable<'a> {
    pub header: AcpiTableHeader,
    pub licensing: LicensingHeader,
    raw: &'a [u8],
    key: &'a [u8],
}

impl<'a> MsdmTable<'a> {
    /// Parse the headers and locate the key.
    ///
    /// Fails with `MalformedTable` if the buffer cannot hold both headers or
    /// the key length runs past the end of the buffer.
    pub fn parse(raw: &'a [u8]) -> OemKeyResult<Self> {
        let malformed = |needed: usize| OemKeyError::MalformedTable {
            signature: Signature::MSDM,
            needed,
            actual: raw.len(),
        };

        if raw.len() < KEY_OFFSET {
            return Err(malformed(KEY_OFFSET));
        }

        let header = AcpiTableHeader::read(&raw[..ACPI_HEADER_LEN])
            .map_err(|_| malformed(ACPI_HEADER_LEN))?;
        let licensing = LicensingHeader::read(&raw[ACPI_HEADER_LEN..KEY_OFFSET])
            .map_err(|_| malformed(KEY_OFFSET))?;

        let key_end = KEY_OFFSET
            .checked_add(licensing.key_length as usize)
            .ok_or_else(|| malformed(usize::MAX))?;
        let key = raw.get(KEY_OFFSET..key_end).ok_or_else(|| malformed(key_end))?;

        Ok(Self {
            header,
            licensing,
            raw,
            key,
        })
    }

    /// The raw key bytes.
    pub fn key_bytes(&self) -> &'a [u8] {
        self.key
    }

    /// True if the bytes covered by the header length sum to zero.
    ///
    /// Returns false when the header claims more bytes than were fetched.
    pub fn checksum_valid(&self) -> bool {
        self.raw
            .get(..self.header.length as usize)
            .map(|bytes| bytes.iter().fold(0u8, |sum, &b| sum.wrapping_add(b)) == 0)
            .unwrap_or(false)
    }

    /// Log anything unusual about the table. None of it stops extraction.
    pub fn log_diagnostics(&self) {
        let header = &self.header;
        log::debug!(
            "{} rev {} oem '{}' table '{}' oem rev {:#x} creator {:#x} rev {:#x}",
            header.signature,
            header.revision,
            header.oem_id_str(),
            header.oem_table_id_str(),
            header.oem_revision,
            header.creator_id,
            header.creator_revision
        );

        if header.signature != Signature::MSDM {
            log::warn!("Table header carries signature {}", header.signature);
        }
        if header.length as usize != self.raw.len() {
            log::warn!(
                "Table header declares {} bytes, platform returned {}",
                header.length,
                self.raw.len()
            );
        }
        if !self.checksum_valid() {
            log::warn!("Table checksum does not verify");
        }
        if self.licensing.version != EXPECTED_VERSION
            || self.licensing.data_version != EXPECTED_VERSION
        {
            log::warn!(
                "Unexpected licensing header versions {}/{}",
                self.licensing.version,
                self.licensing.data_version
            );
        }
    }
}

/// The product key, exactly as stored in the table.
#[derive(Clone, PartialEq, Eq)]
pub struct ProductKey(Vec<u8>);

impl ProductKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        ProductKey(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// The key as UTF-8, if it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.0).ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

// Keys end up in logs through `{:?}`; only show the length.
impl fmt::Debug for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProductKey({} bytes)", self.0.len())
    }
}

/// Parse an MSDM table buffer and copy out its product key.
pub fn extract_key(raw: &[u8]) -> OemKeyResult<ProductKey> {
    let table = MsdmTable::parse(raw)?;
    table.log_diagnostics();
    Ok(ProductKey::new(table.key_bytes()))
}
