use std::ptr;

use windows_sys::Win32::System::SystemInformation::{
    EnumSystemFirmwareTables, GetSystemFirmwareTable,
};

use super::{FirmwareInterface, Signature, TableProvider};

/// Firmware tables through `EnumSystemFirmwareTables` and `GetSystemFirmwareTable`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Win32Firmware;

fn buffer_parts(buffer: &mut [u8]) -> (*mut u8, u32) {
    if buffer.is_empty() {
        (ptr::null_mut(), 0)
    } else {
        // Tables never approach 4 GiB; clamp rather than wrap.
        let len = u32::try_from(buffer.len()).unwrap_or(u32::MAX);
        (buffer.as_mut_ptr(), len)
    }
}

impl FirmwareInterface for Win32Firmware {
    fn enumerate(&self, provider: TableProvider, buffer: &mut [u8]) -> u32 {
        let (data, len) = buffer_parts(buffer);
        // SAFETY: `data` is null with a zero length, or points to `len` writable bytes.
        unsafe { EnumSystemFirmwareTables(provider.id(), data.cast(), len) }
    }

    fn table(&self, provider: TableProvider, signature: Signature, buffer: &mut [u8]) -> u32 {
        let (data, len) = buffer_parts(buffer);
        // SAFETY: as above; the call writes at most `len` bytes.
        unsafe { GetSystemFirmwareTable(provider.id(), signature.as_table_id(), data.cast(), len) }
    }
}
