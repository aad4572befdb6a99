/// Page-addressed memory access
///
/// Reads always go to the device; nothing is cached on the host.

use embedded_hal::delay::DelayNs;
use log::debug;

use super::DeepCover;
use super::auth::PublicKey;
use crate::error::Error;
use crate::memory::{page_index, KeySet, Page, PageRole, ProtectionFlags, PAGE_SIZE};
use crate::protocol::commands::{Command, ResultCode};
use crate::protocol::frame::{CommandFrame, ResponseFrame};
use crate::transport::Transport;

/// Reject page indices before any bus traffic happens
fn check_page(page: u8) -> Result<u8, Error> {
    page_index(page as i64)
}

impl<T: Transport, D: DelayNs> DeepCover<T, D> {
    /// Read a page, keeping the length and result header
    pub fn read_page_frame(&mut self, page: u8) -> Result<ResponseFrame, Error> {
        let page = check_page(page)?;
        let frame = CommandFrame::new(Command::ReadMemory, page, &[])?;
        self.transact(&frame, PAGE_SIZE)
    }

    /// Read the 32-byte payload of a page
    ///
    /// A read-protected page answers `FailProtection`, surfaced as
    /// `Error::Device`.
    pub fn read_page(&mut self, page: u8) -> Result<[u8; PAGE_SIZE], Error> {
        let payload = self.read_page_frame(page)?.into_payload()?;
        payload.as_slice().try_into().map_err(|_| Error::InvalidLength {
            expected: PAGE_SIZE,
            actual: payload.len(),
        })
    }

    /// Write a full page
    ///
    /// The device result is returned as-is: `FailProtection` means the page
    /// is write protected and is data for the caller, not an error.
    pub fn write_page(&mut self, page: u8, data: &[u8]) -> Result<ResultCode, Error> {
        let page = check_page(page)?;
        if data.len() != PAGE_SIZE {
            return Err(Error::InvalidLength {
                expected: PAGE_SIZE,
                actual: data.len(),
            });
        }

        let frame = CommandFrame::new(Command::WriteMemory, page, data)?;
        let result = self.transact(&frame, 0)?.result;
        debug!("Write page {page}: {result}");
        Ok(result)
    }

    /// Read the protection flags in effect on a page
    ///
    /// Bits the device ignores on key pages (14-27) are dropped.
    pub fn read_page_protection(&mut self, page: u8) -> Result<ProtectionFlags, Error> {
        Ok(self.read_page_protection_raw(page)?.effective(page))
    }

    /// Read the protection byte of a page exactly as stored
    pub fn read_page_protection_raw(&mut self, page: u8) -> Result<ProtectionFlags, Error> {
        let page = check_page(page)?;
        let frame = CommandFrame::new(Command::ReadPageProtection, page, &[])?;
        let payload = self.transact(&frame, 1)?.into_payload()?;
        let byte = *payload.first().ok_or(Error::InvalidLength {
            expected: 1,
            actual: 0,
        })?;
        Ok(ProtectionFlags::from_byte(byte))
    }

    /// Set protection bits on a page
    ///
    /// Protection is one-way on the device: bits already set stay set.
    pub fn set_page_protection(&mut self, page: u8, flags: ProtectionFlags) -> Result<ResultCode, Error> {
        let page = check_page(page)?;
        let frame = CommandFrame::new(Command::SetPageProtection, page, &[flags.bits()])?;
        let result = self.transact(&frame, 0)?.result;
        debug!("Set protection {flags:?} on page {page}: {result}");
        Ok(result)
    }

    /// Read a page together with its role and effective protection
    pub fn read_page_with_protection(&mut self, page: u8) -> Result<Page, Error> {
        let page = check_page(page)?;
        let protection = self.read_page_protection(page)?;
        let data = self.read_page(page)?;
        Ok(Page {
            index: page,
            role: PageRole::of(page).unwrap_or(PageRole::Unused),
            protection,
            data,
        })
    }

    /// Decrement the one-way counter kept in page 27
    pub fn decrement_counter(&mut self) -> Result<ResultCode, Error> {
        let frame = CommandFrame::without_parameter(Command::DecrementCounter, &[])?;
        let result = self.transact(&frame, 0)?.result;
        debug!("Decrement counter: {result}");
        Ok(result)
    }

    /// Read a public key from its X/Y page pair
    pub fn read_public_key(&mut self, key: KeySet) -> Result<PublicKey, Error> {
        let (x_role, y_role) = key.pages();
        // every role in a key set has a fixed page
        let x = self.read_page(x_role.page().unwrap_or_default())?;
        let y = self.read_page(y_role.page().unwrap_or_default())?;
        Ok(PublicKey { x, y })
    }
}
