//! Test doubles: a simulated DS28C36 on the far side of a `Transport`, and a
//! delay provider that records settle times instead of sleeping.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use embedded_hal::delay::DelayNs;

use crate::error::Error;
use crate::memory::{PAGE_COUNT, PAGE_SIZE, ROM_ID_OFFSET, MAN_ID_OFFSET};
use crate::protocol::commands::{Command, ResultCode};
use crate::protocol::crc8;
use crate::transport::Transport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusEvent {
    Write(Vec<u8>),
    Read(usize),
    Delay(Duration),
}

pub type EventLog = Rc<RefCell<Vec<BusEvent>>>;

/// Records every requested delay into the shared event log
pub struct RecordingDelay {
    events: EventLog,
}

impl RecordingDelay {
    pub fn new(events: EventLog) -> Self {
        Self { events }
    }
}

impl DelayNs for RecordingDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.events
            .borrow_mut()
            .push(BusEvent::Delay(Duration::from_nanos(ns as u64)));
    }
}

/// In-memory DS28C36 answering command frames
pub struct SimulatedDevice {
    pub pages: [[u8; PAGE_SIZE]; PAGE_COUNT],
    pub protection: [u8; PAGE_COUNT],
    pub buffer: Vec<u8>,
    pub hmac_secret: [u8; 32],
    /// Truncate the next read to this many bytes
    pub short_read: Option<usize>,
    /// Answer every result-bearing command with this code instead
    pub forced_result: Option<ResultCode>,
    #[cfg(feature = "verify")]
    pub signing_key: Option<p256::ecdsa::SigningKey>,
    pending: Vec<u8>,
    events: EventLog,
}

impl SimulatedDevice {
    pub fn new(events: EventLog) -> Self {
        Self {
            pages: [[0u8; PAGE_SIZE]; PAGE_COUNT],
            protection: [0u8; PAGE_COUNT],
            buffer: Vec::new(),
            hmac_secret: [0x5C; 32],
            short_read: None,
            forced_result: None,
            #[cfg(feature = "verify")]
            signing_key: None,
            pending: Vec::new(),
            events,
        }
    }

    /// Put a ROM ID (family code, 6 serial bytes, CRC) and MANID into page 28
    pub fn set_rom_id(&mut self, serial: [u8; 6], family: u8, man_id: [u8; 2]) -> [u8; 8] {
        let mut rom_id = [0u8; 8];
        rom_id[0] = family;
        rom_id[1..7].copy_from_slice(&serial);
        rom_id[7] = crc8::checksum(&rom_id[..7]);
        self.pages[28][ROM_ID_OFFSET..ROM_ID_OFFSET + 8].copy_from_slice(&rom_id);
        self.pages[28][MAN_ID_OFFSET..MAN_ID_OFFSET + 2].copy_from_slice(&man_id);
        rom_id
    }

    /// Install a signing key and publish its public half in pages 16/17
    #[cfg(feature = "verify")]
    pub fn install_key_a(&mut self, secret: [u8; 32]) {
        let key = p256::ecdsa::SigningKey::from_slice(&secret).unwrap();
        let point = key.verifying_key().to_encoded_point(false);
        self.pages[16].copy_from_slice(point.x().unwrap());
        self.pages[17].copy_from_slice(point.y().unwrap());
        self.signing_key = Some(key);
    }

    fn result_only(&mut self, result: ResultCode) {
        self.pending = vec![0x01, result.byte()];
    }

    fn success_with(&mut self, payload: &[u8]) {
        let mut response = vec![(payload.len() + 1) as u8, ResultCode::SUCCESS];
        response.extend_from_slice(payload);
        self.pending = response;
    }

    fn handle(&mut self, frame: &[u8]) {
        let Some(command) = Command::from_code(frame[0]) else {
            self.result_only(ResultCode::FailParameter);
            return;
        };

        if command == Command::ReadBuffer {
            let mut response = vec![self.buffer.len() as u8];
            response.extend_from_slice(&self.buffer);
            self.pending = response;
            return;
        }
        if command == Command::WriteBuffer {
            let len = frame[1] as usize;
            self.buffer = frame[2..2 + len].to_vec();
            return;
        }

        if let Some(forced) = self.forced_result {
            self.result_only(forced);
            return;
        }

        let parameter = frame.get(2).copied().unwrap_or(0);
        let page = parameter as usize;
        match command {
            Command::ReadMemory => {
                if page >= PAGE_COUNT {
                    self.result_only(ResultCode::FailParameter);
                } else if self.protection[page] & 0x01 != 0 {
                    self.result_only(ResultCode::FailProtection);
                } else {
                    let data = self.pages[page];
                    self.success_with(&data);
                }
            }
            Command::WriteMemory => {
                if page >= PAGE_COUNT {
                    self.result_only(ResultCode::FailParameter);
                } else if self.protection[page] & 0x02 != 0 {
                    self.result_only(ResultCode::FailProtection);
                } else {
                    self.pages[page].copy_from_slice(&frame[3..3 + PAGE_SIZE]);
                    self.result_only(ResultCode::Success);
                }
            }
            Command::ReadPageProtection if page < PAGE_COUNT => {
                let protection = self.protection[page];
                self.success_with(&[protection]);
            }
            Command::SetPageProtection if page < PAGE_COUNT => {
                // protection bits are one-way: they can be set, never cleared
                self.protection[page] |= frame[3];
                self.result_only(ResultCode::Success);
            }
            Command::DecrementCounter => {
                let counter = u32::from_le_bytes([self.pages[27][0], self.pages[27][1], self.pages[27][2], 0]);
                if counter == 0 {
                    self.result_only(ResultCode::FailProtection);
                } else {
                    let bytes = (counter - 1).to_le_bytes();
                    self.pages[27][..3].copy_from_slice(&bytes[..3]);
                    self.result_only(ResultCode::Success);
                }
            }
            Command::ReadRandom => {
                let len = parameter as usize + 1;
                let random: Vec<u8> = (0..len).map(|i| (i as u8).wrapping_mul(37) ^ 0xA5).collect();
                self.success_with(&random);
            }
            Command::ComputeAndReadAuth => {
                let authority = parameter >> 5;
                let page = (parameter & 0x1F) as usize;
                match authority {
                    0..=2 => {
                        let mut mac = [0u8; 32];
                        for (i, out) in mac.iter_mut().enumerate() {
                            let challenge = self.buffer.get(i).copied().unwrap_or(0);
                            *out = challenge ^ self.hmac_secret[i] ^ self.pages[page][i] ^ authority;
                        }
                        self.success_with(&mac);
                    }
                    3..=5 => {
                        let signature = self.sign(page);
                        self.success_with(&signature);
                    }
                    _ => self.result_only(ResultCode::FailParameter),
                }
            }
            _ => self.result_only(ResultCode::FailParameter),
        }
    }

    #[cfg(feature = "verify")]
    fn sign(&self, page: usize) -> Vec<u8> {
        use p256::ecdsa::{Signature, signature::hazmat::PrehashSigner};

        let Some(key) = &self.signing_key else {
            return vec![0xEE; 64];
        };
        let mut rom_id = [0u8; 8];
        rom_id.copy_from_slice(&self.pages[28][ROM_ID_OFFSET..ROM_ID_OFFSET + 8]);
        let mut man_id = [0u8; 2];
        man_id.copy_from_slice(&self.pages[28][MAN_ID_OFFSET..MAN_ID_OFFSET + 2]);
        let mut challenge = [0u8; 32];
        challenge.copy_from_slice(&self.buffer[..32]);

        let digest = crate::verify::message_digest(&rom_id, &self.pages[page], &challenge, page as u8, &man_id);
        let signature: Signature = key.sign_prehash(&digest).unwrap();
        let (r, s) = signature.split_bytes();

        // device order: S then R
        let mut out = s.to_vec();
        out.extend_from_slice(&r);
        out
    }

    #[cfg(not(feature = "verify"))]
    fn sign(&self, _page: usize) -> Vec<u8> {
        vec![0xEE; 64]
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                BusEvent::Write(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of bus transactions (writes and reads) seen so far
    pub fn transaction_count(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|e| !matches!(e, BusEvent::Delay(_)))
            .count()
    }
}

impl Transport for SimulatedDevice {
    fn write(&mut self, bytes: &[u8]) -> Result<usize, Error> {
        self.events.borrow_mut().push(BusEvent::Write(bytes.to_vec()));
        self.handle(bytes);
        Ok(bytes.len())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Result<usize, Error> {
        self.events.borrow_mut().push(BusEvent::Read(buffer.len()));
        // an idle I2C bus reads back as 0xFF
        buffer.fill(0xFF);
        let available = self.pending.len().min(buffer.len());
        buffer[..available].copy_from_slice(&self.pending[..available]);
        self.pending.clear();

        match self.short_read.take() {
            Some(limit) => Ok(limit.min(buffer.len())),
            None => Ok(buffer.len()),
        }
    }
}
