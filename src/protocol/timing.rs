/// Settle times between transmitting a command and reading its response
///
/// The device NAKs or returns garbage when read before its internal
/// processing finishes, so each command carries a minimum delay. Overrides
/// can only lengthen a delay.

use core::time::Duration;

use super::commands::Command;

/// EEPROM page read (tRM)
pub const READ_MEMORY: Duration = Duration::from_micros(1_500);
/// EEPROM page write (tWM)
pub const WRITE_MEMORY: Duration = Duration::from_micros(12_500);
/// Protection byte read
pub const READ_PROTECTION: Duration = Duration::from_micros(500);
/// RNG generation (tRNG)
pub const READ_RANDOM: Duration = Duration::from_micros(2_000);
/// HMAC / ECDSA computation (tGES)
pub const COMPUTE_AUTH: Duration = Duration::from_millis(40);

/// Table mapping each command to its settle time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettleTimes {
    read_memory: Duration,
    write_memory: Duration,
    read_protection: Duration,
    set_protection: Duration,
    decrement_counter: Duration,
    read_random: Duration,
    compute_auth: Duration,
}

impl Default for SettleTimes {
    fn default() -> Self {
        Self {
            read_memory: READ_MEMORY,
            write_memory: WRITE_MEMORY,
            read_protection: READ_PROTECTION,
            set_protection: WRITE_MEMORY,
            decrement_counter: WRITE_MEMORY,
            read_random: READ_RANDOM,
            compute_auth: COMPUTE_AUTH,
        }
    }
}

impl SettleTimes {
    /// Minimum settle time mandated by the device for `command`
    pub fn minimum(command: Command) -> Duration {
        Self::default().get(command)
    }

    /// Settle time for `command`
    ///
    /// Commands without a table entry (buffer access and the commands this
    /// driver does not issue) need no delay beyond the bus framing.
    pub fn get(&self, command: Command) -> Duration {
        match command {
            Command::ReadMemory => self.read_memory,
            Command::WriteMemory => self.write_memory,
            Command::ReadPageProtection => self.read_protection,
            Command::SetPageProtection => self.set_protection,
            Command::DecrementCounter => self.decrement_counter,
            Command::ReadRandom => self.read_random,
            Command::ComputeAndReadAuth => self.compute_auth,
            _ => Duration::ZERO,
        }
    }

    /// Override the settle time of `command`, clamped up to the device minimum
    pub fn set(&mut self, command: Command, delay: Duration) -> &mut Self {
        let delay = delay.max(Self::minimum(command));
        match command {
            Command::ReadMemory => self.read_memory = delay,
            Command::WriteMemory => self.write_memory = delay,
            Command::ReadPageProtection => self.read_protection = delay,
            Command::SetPageProtection => self.set_protection = delay,
            Command::DecrementCounter => self.decrement_counter = delay,
            Command::ReadRandom => self.read_random = delay,
            Command::ComputeAndReadAuth => self.compute_auth = delay,
            other => log::debug!("{other:?} has no settle time, override ignored"),
        }
        self
    }
}
