#![cfg_attr(not(test), no_std)]
#![cfg_attr(not(test), no_main)]

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod frame;
mod s8_sensor;
mod stream;

use core::fmt::{Display, Formatter};
use embassy_time::Duration;

pub use s8_sensor::S8Sensor;
pub use stream::{IoStream, SerialStream};

/// Exchange settings. `Default` matches the timing the sensor firmware expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct S8Config {
    /// Write human readable progress and failures to the diagnostic sink.
    pub debug: bool,
    /// Requests sent while waiting for the first response byte.
    pub transmit_attempts: u8,
    /// Polls while waiting for the rest of the response.
    pub response_checks: u8,
    pub poll_interval: Duration,
}

impl S8Config {
    pub const fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}

impl Default for S8Config {
    fn default() -> Self {
        Self {
            debug: false,
            transmit_attempts: 10,
            response_checks: 10,
            poll_interval: Duration::from_millis(50),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum S8Error {
    /// Nothing came back after every transmit attempt.
    NoResponse,
    /// The stream ran dry after `received` bytes of the response.
    IncompleteResponse { received: usize },
    HeaderMismatch { address: u8, function: u8 },
    ChecksumMismatch { expected: u16, computed: u16 },
    SerialError,
}

impl Display for S8Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        match self {
            S8Error::NoResponse => f.write_str("no response from sensor"),
            S8Error::IncompleteResponse { received } => {
                write!(f, "response ended after {received} bytes")
            }
            S8Error::HeaderMismatch { address, function } => {
                write!(f, "unexpected header: {address:02x} {function:02x}")
            }
            S8Error::ChecksumMismatch { expected, computed } => {
                write!(f, "CRC mismatch: {expected:04x} != {computed:04x}")
            }
            S8Error::SerialError => f.write_str("serial write failed"),
        }
    }
}

impl core::error::Error for S8Error {}

/// Result of writing the ABC period.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WriteOutcome {
    /// The sensor echoed the command unchanged.
    Success,
    /// A complete reply arrived but differs from the command.
    Mismatch { echo: [u8; frame::WRITE_RESPONSE_LEN] },
    CommunicationError(S8Error),
}

impl WriteOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, WriteOutcome::Success)
    }
}
