//! Fixed Modbus frames understood by the S8 and the checks applied to its replies.

use crc::{CRC_16_MODBUS, Crc};

use crate::S8Error;

/// "Any sensor" address; the S8 answers on it regardless of its own address.
pub const SENSOR_ADDRESS: u8 = 0xFE;

pub mod function_code {
    pub const READ_HOLDING_REGISTERS: u8 = 0x03;
    pub const READ_INPUT_REGISTERS: u8 = 0x04;
    pub const WRITE_SINGLE_REGISTER: u8 = 0x06;
}

pub const REQUEST_LEN: usize = 8;
pub const READ_RESPONSE_LEN: usize = 7;
pub const WRITE_RESPONSE_LEN: usize = 8;

/// ABC period written by [`WRITE_ABC_PERIOD_COMMAND`], in hours.
pub const ABC_PERIOD_HOURS: u16 = 180;

/// Input register 0x0003 (space CO2), one register.
pub const READ_CO2_REQUEST: [u8; REQUEST_LEN] = [0xFE, 0x04, 0x00, 0x03, 0x00, 0x01, 0xD5, 0xC5];
/// Holding register 0x001F (ABC period), one register.
pub const READ_ABC_PERIOD_REQUEST: [u8; REQUEST_LEN] = [0xFE, 0x03, 0x00, 0x1F, 0x00, 0x01, 0xA1, 0xC3];
/// Sets holding register 0x001F to [`ABC_PERIOD_HOURS`].
pub const WRITE_ABC_PERIOD_COMMAND: [u8; REQUEST_LEN] = [0xFE, 0x06, 0x00, 0x1F, 0x00, 0xB4, 0xAC, 0x74];

const CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// CRC-16/MODBUS with its bytes swapped, so it compares equal to the
/// trailing two frame bytes read big-endian.
pub(crate) fn crc16(data: &[u8]) -> u16 {
    CRC.checksum(data).swap_bytes()
}

pub(crate) fn check_header(request: &[u8], response: &[u8]) -> Result<(), S8Error> {
    if response[0] != request[0] || response[1] != request[1] {
        return Err(S8Error::HeaderMismatch {
            address: response[0],
            function: response[1],
        });
    }
    Ok(())
}

/// Verifies the checksum of a read reply and returns its register value.
pub(crate) fn decode_register(response: &[u8; READ_RESPONSE_LEN]) -> Result<u16, S8Error> {
    let (body, trailer) = response.split_at(READ_RESPONSE_LEN - 2);
    let expected = u16::from_be_bytes([trailer[0], trailer[1]]);
    let computed = crc16(body);
    if expected != computed {
        return Err(S8Error::ChecksumMismatch { expected, computed });
    }
    Ok(u16::from_be_bytes([response[3], response[4]]))
}
