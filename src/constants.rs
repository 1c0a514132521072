// HEAD marks the beginning of every command frame and of a successful reply.
pub const HEAD: u8 = 0xAA;

// ERROR_HEAD replaces HEAD on replies the sensor rejected. These frames are
// still checksummed.
pub const ERROR_HEAD: u8 = 0xEE;

// READ_FLAG is or-ed into the address byte of read commands.
pub const READ_FLAG: u8 = 0x80;

// AUTO_BAUD is sent repeatedly after reset until the sensor answers SYNC_ACK.
pub const AUTO_BAUD: u8 = 0x55;
pub const SYNC_ACK: u8 = 0x00;

// STOP_CONTINUOUS halts continuous measurement. It is sent bare, no frame.
pub const STOP_CONTINUOUS: u8 = b'X';

// Writes always carry exactly one register unit.
pub const WRITE_PAYLOAD_COUNT: u16 = 1;

/// Bit rate the sensor comes up with after reset.
pub const DEFAULT_BAUD_RATE: u32 = 19_200;

/// Minimum time the reset line is held high.
pub const MIN_RESET_HOLD_MS: u32 = 500;

/// Largest reply payload the driver decodes (a distance is at most 4 bytes).
pub const MAX_PAYLOAD_LEN: usize = 4;

/// Register map.
pub mod register {
    /// Status code, see [`crate::Status`].
    pub const STATUS: u16 = 0x00;
    /// Input voltage in millivolts.
    pub const INPUT_VOLTAGE: u16 = 0x06;
    pub const HW_VERSION: u16 = 0x0A;
    pub const SW_VERSION: u16 = 0x0C;
    pub const LASER: u16 = 0x1BE;
    /// Measurement trigger. Writing it starts a one-shot or continuous measurement.
    pub const MEASURE: u16 = 0x20;
    /// Measurement result. Only ever seen in replies, followed by a signal quality word.
    pub const MEASUREMENT_RESULT: u16 = 0x22;
}
