use embedded_io_async::{ErrorKind, ReadExactError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Checksum carried by the frame does not match the recomputed one.
    #[error("checksum mismatch: calculated {expected:#04x}, received {received:#04x}")]
    ChecksumMismatch { expected: u8, received: u8 },

    /// Reply was for another register than the one addressed.
    #[error("register mismatch: expected {expected:#06x}, received {received:#06x}")]
    RegisterMismatch { expected: u16, received: u16 },

    /// Sensor answered with an error frame (0xEE header).
    #[error("sensor rejected register {register:#06x} (value {value})")]
    SensorErrorResponse { register: u16, value: i32 },

    #[error("serial read failed: {0:?}")]
    ReadFailure(ErrorKind),

    #[error("serial write failed: {0:?}")]
    WriteFailure(ErrorKind),

    /// Transport reported end of stream in the middle of a frame.
    #[error("serial stream ended mid-frame")]
    UnexpectedEof,

    #[error("failed to drive the reset line")]
    ResetLineFailure,

    /// Auto-baud answered with something other than 0x00.
    #[error("auto-baud synchronization failed, sensor answered {0:#04x}")]
    SynchronizationFailure(u8),

    #[error("no auto-baud answer after {attempts} attempts")]
    SynchronizationTimeout { attempts: u32 },

    /// Reply carried more than 4 payload bytes. The frame was consumed.
    #[error("declared payload length {0} is too long")]
    PayloadTooLong(u16),

    #[error("malformed frame")]
    InvalidFrame,

    #[error("address {0:#04x} does not fit in 7 bits")]
    InvalidAddress(u8),

    #[error("sensor is not synchronized")]
    NotSynchronized,

    #[error("continuous measurement is running")]
    ContinuousModeActive,

    #[error("continuous measurement is not running")]
    NotMeasuring,
}

impl Error {
    /// Whether the transport gave up waiting for data.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::ReadFailure(ErrorKind::TimedOut))
    }
}

impl<E: embedded_io_async::Error> From<ReadExactError<E>> for Error {
    fn from(e: ReadExactError<E>) -> Self {
        match e {
            ReadExactError::UnexpectedEof => Error::UnexpectedEof,
            ReadExactError::Other(e) => Error::ReadFailure(e.kind()),
        }
    }
}
