use crate::{
    register, Address, Error, ERROR_HEAD, HEAD, MAX_PAYLOAD_LEN, READ_FLAG, WRITE_PAYLOAD_COUNT,
};

/// Longest command frame: a register write.
pub const MAX_COMMAND_LEN: usize = 9;

/// Longest response frame the driver accepts.
pub const MAX_RESPONSE_LEN: usize = 1 + 1 + 2 + 2 + MAX_PAYLOAD_LEN + 2 + 1;

const READ_COMMAND_LEN: usize = 5;

/// Low 8 bits of the sum of `bytes`.
///
/// Frames are checksummed over everything after the header byte.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |sum, &b| sum.wrapping_add(b))
}

/// A command sent to the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandFrame {
    /// Address byte as sent, read flag included.
    pub address: u8,
    pub register: u16,
    /// Value to write. `None` for reads.
    pub value: Option<i16>,
}

impl CommandFrame {
    pub fn read(address: Address, register: u16) -> Self {
        Self {
            address: address.read_byte(),
            register,
            value: None,
        }
    }

    pub fn write(address: Address, register: u16, value: i16) -> Self {
        Self {
            address: address.write_byte(),
            register,
            value: Some(value),
        }
    }

    pub fn is_read(&self) -> bool {
        self.address & READ_FLAG != 0
    }

    /// Serializes the frame, returning the buffer and the number of bytes used.
    ///
    /// Reads are `AA addr reg reg cs`, writes are
    /// `AA addr reg reg 00 01 val val cs`.
    pub fn encode(&self) -> ([u8; MAX_COMMAND_LEN], usize) {
        let mut buf = [0u8; MAX_COMMAND_LEN];
        buf[0] = HEAD;
        buf[1] = self.address;
        buf[2..4].copy_from_slice(&self.register.to_be_bytes());
        let mut len = 4;
        if let Some(value) = self.value {
            buf[4..6].copy_from_slice(&WRITE_PAYLOAD_COUNT.to_be_bytes());
            buf[6..8].copy_from_slice(&value.to_be_bytes());
            len = 8;
        }
        buf[len] = checksum(&buf[1..len]);
        (buf, len + 1)
    }

    /// Parses a complete command frame.
    ///
    /// The checksum is verified before the structure, so any corrupted byte
    /// after the header shows up as [`Error::ChecksumMismatch`].
    pub fn decode(bytes: &[u8]) -> Result<Self, Error> {
        let (&received, body) = match bytes.split_last() {
            Some((cs, rest)) if rest.len() >= READ_COMMAND_LEN - 1 => (cs, rest),
            _ => return Err(Error::InvalidFrame),
        };
        let expected = checksum(&body[1..]);
        if expected != received {
            return Err(Error::ChecksumMismatch { expected, received });
        }
        if body[0] != HEAD {
            return Err(Error::InvalidFrame);
        }

        let address = body[1];
        let register = u16::from_be_bytes([body[2], body[3]]);
        let is_read = address & READ_FLAG != 0;
        match (body.len(), is_read) {
            (4, true) => Ok(Self {
                address,
                register,
                value: None,
            }),
            (8, false) if u16::from_be_bytes([body[4], body[5]]) == WRITE_PAYLOAD_COUNT => {
                Ok(Self {
                    address,
                    register,
                    value: Some(i16::from_be_bytes([body[6], body[7]])),
                })
            }
            _ => Err(Error::InvalidFrame),
        }
    }
}

/// Header kind of a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// `0xAA`
    Success,
    /// `0xEE`, the sensor rejected the command.
    Error,
}

impl ResponseKind {
    pub fn from_header(byte: u8) -> Option<Self> {
        match byte {
            HEAD => Some(ResponseKind::Success),
            ERROR_HEAD => Some(ResponseKind::Error),
            _ => None,
        }
    }

    pub fn header(self) -> u8 {
        match self {
            ResponseKind::Success => HEAD,
            ResponseKind::Error => ERROR_HEAD,
        }
    }
}

/// A reply received from the sensor.
///
/// The declared payload length is one less than the number of payload bytes
/// actually sent. Replies on [`register::MEASUREMENT_RESULT`] carry a signal
/// quality word between the payload and the checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseFrame {
    pub kind: ResponseKind,
    pub address: u8,
    pub register: u16,
    /// Length field as found on the wire.
    pub payload_length: u16,
    payload: [u8; MAX_PAYLOAD_LEN],
    pub signal_quality: Option<u16>,
    pub checksum: u8,
}

impl ResponseFrame {
    /// Builds a well-formed reply with a correct checksum.
    ///
    /// `payload` must hold between 1 and 4 bytes. A signal quality is
    /// attached only to measurement result replies (0 if none given).
    pub fn new(
        kind: ResponseKind,
        address: u8,
        register: u16,
        payload: &[u8],
        signal_quality: Option<u16>,
    ) -> Result<Self, Error> {
        if payload.is_empty() {
            return Err(Error::InvalidFrame);
        }
        if payload.len() > MAX_PAYLOAD_LEN {
            return Err(Error::PayloadTooLong((payload.len() - 1) as u16));
        }
        let mut bytes = [0u8; MAX_PAYLOAD_LEN];
        bytes[..payload.len()].copy_from_slice(payload);
        let signal_quality = (register == register::MEASUREMENT_RESULT)
            .then(|| signal_quality.unwrap_or(0));

        let mut frame = Self {
            kind,
            address,
            register,
            payload_length: (payload.len() - 1) as u16,
            payload: bytes,
            signal_quality,
            checksum: 0,
        };
        frame.checksum = frame.computed_checksum();
        Ok(frame)
    }

    // Assembles a frame read off the wire. `payload_length + 1` must not
    // exceed MAX_PAYLOAD_LEN; the checksum is left unverified.
    pub(crate) fn from_wire(
        kind: ResponseKind,
        address: u8,
        register: u16,
        payload_length: u16,
        payload: [u8; MAX_PAYLOAD_LEN],
        signal_quality: Option<u16>,
        checksum: u8,
    ) -> Self {
        Self {
            kind,
            address,
            register,
            payload_length,
            payload,
            signal_quality,
            checksum,
        }
    }

    /// Payload bytes: one more than the declared length.
    pub fn payload(&self) -> &[u8] {
        &self.payload[..usize::from(self.payload_length) + 1]
    }

    /// Payload as a big-endian signed integer.
    pub fn value(&self) -> i32 {
        let payload = self.payload();
        let sign: i32 = if payload[0] & 0x80 != 0 { -1 } else { 0 };
        payload
            .iter()
            .fold(sign, |acc, &b| (acc << 8) | i32::from(b))
    }

    /// Checksum over address, register, length, payload and signal quality.
    pub fn computed_checksum(&self) -> u8 {
        let sum = checksum(&[self.address])
            .wrapping_add(checksum(&self.register.to_be_bytes()))
            .wrapping_add(checksum(&self.payload_length.to_be_bytes()))
            .wrapping_add(checksum(self.payload()));
        match self.signal_quality {
            Some(quality) => sum.wrapping_add(checksum(&quality.to_be_bytes())),
            None => sum,
        }
    }

    pub fn verify_checksum(&self) -> Result<(), Error> {
        let expected = self.computed_checksum();
        if expected != self.checksum {
            log::error!(
                "Bad checksum: calculated {:02X}, received {:02X}. Frame: {:?}",
                expected,
                self.checksum,
                self
            );
            return Err(Error::ChecksumMismatch {
                expected,
                received: self.checksum,
            });
        }
        Ok(())
    }

    /// Whether this reply answers a command on `expected`.
    ///
    /// A write to the measurement trigger is answered on the measurement
    /// result register.
    pub fn answers(&self, expected: u16) -> bool {
        self.register == expected
            || (self.register == register::MEASUREMENT_RESULT && expected == register::MEASURE)
    }

    /// Serializes the frame, returning the buffer and the number of bytes used.
    pub fn encode(&self) -> ([u8; MAX_RESPONSE_LEN], usize) {
        let mut buf = [0u8; MAX_RESPONSE_LEN];
        buf[0] = self.kind.header();
        buf[1] = self.address;
        buf[2..4].copy_from_slice(&self.register.to_be_bytes());
        buf[4..6].copy_from_slice(&self.payload_length.to_be_bytes());
        let payload = self.payload();
        let mut len = 6 + payload.len();
        buf[6..len].copy_from_slice(payload);
        if let Some(quality) = self.signal_quality {
            buf[len..len + 2].copy_from_slice(&quality.to_be_bytes());
            len += 2;
        }
        buf[len] = self.checksum;
        (buf, len + 1)
    }
}
