use core::fmt;

/// Text returned for codes the sensor documentation does not list.
pub const UNKNOWN_STATUS: &str = "Unknown status";

/// Hardware fault number, 1 to 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareFault(u8);

impl HardwareFault {
    const TEXT: [&'static str; 7] = [
        "Hardware fault 1",
        "Hardware fault 2",
        "Hardware fault 3",
        "Hardware fault 4",
        "Hardware fault 5",
        "Hardware fault 6",
        "Hardware fault 7",
    ];

    fn from_code(code: i32) -> Option<Self> {
        match code {
            10..=14 => Some(HardwareFault((code - 9) as u8)),
            16 | 17 => Some(HardwareFault((code - 10) as u8)),
            _ => None,
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }

    fn code(self) -> i32 {
        // fault 6 and 7 sit after the "signal not stable" code
        match self.0 {
            n @ 1..=5 => 9 + i32::from(n),
            n => 10 + i32::from(n),
        }
    }

    fn text(self) -> &'static str {
        Self::TEXT[usize::from(self.0 - 1)]
    }
}

/// Status code reported by the sensor in its status register.
///
/// These are measurement conditions, not protocol failures: a frame carrying
/// `TargetOutOfRange` is still a perfectly valid frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    NoError,
    PowerTooLow,
    /// Internal error, safe to ignore.
    InternalError,
    TemperatureTooLow,
    TemperatureTooHigh,
    TargetOutOfRange,
    InvalidMeasurement,
    BackgroundLightTooStrong,
    SignalTooWeak,
    SignalTooStrong,
    HardwareFault(HardwareFault),
    SignalNotStable,
    /// The sensor could not parse the last frame it received.
    InvalidFrame,
    Unknown(i32),
}

impl Status {
    pub fn from_code(code: i32) -> Status {
        match code {
            0 => Status::NoError,
            1 => Status::PowerTooLow,
            2 => Status::InternalError,
            3 => Status::TemperatureTooLow,
            4 => Status::TemperatureTooHigh,
            5 => Status::TargetOutOfRange,
            6 => Status::InvalidMeasurement,
            7 => Status::BackgroundLightTooStrong,
            8 => Status::SignalTooWeak,
            9 => Status::SignalTooStrong,
            15 => Status::SignalNotStable,
            0x81 => Status::InvalidFrame,
            other => match HardwareFault::from_code(other) {
                Some(fault) => Status::HardwareFault(fault),
                None => Status::Unknown(other),
            },
        }
    }

    pub fn code(self) -> i32 {
        match self {
            Status::NoError => 0,
            Status::PowerTooLow => 1,
            Status::InternalError => 2,
            Status::TemperatureTooLow => 3,
            Status::TemperatureTooHigh => 4,
            Status::TargetOutOfRange => 5,
            Status::InvalidMeasurement => 6,
            Status::BackgroundLightTooStrong => 7,
            Status::SignalTooWeak => 8,
            Status::SignalTooStrong => 9,
            Status::HardwareFault(fault) => fault.code(),
            Status::SignalNotStable => 15,
            Status::InvalidFrame => 0x81,
            Status::Unknown(code) => code,
        }
    }

    pub fn text(self) -> &'static str {
        match self {
            Status::NoError => "No error",
            Status::PowerTooLow => "Power too low",
            Status::InternalError => "Internal error; ignore",
            Status::TemperatureTooLow => "Module temperature too low",
            Status::TemperatureTooHigh => "Module temperature too high",
            Status::TargetOutOfRange => "Target out of range",
            Status::InvalidMeasurement => "Invalid measure result",
            Status::BackgroundLightTooStrong => "Background light too strong",
            Status::SignalTooWeak => "Laser signal too weak",
            Status::SignalTooStrong => "Laser signal too strong",
            Status::HardwareFault(fault) => fault.text(),
            Status::SignalNotStable => "Laser signal not stable",
            Status::InvalidFrame => "Invalid frame",
            Status::Unknown(_) => UNKNOWN_STATUS,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Describes a raw status code. Never fails; unlisted codes map to
/// [`UNKNOWN_STATUS`].
pub fn status_to_text(code: i32) -> &'static str {
    Status::from_code(code).text()
}
