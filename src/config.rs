use crate::{Error, MIN_RESET_HOLD_MS, READ_FLAG};

/// 7-bit bus address of the sensor.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Default)]
pub struct Address(u8);

impl Address {
    /// Creates an address, rejecting values that use the read flag bit.
    pub fn new(address: u8) -> Result<Address, Error> {
        if address & READ_FLAG != 0 {
            return Err(Error::InvalidAddress(address));
        }
        Ok(Address(address))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Address byte for a write command.
    pub fn write_byte(self) -> u8 {
        self.0
    }

    /// Address byte for a read command.
    pub fn read_byte(self) -> u8 {
        self.0 | READ_FLAG
    }
}

/// Configuration settings for the JRT sensor.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Config {
    /// The sensor address.
    pub address: Address,
    /// Upper bound on unanswered auto-baud bytes. `None` retries forever.
    pub sync_attempts: Option<u32>,
    /// How long the reset line is held high, in milliseconds.
    pub reset_hold_ms: u32,
}

impl Config {
    /// Creates a new `Config` instance.
    ///
    /// # Arguments
    ///
    /// * `address` - The `Address` of the sensor.
    ///
    /// # Returns
    ///
    /// A new `Config` with unbounded synchronization and the minimum reset hold.
    pub fn new(address: Address) -> Config {
        Config {
            address,
            ..Config::default()
        }
    }

    /// Sets the sensor address.
    pub fn address(mut self, address: Address) -> Self {
        self.address = address;
        self
    }

    /// Bounds auto-baud to `attempts` sync bytes.
    ///
    /// Without a bound the driver keeps sending sync bytes for as long as the
    /// transport keeps timing out, which is how the sensor vendor tooling
    /// behaves.
    pub fn sync_attempts(mut self, attempts: u32) -> Self {
        self.sync_attempts = Some(attempts);
        self
    }

    /// Sets the reset hold time. Values below 500 ms are raised to 500 ms.
    pub fn reset_hold_ms(mut self, ms: u32) -> Self {
        self.reset_hold_ms = ms.max(MIN_RESET_HOLD_MS);
        self
    }
}

impl Default for Config {
    /// Returns the default configuration.
    ///
    /// Address 0, unbounded auto-baud and a 500 ms reset hold.
    fn default() -> Config {
        Config {
            address: Address::default(),
            sync_attempts: None,
            reset_hold_ms: MIN_RESET_HOLD_MS,
        }
    }
}
