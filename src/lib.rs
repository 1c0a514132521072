#![cfg_attr(not(test), no_std)]

use embedded_hal::digital::OutputPin;
use embedded_hal_async::delay::DelayNs;
use embedded_io_async::{Error as _, Read, Write};
use log::debug;

mod constants;
pub use constants::*;

mod error;
pub use error::*;

mod config;
pub use config::*;

mod frame;
pub use frame::*;

mod status;
pub use status::*;

/// Measurement state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Every command is answered by exactly one reply.
    Idle,
    /// The sensor streams measurement results until it receives the stop byte.
    Continuous,
}

/// Measurement speed/accuracy trade-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MeasurementMode {
    /// Sensor picks the speed.
    #[default]
    Auto,
    Slow,
    Fast,
}

impl MeasurementMode {
    /// Value written to the measurement trigger for a single measurement.
    pub fn one_shot_code(self) -> i16 {
        match self {
            MeasurementMode::Auto => 0,
            MeasurementMode::Slow => 1,
            MeasurementMode::Fast => 2,
        }
    }

    /// Value written to the measurement trigger to start streaming.
    pub fn continuous_code(self) -> i16 {
        match self {
            MeasurementMode::Auto => 4,
            MeasurementMode::Slow => 5,
            MeasurementMode::Fast => 6,
        }
    }
}

/// Represents a JRT laser distance sensor.
///
/// This struct provides methods to synchronize with the sensor, access its
/// registers and take distance measurements.
///
/// # Type Parameters
///
/// * `Serial`: The type of the serial interface used to communicate with the sensor.
///   It must implement `embedded_io_async::Read` and `embedded_io_async::Write`.
///   Reads should be bounded by a timeout; the driver never retries a failed
///   read except while synchronizing.
pub struct Jrt<Serial> {
    serial: Serial,
    config: Config,
    mode: Mode,
    last_signal_quality: Option<u16>,
    synchronized: bool,
}

impl<S> Jrt<S>
where
    S: Read + Write,
{
    /// Creates a new `Jrt` sensor instance.
    ///
    /// No bytes are exchanged until [`Jrt::init`] or [`Jrt::auto_baud`] is called.
    ///
    /// # Arguments
    ///
    /// * `serial`: The serial interface, already opened at the sensor bit rate.
    /// * `config`: The sensor configuration.
    pub fn new(serial: S, config: Config) -> Self {
        Self {
            serial,
            config,
            mode: Mode::Idle,
            last_signal_quality: None,
            synchronized: false,
        }
    }

    /// Resets the sensor and synchronizes its bit rate with the serial port.
    ///
    /// # Arguments
    ///
    /// * `rts`: The flow-control line wired to the sensor's reset input.
    /// * `delay`: Used to hold the reset line.
    pub async fn init<P, D>(&mut self, rts: &mut P, delay: &mut D) -> Result<(), Error>
    where
        P: OutputPin,
        D: DelayNs,
    {
        self.reset(rts, delay).await?;
        self.auto_baud().await.map_err(|e| {
            log::error!("Auto-baud failed during init: {:?}", e);
            e
        })?;
        debug!("JRT init sequence complete.");
        Ok(())
    }

    /// Pulses the reset line: low, high for `reset_hold_ms`, then low.
    ///
    /// The session is unsynchronized and idle afterwards.
    pub async fn reset<P, D>(&mut self, rts: &mut P, delay: &mut D) -> Result<(), Error>
    where
        P: OutputPin,
        D: DelayNs,
    {
        debug!("Resetting sensor ({} ms hold)", self.config.reset_hold_ms);
        self.synchronized = false;
        self.mode = Mode::Idle;
        rts.set_low().map_err(|_| Error::ResetLineFailure)?;
        rts.set_high().map_err(|_| Error::ResetLineFailure)?;
        delay.delay_ms(self.config.reset_hold_ms).await;
        rts.set_low().map_err(|_| Error::ResetLineFailure)?;
        Ok(())
    }

    /// Sends sync bytes until the sensor answers.
    ///
    /// Read errors and timeouts count as "no answer yet" and lead to another
    /// sync byte. Retries are unbounded unless [`Config::sync_attempts`] is set.
    ///
    /// # Returns
    ///
    /// * `Ok(())` once the sensor answered `0x00`.
    /// * `Err(Error::SynchronizationFailure)` if it answered anything else.
    /// * `Err(Error::SynchronizationTimeout)` if the attempt bound ran out.
    pub async fn auto_baud(&mut self) -> Result<(), Error> {
        self.synchronized = false;
        let mut attempts: u32 = 0;
        loop {
            if let Some(max) = self.config.sync_attempts {
                if attempts >= max {
                    log::error!("No auto-baud answer after {} attempts", attempts);
                    return Err(Error::SynchronizationTimeout { attempts });
                }
            }
            attempts += 1;

            self.write_bytes(&[AUTO_BAUD]).await?;
            let mut reply = [0u8; 1];
            match self.serial.read(&mut reply).await {
                Ok(0) => {
                    debug!("No auto-baud answer (attempt {})", attempts);
                    continue;
                }
                Err(e) => {
                    debug!("Auto-baud read error (attempt {}): {:?}", attempts, e.kind());
                    continue;
                }
                Ok(_) => {}
            }

            debug!("Auto-baud received: {:02X}", reply[0]);
            if reply[0] == SYNC_ACK {
                debug!("Auto-baud succeeded after {} attempts", attempts);
                self.synchronized = true;
                return Ok(());
            }
            log::error!("Unexpected auto-baud answer: {:02X}", reply[0]);
            return Err(Error::SynchronizationFailure(reply[0]));
        }
    }

    /// Writes a signed value to a register and returns the value echoed back.
    pub async fn write_register(&mut self, register: u16, value: i16) -> Result<i32, Error> {
        self.ensure_idle()?;
        debug!("Writing register {:#06X} with value {}", register, value);
        let frame = CommandFrame::write(self.config.address, register, value);
        self.send(&frame).await?;
        self.receive(Some(register)).await
    }

    /// Reads a register.
    pub async fn read_register(&mut self, register: u16) -> Result<i32, Error> {
        self.ensure_idle()?;
        debug!("Reading register {:#06X}", register);
        let frame = CommandFrame::read(self.config.address, register);
        self.send(&frame).await?;
        self.receive(Some(register)).await
    }

    pub async fn read_hw_version(&mut self) -> Result<i32, Error> {
        self.read_register(register::HW_VERSION).await
    }

    pub async fn read_sw_version(&mut self) -> Result<i32, Error> {
        self.read_register(register::SW_VERSION).await
    }

    /// Reads the supply voltage, in millivolts.
    pub async fn read_input_voltage(&mut self) -> Result<i32, Error> {
        self.read_register(register::INPUT_VOLTAGE).await
    }

    /// Reads the raw status code. See [`status_to_text`].
    pub async fn read_status(&mut self) -> Result<i32, Error> {
        self.read_register(register::STATUS).await
    }

    /// Reads and decodes the status register.
    pub async fn read_status_decoded(&mut self) -> Result<Status, Error> {
        let status = Status::from_code(self.read_status().await?);
        debug!("Sensor status: {}", status);
        Ok(status)
    }

    /// Switches the laser on or off. Returns the echoed register value.
    pub async fn set_laser(&mut self, enable: bool) -> Result<i32, Error> {
        self.write_register(register::LASER, i16::from(enable)).await
    }

    /// Starts streaming measurements.
    ///
    /// Poll results with [`Jrt::read_measurement`] and stop with
    /// [`Jrt::stop_continuous_measurement`]. No other command may be issued
    /// in between.
    ///
    /// # Returns
    ///
    /// * `Ok(i32)` the reply to the trigger write.
    /// * `Err(Error)` if the trigger was not acknowledged; the session stays idle.
    pub async fn start_continuous_measurement(
        &mut self,
        mode: MeasurementMode,
    ) -> Result<i32, Error> {
        debug!("Starting continuous measurement ({:?})", mode);
        let reply = self
            .write_register(register::MEASURE, mode.continuous_code())
            .await?;
        self.mode = Mode::Continuous;
        Ok(reply)
    }

    /// Reads the next streamed measurement and returns the raw distance.
    ///
    /// The signal quality of the measurement is available afterwards through
    /// [`Jrt::last_signal_quality`].
    pub async fn read_measurement(&mut self) -> Result<i32, Error> {
        self.ensure_synchronized()?;
        if self.mode != Mode::Continuous {
            return Err(Error::NotMeasuring);
        }
        self.receive(Some(register::MEASUREMENT_RESULT)).await
    }

    /// Halts continuous measurement by sending the bare stop byte.
    ///
    /// The sensor does not answer. Results already in flight may still be
    /// sitting in the receive buffer; the next reply parse skips to a header.
    pub async fn stop_continuous_measurement(&mut self) -> Result<(), Error> {
        self.ensure_synchronized()?;
        debug!("Stopping continuous measurement");
        self.write_bytes(&[STOP_CONTINUOUS]).await?;
        self.mode = Mode::Idle;
        Ok(())
    }

    /// Takes a single measurement and returns the raw distance.
    ///
    /// The reply to the trigger write carries the result on the measurement
    /// result register, along with its signal quality.
    pub async fn one_shot_measurement(&mut self, mode: MeasurementMode) -> Result<i32, Error> {
        debug!("One-shot measurement ({:?})", mode);
        self.write_register(register::MEASURE, mode.one_shot_code())
            .await
    }

    /// Signal quality of the most recent measurement result, if any.
    pub fn last_signal_quality(&self) -> Option<u16> {
        self.last_signal_quality
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn address(&self) -> Address {
        self.config.address
    }

    pub fn is_synchronized(&self) -> bool {
        self.synchronized
    }

    /// Releases the serial interface.
    pub fn release(self) -> S {
        self.serial
    }

    fn ensure_synchronized(&self) -> Result<(), Error> {
        if !self.synchronized {
            log::warn!("Sensor used before auto-baud synchronization");
            return Err(Error::NotSynchronized);
        }
        Ok(())
    }

    fn ensure_idle(&self) -> Result<(), Error> {
        self.ensure_synchronized()?;
        if self.mode == Mode::Continuous {
            log::warn!("Register access refused while continuous measurement is running");
            return Err(Error::ContinuousModeActive);
        }
        Ok(())
    }

    // Encodes and writes a command frame.
    async fn send(&mut self, frame: &CommandFrame) -> Result<(), Error> {
        let (buf, len) = frame.encode();
        debug!("Executing command: {:02X?}", &buf[..len]);
        self.write_bytes(&buf[..len]).await
    }

    // Reads one reply and validates it against the register it should answer.
    async fn receive(&mut self, expected: Option<u16>) -> Result<i32, Error> {
        let frame = self.read_frame().await?;
        frame.verify_checksum()?;

        if let Some(quality) = frame.signal_quality {
            self.last_signal_quality = Some(quality);
        }

        if let Some(expected) = expected {
            if !frame.answers(expected) {
                log::error!(
                    "Register mismatch: expected {:#06X}, received {:#06X}",
                    expected,
                    frame.register
                );
                return Err(Error::RegisterMismatch {
                    expected,
                    received: frame.register,
                });
            }
        }

        let value = frame.value();
        if frame.kind == ResponseKind::Error {
            log::warn!(
                "Sensor error response on register {:#06X}: {:02X?}",
                frame.register,
                frame.payload()
            );
            return Err(Error::SensorErrorResponse {
                register: frame.register,
                value,
            });
        }
        Ok(value)
    }

    // Reads a reply off the wire without validating it.
    async fn read_frame(&mut self) -> Result<ResponseFrame, Error> {
        let kind = self.read_header().await?;

        let mut head = [0u8; 5];
        self.serial.read_exact(&mut head).await?;
        let address = head[0];
        let register = u16::from_be_bytes([head[1], head[2]]);
        let payload_length = u16::from_be_bytes([head[3], head[4]]);

        // The length field is one short of the bytes that follow.
        let size = usize::from(payload_length) + 1;
        if size > MAX_PAYLOAD_LEN {
            return self
                .drain_oversized_frame(&head, register, payload_length)
                .await;
        }
        let mut payload = [0u8; MAX_PAYLOAD_LEN];
        self.serial.read_exact(&mut payload[..size]).await?;

        let signal_quality = if register == register::MEASUREMENT_RESULT {
            let mut quality = [0u8; 2];
            self.serial.read_exact(&mut quality).await?;
            Some(u16::from_be_bytes(quality))
        } else {
            None
        };

        let mut checksum = [0u8; 1];
        self.serial.read_exact(&mut checksum).await?;

        let frame = ResponseFrame::from_wire(
            kind,
            address,
            register,
            payload_length,
            payload,
            signal_quality,
            checksum[0],
        );
        debug!("Received frame: {:?}", frame);
        Ok(frame)
    }

    // Consumes the rest of a frame whose payload is too long to decode, so
    // the next reply starts on a clean stream. A frame that passes its
    // checksum fails with PayloadTooLong.
    async fn drain_oversized_frame(
        &mut self,
        head: &[u8; 5],
        register: u16,
        payload_length: u16,
    ) -> Result<ResponseFrame, Error> {
        let mut sum = checksum(head);
        let mut chunk = [0u8; 16];
        let mut remaining = usize::from(payload_length) + 1;
        while remaining > 0 {
            let n = remaining.min(chunk.len());
            self.serial.read_exact(&mut chunk[..n]).await?;
            sum = sum.wrapping_add(checksum(&chunk[..n]));
            remaining -= n;
        }

        let mut signal_quality = None;
        if register == register::MEASUREMENT_RESULT {
            let mut quality = [0u8; 2];
            self.serial.read_exact(&mut quality).await?;
            sum = sum.wrapping_add(checksum(&quality));
            signal_quality = Some(u16::from_be_bytes(quality));
        }

        let mut received = [0u8; 1];
        self.serial.read_exact(&mut received).await?;
        if sum != received[0] {
            log::error!(
                "Bad checksum on oversized frame: calculated {:02X}, received {:02X}",
                sum,
                received[0]
            );
            return Err(Error::ChecksumMismatch {
                expected: sum,
                received: received[0],
            });
        }
        if let Some(quality) = signal_quality {
            self.last_signal_quality = Some(quality);
        }

        log::error!(
            "Payload length {} on register {:#06X} exceeds {} bytes",
            payload_length,
            register,
            MAX_PAYLOAD_LEN
        );
        Err(Error::PayloadTooLong(payload_length))
    }

    // Skips bytes until a success or error header shows up.
    async fn read_header(&mut self) -> Result<ResponseKind, Error> {
        loop {
            let mut byte = [0u8; 1];
            self.serial.read_exact(&mut byte).await?;
            match ResponseKind::from_header(byte[0]) {
                Some(kind) => return Ok(kind),
                None => log::warn!("Discarding {:02X} while waiting for a frame header", byte[0]),
            }
        }
    }

    async fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.serial
            .write_all(bytes)
            .await
            .map_err(|e| Error::WriteFailure(e.kind()))?;
        self.serial
            .flush()
            .await
            .map_err(|e| Error::WriteFailure(e.kind()))
    }
}
