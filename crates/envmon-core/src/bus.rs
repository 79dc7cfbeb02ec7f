//! Register-addressed serial bus seam
//!
//! The sensor driver only ever needs two primitives from its transport: read a
//! run of consecutive registers and write a single register. [`RegisterBus`]
//! captures exactly that, so the driver can run over a real I2C peripheral on
//! the device and over an in-memory register map in the simulator and tests.

use embedded_hal::i2c::{Error as _, ErrorKind, I2c, SevenBitAddress};
use thiserror_no_std::Error;

/// A bus transaction did not complete.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    #[error("bus transaction on register {register:#04x} failed: {kind:?}")]
    Bus { register: u8, kind: ErrorKind },
}

/// Synchronous access to a device exposing 8-bit register addresses.
///
/// Calls are assumed non-reentrant and non-overlapping. Implementations either
/// complete the whole transfer or report a [`TransportError`]; retries, if any,
/// belong to the implementation.
pub trait RegisterBus {
    /// Read `buf.len()` consecutive registers starting at `register`.
    fn read_registers(&mut self, register: u8, buf: &mut [u8]) -> Result<(), TransportError>;

    /// Write a single register.
    fn write_register(&mut self, register: u8, value: u8) -> Result<(), TransportError>;
}

impl<T: RegisterBus + ?Sized> RegisterBus for &mut T {
    #[inline]
    fn read_registers(&mut self, register: u8, buf: &mut [u8]) -> Result<(), TransportError> {
        (**self).read_registers(register, buf)
    }

    #[inline]
    fn write_register(&mut self, register: u8, value: u8) -> Result<(), TransportError> {
        (**self).write_register(register, value)
    }
}

/// [`RegisterBus`] over any blocking `embedded-hal` I2C implementation.
///
/// Register reads are a single write-read transaction (register pointer, then
/// repeated-start burst read), which the BME280 auto-increments through.
///
/// # Example
///
/// ```ignore
/// let i2c = esp_hal::i2c::master::I2c::new(peripherals.I2C0, config)?;
/// let bus = I2cRegisterBus::new(i2c, 0x77);
/// ```
pub struct I2cRegisterBus<I> {
    i2c: I,
    address: SevenBitAddress,
}

impl<I> I2cRegisterBus<I> {
    /// Create a new `I2cRegisterBus` talking to the device at `address`.
    #[inline]
    pub const fn new(i2c: I, address: SevenBitAddress) -> Self {
        Self { i2c, address }
    }

    /// The 7-bit device address this bus targets.
    pub const fn address(&self) -> SevenBitAddress {
        self.address
    }

    /// Give the underlying peripheral back.
    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: I2c> RegisterBus for I2cRegisterBus<I> {
    #[inline]
    fn read_registers(&mut self, register: u8, buf: &mut [u8]) -> Result<(), TransportError> {
        self.i2c
            .write_read(self.address, &[register], buf)
            .map_err(|e| TransportError::Bus {
                register,
                kind: e.kind(),
            })
    }

    #[inline]
    fn write_register(&mut self, register: u8, value: u8) -> Result<(), TransportError> {
        self.i2c
            .write(self.address, &[register, value])
            .map_err(|e| TransportError::Bus {
                register,
                kind: e.kind(),
            })
    }
}
