//! Waveshare 7.5" V2 (800x480, black/white) on a Raspberry Pi HAT.
//!
//! Wraps the `epd-waveshare` driver. SPI goes through the kernel `spidev`
//! device, which also drives chip select; DC, RST and BUSY are requested
//! from the GPIO character device.

use crate::config::HardwareConfig;
use crate::display::{DisplayBuffer, DisplayDriver};
use crate::error::DisplayError;
use crate::image::MonoImage;
use embedded_hal::{
    delay::DelayNs,
    digital::{InputPin, OutputPin},
    spi::SpiDevice,
};
use epd_waveshare::{epd7in5_v2::Epd7in5, prelude::*};
use linux_embedded_hal::{
    gpio_cdev::{Chip, LineRequestFlags},
    spidev::{SpiModeFlags, SpidevOptions},
    CdevPin, Delay, SpidevDevice,
};
use tracing::{debug, info};

pub const EPD_WIDTH: u32 = 800;
pub const EPD_HEIGHT: u32 = 480;

const SPI_SPEED_HZ: u32 = 4_000_000;

fn hw_error<E: core::fmt::Debug>(context: &str) -> impl Fn(E) -> DisplayError + '_ {
    move |e| DisplayError(format!("{context}: {e:?}"))
}

/// Panel plus the bus it hangs off.
pub struct Epd7in5Display<SPI, BUSY, DC, RST, DELAY> {
    spi: SPI,
    epd: Epd7in5<SPI, BUSY, DC, RST, DELAY>,
    delay: DELAY,
}

/// The concrete Pi wiring
pub type PiEpd7in5 = Epd7in5Display<SpidevDevice, CdevPin, CdevPin, CdevPin, Delay>;

impl<SPI, BUSY, DC, RST, DELAY> Epd7in5Display<SPI, BUSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    /// Reset and initialize the controller.
    pub fn new(
        mut spi: SPI,
        busy: BUSY,
        dc: DC,
        rst: RST,
        mut delay: DELAY,
    ) -> Result<Self, DisplayError> {
        let epd = Epd7in5::new(&mut spi, busy, dc, rst, &mut delay, None)
            .map_err(hw_error("EPD init failed"))?;
        Ok(Self { spi, epd, delay })
    }
}

/// Open the panel described by `hw`.
pub fn open(hw: &HardwareConfig) -> Result<PiEpd7in5, DisplayError> {
    info!("Opening {} for the e-ink panel", hw.spi_device);
    let mut spi = SpidevDevice::open(&hw.spi_device).map_err(hw_error("opening SPI device"))?;
    let options = SpidevOptions::new()
        .bits_per_word(8)
        .max_speed_hz(SPI_SPEED_HZ)
        .mode(SpiModeFlags::SPI_MODE_0)
        .build();
    spi.configure(&options).map_err(hw_error("configuring SPI"))?;

    debug!(
        "GPIO wiring: cs={} (kernel), dc={}, rst={}, busy={}",
        hw.cs_pin, hw.dc_pin, hw.rst_pin, hw.busy_pin
    );
    let mut chip = Chip::new(&hw.gpio_chip).map_err(hw_error("opening GPIO chip"))?;
    let mut request = |pin: u32, flags: LineRequestFlags, default: u8, label: &str| {
        let handle = chip
            .get_line(pin)
            .and_then(|line| line.request(flags, default, label))
            .map_err(hw_error("requesting GPIO line"))?;
        CdevPin::new(handle).map_err(hw_error("creating GPIO pin"))
    };

    let busy = request(hw.busy_pin, LineRequestFlags::INPUT, 0, "zivyobraz-busy")?;
    let dc = request(hw.dc_pin, LineRequestFlags::OUTPUT, 0, "zivyobraz-dc")?;
    let rst = request(hw.rst_pin, LineRequestFlags::OUTPUT, 1, "zivyobraz-rst")?;

    Epd7in5Display::new(spi, busy, dc, rst, Delay {})
}

impl<SPI, BUSY, DC, RST, DELAY> DisplayDriver for Epd7in5Display<SPI, BUSY, DC, RST, DELAY>
where
    SPI: SpiDevice,
    BUSY: InputPin,
    DC: OutputPin,
    RST: OutputPin,
    DELAY: DelayNs,
{
    fn initialize(&mut self) -> Result<(), DisplayError> {
        self.epd
            .wake_up(&mut self.spi, &mut self.delay)
            .map_err(hw_error("EPD wake up failed"))
    }

    fn render(&mut self, image: &MonoImage) -> Result<(), DisplayError> {
        if (image.width(), image.height()) != (EPD_WIDTH, EPD_HEIGHT) {
            return Err(DisplayError(format!(
                "frame is {}x{}, panel is {}x{}",
                image.width(),
                image.height(),
                EPD_WIDTH,
                EPD_HEIGHT
            )));
        }
        let buffer = DisplayBuffer::from_image(image);
        info!("Sending {} byte frame to e-ink display", buffer.as_bytes().len());
        self.epd
            .update_and_display_frame(&mut self.spi, buffer.as_bytes(), &mut self.delay)
            .map_err(hw_error("EPD frame update failed"))
    }

    fn sleep(&mut self) -> Result<(), DisplayError> {
        self.epd
            .sleep(&mut self.spi, &mut self.delay)
            .map_err(hw_error("EPD sleep failed"))
    }
}
