//! ST7789 status LCD, 320×170 over SPI with DMA.

use embedded_graphics::{
    Pixel,
    pixelcolor::Rgb565,
    prelude::{
        DrawTarget,
        OriginDimensions,
        Size,
    },
    primitives::Rectangle,
};
use embedded_hal_bus::spi::ExclusiveDevice;
use esp_hal::{
    Async,
    dma::{
        DmaRxBuf,
        DmaTxBuf,
    },
    dma_buffers,
    gpio::{
        Level,
        Output,
        OutputConfig,
    },
    spi::master::Spi,
    time::Rate,
};
use mipidsi::{
    models::ST7789,
    options::{
        ColorInversion,
        Orientation,
        Rotation,
    },
};

use crate::DisplayResources;

/// Panel size in its native portrait orientation.
const PANEL_WIDTH: u16 = 170;
const PANEL_HEIGHT: u16 = 320;
/// The 170 px glass sits in the middle of the controller's 240 columns.
const PANEL_COLUMN_OFFSET: u16 = 35;

/// Only short text lines are redrawn, so the DMA and pixel buffers stay small.
const DMA_BUFFER_SIZE: usize = 4096;
const PIXEL_BUFFER_SIZE: usize = 4096;
const SPI_FREQUENCY_MHZ: u32 = 40;

type SpiInterface<'a> = mipidsi::interface::SpiInterface<
    'a,
    ExclusiveDevice<esp_hal::spi::master::SpiDmaBus<'a, Async>, Output<'a>, esp_hal::delay::Delay>,
    Output<'a>,
>;

type Lcd<'a> = mipidsi::Display<SpiInterface<'a>, ST7789, Output<'a>>;

/// The unit's LCD, drawn on through [`StatusPanel`](crate::status::StatusPanel).
///
/// The backlight starts off so the uninitialised frame memory is never shown;
/// switch it on once the first frame is drawn.
pub struct Display<'a> {
    lcd: Lcd<'a>,
    backlight: Output<'a>,
}

impl Display<'_> {
    pub fn set_backlight(&mut self, on: bool) {
        self.backlight.set_level(Level::from(on));
    }
}

impl<'a> From<DisplayResources<'a>> for Display<'a> {
    fn from(res: DisplayResources<'a>) -> Self {
        let (rx_buffer, rx_descriptors, tx_buffer, tx_descriptors) = dma_buffers!(DMA_BUFFER_SIZE);
        let dma_rx_buf = DmaRxBuf::new(rx_descriptors, rx_buffer).unwrap();
        let dma_tx_buf = DmaTxBuf::new(tx_descriptors, tx_buffer).unwrap();

        let mut delay = esp_hal::delay::Delay::new();

        let backlight = Output::new(res.backlight, Level::Low, OutputConfig::default());
        let dc = Output::new(res.dc, Level::Low, OutputConfig::default());
        let mut rst = Output::new(res.rst, Level::Low, OutputConfig::default());
        rst.set_high();

        let spi = Spi::new(
            res.spi,
            esp_hal::spi::master::Config::default()
                .with_frequency(Rate::from_mhz(SPI_FREQUENCY_MHZ)),
        )
        .unwrap()
        .with_sck(res.sck)
        .with_mosi(res.mosi)
        .with_miso(res.miso)
        .with_dma(res.dma)
        .with_buffers(dma_rx_buf, dma_tx_buf)
        .into_async();

        let cs = Output::new(res.cs, Level::High, OutputConfig::default());
        let spi_device = ExclusiveDevice::new(spi, cs, delay).unwrap();

        let buffer = crate::mk_static!([u8; PIXEL_BUFFER_SIZE], [0_u8; PIXEL_BUFFER_SIZE]);
        let di = mipidsi::interface::SpiInterface::new(spi_device, dc, buffer);

        let lcd = mipidsi::Builder::new(ST7789, di)
            .reset_pin(rst)
            .display_size(PANEL_WIDTH, PANEL_HEIGHT)
            .invert_colors(ColorInversion::Inverted)
            .orientation(Orientation::new().rotate(Rotation::Deg90))
            .display_offset(PANEL_COLUMN_OFFSET, 0)
            .init(&mut delay)
            .unwrap();

        Self { lcd, backlight }
    }
}

impl<'a> OriginDimensions for Display<'a> {
    fn size(&self) -> Size {
        self.lcd.size()
    }
}

impl<'a> DrawTarget for Display<'a> {
    type Color = Rgb565;
    type Error = <Lcd<'a> as DrawTarget>::Error;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        self.lcd.draw_iter(pixels)
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        self.lcd.fill_contiguous(area, colors)
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        self.lcd.fill_solid(area, color)
    }

    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        self.lcd.clear(color)
    }
}
