//! WaveCard firmware - Main Entry Point
//!
//! Hardware-only entry point for STM32H743ZI.

#![no_std]
#![no_main]

use core::cell::RefCell;

use critical_section::Mutex;
use embassy_executor::Spawner;
use embassy_stm32::dma::NoDma;
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_stm32::spi::{Config as SpiConfig, Spi};
use embassy_stm32::time::Hertz;
use embassy_stm32::{interrupt, pac, peripherals};
use embassy_time::{Delay, Duration, Timer};
use platform::bus::SpiCardBus;
use platform::config::{banner, APP_VERSION, SPI_INIT_FREQUENCY_HZ, SPI_RUN_FREQUENCY_HZ};
use playback::{PlaybackConfig, Player, SampleEmitter, SharedPlayback};
use sdcard::{SdBlockDevice, SdCard};

use firmware::{jukebox, FatStorage, FixedTime, Mcp4921, MountError, Tim6SampleTimer};

// RTT transport + panic handler
use defmt_rtt as _;
use panic_probe as _;

type CardSpi = Spi<'static, peripherals::SPI1, NoDma, NoDma>;
type Card = SdCard<SpiCardBus<CardSpi, Output<'static, peripherals::PA4>>, Delay>;
type Dac = Mcp4921<
    Output<'static, peripherals::PB0>,
    Output<'static, peripherals::PB1>,
    Output<'static, peripherals::PB2>,
>;

/// Buffers and counters shared with the TIM6 interrupt.
static PLAYBACK: SharedPlayback = SharedPlayback::new();

/// Sample emitter, owned by the TIM6 interrupt once installed.
static EMITTER: Mutex<RefCell<Option<SampleEmitter<'static, Dac>>>> = Mutex::new(RefCell::new(None));

#[interrupt]
fn TIM6_DAC() {
    pac::TIM6.sr().modify(|w| w.set_uif(false));
    critical_section::with(|cs| {
        if let Some(emitter) = EMITTER.borrow_ref_mut(cs).as_mut() {
            // GPIO writes on this HAL cannot fail; a fallible DAC stops
            // this match from compiling.
            match emitter.on_tick() {
                Ok(_) => {}
                Err(never) => match never {},
            }
        }
    });
}

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    defmt::info!("{=str} v{=str}", banner(), APP_VERSION);

    // Step 1: clocks (see firmware::boot::BOOT_SEQUENCE_STEPS)
    let p = embassy_stm32::init(firmware::boot::build_embassy_config());

    // Step 2: SPI1 to the card at the identification clock.
    // PA5 (SCK), PA7 (MOSI), PA6 (MISO), PA4 (CS, active low)
    let mut spi_config = SpiConfig::default();
    spi_config.frequency = Hertz(SPI_INIT_FREQUENCY_HZ);
    let spi = Spi::new_blocking(p.SPI1, p.PA5, p.PA7, p.PA6, spi_config);
    let card_cs = Output::new(p.PA4, Level::High, Speed::VeryHigh);
    let mut card: Card = SdCard::new(SpiCardBus::new(spi, card_cs), Delay);

    // Step 3: MCP4921 on PB0 (CS), PB1 (SCK), PB2 (SDI)
    let dac = match Mcp4921::new(
        Output::new(p.PB0, Level::High, Speed::VeryHigh),
        Output::new(p.PB1, Level::Low, Speed::VeryHigh),
        Output::new(p.PB2, Level::Low, Speed::VeryHigh),
    ) {
        Ok(dac) => dac,
        Err(never) => match never {},
    };
    critical_section::with(|cs| {
        EMITTER
            .borrow_ref_mut(cs)
            .replace(SampleEmitter::new(&PLAYBACK, dac));
    });

    // Step 4: sample timer
    let mut timer = Tim6SampleTimer::new(p.TIM6);
    let mut player = Player::new(&PLAYBACK, PlaybackConfig::default());

    // Steps 5-6, forever. Any storage error re-initialises the card.
    loop {
        if let Err(e) = bring_up(&mut card) {
            defmt::warn!("card bring-up failed: {}", e);
            Timer::after(Duration::from_secs(1)).await;
            continue;
        }

        let mut storage = match FatStorage::mount(SdBlockDevice::new(card), FixedTime) {
            Ok(storage) => storage,
            Err(MountError { device, error }) => {
                defmt::warn!("mount failed: {}", defmt::Debug2Format(&error));
                card = device.into_inner();
                Timer::after(Duration::from_secs(1)).await;
                continue;
            }
        };

        match jukebox::play_root(&mut storage, &mut player, &mut timer) {
            Ok(report) if report.played == 0 => {
                defmt::info!("nothing playable in root directory");
                Timer::after(Duration::from_secs(5)).await;
            }
            Ok(report) => defmt::info!("{}", report),
            Err(e) => defmt::warn!("storage error: {}", defmt::Debug2Format(&e)),
        }
        card = storage.unmount().into_inner();
    }
}

/// Identify the card at the slow clock, then switch SPI1 to the run clock.
fn bring_up(card: &mut Card) -> Result<(), sdcard::DiskError> {
    let mut slow = SpiConfig::default();
    slow.frequency = Hertz(SPI_INIT_FREQUENCY_HZ);
    if card.bus_mut().spi_mut().set_config(&slow).is_err() {
        defmt::warn!("SPI1 rejected the identification clock");
    }

    let kind = card.initialize()?;
    defmt::info!("card: {}", kind);

    let mut fast = SpiConfig::default();
    fast.frequency = Hertz(SPI_RUN_FREQUENCY_HZ);
    if card.bus_mut().spi_mut().set_config(&fast).is_err() {
        defmt::warn!("SPI1 rejected the run clock, staying slow");
    }

    match card.num_blocks() {
        Ok(blocks) => defmt::info!("{=u32} blocks", blocks),
        Err(e) => defmt::warn!("CSD read failed: {}", e),
    }
    Ok(())
}
