//! SDR USB Peripheral Main Application
//!
//! Entry point for the STM32G474-based SDR USB peripheral firmware.
//! Initializes hardware, builds the USB device and spawns async tasks.

#![no_std]
#![no_main]

use core::cell::RefCell;

use embassy_executor::Spawner;
use embassy_futures::yield_now;
use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, Pull, Speed};
use embassy_stm32::mode::Blocking;
use embassy_stm32::spi::{self, Spi};
use embassy_stm32::time::Hertz;
use embassy_stm32::usb::{self as stm32_usb, Driver};
use embassy_stm32::{bind_interrupts, peripherals};
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_usb::{Builder, UsbDevice};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use sdr_usb_firmware::drivers::register_bus::RegisterBus;
use sdr_usb_firmware::drivers::register_file::{CachedRegisterBus, RegisterFile};
use sdr_usb_firmware::hal::gpio::{ModeLeds, StatusLed};
use sdr_usb_firmware::hal::sample_port::MmioSamplePort;
use sdr_usb_firmware::prelude::*;
use sdr_usb_firmware::radio::command::{Command, Response};
use sdr_usb_firmware::radio::frontend::FrontEnd;
use sdr_usb_firmware::radio::transceiver::Transceiver;
use sdr_usb_firmware::streaming::buffer::StreamBuffer;
use sdr_usb_firmware::streaming::clock::GatedSampleClock;
use sdr_usb_firmware::streaming::port::exchange_sample_word;
use sdr_usb_firmware::streaming::state::StreamState;
use sdr_usb_firmware::usb::bulk::{BulkPump, PumpError, UsbTransferQueue, TRANSFER_PENDING};
use sdr_usb_firmware::usb::control::{CommandSink, VendorHandler};

// Bind interrupt handlers
bind_interrupts!(struct Irqs {
    USB_LP => stm32_usb::InterruptHandler<peripherals::USB>;
});

type UsbDriver = Driver<'static, peripherals::USB>;
type BulkIn = <UsbDriver as embassy_usb::driver::Driver<'static>>::EndpointIn;
type BulkOut = <UsbDriver as embassy_usb::driver::Driver<'static>>::EndpointOut;
type XcvrRegisters = CachedRegisterBus<Spi<'static, Blocking>, Output<'static>, XCVR_NUM_REGS>;
type Xcvr = Transceiver<'static, Output<'static>, XcvrRegisters, STREAM_BUFFER_SIZE>;

/// Everything the main loop, the vendor handler and the pump share
struct Core {
    xcvr: Xcvr,
    clock: GatedSampleClock<Output<'static>>,
    port: MmioSamplePort,
    endpoint: UsbTransferQueue,
    leds: ModeLeds<'static>,
}

type SharedCore = Mutex<ThreadModeRawMutex, RefCell<Core>>;

static STATE: StreamState<STREAM_BUFFER_SIZE> = StreamState::new();
static BUFFER: Mutex<ThreadModeRawMutex, RefCell<StreamBuffer<STREAM_BUFFER_SIZE>>> =
    Mutex::new(RefCell::new(StreamBuffer::new()));

static CORE: StaticCell<SharedCore> = StaticCell::new();
static HANDLER: StaticCell<VendorHandler<CoreSink>> = StaticCell::new();
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

/// Routes vendor requests into the shared core
struct CoreSink(&'static SharedCore);

impl CommandSink for CoreSink {
    fn execute(&mut self, command: Command) -> Result<Response> {
        self.0.lock(|cell| {
            let mut guard = cell.borrow_mut();
            let core = &mut *guard;
            let response = core.xcvr.handle(command, &mut core.clock, &mut core.endpoint)?;
            core.leds.show(core.xcvr.transceiver_mode());
            Ok(response)
        })
    }

    fn usb_configuration_changed(&mut self, configured: bool) {
        self.0.lock(|cell| {
            let mut guard = cell.borrow_mut();
            let core = &mut *guard;
            if let Err(err) =
                core.xcvr
                    .on_usb_configuration_changed(configured, &mut core.clock, &mut core.endpoint)
            {
                warn!("usb reset: {}", err);
            }
            core.leds.show(core.xcvr.transceiver_mode());
        });
    }
}

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("SDR USB peripheral firmware v{}", env!("CARGO_PKG_VERSION"));

    let mut config = embassy_stm32::Config::default();
    {
        use embassy_stm32::rcc::*;
        // 16 MHz HSI / 4 * 85 / 2 = 170 MHz
        config.rcc.pll = Some(Pll {
            source: PllSource::HSI,
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL85,
            divp: None,
            divq: None,
            divr: Some(PllRDiv::DIV2),
        });
        config.rcc.sys = Sysclk::PLL1_R;
        config.rcc.boost = true;
        config.rcc.hsi48 = Some(Hsi48Config { sync_from_usb: true });
        config.rcc.mux.clk48sel = mux::Clk48sel::HSI48;
    }
    let p = embassy_stm32::init(config);

    info!("Peripherals initialized at {} Hz", SYSTEM_CLOCK_HZ);

    // Transceiver register bus: SPI1 (SCK PB3, MOSI PB5, MISO PB4), 16-bit
    // frames, software chip select on PA4
    let mut spi_config = spi::Config::default();
    spi_config.frequency = Hertz(XCVR_SPI_FREQUENCY_HZ);
    let spi = Spi::new_blocking(p.SPI1, p.PB3, p.PB5, p.PB4, spi_config);
    let cs = Output::new(p.PA4, Level::High, Speed::VeryHigh);
    let bus = defmt::unwrap!(RegisterBus::new(spi, cs));
    let registers = CachedRegisterBus::new(bus, RegisterFile::new());

    // Front-end control lines: enable PC4, TX PC6, RX PC5
    let frontend = defmt::unwrap!(FrontEnd::new(
        Output::new(p.PC4, Level::Low, Speed::Low),
        Output::new(p.PC6, Level::Low, Speed::Low),
        Output::new(p.PC5, Level::Low, Speed::Low),
    ));

    // Sample clock gate PB0, word strobe PB1
    let clock = defmt::unwrap!(GatedSampleClock::new(Output::new(
        p.PB0,
        Level::Low,
        Speed::VeryHigh
    )));
    let strobe = ExtiInput::new(p.PB1, p.EXTI1, Pull::Down);

    // SAFETY: the shift register block is only ever reached through this port.
    let port = unsafe { MmioSamplePort::new() };

    // RX LED PB10, TX LED PB11, heartbeat PA5
    let leds = ModeLeds::new(
        Output::new(p.PB10, Level::Low, Speed::Low),
        Output::new(p.PB11, Level::Low, Speed::Low),
    );
    let status = StatusLed::new(Output::new(p.PA5, Level::Low, Speed::Low));

    let core: &'static SharedCore = CORE.init(Mutex::new(RefCell::new(Core {
        xcvr: Transceiver::new(frontend, registers, &STATE),
        clock,
        port,
        endpoint: UsbTransferQueue::new(),
        leds,
    })));

    info!("Transceiver in {}", STATE.mode());

    // USB device: vendor class, one bulk IN/OUT pair
    let driver = Driver::new(p.USB, Irqs, p.PA12, p.PA11);
    let mut usb_config = embassy_usb::Config::new(USB_VID, USB_PID);
    usb_config.manufacturer = Some("SDR Project");
    usb_config.product = Some("SDR USB peripheral");
    usb_config.serial_number = Some("0001");
    usb_config.max_power = 100;
    usb_config.max_packet_size_0 = 64;

    let mut builder = Builder::new(
        driver,
        usb_config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        &mut [],
        CONTROL_BUF.init([0; 64]),
    );
    builder.handler(HANDLER.init(VendorHandler::new(CoreSink(core))));

    let mut function = builder.function(0xFF, 0x00, 0x00);
    let mut interface = function.interface();
    let mut alt = interface.alt_setting(0xFF, 0x00, 0x00, None);
    let ep_in = alt.endpoint_bulk_in(USB_BULK_PACKET_SIZE);
    let ep_out = alt.endpoint_bulk_out(USB_BULK_PACKET_SIZE);
    drop(function);
    let usb = builder.build();

    info!("USB device built, VID {=u16:#x} PID {=u16:#x}", USB_VID, USB_PID);

    // Spawn background tasks
    spawner.spawn(usb_device_task(usb)).unwrap();
    spawner
        .spawn(bulk_pump_task(BulkPump::new(ep_in, ep_out), core))
        .unwrap();
    spawner.spawn(sample_tick_task(strobe, core)).unwrap();
    spawner.spawn(heartbeat_task(status)).unwrap();

    info!("Tasks spawned, entering main loop");

    // Main loop - start sequence and half scheduling
    loop {
        core.lock(|cell| {
            let mut guard = cell.borrow_mut();
            let core = &mut *guard;
            if let Err(err) = core
                .xcvr
                .service(&mut core.clock, &mut core.endpoint, &mut core.port)
            {
                warn!("stream: {}", err);
            }
        });
        yield_now().await;
    }
}

/// Runs the USB device state machine and endpoint 0
#[embassy_executor::task]
async fn usb_device_task(mut usb: UsbDevice<'static, UsbDriver>) {
    usb.run().await;
}

/// Moves queued half-buffer transfers over the bulk endpoints
#[embassy_executor::task]
async fn bulk_pump_task(mut pump: BulkPump<BulkIn, BulkOut>, core: &'static SharedCore) {
    loop {
        pump.wait_enabled().await;

        let next = core.lock(|cell| cell.borrow_mut().endpoint.pop());
        let Some(transfer) = next else {
            TRANSFER_PENDING.wait().await;
            continue;
        };

        match pump.run(&transfer, &BUFFER).await {
            Ok(()) => core.lock(|cell| {
                let mut guard = cell.borrow_mut();
                let core = &mut *guard;
                let completed = BUFFER.lock(|buffer| {
                    core.xcvr.on_transfer_complete(
                        transfer.completion,
                        &buffer.borrow(),
                        &mut core.clock,
                        &mut core.port,
                    )
                });
                match completed {
                    Ok(outcome) => trace!("usb: {} done", outcome),
                    Err(err) => warn!("usb: completion failed: {}", err),
                }
            }),
            Err(PumpError::Cancelled) => debug!("usb: transfer cancelled"),
            Err(PumpError::Endpoint(err)) => {
                warn!("usb: bulk transfer failed: {}", err);
                let outcome = core.lock(|cell| {
                    cell.borrow_mut()
                        .xcvr
                        .on_transfer_failed(transfer.completion)
                });
                trace!("usb: {}", outcome);
            }
        }
    }
}

/// Moves one sample word between the shift register and the stream buffer
/// on every strobe
#[embassy_executor::task]
async fn sample_tick_task(mut strobe: ExtiInput<'static>, core: &'static SharedCore) {
    loop {
        strobe.wait_for_rising_edge().await;
        core.lock(|cell| {
            let mut guard = cell.borrow_mut();
            BUFFER.lock(|buffer| {
                exchange_sample_word(&mut guard.port, &STATE, &mut *buffer.borrow_mut());
            });
        });
    }
}

/// Heartbeat task - blinks LED to show system is running
#[embassy_executor::task]
async fn heartbeat_task(mut led: StatusLed<'static>) {
    loop {
        led.toggle();
        let period = if STATE.mode().is_streaming() { 100 } else { 500 };
        Timer::after(Duration::from_millis(period)).await;
    }
}
