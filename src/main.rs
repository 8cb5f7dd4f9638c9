#![no_std]
#![no_main]

extern crate alloc;

// Required for ESP-IDF bootloader compatibility
// Use explicit parameters to ensure correct efuse block revision values
esp_bootloader_esp_idf::esp_app_desc!(
    env!("CARGO_PKG_VERSION"), // version
    env!("CARGO_PKG_NAME"),    // project_name
    "00:00:00",                // build_time
    "2025-01-01",              // build_date
    "0.0.0",                   // idf_ver (not using IDF)
    0x10000,                   // mmu_page_size (64KB)
    0,                         // min_efuse_blk_rev_full (accept all)
    u16::MAX                   // max_efuse_blk_rev_full (accept all)
);

use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Receiver;
use esp_backtrace as _;
use esp_hal::gpio::{Input, InputConfig, Level, Output, OutputConfig, Pull};
use esp_hal::timer::timg::TimerGroup;
use static_cell::StaticCell;

use rsc_sensor_rust_firmware::ble;
use rsc_sensor_rust_firmware::ble::peripheral::{LinkState, LINK_STATE, PROFILE_EVENTS};

/// Debounce window after a profile button press
const BUTTON_DEBOUNCE_MS: u64 = 250;

/// Blink period of the advertising LED
const ADVERTISING_BLINK_MS: u64 = 500;

/// Type alias for the link state receiver feeding the LED task
type LinkReceiver = Receiver<'static, CriticalSectionRawMutex, LinkState, 4>;

/// Static executor for embassy
static EXECUTOR: StaticCell<esp_rtos::embassy::Executor> = StaticCell::new();

/// Static cell for esp-radio controller (needed for 'static lifetime)
static RADIO_CONTROLLER: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();

/// Type alias for the BLE controller
type BleController = trouble_host::prelude::ExternalController<
    esp_radio::ble::controller::BleConnector<'static>,
    10,
>;

#[esp_hal::main]
fn main() -> ! {
    // Initialise heap allocator for BLE support (64KB - BLE requires significant heap)
    esp_alloc::heap_allocator!(size: 64 * 1024);

    let peripherals = esp_hal::init(esp_hal::Config::default());

    // Status LED (active low)
    let led = Output::new(peripherals.GPIO48, Level::Low, OutputConfig::default());

    // Boot button selects the walking/running profile
    let button = Input::new(peripherals.GPIO0, InputConfig::default().with_pull(Pull::Up));

    // Initialise the RTOS scheduler with timer - MUST be done before any async operations
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    // Read unique device ID from eFuse MAC address (last 3 bytes)
    let mac = esp_hal::efuse::Efuse::read_base_mac_address();
    let device_id: [u8; 3] = [mac[3], mac[4], mac[5]];

    // Initialise esp-radio for BLE support (must be after esp_rtos::start)
    let radio_controller =
        RADIO_CONTROLLER.init(esp_radio::init().expect("Failed to initialize esp-radio"));

    // Create BLE connector (ownership is passed to ExternalController)
    let ble_connector = esp_radio::ble::controller::BleConnector::new(
        radio_controller,
        peripherals.BT,
        esp_radio::ble::Config::default(),
    )
    .expect("Failed to initialize BLE connector");

    // Wrap in ExternalController for trouble-host compatibility
    let controller: BleController = trouble_host::prelude::ExternalController::new(ble_connector);

    // Create and run the embassy executor
    let executor = EXECUTOR.init(esp_rtos::embassy::Executor::new());
    executor.run(|spawner| {
        spawner.must_spawn(async_main(spawner, button, led, controller, device_id));
    })
}

#[embassy_executor::task]
async fn async_main(
    spawner: Spawner,
    button: Input<'static>,
    led: Output<'static>,
    ble_controller: BleController,
    device_id: [u8; 3],
) {
    spawner.spawn(button_task(button)).unwrap();
    spawner.spawn(led_task(led, LINK_STATE.receiver())).unwrap();
    spawner.spawn(ble_host_task(ble_controller, device_id)).unwrap();
}

/// Task that turns button presses into profile toggle events
#[embassy_executor::task]
async fn button_task(mut button: Input<'static>) {
    loop {
        button.wait_for_falling_edge().await;
        // Full channel means a toggle is already queued; drop this press
        let _ = PROFILE_EVENTS.try_send(());
        embassy_time::Timer::after(embassy_time::Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;
    }
}

/// Task that mirrors the link state on the status LED
///
/// Blinks while advertising, solid once a peer is connected (active low).
#[embassy_executor::task]
async fn led_task(mut led: Output<'static>, receiver: LinkReceiver) {
    use embassy_futures::select::{select, Either};

    let mut state = LinkState::Advertising;
    loop {
        match state {
            LinkState::Advertising => {
                led.toggle();
                match select(
                    receiver.receive(),
                    embassy_time::Timer::after(embassy_time::Duration::from_millis(
                        ADVERTISING_BLINK_MS,
                    )),
                )
                .await
                {
                    Either::First(next) => state = next,
                    Either::Second(()) => {}
                }
            }
            LinkState::Connected { .. } => {
                led.set_low();
                state = receiver.receive().await;
            }
        }
    }
}

/// Task that manages BLE connectivity
///
/// Runs the RSC peripheral: advertising, connections, the GATT server and
/// the session scheduler.
#[embassy_executor::task]
async fn ble_host_task(controller: BleController, device_id: [u8; 3]) {
    ble::peripheral::run(controller, device_id).await;
}
