//! BLE peripheral task for the RSC sensor
//!
//! Owns the GATT server and the [`RscSession`], and multiplexes the three
//! event sources per connection: GATT traffic, the periodic tick and the
//! profile selector. The session core is synchronous, so its outbound calls
//! land in a bounded queue that is flushed asynchronously after every core
//! entry point returns.

use embassy_futures::select::{select3, Either3};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Ticker};
use trouble_host::prelude::*;

use crate::ble::service::RunningSpeedCadenceService;
use crate::config::characteristic::MEASUREMENT_SIZE;
use crate::config::timing;
use crate::rsc::types::{SensorLocation, MAX_RESPONSE_SIZE};
use crate::session::{RscSession, SessionConfig};
use crate::simulator::ProfileKind;
use crate::transport::{RscTransport, TransportError};

/// Device name prefix for BLE advertising
const DEVICE_NAME_PREFIX: &str = "RscSensor-";

/// Number of maximum concurrent connections
const CONNECTIONS_MAX: usize = 1;
/// Number of L2CAP channels
const L2CAP_CHANNELS_MAX: usize = 3;

/// Connection state surfaced to the LED task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Advertising,
    Connected { running: bool },
}

/// Profile toggle events from the user button
pub static PROFILE_EVENTS: Channel<CriticalSectionRawMutex, (), 4> = Channel::new();

/// Link state updates for the LED task
pub static LINK_STATE: Channel<CriticalSectionRawMutex, LinkState, 4> = Channel::new();

/// BLE GATT server with the RSC service
#[gatt_server(mutex_type = CriticalSectionRawMutex)]
struct Server {
    rsc: RunningSpeedCadenceService,
}

/// Outbound frames queued by the session between flushes
enum Outbound {
    Measurement([u8; MEASUREMENT_SIZE]),
    ControlPointResponse(heapless::Vec<u8, MAX_RESPONSE_SIZE>),
    SensorLocation(u8),
}

/// Bounded bridge between the synchronous session and the async stack.
///
/// The queue is sized for one tick's worth of output; when it is full the
/// delivery is reported rejected and the session drops the frame, the same
/// way it handles any other transport failure.
struct OutboundQueue {
    frames: heapless::Deque<Outbound, 8>,
}

impl OutboundQueue {
    fn new() -> Self {
        Self {
            frames: heapless::Deque::new(),
        }
    }

    fn pop(&mut self) -> Option<Outbound> {
        self.frames.pop_front()
    }
}

impl RscTransport for OutboundQueue {
    fn send_measurement(&mut self, payload: &[u8; MEASUREMENT_SIZE]) -> Result<(), TransportError> {
        self.frames
            .push_back(Outbound::Measurement(*payload))
            .map_err(|_| TransportError::Rejected)
    }

    fn send_control_point_response(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let mut frame = heapless::Vec::new();
        frame
            .extend_from_slice(payload)
            .map_err(|_| TransportError::Rejected)?;
        self.frames
            .push_back(Outbound::ControlPointResponse(frame))
            .map_err(|_| TransportError::Rejected)
    }

    fn write_sensor_location(&mut self, location: SensorLocation) -> Result<(), TransportError> {
        self.frames
            .push_back(Outbound::SensorLocation(location.code()))
            .map_err(|_| TransportError::Rejected)
    }
}

/// Format device ID bytes as uppercase hex into a buffer
/// Returns the formatted string slice
fn format_device_name<'a>(buf: &'a mut [u8; 20], device_id: &[u8; 3]) -> &'a str {
    const HEX_CHARS: &[u8; 16] = b"0123456789ABCDEF";
    let prefix = DEVICE_NAME_PREFIX.as_bytes();

    buf[..prefix.len()].copy_from_slice(prefix);

    let mut pos = prefix.len();
    for &byte in device_id {
        buf[pos] = HEX_CHARS[(byte >> 4) as usize];
        buf[pos + 1] = HEX_CHARS[(byte & 0x0F) as usize];
        pos += 2;
    }

    core::str::from_utf8(&buf[..pos]).unwrap_or(DEVICE_NAME_PREFIX)
}

/// Main BLE task for the sensor
///
/// 1. Initialises the BLE host and the GATT server
/// 2. Advertises as "RscSensor-XXXXXX" (unique per device)
/// 3. Runs one session per process lifetime, reconnecting forever
pub async fn run<C: Controller>(controller: C, device_id: [u8; 3]) {
    let mut device_name_buf = [0u8; 20];
    let device_name = format_device_name(&mut device_name_buf, &device_id);

    log::info!("BLE: starting as '{}'", device_name);

    let mut resources: HostResources<DefaultPacketPool, CONNECTIONS_MAX, L2CAP_CHANNELS_MAX> =
        HostResources::new();

    let stack = trouble_host::new(controller, &mut resources).set_random_address(Address::random([
        device_id[0],
        device_id[1],
        device_id[2],
        0x5C,
        0xA9,
        0xD3,
    ]));

    let Host {
        mut peripheral,
        mut runner,
        ..
    } = stack.build();

    let gap = GapConfig::Peripheral(PeripheralConfig {
        name: device_name,
        appearance: &appearance::UNKNOWN,
    });
    let server: Server = match Server::new_with_config(gap) {
        Ok(s) => s,
        Err(_) => return,
    };

    let runner_task = runner.run();

    let peripheral_task = async {
        let mut adv_data = [0u8; 31];
        let len = match AdStructure::encode_slice(
            &[
                AdStructure::Flags(LE_GENERAL_DISCOVERABLE | BR_EDR_NOT_SUPPORTED),
                AdStructure::CompleteLocalName(device_name.as_bytes()),
            ],
            &mut adv_data,
        ) {
            Ok(l) => l,
            Err(_) => return,
        };

        // One session for the lifetime of the device; the odometer keeps
        // counting across reconnects
        let mut session = RscSession::new(SessionConfig::default());
        let mut queue = OutboundQueue::new();

        // Mirror the session's capability bits into the Feature store
        let _ = server
            .rsc
            .feature
            .set(&server, &session.feature().to_le_bytes());

        loop {
            let _ = LINK_STATE.try_send(LinkState::Advertising);
            log::info!("BLE: advertising...");
            let advertiser = match peripheral
                .advertise(
                    &Default::default(),
                    Advertisement::ConnectableScannableUndirected {
                        adv_data: &adv_data[..len],
                        scan_data: &[],
                    },
                )
                .await
            {
                Ok(a) => a,
                Err(_) => continue,
            };

            let acceptor = match advertiser.accept().await {
                Ok(a) => {
                    log::info!("BLE: connected");
                    a
                }
                Err(_) => continue,
            };

            let conn = match acceptor.with_attribute_server(&*server) {
                Ok(c) => c,
                Err(_) => continue,
            };

            session.on_connect();
            // Deliveries before the peer writes the CCCDs are rejected by
            // the stack and dropped like any other transport failure
            session.set_notifications_enabled(true);
            session.set_indications_enabled(true);
            let _ = LINK_STATE.try_send(LinkState::Connected {
                running: session.simulator().kind() == ProfileKind::Running,
            });

            let mut ticker = Ticker::every(Duration::from_millis(timing::TICK_INTERVAL_MS));

            loop {
                match select3(conn.next(), ticker.next(), PROFILE_EVENTS.receive()).await {
                    Either3::First(event) => match event {
                        GattConnectionEvent::Disconnected { reason: _ } => {
                            log::info!("BLE: disconnected");
                            session.on_disconnect();
                            session.set_notifications_enabled(false);
                            session.set_indications_enabled(false);
                            break;
                        }
                        GattConnectionEvent::Gatt { event } => match event {
                            GattEvent::Write(write_event) => {
                                if write_event.handle() == server.rsc.control_point.handle {
                                    let data = write_event.data();
                                    match data.split_first() {
                                        Some((&op_code, params)) => {
                                            session.on_control_point_write(
                                                &mut queue, op_code, params,
                                            );
                                        }
                                        None => log::warn!("empty control point write dropped"),
                                    }
                                }
                                let _ = write_event.accept();
                            }
                            GattEvent::Read(read_event) => {
                                let _ = read_event.accept();
                            }
                            GattEvent::Other(other_event) => {
                                let _ = other_event.accept();
                            }
                        },
                        _ => {}
                    },
                    Either3::Second(_) => session.on_tick(&mut queue),
                    Either3::Third(_) => {
                        let next = session.simulator().kind().toggled();
                        session.set_profile(next);
                        let _ = LINK_STATE.try_send(LinkState::Connected {
                            running: next == ProfileKind::Running,
                        });
                    }
                }

                flush(&mut queue, &server, &conn).await;
            }
        }
    };

    embassy_futures::select::select(runner_task, peripheral_task).await;
}

/// Drain the outbound queue into the GATT server.
///
/// Delivery errors (unsubscribed peer, congested stack) are logged and the
/// frame is dropped; the scheduler regenerates fresh data on its own grid.
async fn flush<P: PacketPool>(
    queue: &mut OutboundQueue,
    server: &Server,
    conn: &GattConnection<'_, '_, P>,
) {
    while let Some(frame) = queue.pop() {
        match frame {
            Outbound::Measurement(payload) => {
                if server.rsc.measurement.notify(conn, &payload).await.is_err() {
                    log::warn!("BLE: measurement notify failed");
                }
            }
            Outbound::ControlPointResponse(response) => {
                let mut value = [0u8; MAX_RESPONSE_SIZE];
                let len = response.len().min(value.len());
                value[..len].copy_from_slice(&response[..len]);
                if server.rsc.control_point.indicate(conn, &value).await.is_err() {
                    log::warn!("BLE: control point indication failed");
                }
            }
            Outbound::SensorLocation(code) => {
                let _ = server.rsc.sensor_location.set(server, &code);
            }
        }
    }
}
