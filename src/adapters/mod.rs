//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements                        | Connects to          |
//! |-------------|-----------------------------------|----------------------|
//! | `ble`       | RadioPort                         | Bluedroid GATT server|
//! | `hardware`  | RadioPort, IndicatorPort,         | BLE adapter, LEDC,   |
//! |             | WatchdogPort, ButtonWakePort,     | TWDT, GPIO wake,     |
//! |             | SystemPort                        | esp_restart          |
//! | `log_sink`  | EventSink                         | Serial log output    |
//! | `device_id` | —                                 | eFuse factory MAC    |

pub mod ble;
pub mod device_id;
pub mod hardware;
pub mod log_sink;
