//! BLE radio adapter.
//!
//! Implements [`RadioPort`]: stack lifecycle, advertising, and the two
//! characteristics a phone app uses to read the device identity and to
//! write a new sensing configuration.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: Bluedroid GATT server via raw `esp_idf_svc::sys`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Link events
//!
//! Stack callbacks never touch the state machine.  They post a mode
//! request through [`crate::runtime::request_mode`]:
//!
//! | Stack event                | Requested mode |
//! |----------------------------|----------------|
//! | central connected          | `Connected`    |
//! | central disconnected       | `Sensing`      |
//! | advertising window expired | `Sensing`      |
//!
//! ## GATT Service Layout
//!
//! | Characteristic | UUID                        | Perms      |
//! |----------------|-----------------------------|------------|
//! | System info    | `3c730002-…-9e1b4f2d5a68`   | Read       |
//! | Configuration  | `3c730003-…-9e1b4f2d5a68`   | Read+Write |

use log::{info, warn};

use crate::app::ports::{ConfigBlob, RadioPort};
use crate::config::{SenseConfig, SysInfo};
use crate::error::RadioError;
#[cfg(not(target_os = "espidf"))]
use crate::events::{Message, MessageSink};
#[cfg(not(target_os = "espidf"))]
use crate::fsm::DeviceMode;

// ───────────────────────────────────────────────────────────────
// Constants
// ───────────────────────────────────────────────────────────────

pub const SERVICE_UUID: u128 = 0x3c730001_58d2_4e07_b6a1_9e1b4f2d5a68;
pub const CHAR_SYSINFO: u128 = 0x3c730002_58d2_4e07_b6a1_9e1b4f2d5a68;
pub const CHAR_CONFIG: u128 = 0x3c730003_58d2_4e07_b6a1_9e1b4f2d5a68;

/// Legacy advertising payload limit.
pub const MAX_ADV_LEN: usize = 31;

/// Limited-discoverable advertising window before falling back to sensing.
pub const ADV_WINDOW_MS: u32 = 180_000;

const AD_TYPE_FLAGS: u8 = 0x01;
const AD_TYPE_UUID128_COMPLETE: u8 = 0x07;
const AD_TYPE_NAME_SHORT: u8 = 0x08;
const AD_TYPE_NAME_COMPLETE: u8 = 0x09;
const AD_TYPE_TX_POWER: u8 = 0x0A;
const AD_TYPE_MANUFACTURER: u8 = 0xFF;
/// Advertised TX power level (dBm).
const ADV_TX_POWER_DBM: u8 = 0;
/// LE limited discoverable, BR/EDR not supported.
const ADV_FLAGS_LE_ONLY_LIMITED: u8 = 0x05;

pub type AdvPayload = heapless::Vec<u8, MAX_ADV_LEN>;
pub type IdentityValue = heapless::Vec<u8, { SysInfo::MAX_ENCODED_LEN }>;

// ───────────────────────────────────────────────────────────────
// Payload builders
// ───────────────────────────────────────────────────────────────

/// Append one AD structure, shortening `data` to whatever still fits.
/// Nothing is appended when no data byte fits.  Returns the bytes used.
fn push_ad(payload: &mut AdvPayload, ad_type: u8, data: &[u8]) -> usize {
    let room = MAX_ADV_LEN.saturating_sub(payload.len() + 2);
    let used = &data[..data.len().min(room)];
    if !used.is_empty() {
        let _ = payload.push(used.len() as u8 + 1);
        let _ = payload.push(ad_type);
        let _ = payload.extend_from_slice(used);
    }
    used.len()
}

/// Flags, the 128-bit service UUID and the device name, shortened to
/// whatever still fits.
pub fn build_adv_payload(name: &str) -> AdvPayload {
    let mut adv = AdvPayload::new();
    let _ = adv.extend_from_slice(&[2, AD_TYPE_FLAGS, ADV_FLAGS_LE_ONLY_LIMITED]);
    push_ad(&mut adv, AD_TYPE_UUID128_COMPLETE, &SERVICE_UUID.to_le_bytes());

    let bytes = name.as_bytes();
    let room = MAX_ADV_LEN - adv.len() - 2;
    let ad_type = if bytes.len() > room { AD_TYPE_NAME_SHORT } else { AD_TYPE_NAME_COMPLETE };
    push_ad(&mut adv, ad_type, bytes);
    adv
}

/// TX power, the device id as short local name, and the firmware version
/// as manufacturer data (`major, minor, build`).
pub fn build_scan_response(info: &SysInfo) -> AdvPayload {
    let mut rsp = AdvPayload::new();
    push_ad(&mut rsp, AD_TYPE_TX_POWER, &[ADV_TX_POWER_DBM]);
    push_ad(&mut rsp, AD_TYPE_NAME_SHORT, info.id_str().as_bytes());
    let fw = info.fw_ver;
    push_ad(&mut rsp, AD_TYPE_MANUFACTURER, &[fw.major, fw.minor, fw.build]);
    rsp
}

/// Postcard-encoded identity record for the system-info characteristic.
pub fn encode_identity(info: &SysInfo) -> IdentityValue {
    let mut buf = [0u8; SysInfo::MAX_ENCODED_LEN];
    match info.encode(&mut buf) {
        Ok(used) => IdentityValue::from_slice(used).unwrap_or_default(),
        Err(e) => {
            warn!("BLE: identity encode failed ({}), publishing empty value", e);
            IdentityValue::new()
        }
    }
}

// ───────────────────────────────────────────────────────────────
// BLE state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BleState {
    /// Controller and host stack are down.
    Off,
    /// Stack up, not advertising.
    Ready,
    Advertising,
    Connected,
}

// ── ESP-IDF BLE static state ──────────────────────────────────
//
// Bluedroid callbacks are C function pointers that cannot capture Rust
// closures.  These statics bridge the callback context to the adapter.

#[cfg(target_os = "espidf")]
use core::sync::atomic::{AtomicBool, AtomicU32, Ordering as AtomicOrdering};

#[cfg(target_os = "espidf")]
static BLE_GATTS_IF: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CONN_ID: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CONNECTED: AtomicBool = AtomicBool::new(false);
#[cfg(target_os = "espidf")]
static BLE_SVC_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_SYSINFO_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CONFIG_HANDLE: AtomicU32 = AtomicU32::new(0);
#[cfg(target_os = "espidf")]
static BLE_CHAR_STEP: AtomicU32 = AtomicU32::new(0);

// Characteristic values cached until the stack hands out their handles,
// and the last configuration written by a central.
// GATTS callbacks run in the Bluedroid task (not ISR), so std Mutex is safe.
#[cfg(target_os = "espidf")]
static BLE_SYSINFO_VALUE: std::sync::Mutex<IdentityValue> = std::sync::Mutex::new(heapless::Vec::new());
#[cfg(target_os = "espidf")]
static BLE_CONFIG_VALUE: std::sync::Mutex<heapless::Vec<u8, { SenseConfig::BLOB_LEN }>> =
    std::sync::Mutex::new(heapless::Vec::new());
#[cfg(target_os = "espidf")]
static BLE_RX_CONFIG: std::sync::Mutex<ConfigBlob> = std::sync::Mutex::new(heapless::Vec::new());

#[cfg(target_os = "espidf")]
static mut ADV_WINDOW_TIMER: esp_idf_svc::sys::esp_timer_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
fn uuid128_to_esp(uuid: u128) -> esp_idf_svc::sys::esp_bt_uuid_t {
    let mut t: esp_idf_svc::sys::esp_bt_uuid_t = unsafe { core::mem::zeroed() };
    t.len = 16;
    unsafe {
        t.uuid.uuid128 = uuid.to_le_bytes();
    }
    t
}

#[cfg(target_os = "espidf")]
unsafe fn add_gatt_char(svc_handle: u16, uuid: u128, perm: u32, prop: u32) {
    use esp_idf_svc::sys::*;
    let mut char_uuid = uuid128_to_esp(uuid);
    unsafe {
        esp_ble_gatts_add_char(
            svc_handle,
            &mut char_uuid,
            perm as esp_gatt_perm_t,
            prop as esp_gatt_char_prop_t,
            core::ptr::null_mut(),
            core::ptr::null_mut(),
        );
    }
}

/// Push `value` into the attribute table if the handle is known yet.
#[cfg(target_os = "espidf")]
fn publish_attr(handle: &AtomicU32, value: &[u8]) {
    let handle = handle.load(AtomicOrdering::Relaxed);
    if handle != 0 {
        // SAFETY: the handle came from ADD_CHAR_EVT; the stack copies `value`.
        unsafe {
            esp_idf_svc::sys::esp_ble_gatts_set_attr_value(handle as u16, value.len() as u16, value.as_ptr());
        }
    }
}

#[cfg(target_os = "espidf")]
fn adv_params() -> esp_idf_svc::sys::esp_ble_adv_params_t {
    use esp_idf_svc::sys::*;
    // SAFETY: all-zero is a valid bit pattern for the remaining C fields.
    esp_ble_adv_params_t {
        adv_int_min: 0x20,
        adv_int_max: 0x40,
        adv_type: esp_ble_adv_type_t_ADV_TYPE_IND,
        own_addr_type: esp_ble_addr_type_t_BLE_ADDR_TYPE_PUBLIC,
        channel_map: esp_ble_adv_channel_t_ADV_CHNL_ALL,
        adv_filter_policy: esp_ble_adv_filter_t_ADV_FILTER_ALLOW_SCAN_ANY_CON_ANY,
        ..unsafe { core::mem::zeroed() }
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn adv_window_expired(_arg: *mut core::ffi::c_void) {
    if !BLE_CONNECTED.load(AtomicOrdering::Relaxed) {
        info!("BLE: advertising window expired");
        // SAFETY: stopping advertising that already stopped is a no-op error.
        unsafe { esp_idf_svc::sys::esp_ble_gap_stop_advertising() };
        crate::runtime::request_mode(crate::fsm::DeviceMode::Sensing);
    }
}

#[cfg(target_os = "espidf")]
fn adv_window_stop() {
    // SAFETY: ADV_WINDOW_TIMER is only written in activate(), from the
    // main task, before advertising can start.
    unsafe {
        let t = ADV_WINDOW_TIMER;
        if !t.is_null() {
            esp_idf_svc::sys::esp_timer_stop(t);
        }
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gap_event_handler(
    event: esp_idf_svc::sys::esp_gap_ble_cb_event_t,
    _param: *mut esp_idf_svc::sys::esp_ble_gap_cb_param_t,
) {
    use esp_idf_svc::sys::*;
    match event {
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_START_COMPLETE_EVT => {
            log::info!("BLE GAP: advertising started");
        }
        esp_gap_ble_cb_event_t_ESP_GAP_BLE_ADV_STOP_COMPLETE_EVT => {
            log::info!("BLE GAP: advertising stopped");
        }
        _ => {}
    }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn ble_gatts_event_handler(
    event: esp_idf_svc::sys::esp_gatts_cb_event_t,
    gatts_if: esp_idf_svc::sys::esp_gatt_if_t,
    param: *mut esp_idf_svc::sys::esp_ble_gatts_cb_param_t,
) {
    use crate::fsm::DeviceMode;
    use esp_idf_svc::sys::*;

    BLE_GATTS_IF.store(gatts_if as u32, AtomicOrdering::Relaxed);

    match event {
        esp_gatts_cb_event_t_ESP_GATTS_REG_EVT => {
            log::info!("BLE GATTS: app registered (if={})", gatts_if);
            let mut svc_id = esp_gatt_srvc_id_t {
                id: esp_gatt_id_t { uuid: uuid128_to_esp(SERVICE_UUID), inst_id: 0 },
                is_primary: true,
            };
            unsafe { esp_ble_gatts_create_service(gatts_if, &mut svc_id, 6) };
        }
        esp_gatts_cb_event_t_ESP_GATTS_CREATE_EVT => {
            let svc_handle = unsafe { (*param).create.service_handle };
            BLE_SVC_HANDLE.store(svc_handle as u32, AtomicOrdering::Relaxed);
            log::info!("BLE GATTS: service created (handle={})", svc_handle);
            unsafe {
                esp_ble_gatts_start_service(svc_handle);
                BLE_CHAR_STEP.store(1, AtomicOrdering::Relaxed);
                add_gatt_char(svc_handle, CHAR_SYSINFO, ESP_GATT_PERM_READ, ESP_GATT_CHAR_PROP_BIT_READ);
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_ADD_CHAR_EVT => {
            let handle = unsafe { (*param).add_char.attr_handle };
            let svc_handle = BLE_SVC_HANDLE.load(AtomicOrdering::Relaxed) as u16;
            match BLE_CHAR_STEP.load(AtomicOrdering::Relaxed) {
                1 => {
                    BLE_SYSINFO_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
                    if let Ok(v) = BLE_SYSINFO_VALUE.lock() {
                        publish_attr(&BLE_SYSINFO_HANDLE, &v);
                    }
                    BLE_CHAR_STEP.store(2, AtomicOrdering::Relaxed);
                    unsafe {
                        add_gatt_char(
                            svc_handle,
                            CHAR_CONFIG,
                            ESP_GATT_PERM_READ | ESP_GATT_PERM_WRITE,
                            ESP_GATT_CHAR_PROP_BIT_READ | ESP_GATT_CHAR_PROP_BIT_WRITE,
                        );
                    }
                }
                2 => {
                    BLE_CONFIG_HANDLE.store(handle as u32, AtomicOrdering::Relaxed);
                    if let Ok(v) = BLE_CONFIG_VALUE.lock() {
                        publish_attr(&BLE_CONFIG_HANDLE, &v);
                    }
                    BLE_CHAR_STEP.store(3, AtomicOrdering::Relaxed);
                    log::info!("BLE GATTS: characteristics registered");
                }
                _ => {}
            }
        }
        esp_gatts_cb_event_t_ESP_GATTS_CONNECT_EVT => {
            let conn_id = unsafe { (*param).connect.conn_id };
            BLE_CONN_ID.store(conn_id as u32, AtomicOrdering::Relaxed);
            BLE_CONNECTED.store(true, AtomicOrdering::Relaxed);
            adv_window_stop();
            log::info!("BLE GATTS: central connected (conn_id={})", conn_id);
            crate::runtime::request_mode(DeviceMode::Connected);
        }
        esp_gatts_cb_event_t_ESP_GATTS_DISCONNECT_EVT => {
            BLE_CONNECTED.store(false, AtomicOrdering::Relaxed);
            log::info!("BLE GATTS: central disconnected");
            crate::runtime::request_mode(DeviceMode::Sensing);
        }
        esp_gatts_cb_event_t_ESP_GATTS_WRITE_EVT => {
            let p = unsafe { &(*param).write };
            if p.handle as u32 == BLE_CONFIG_HANDLE.load(AtomicOrdering::Relaxed) {
                let data = unsafe { core::slice::from_raw_parts(p.value, p.len as usize) };
                if let Ok(mut buf) = BLE_RX_CONFIG.lock() {
                    buf.clear();
                    // Anything past the buffer is dropped; the blob parser
                    // only reads the fixed prefix.
                    let take = data.len().min(buf.capacity());
                    let _ = buf.extend_from_slice(&data[..take]);
                }
            }
        }
        _ => {}
    }
}

// ───────────────────────────────────────────────────────────────
// BLE adapter
// ───────────────────────────────────────────────────────────────

pub struct BleAdapter {
    state: BleState,
    adv: AdvPayload,
    scan_rsp: AdvPayload,
    identity: IdentityValue,
    config: [u8; SenseConfig::BLOB_LEN],
    /// Simulation: config bytes "written" by a test central.
    #[cfg(not(target_os = "espidf"))]
    sim_rx: Option<ConfigBlob>,
    /// Simulation: make the next activation fail with this code.
    #[cfg(not(target_os = "espidf"))]
    sim_fail_activation: Option<i32>,
}

impl Default for BleAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl BleAdapter {
    pub fn new() -> Self {
        Self {
            state: BleState::Off,
            adv: AdvPayload::new(),
            scan_rsp: AdvPayload::new(),
            identity: IdentityValue::new(),
            config: [0u8; SenseConfig::BLOB_LEN],
            #[cfg(not(target_os = "espidf"))]
            sim_rx: None,
            #[cfg(not(target_os = "espidf"))]
            sim_fail_activation: None,
        }
    }

    pub fn state(&self) -> BleState {
        self.state
    }

    /// Current advertising payload.
    pub fn adv_payload(&self) -> &[u8] {
        &self.adv
    }

    /// Current scan response payload.
    pub fn scan_response(&self) -> &[u8] {
        &self.scan_rsp
    }

    /// Current system-info characteristic value.
    pub fn identity_value(&self) -> &[u8] {
        &self.identity
    }

    /// Current configuration characteristic value.
    pub fn config_value(&self) -> &[u8; SenseConfig::BLOB_LEN] {
        &self.config
    }

    // ── Simulated link events ─────────────────────────────────

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next_activation(&mut self, code: i32) {
        self.sim_fail_activation = Some(code);
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_config_write(&mut self, raw: &[u8]) {
        let take = raw.len().min(crate::app::ports::CONFIG_BLOB_CAP);
        self.sim_rx = ConfigBlob::from_slice(&raw[..take]).ok();
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_central_connected(&mut self, sink: &dyn MessageSink) {
        info!("BLE(sim): central connected");
        self.state = BleState::Connected;
        sink.post(Message::StateChange(DeviceMode::Connected));
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_central_disconnected(&mut self, sink: &dyn MessageSink) {
        info!("BLE(sim): central disconnected");
        if self.state == BleState::Connected {
            self.state = BleState::Ready;
        }
        sink.post(Message::StateChange(DeviceMode::Sensing));
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_adv_window_expired(&mut self, sink: &dyn MessageSink) {
        if self.state == BleState::Advertising {
            self.state = BleState::Ready;
            sink.post(Message::StateChange(DeviceMode::Sensing));
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_activate(&mut self) -> Result<(), RadioError> {
        use esp_idf_svc::sys::*;
        unsafe {
            // BLE-only mode; classic BT memory is never needed.
            esp_bt_controller_mem_release(esp_bt_mode_t_ESP_BT_MODE_CLASSIC_BT);

            let mut bt_cfg = esp_bt_controller_config_t::default();
            let ret = esp_bt_controller_init(&mut bt_cfg);
            if ret != ESP_OK {
                return Err(RadioError::StackInitFailed(ret));
            }

            let ret = esp_bt_controller_enable(esp_bt_mode_t_ESP_BT_MODE_BLE);
            if ret != ESP_OK {
                return Err(RadioError::StackInitFailed(ret));
            }

            let ret = esp_bluedroid_init();
            if ret != ESP_OK {
                return Err(RadioError::StackInitFailed(ret));
            }

            let ret = esp_bluedroid_enable();
            if ret != ESP_OK {
                return Err(RadioError::StackInitFailed(ret));
            }

            esp_ble_gap_register_callback(Some(ble_gap_event_handler));
            esp_ble_gatts_register_callback(Some(ble_gatts_event_handler));
            esp_ble_gatts_app_register(0);

            if ADV_WINDOW_TIMER.is_null() {
                let args = esp_timer_create_args_t {
                    callback: Some(adv_window_expired),
                    arg: core::ptr::null_mut(),
                    dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
                    name: b"adv_window\0".as_ptr() as *const _,
                    skip_unhandled_events: true,
                };
                let ret = esp_timer_create(&args, &raw mut ADV_WINDOW_TIMER);
                if ret != ESP_OK {
                return Err(RadioError::StackInitFailed(ret));
            }
            }
        }
        info!("BLE(espidf): Bluedroid stack initialized");
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_activate(&mut self) -> Result<(), RadioError> {
        if let Some(code) = self.sim_fail_activation.take() {
            return Err(RadioError::StackInitFailed(code));
        }
        info!("BLE(sim): stack up (service {:032x})", SERVICE_UUID);
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_deactivate(&mut self) {
        use esp_idf_svc::sys::*;
        adv_window_stop();
        BLE_CONNECTED.store(false, AtomicOrdering::Relaxed);
        for h in [&BLE_SVC_HANDLE, &BLE_SYSINFO_HANDLE, &BLE_CONFIG_HANDLE, &BLE_CHAR_STEP] {
            h.store(0, AtomicOrdering::Relaxed);
        }
        unsafe {
            esp_ble_gap_stop_advertising();
            esp_bluedroid_disable();
            esp_bluedroid_deinit();
            esp_bt_controller_disable();
            esp_bt_controller_deinit();
        }
        info!("BLE(espidf): stack shut down");
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_deactivate(&mut self) {
        info!("BLE(sim): stack down");
    }

    #[cfg(target_os = "espidf")]
    fn platform_start_advertising(&mut self) -> Result<(), RadioError> {
        use esp_idf_svc::sys::*;
        unsafe {
            let ret = esp_ble_gap_config_adv_data_raw(self.adv.as_ptr() as *mut u8, self.adv.len() as u32);
            if ret != ESP_OK {
                return Err(RadioError::AdvertisingFailed(ret));
            }
            let ret = esp_ble_gap_config_scan_rsp_data_raw(
                self.scan_rsp.as_ptr() as *mut u8,
                self.scan_rsp.len() as u32,
            );
            if ret != ESP_OK {
                return Err(RadioError::AdvertisingFailed(ret));
            }
            let mut params = adv_params();
            let ret = esp_ble_gap_start_advertising(&mut params);
            if ret != ESP_OK {
                return Err(RadioError::AdvertisingFailed(ret));
            }

            let t = ADV_WINDOW_TIMER;
            if !t.is_null() {
                esp_timer_stop(t);
                esp_timer_start_once(t, ADV_WINDOW_MS as u64 * 1_000);
            }
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_start_advertising(&mut self) -> Result<(), RadioError> {
        info!(
            "BLE(sim): advertising {} byte payload, {} byte scan response",
            self.adv.len(),
            self.scan_rsp.len()
        );
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_disconnect(&mut self) {
        if BLE_CONNECTED.load(AtomicOrdering::Relaxed) {
            // SAFETY: gatts_if/conn_id were recorded by the connect event.
            unsafe {
                esp_idf_svc::sys::esp_ble_gatts_close(
                    BLE_GATTS_IF.load(AtomicOrdering::Relaxed) as u8,
                    BLE_CONN_ID.load(AtomicOrdering::Relaxed) as u16,
                );
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_disconnect(&mut self) {
        info!("BLE(sim): link dropped");
    }

    #[cfg(target_os = "espidf")]
    fn platform_publish(&mut self) {
        if let Ok(mut v) = BLE_SYSINFO_VALUE.lock() {
            *v = self.identity.clone();
            publish_attr(&BLE_SYSINFO_HANDLE, &v);
        }
        if let Ok(mut v) = BLE_CONFIG_VALUE.lock() {
            v.clear();
            let _ = v.extend_from_slice(&self.config);
            publish_attr(&BLE_CONFIG_HANDLE, &v);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_publish(&mut self) {}
}

// ───────────────────────────────────────────────────────────────
// RadioPort implementation
// ───────────────────────────────────────────────────────────────

impl RadioPort for BleAdapter {
    fn is_active(&self) -> bool {
        self.state != BleState::Off
    }

    fn activate(&mut self) -> Result<(), RadioError> {
        if self.is_active() {
            return Ok(());
        }
        self.platform_activate()?;
        self.state = BleState::Ready;
        Ok(())
    }

    fn deactivate(&mut self) {
        if !self.is_active() {
            return;
        }
        self.platform_deactivate();
        self.state = BleState::Off;
    }

    fn start_advertising(&mut self) -> Result<(), RadioError> {
        if !self.is_active() {
            return Err(RadioError::NotActive);
        }
        self.platform_start_advertising()?;
        self.state = BleState::Advertising;
        Ok(())
    }

    fn force_disconnect(&mut self) {
        info!("BLE: forcing disconnect");
        self.platform_disconnect();
    }

    fn set_advertisement(&mut self, info: &SysInfo, name: &str) {
        self.adv = build_adv_payload(name);
        self.scan_rsp = build_scan_response(info);
        info!(
            "BLE: advertising '{}' for {} fw {}.{}.{}",
            name,
            info.id_str(),
            info.fw_ver.major,
            info.fw_ver.minor,
            info.fw_ver.build
        );
    }

    fn set_identity(&mut self, info: &SysInfo) {
        self.identity = encode_identity(info);
        self.platform_publish();
    }

    fn set_config(&mut self, config: &SenseConfig) {
        self.config = config.to_blob();
        self.platform_publish();
    }

    #[cfg(target_os = "espidf")]
    fn take_received_config(&mut self) -> Option<ConfigBlob> {
        BLE_RX_CONFIG.lock().ok().and_then(|mut buf| {
            if buf.is_empty() {
                return None;
            }
            let data = buf.clone();
            buf.clear();
            Some(data)
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn take_received_config(&mut self) -> Option<ConfigBlob> {
        self.sim_rx.take()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
