//! Device identity derived from the ESP32 factory MAC address.
//!
//! Produces a stable device ID in the form `SB-XXYYZZ` (last 3 bytes of
//! the 6-byte MAC in uppercase hex).  It is deterministic across reboots
//! and becomes the `SysInfo::id` published over the radio.

use crate::config::SysInfo;

/// Fixed-size device ID string: "SB-XXYYZZ".
pub type DeviceIdString = heapless::String<16>;

/// Full 6-byte MAC address.
pub type MacAddress = [u8; 6];

/// Read the factory MAC address from eFuse.
#[cfg(target_os = "espidf")]
pub fn read_mac() -> MacAddress {
    let mut mac: MacAddress = [0u8; 6];
    // SAFETY: the buffer is exactly the 6 bytes the call writes.
    unsafe {
        esp_idf_svc::sys::esp_efuse_mac_get_default(mac.as_mut_ptr());
    }
    mac
}

/// Simulation: returns a deterministic fake MAC.
#[cfg(not(target_os = "espidf"))]
pub fn read_mac() -> MacAddress {
    [0xDE, 0xAD, 0xBE, 0xEF, 0xCA, 0xFE]
}

/// Derive the short device ID from the last 3 MAC bytes.
/// Format: `SB-XXYYZZ` (e.g., `SB-EFCAFE`).
pub fn device_id(mac: &MacAddress) -> DeviceIdString {
    let mut id = DeviceIdString::new();
    use core::fmt::Write;
    let _ = write!(id, "SB-{:02X}{:02X}{:02X}", mac[3], mac[4], mac[5]);
    id
}

/// Identity record for `mac` at the current firmware version.
pub fn sys_info(mac: &MacAddress) -> SysInfo {
    SysInfo::new(device_id(mac).as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn device_id_format() {
        let mac = [0x00, 0x11, 0x22, 0xAA, 0xBB, 0xCC];
        assert_eq!(device_id(&mac).as_str(), "SB-AABBCC");
    }

    #[test]
    fn sim_mac_deterministic() {
        assert_eq!(read_mac(), read_mac());
        assert_eq!(device_id(&read_mac()).as_str(), "SB-EFCAFE");
    }

    #[test]
    fn sys_info_carries_id() {
        let info = sys_info(&[0, 0, 0, 0x01, 0x02, 0x03]);
        assert_eq!(info.id_str(), "SB-010203");
        assert_eq!(info.fw_ver, crate::config::FW_VERSION);
    }
}
