//! Fuzz target: `SenseConfig::from_blob`
//!
//! Feeds arbitrary bytes in as a configuration write and verifies:
//! - No panics under arbitrary byte inputs
//! - Short blobs are always rejected
//! - Accepted blobs re-encode to their first `BLOB_LEN` bytes
//! - `name()` is always valid UTF-8 no longer than the name field
//!
//! cargo fuzz run fuzz_config_blob

#![no_main]

use libfuzzer_sys::fuzz_target;
use sensebe::config::{SenseConfig, DEV_NAME_LEN};

fuzz_target!(|data: &[u8]| {
    match SenseConfig::from_blob(data) {
        Ok(cfg) => {
            assert!(data.len() >= SenseConfig::BLOB_LEN);
            assert_eq!(&cfg.to_blob()[..], &data[..SenseConfig::BLOB_LEN]);
            assert!(cfg.name().len() <= DEV_NAME_LEN);
        }
        Err(_) => assert!(data.len() < SenseConfig::BLOB_LEN),
    }
});
