//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises the main loop against
//! mock adapters.  All tests run on the host with no real hardware.

mod app_service_tests;
mod gesture_flow_tests;
mod mock_hw;
