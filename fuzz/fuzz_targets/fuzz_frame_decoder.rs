//! Fuzz target: `decode_frame`
//!
//! Every two-byte window of the input is decoded as a converter frame.
//! Decoding must never panic, must agree with the fault bit, and must
//! stay inside the converter's 0–1023.75 °C range.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use tempctl::error::LinkError;
use tempctl::sensors::thermocouple::decode_frame;

fuzz_target!(|data: &[u8]| {
    for pair in data.windows(2) {
        let rx = [pair[0], pair[1]];
        let fault = u16::from_be_bytes(rx) & 0x0004 != 0;

        match decode_frame(rx) {
            Ok(reading) => {
                assert!(!fault, "faulted frame decoded as a reading");
                assert!(reading.celsius >= 0.0 && reading.celsius <= 1023.75);
            }
            Err(e) => {
                assert!(fault, "clean frame rejected");
                assert_eq!(e, LinkError::ThermocoupleDisconnected);
            }
        }
    }
});
