#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let settings = unbrotli::DecodeSettings {
        output_limit: Some(1 << 24),
        ..Default::default()
    };

    let _ = unbrotli::decompress_with_settings(data, settings);
});
