#![no_main]

use libfuzzer_sys::fuzz_target;

// Header layout (2 bytes):
// [0]     chunk size (0 is treated as 1)
// [1]     strict (bool)
// [2..]   Brotli stream
const HEADER_SIZE: usize = 2;

fuzz_target!(|data: &[u8]| {
    if data.len() < HEADER_SIZE {
        return;
    }

    let chunk_size = (data[0] as usize).max(1);
    let settings = unbrotli::DecodeSettings {
        strict: data[1] != 0,
        output_limit: Some(1 << 24),
    };
    let stream = &data[HEADER_SIZE..];

    let mut decompressor = unbrotli::Decompressor::with_settings(settings);
    let mut chunked = Vec::new();
    let mut result = Ok(unbrotli::Status::NeedMoreInput);

    for chunk in stream.chunks(chunk_size) {
        result = decompressor.decompress_chunk(chunk);
        chunked.extend(decompressor.take_output());

        if !matches!(result, Ok(unbrotli::Status::NeedMoreInput)) {
            break;
        }
    }

    // Splitting the input must not change the outcome.
    if let (Ok(status), Ok(whole)) = (result, unbrotli::decompress_with_settings(stream, settings)) {
        if status.is_done() {
            assert_eq!(chunked, whole);
        }
    }
});
