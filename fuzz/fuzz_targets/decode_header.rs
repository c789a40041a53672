#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(header) = webpush_envelope::wire::decode_header(data) {
        assert_eq!(header.ciphertext.len() + webpush_envelope::wire::HEADER_BYTES, data.len());
    }
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = webpush_envelope::encoding::decode_key(text);
    }
});
