#![no_main]

use libfuzzer_sys::fuzz_target;
use once_cell::sync::Lazy;

static ENCRYPTOR: Lazy<webpush_envelope::MessageEncryptor> = Lazy::new(|| {
    webpush_envelope::MessageEncryptor::generate().expect("key generation")
});

// data = auth || 0x00 || p256dh || 0x00 || plaintext
fuzz_target!(|data: &[u8]| {
    let mut parts = data.splitn(3, |b| *b == 0);
    let (Some(auth), Some(p256dh), Some(plaintext)) = (parts.next(), parts.next(), parts.next())
    else {
        return;
    };
    let (Ok(auth), Ok(p256dh)) = (std::str::from_utf8(auth), std::str::from_utf8(p256dh)) else {
        return;
    };

    if let Ok(record) = ENCRYPTOR.encrypt(auth, p256dh, plaintext) {
        assert_eq!(record.len(), webpush_envelope::wire::record_len(plaintext.len()));
    }
});
