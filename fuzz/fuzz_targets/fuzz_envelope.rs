//! Fuzz target for notification envelope parsing.
//!
//! Arbitrary payloads must never panic, and every descriptor produced must
//! be classified consistently with its event name.

#![no_main]

use bucket_replicator::event::parse_envelope;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(payload) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(records) = parse_envelope(payload) {
        assert!(!records.is_empty());
        for descriptor in records.into_iter().flatten() {
            assert_eq!(
                descriptor.event_kind.is_removal(),
                descriptor.event_name.starts_with("ObjectRemoved")
            );
        }
    }
});
