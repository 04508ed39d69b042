//! Fuzz target for tag encoding.
//!
//! Encoding then decoding any tag set must give back the same tags.

#![no_main]

use bucket_replicator::realm::memory::decode_tags;
use bucket_replicator::realm::{encode_tags, Tag};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|pairs: Vec<(String, String)>| {
    let tags: Vec<Tag> = pairs
        .into_iter()
        .filter(|(k, _)| !k.is_empty())
        .map(|(k, v)| Tag::new(k, v))
        .collect();

    let encoded = encode_tags(&tags);
    let decoded = decode_tags(&encoded).expect("encoder output always decodes");
    assert_eq!(decoded, tags);

    // Arbitrary tagging strings must not panic either
    let _ = decode_tags(&encoded.replace('%', "%%"));
});
