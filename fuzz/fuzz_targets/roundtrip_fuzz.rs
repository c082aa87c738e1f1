#![no_main]

use libfuzzer_sys::fuzz_target;
use savestream::container::{decode, encode};
use serde_json::json;

fn make_state(buffer: &[u8]) -> Vec<u8> {
    let info = serde_json::to_vec(&json!({
        "buffer_infos": [{ "offset": 0, "length": buffer.len() }]
    }))
    .unwrap();
    let mut raw = vec![0u8; 12];
    raw.extend_from_slice(&(info.len() as u32).to_le_bytes());
    raw.extend_from_slice(&info);
    if !buffer.is_empty() {
        while raw.len() % 4 != 0 {
            raw.push(0);
        }
        raw.extend_from_slice(buffer);
    }
    raw
}

// Fuzz input becomes a short sequence of single-region states; the decoded
// sequence must be byte-identical.
fuzz_target!(|data: &[u8]| {
    let states: Vec<Vec<u8>> = data.chunks(257).map(make_state).collect();
    let stream = encode(&states).expect("well-formed states must encode");
    let decoded: Vec<Vec<u8>> = decode(&stream)
        .expect("container must parse")
        .collect::<Result<_, _>>()
        .expect("frames must decode");
    assert_eq!(decoded, states);
});
