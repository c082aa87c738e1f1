//! Minimal encode/decode walkthrough over synthetic save states.
//!
//! Run with: `cargo run --example basic_encode_decode`

use savestream::container::{decode, decode_one, encode, length};
use serde_json::json;

fn make_state(ram: &[u8], tick: u64) -> Vec<u8> {
    let info = serde_json::to_vec(&json!({
        "buffer_infos": [{ "offset": 0, "length": ram.len() }],
        "state": { "tick": tick },
    }))
    .unwrap();
    let mut raw = vec![0u8; 12];
    raw.extend_from_slice(&(info.len() as u32).to_le_bytes());
    raw.extend_from_slice(&info);
    while raw.len() % 4 != 0 {
        raw.push(0);
    }
    raw.extend_from_slice(ram);
    raw
}

fn main() {
    // Three snapshots of a "VM" that touches a little RAM per tick.
    let mut ram = vec![0u8; 256 * 1024];
    let states: Vec<Vec<u8>> = (0..3)
        .map(|tick| {
            ram[tick * 100..tick * 100 + 32].fill(tick as u8 + 1);
            make_state(&ram, tick as u64)
        })
        .collect();
    let input_bytes: usize = states.iter().map(Vec::len).sum();

    let stream = encode(&states).unwrap();
    println!(
        "encoded {} states, {} -> {} bytes ({:.1}% of input)",
        states.len(),
        input_bytes,
        stream.len(),
        100.0 * stream.len() as f64 / input_bytes as f64
    );

    assert_eq!(length(&stream).unwrap(), states.len());

    // Random access to the last state.
    let last = decode_one(&stream, 2).unwrap();
    assert_eq!(last, states[2]);

    // Full lazy decode.
    for (i, state) in decode(&stream).unwrap().enumerate() {
        assert_eq!(state.unwrap(), states[i]);
    }
    println!("round trip OK");
}
