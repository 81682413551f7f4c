#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Interpret the input as a provider spot-price payload and exercise
    // the normalization boundary
    if let Ok(entries) =
        serde_json::from_slice::<Vec<elektra::ostrom::types::RawSpotPrice>>(data)
    {
        let _ = elektra::ostrom::normalize_payload(&entries);
    }
});
