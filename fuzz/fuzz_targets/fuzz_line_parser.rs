#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Whatever the serial line carries, decoding either yields a full sample or an error.
    if let Ok(sample) = heatmeter_core::parse_line(data) {
        let text = std::str::from_utf8(data).expect("accepted lines are UTF-8");
        assert_eq!(text.split(';').filter(|f| !f.trim().is_empty()).count(), 10);
        let _ = sample.pulses();
    }
});
