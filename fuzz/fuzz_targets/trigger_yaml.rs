#![no_main]

use libfuzzer_sys::fuzz_target;
use tailpost_log_pipeline::{TriggerLoader, TriggerMatcher};

fuzz_target!(|data: &[u8]| {
    if let Ok(yaml) = std::str::from_utf8(data) {
        if let Ok(rule) = TriggerLoader::parse_yaml(yaml, "fuzz.yml") {
            // 잘못된 정규식은 Err로 끝나야 함
            let _ = TriggerMatcher::new(vec![rule]);
        }
    }
});
