#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;
use tailpost_core::types::HostIdentity;
use tailpost_log_pipeline::{LineParser, ParserDefinition};

const NGINX: &str = r#"^(?P<ip>\S+) \S+ \S+ \[(?P<time>[^\]]+)\] "(?P<method>\S+) (?P<path>\S+) [^"]*" (?P<status>\d{3})"#;

fn setup() -> &'static (LineParser, ParserDefinition) {
    static SETUP: OnceLock<(LineParser, ParserDefinition)> = OnceLock::new();
    SETUP.get_or_init(|| {
        let def = ParserDefinition::regex("nginx", NGINX, ["/var/log/*.log"])
            .with_date("time", "%d/%b/%Y:%H:%M:%S %z");
        let parser =
            LineParser::new(HostIdentity::new("fuzz", "fuzz", "fuzz")).with_max_line_length(4096);
        (parser, def)
    })
}

fuzz_target!(|data: &[u8]| {
    let line = String::from_utf8_lossy(data);
    let (parser, def) = setup();
    // 매칭 실패든 날짜 실패든 패닉 없이 Result로 끝나야 함
    if let Ok(parsed) = parser.parse(def, "fuzz.log", &line) {
        assert!(parsed.record.raw.len() <= 4096);
    }
});
