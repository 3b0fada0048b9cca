#![no_main]

use libfuzzer_sys::fuzz_target;
use std::sync::OnceLock;
use tailpost_core::types::HostIdentity;
use tailpost_log_pipeline::{LineParser, ParserDefinition};

fn setup() -> &'static (LineParser, ParserDefinition) {
    static SETUP: OnceLock<(LineParser, ParserDefinition)> = OnceLock::new();
    SETUP.get_or_init(|| {
        let def = ParserDefinition::json(
            "app",
            [("level", "level"), ("user", "context.user.id"), ("ts", "ts")],
            ["/var/log/*.json"],
        )
        .with_date("ts", "rfc3339");
        (LineParser::new(HostIdentity::new("fuzz", "fuzz", "fuzz")), def)
    })
}

fuzz_target!(|data: &[u8]| {
    let line = String::from_utf8_lossy(data);
    let (parser, def) = setup();
    if let Ok(parsed) = parser.parse(def, "fuzz.json", &line) {
        // 매핑에 없는 필드는 생기지 않음
        assert!(parsed
            .record
            .fields
            .keys()
            .all(|k| ["level", "user", "ts"].contains(&k.as_str())));
    }
});
