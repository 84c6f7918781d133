#![no_main]

use libfuzzer_sys::fuzz_target;
use tkwatch_log_monitor::{EventClassifier, LineEvent};

fuzz_target!(|data: &[u8]| {
    let Ok(classifier) = EventClassifier::new() else {
        return;
    };
    let line = String::from_utf8_lossy(data);

    // 분류는 패닉하지 않아야 하며, 데미지 통지의 무기 이름에는 BP_ 접두어가 남지 않아야 함
    if let LineEvent::Damage(damage) = classifier.classify(&line) {
        assert!(!damage.weapon.starts_with("BP_"));
    }
});
