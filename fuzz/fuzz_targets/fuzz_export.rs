#![no_main]

use libfuzzer_sys::fuzz_target;

use nfedit::session::EditSession;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let mut session = EditSession::new();
        if session.load_str(s).is_ok() {
            // Load → export must not panic at any step.
            let _ = session.export();
        }
    }
});
