#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decoding sniffs the prolog and never fails; parsing must not panic —
    // errors are fine, panics are bugs.
    let _ = nfedit::parse::parse_invoice_bytes(data);
});
