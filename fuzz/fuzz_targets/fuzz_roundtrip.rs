#![no_main]

use libfuzzer_sys::fuzz_target;

use nfedit::xml::XmlDocument;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // Whatever parses must serialize back byte-identically.
        if let Ok(doc) = XmlDocument::parse(s) {
            assert_eq!(doc.to_xml(), s);
        }
    }
});
