#![no_main]

use libfuzzer_sys::fuzz_target;
use tracelint_core::sql::{number_placeholders, where_columns};

fuzz_target!(|data: &[u8]| {
    if let Ok(sql) = std::str::from_utf8(data) {
        let _ = where_columns(&number_placeholders(sql));
    }
});
