#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let loader = flango::Loader::builder("/")
        .reader(|_| Err(std::io::ErrorKind::NotFound.into()))
        .build();
    let _ = loader.compile(data);
});
