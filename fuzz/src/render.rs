#![no_main]

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use serde::Serialize;

#[derive(Debug, Serialize, Arbitrary)]
enum Value {
    None,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

fuzz_target!(|data: (&str, Vec<(&str, &str)>, BTreeMap<String, Value>)| {
    let (root, templates, ctx) = data;
    let templates: BTreeMap<_, _> = templates
        .into_iter()
        .map(|(name, source)| (Path::new("/").join(name), source.to_owned()))
        .collect();
    let loader = flango::Loader::builder("/")
        .capacity(4)
        .reader(move |path| {
            templates
                .get(path)
                .cloned()
                .ok_or_else(|| io::ErrorKind::NotFound.into())
        })
        .build();
    if let Ok(template) = loader.compile(root) {
        let _ = template.render(&ctx);
    }
});
