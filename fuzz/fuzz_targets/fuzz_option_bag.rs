//! Fuzz target for option bag ingestion.
//!
//! Arbitrary JSON is parsed into a bag, checked against a registry and read
//! into typed training options. Every step may fail but must never panic.

#![no_main]

use arbitrary::Arbitrary;
use cp_config::options::TrainOptions;
use cp_config::reader::OptionReader;
use cp_config::{registry, Mode, RawOptionBag};
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
enum FuzzMode {
    Train,
    Hyperopt,
    Predict,
}

#[derive(Arbitrary, Debug)]
struct Input {
    mode: FuzzMode,
    json: String,
}

fuzz_target!(|input: Input| {
    let Ok(bag) = RawOptionBag::from_json_str(&input.json) else {
        return;
    };
    let mode = match input.mode {
        FuzzMode::Train => Mode::Train,
        FuzzMode::Hyperopt => Mode::Hyperopt,
        FuzzMode::Predict => Mode::Predict,
    };
    let Ok(prepared) = registry(mode).prepare(bag) else {
        return;
    };
    if mode != Mode::Predict {
        let mut reader = OptionReader::new(prepared);
        let _ = TrainOptions::read(&mut reader);
    }
});
