#![no_main]

use libfuzzer_sys::fuzz_target;
use usagescope::{
    collectors::UsageCollectorSet,
    crawler::{AssemblyContext, AssemblyCrawler},
    metadata::reader::ModuleReader,
};

fuzz_target!(|data: &[u8]| {
    let Ok(reader) = ModuleReader::open(data.to_vec()) else {
        return;
    };

    let context = AssemblyContext::default();
    let _ = AssemblyCrawler::new().crawl(&reader, &context);
    let _ = UsageCollectorSet::new().collect(&reader, &context);
});
