#![no_main]

use evalscope::metadata::block::MetadataBlock;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(block) = MetadataBlock::read(data) {
        let _ = block.assembly_info();
    }
});
