//! Fuzz target: `Snapshot::decode`
//!
//! Feeds arbitrary bytes to the snapshot decoder.  It must never panic,
//! and anything it accepts must be internally consistent and survive a
//! re-encode.
//!
//! cargo fuzz run fuzz_snapshot_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use lightwatch::snapshot::Snapshot;

fuzz_target!(|data: &[u8]| {
    let Ok(snapshot) = Snapshot::decode(data) else {
        return;
    };

    assert_eq!(
        snapshot.frames().len(),
        snapshot.len() * snapshot.shape().len(),
        "decoder accepted mismatched frame data"
    );
    for i in 0..snapshot.len() {
        assert!(snapshot.frame(i).is_some());
    }
    assert!(snapshot.frame(snapshot.len()).is_none());

    let bytes = snapshot.encode().expect("re-encode of decoded snapshot");
    assert_eq!(Snapshot::decode(&bytes).as_ref(), Ok(&snapshot));
});
