#![no_main]

use arbitrary::Unstructured;
use fatsweep::{arbitrary::closed_path, Topology};
use libfuzzer_sys::fuzz_target;

fn build(u: &mut Unstructured) -> Result<(), arbitrary::Error> {
    let a = closed_path(1e3, u)?;
    let b = closed_path(1e3, u)?;
    let tol = fatsweep::arbitrary::float_in_range(1e-6, 1.0, u)?;

    // Errors are fine, panics aren't.
    if let Ok(top) = Topology::new([&a, &b], tol) {
        for (_, area) in top.areas().iter() {
            assert_eq!(area.winding.len(), 2);
        }
        let _ = top.contours(|w| w[0] != 0 || w[1] != 0);
    }
    Ok(())
}

fuzz_target!(|data: &[u8]| {
    let _ = build(&mut Unstructured::new(data));
});
