#![no_main]

use arbitrary::Unstructured;
use fatsweep::{arbitrary::integer_rect, binary_op, BinaryOp, FillRule};
use kurbo::{BezPath, Point, Shape};
use libfuzzer_sys::fuzz_target;

const SIZE: u16 = 8;

fn set(u: &mut Unstructured) -> Result<BezPath, arbitrary::Error> {
    let mut ret = BezPath::new();
    for _ in 0..u.int_in_range(1..=3)? {
        ret.extend(integer_rect(SIZE, u)?.iter());
    }
    Ok(ret)
}

fn compare(u: &mut Unstructured) -> Result<(), arbitrary::Error> {
    let a = set(u)?;
    let b = set(u)?;
    let out = binary_op(&a, &b, FillRule::NonZero, BinaryOp::Xor)
        .unwrap()
        .to_path();
    for i in 0..SIZE {
        for j in 0..SIZE {
            let p = Point::new(f64::from(i) + 0.5, f64::from(j) + 0.5);
            let expected = (a.winding(p) != 0) != (b.winding(p) != 0);
            assert_eq!(expected, out.winding(p) != 0, "at {p:?}");
        }
    }
    Ok(())
}

fuzz_target!(|data: &[u8]| {
    let _ = compare(&mut Unstructured::new(data));
});
