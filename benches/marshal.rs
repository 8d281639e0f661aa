//! Marshalling benchmarks
//!
//! Measures descriptor validation, argument marshalling and full calls
//! against an in-process C function.

use core::ffi::c_void;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dynwrap::descriptor::{parse_json, Param};
use dynwrap::interop::marshal_args;
use dynwrap::{invoke, DType, Descriptor, ForeignFunction};

extern "C" fn sum_into(n: *mut i32, data: *mut c_void, total: *mut f64) -> i32 {
    unsafe {
        let data = data as *const f64;
        let mut acc = 0.0;
        for i in 0..*n as usize {
            acc += *data.add(i);
        }
        *total = acc;
    }
    0
}

fn descriptor(len: usize) -> Descriptor {
    Descriptor::new(vec![
        Param::int("n", Some(len as i32)).unwrap(),
        Param::array("data", None, Some(&[len]), Some(DType::Float64)).unwrap(),
        Param::array("total", None, Some(&[1]), Some(DType::Float64)).unwrap(),
    ])
    .unwrap()
}

fn bench_parse(c: &mut Criterion) {
    let json = r#"[
        {"name": "n", "type": "int", "value": 3},
        {"name": "data", "type": "array", "value": [[1.0, 2.0], [3.0, 4.0]], "dtype": "float64", "swapaxes": [0, 1]},
        {"name": "label", "type": "string", "size": 16}
    ]"#;

    c.bench_function("parse_json_descriptor", |b| {
        b.iter(|| parse_json(black_box(json)).unwrap())
    });
}

fn bench_marshal(c: &mut Criterion) {
    let mut group = c.benchmark_group("marshal_args");

    for len in [16, 1024, 65536] {
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            b.iter_with_setup(
                || {
                    descriptor(len)
                        .into_params()
                        .into_iter()
                        .map(|p| p.into_parts().1)
                        .collect::<Vec<_>>()
                },
                |kinds| black_box(marshal_args(kinds)),
            )
        });
    }

    group.finish();
}

fn bench_invoke(c: &mut Criterion) {
    let function = unsafe { ForeignFunction::from_raw("sum_into", sum_into as *const c_void) };
    let mut group = c.benchmark_group("invoke");

    for len in [16, 1024, 65536] {
        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, &len| {
            b.iter_with_setup(|| descriptor(len), |d| unsafe { invoke(&function, d).unwrap() })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_marshal, bench_invoke);
criterion_main!(benches);
