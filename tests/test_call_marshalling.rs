use core::ffi::{c_char, c_void};
use dynwrap::descriptor::{parse_json, parse_toml, Param};
use dynwrap::{invoke, ArrayBuffer, DType, Descriptor, DescriptorError, Error, ForeignFunction, RawParam, Value};
use proptest::prelude::*;

extern "C" fn fill_counts(n: *mut i32, out: *mut c_void) -> i32 {
    unsafe {
        *n = 10;
        let out = out as *mut i32;
        for i in 0..4 {
            *out.add(i) = i as i32 + 1;
        }
    }
    0
}

/// Leaves every argument alone
extern "C" fn untouched(_a: *mut c_void, _b: *mut c_void, _c: *mut c_void, _d: *mut c_void) -> i32 {
    0
}

/// Writes 0..rows*cols row-major into a buffer the caller thinks is (cols, rows)
extern "C" fn column_major(data: *mut c_void, rows: *mut i32, cols: *mut i32) -> i32 {
    unsafe {
        let data = data as *mut f64;
        for i in 0..(*rows * *cols) as usize {
            *data.add(i) = i as f64;
        }
    }
    0
}

extern "C" fn first_byte(text: *mut c_char) -> i32 {
    unsafe { *text as i32 }
}

fn function(name: &str, ptr: *const c_void) -> ForeignFunction {
    unsafe { ForeignFunction::from_raw(name, ptr) }
}

#[test]
fn test_int_and_array_end_to_end() {
    let f = function("fill_counts", fill_counts as *const c_void);
    let d = Descriptor::new(vec![
        Param::int("n", Some(5)).unwrap(),
        Param::array("out", None, Some(&[4]), Some(DType::Int32)).unwrap(),
    ])
    .unwrap();

    let result = unsafe { invoke(&f, d) }.unwrap();
    assert_eq!(result.status(), 0);
    assert_eq!(result["n"], Value::Int(10));
    assert_eq!(result["out"].as_array().unwrap().to_vec::<i32>().unwrap(), vec![1, 2, 3, 4]);
    assert_eq!(result.values().len(), 2);
    assert_eq!(result.dictionary().keys().collect::<Vec<_>>(), vec!["n", "out"]);
}

#[test]
fn test_end_to_end_from_json() {
    let f = function("fill_counts", fill_counts as *const c_void);
    let d = parse_json(
        r#"[
            {"name": "n", "type": "int", "value": 5},
            {"name": "out", "type": "array", "size": 4, "dtype": "int32"}
        ]"#,
    )
    .unwrap();

    let result = unsafe { invoke(&f, d) }.unwrap();
    let json = result.to_json();
    assert_eq!(json["status"], 0);
    assert_eq!(json["dictionary"]["n"], 10);
    assert_eq!(json["dictionary"]["out"], serde_json::json!([1, 2, 3, 4]));
}

#[test]
fn test_reserved_status_name() {
    let err = Param::int("status", Some(1)).unwrap_err();
    assert!(matches!(err, Error::Descriptor(DescriptorError::ReservedName)));

    let err = parse_json(r#"[{"name": "status", "type": "long"}]"#).unwrap_err();
    assert!(matches!(err, Error::Descriptor(DescriptorError::ReservedName)));
}

#[test]
fn test_array_without_dtype() {
    let err = Param::array("a", None, Some(&[3]), None).unwrap_err();
    assert!(matches!(err, Error::Descriptor(DescriptorError::MissingDType { .. })));

    let err = parse_json(r#"[{"name": "a", "type": "array", "size": 3}]"#).unwrap_err();
    assert!(err.is_descriptor());
}

#[test]
fn test_string_without_size() {
    let err = Param::string("s", None, None).unwrap_err();
    assert!(matches!(err, Error::Descriptor(DescriptorError::MissingSize { .. })));
}

#[test]
fn test_unallocatable_sizes_rejected_before_call() {
    let err = parse_json(
        r#"[{"name": "a", "type": "array", "size": [4294967296, 4294967296, 4294967296], "dtype": "int8"}]"#,
    )
    .unwrap_err();
    assert!(matches!(err, Error::Descriptor(DescriptorError::InvalidValue { .. })));

    let err = Param::string("s", None, Some(usize::MAX)).unwrap_err();
    assert!(err.is_descriptor());
}

#[test]
fn test_unknown_type_tag() {
    let err = parse_json(r#"[{"name": "x", "type": "unsupported_tag"}]"#).unwrap_err();
    match err {
        Error::UnknownType(tag) => assert_eq!(tag, "unsupported_tag"),
        other => panic!("expected UnknownType, got {:?}", other),
    }
    assert!(Error::UnknownType("unsupported_tag".into()).to_string().contains("unsupported_tag"));
}

#[test]
fn test_duplicate_names() {
    let err = Descriptor::new(vec![
        Param::int("x", None).unwrap(),
        Param::float("x", None).unwrap(),
    ])
    .unwrap_err();
    assert!(matches!(err, Error::Descriptor(DescriptorError::DuplicateName { .. })));
}

#[test]
fn test_swapaxes_after_call() {
    let f = function("column_major", column_major as *const c_void);
    let d = Descriptor::new(vec![
        Param::array("grid", None, Some(&[3, 2]), Some(DType::Float64))
            .unwrap()
            .with_swapaxes(0, 1)
            .unwrap(),
        Param::int("rows", Some(2)).unwrap(),
        Param::int("cols", Some(3)).unwrap(),
    ])
    .unwrap();

    let result = unsafe { invoke(&f, d) }.unwrap();
    let grid = result["grid"].array_view::<f64>().unwrap();
    assert_eq!(grid.shape(), &[3, 2]);

    // reshaped to (2, 3) = [[0,1,2],[3,4,5]], then transposed
    for i in 0..2 {
        for j in 0..3 {
            assert_eq!(grid[[j, i]], (i * 3 + j) as f64);
        }
    }
}

#[test]
fn test_swapaxes_out_of_range() {
    let err = Param::array("a", None, Some(&[4]), Some(DType::Int32))
        .unwrap()
        .with_swapaxes(0, 1)
        .unwrap_err();
    assert!(matches!(err, Error::Descriptor(DescriptorError::InvalidSwapAxes { .. })));
}

#[test]
fn test_swapaxes_ignored_on_scalars() {
    let f = function("untouched", untouched as *const c_void);
    let d = parse_json(
        r#"[
            {"name": "a", "type": "int", "value": 3, "swapaxes": [0, 1]},
            {"name": "b", "type": "uint"},
            {"name": "c", "type": "long"},
            {"name": "d", "type": "float"}
        ]"#,
    )
    .unwrap();
    let result = unsafe { invoke(&f, d) }.unwrap();
    assert_eq!(result["a"], Value::Int(3));
}

#[test]
fn test_text_parameter() {
    let f = function("first_byte", first_byte as *const c_void);
    let d = Descriptor::new(vec![Param::string("s", Some("xyz"), None).unwrap()]).unwrap();
    let result = unsafe { invoke(&f, d) }.unwrap();
    assert_eq!(result.status(), b'x' as i32);
    assert_eq!(result["s"].as_text().unwrap(), "xyz");
}

#[test]
fn test_caller_array_values_pass_through() {
    let f = function("untouched", untouched as *const c_void);
    let grid = ArrayBuffer::from_shape_vec(&[2, 2], vec![1.5f32, 2.5, 3.5, 4.5]).unwrap();
    let d = Descriptor::new(vec![
        Param::array("grid", Some(grid.clone()), None, None).unwrap(),
        Param::int("b", None).unwrap(),
        Param::int("c", None).unwrap(),
        Param::int("d", None).unwrap(),
    ])
    .unwrap();

    let result = unsafe { invoke(&f, d) }.unwrap();
    assert_eq!(result["grid"].as_array(), Some(&grid));
}

#[test]
fn test_toml_descriptor() {
    let d = parse_toml(
        r#"
[[param]]
name = "n"
type = "int"
value = 5

[[param]]
name = "out"
type = "array"
size = [2, 2]
dtype = "int32"
"#,
    )
    .unwrap();
    assert_eq!(d.names().collect::<Vec<_>>(), vec!["n", "out"]);

    let f = function("fill_counts", fill_counts as *const c_void);
    let result = unsafe { invoke(&f, d) }.unwrap();
    let out = result["out"].array_view::<i32>().unwrap();
    assert_eq!(out.shape(), &[2, 2]);
    assert_eq!(out[[1, 0]], 3);
}

#[test]
fn test_raw_param_round_trip_through_serde() {
    let raw = RawParam {
        name: "x".to_string(),
        type_tag: "long".to_string(),
        value: Some(serde_json::json!(-4)),
        size: None,
        dtype: None,
        swapaxes: None,
    };
    let text = serde_json::to_string(&[raw]).unwrap();
    assert!(text.contains(r#""type":"long""#));
    let d = parse_json(&text).unwrap();
    assert_eq!(d.len(), 1);
}

fn scalars(a: Option<i32>, b: Option<u32>, c: Option<i64>, d: Option<f32>) -> Descriptor {
    Descriptor::new(vec![
        Param::int("a", a).unwrap(),
        Param::uint("b", b).unwrap(),
        Param::long("c", c).unwrap(),
        Param::float("d", d).unwrap(),
    ])
    .unwrap()
}

proptest! {
    #[test]
    fn prop_scalars_echo(a in any::<i32>(), b in any::<u32>(), c in any::<i64>(), d in -1.0e6f32..1.0e6) {
        let f = function("untouched", untouched as *const c_void);
        let result = unsafe { invoke(&f, scalars(Some(a), Some(b), Some(c), Some(d))) }.unwrap();
        prop_assert_eq!(
            result.values(),
            &[Value::Int(a), Value::UInt(b), Value::Long(c), Value::Float(d)][..]
        );
    }

    #[test]
    fn prop_blank_string_has_requested_length(n in 0usize..256) {
        let f = function("untouched", untouched as *const c_void);
        let d = Descriptor::new(vec![
            Param::string("s", None, Some(n)).unwrap(),
            Param::int("b", None).unwrap(),
            Param::int("c", None).unwrap(),
            Param::int("d", None).unwrap(),
        ])
        .unwrap();
        let result = unsafe { invoke(&f, d) }.unwrap();
        let bytes = result["s"].as_bytes().unwrap();
        prop_assert_eq!(bytes.len(), n);
        prop_assert!(bytes.iter().all(|&b| b == b' '));
    }

    #[test]
    fn prop_zero_arrays(shape in prop::collection::vec(1usize..5, 1..4)) {
        let f = function("untouched", untouched as *const c_void);
        let d = Descriptor::new(vec![
            Param::array("x", None, Some(&shape[..]), Some(DType::UInt16)).unwrap(),
            Param::array("y", None, Some(&shape[..]), Some(DType::Float32)).unwrap(),
            Param::int("c", None).unwrap(),
            Param::int("d", None).unwrap(),
        ])
        .unwrap();
        let result = unsafe { invoke(&f, d) }.unwrap();

        let x = result["x"].as_array().unwrap();
        prop_assert_eq!(x.shape(), &shape[..]);
        prop_assert!(x.to_vec::<u16>().unwrap().iter().all(|&v| v == 0));
        let y = result["y"].as_array().unwrap();
        prop_assert_eq!(y.len(), shape.iter().product::<usize>());
        prop_assert!(y.to_vec::<f32>().unwrap().iter().all(|&v| v == 0.0));
    }
}

#[test]
fn test_scalar_defaults_are_zero() {
    let f = function("untouched", untouched as *const c_void);
    let result = unsafe { invoke(&f, scalars(None, None, None, None)) }.unwrap();
    assert_eq!(
        result.values(),
        &[Value::Int(0), Value::UInt(0), Value::Long(0), Value::Float(0.0)]
    );
}
