use std::env;
use std::path::PathBuf;

/// Compile `tests/native/fixture.c` into a shared library for the
/// integration tests. Failure only warns; the tests skip without it.
fn main() {
    println!("cargo:rerun-if-changed=tests/native/fixture.c");

    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let (file, link_flag) = match target_os.as_str() {
        "linux" | "freebsd" | "netbsd" | "openbsd" => ("libdwfixture.so", "-shared"),
        "macos" => ("libdwfixture.dylib", "-dynamiclib"),
        _ => {
            println!("cargo:warning=native test fixture not built for {}", target_os);
            return;
        }
    };

    let out_path = PathBuf::from(env::var("OUT_DIR").unwrap());
    let output = out_path.join(file);

    let compiler = match cc::Build::new()
        .pic(true)
        .warnings(false)
        .flag_if_supported("-O2")
        .try_get_compiler()
    {
        Ok(compiler) => compiler,
        Err(e) => {
            println!("cargo:warning=no C compiler for the native test fixture: {}", e);
            return;
        }
    };

    let status = compiler
        .to_command()
        .arg(link_flag)
        .arg("-o")
        .arg(&output)
        .arg("tests/native/fixture.c")
        .status();

    match status {
        Ok(status) if status.success() => {
            println!("cargo:rustc-env=DYNWRAP_FIXTURE_DIR={}", out_path.display());
        }
        Ok(status) => println!("cargo:warning=native test fixture failed to build: {}", status),
        Err(e) => println!("cargo:warning=native test fixture failed to build: {}", e),
    }
}
