use dynwrap::{descriptor, init_logging, invoke, Config, LogConfig, RawParam};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, error, info, Level};

#[derive(Debug)]
struct Args {
    call_file: PathBuf,
    config: Option<PathBuf>,
    compact: bool,
    verbose: bool,
}

impl Args {
    fn from_args() -> Result<Self, String> {
        let args: Vec<String> = std::env::args().collect();
        let prog = args.first().map(String::as_str).unwrap_or("dynwrap");

        let mut call_file = None;
        let mut config = None;
        let mut compact = false;
        let mut verbose = false;

        let mut iter = args.iter().skip(1);
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--help" | "-h" => return Err(Self::usage(prog)),
                "--compact" => compact = true,
                "--verbose" | "-v" => verbose = true,
                "--config" => match iter.next() {
                    Some(path) => config = Some(PathBuf::from(path)),
                    None => return Err("--config requires a file".to_string()),
                },
                path if !path.starts_with('-') && call_file.is_none() => {
                    call_file = Some(PathBuf::from(path))
                }
                opt => return Err(format!("Unexpected argument: {}\n\n{}", opt, Self::usage(prog))),
            }
        }

        match call_file {
            Some(call_file) => Ok(Self { call_file, config, compact, verbose }),
            None => Err(Self::usage(prog)),
        }
    }

    fn usage(prog: &str) -> String {
        format!(
            "dynwrap - call a C function in a dynamic library\n\n\
            USAGE:\n    {} [OPTIONS] <call.json>\n\n\
            OPTIONS:\n    \
            -h, --help          Print help information\n    \
            --config <file>     Use this config instead of discovering .dynwraprc\n    \
            --compact           Print the result on one line\n    \
            -v, --verbose       Log at debug level\n\n\
            CALL FILE:\n    \
            {{\"library\": \"simple\", \"path\": \"./lib\", \"function\": \"fill\",\n     \
            \"params\": [{{\"name\": \"n\", \"type\": \"int\", \"value\": 5}}]}}",
            prog
        )
    }
}

/// Contents of a call file
#[derive(Debug, Deserialize)]
struct CallFile {
    library: String,
    #[serde(default)]
    path: Option<PathBuf>,
    function: String,
    #[serde(default)]
    params: Vec<RawParam>,
}

fn run(args: &Args, config: &Config) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let content = fs::read_to_string(&args.call_file)
        .map_err(|e| format!("Failed to read {}: {}", args.call_file.display(), e))?;
    let call: CallFile = serde_json::from_str(&content)
        .map_err(|e| format!("Invalid call file {}: {}", args.call_file.display(), e))?;

    debug!(library = %call.library, function = %call.function, params = call.params.len(), "call file parsed");

    let descriptor = descriptor::from_raw(call.params)?;
    let library = config.library.resolve(&call.library, call.path.as_deref())?;
    let function = library.function(&call.function)?;

    // The call file is trusted to describe the function's real signature
    let result = unsafe { invoke(&function, descriptor)? };
    info!(function = %call.function, status = result.status(), "call complete");

    Ok(result.to_json())
}

fn main() {
    let args = match Args::from_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let config = match &args.config {
        Some(path) => match Config::load(path) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        },
        None => Config::discover(),
    };

    let log_config = match config.logging.to_log_config() {
        Ok(c) if args.verbose => c.with_level(Level::DEBUG).with_span_events(true),
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}; using defaults", e);
            LogConfig::new()
        }
    };
    let _guard = match init_logging(log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("{}", e);
            None
        }
    };

    debug!(?args, "arguments parsed");

    match run(&args, &config) {
        Ok(json) => {
            let out = if args.compact {
                serde_json::to_string(&json)
            } else {
                serde_json::to_string_pretty(&json)
            };
            match out {
                Ok(s) => println!("{}", s),
                Err(e) => {
                    error!(error = %e, "failed to serialize result");
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            error!(error = %e, "call failed");
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
