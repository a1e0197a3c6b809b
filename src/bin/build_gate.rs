//! CI gate binary.
//!
//! Three modes, combinable in one invocation:
//! - `--build <file.json>` verifies a build description and exits
//!   nonzero listing every required step that did not succeed;
//! - `--sentinel-dir <dir> --suite <name>...` reports the suites whose
//!   sentinel file is absent;
//! - `--sentinel-dir <dir> --mark <name> -- <command...>` runs a suite
//!   command, propagates its exit code, and drops the sentinel only on
//!   success.

use std::ffi::OsString;
use std::path::PathBuf;

use dataproc_spark_connect::gate::{run_suite, BuildDescription, SentinelDir};
use dataproc_spark_connect::logging;

#[derive(Debug, Default)]
struct GateArgs {
    build: Option<PathBuf>,
    sentinel_dir: Option<PathBuf>,
    suites: Vec<String>,
    mark: Option<String>,
    command: Vec<String>,
    help: bool,
}

fn parse_args<I>(args: I) -> Result<GateArgs, lexopt::Error>
where
    I: IntoIterator<Item = OsString>,
{
    use lexopt::prelude::*;

    let mut result = GateArgs::default();
    let mut parser = lexopt::Parser::from_iter(args);

    while let Some(arg) = parser.next()? {
        match arg {
            Short('h') | Long("help") => result.help = true,
            Long("build") => result.build = Some(parser.value()?.parse()?),
            Long("sentinel-dir") => result.sentinel_dir = Some(parser.value()?.parse()?),
            Long("suite") => result.suites.push(parser.value()?.parse()?),
            Long("mark") => result.mark = Some(parser.value()?.parse()?),
            Value(val) => {
                // Everything after the first positional is the suite command.
                result.command.push(val.to_string_lossy().into_owned());
                for rest in parser.raw_args()? {
                    result.command.push(rest.to_string_lossy().into_owned());
                }
            }
            _ => return Err(arg.unexpected()),
        }
    }

    Ok(result)
}

fn print_help() {
    println!(
        r#"build-gate {version}
CI gate: build-status verification and test-suite sentinels

USAGE:
    build-gate --build <FILE>
    build-gate --sentinel-dir <DIR> --suite <NAME>...
    build-gate --sentinel-dir <DIR> --mark <NAME> -- <COMMAND>...

OPTIONS:
        --build <FILE>        Verify a build description (JSON)
        --sentinel-dir <DIR>  Directory holding suite sentinel files
        --suite <NAME>        Require this suite's sentinel (repeatable)
        --mark <NAME>         Run the trailing command and mark the suite
                              on success, propagating the exit code
    -h, --help                Print help
"#,
        version = env!("CARGO_PKG_VERSION")
    );
}

fn run(args: GateArgs) -> i32 {
    if let Some(ref path) = args.build {
        let build = match BuildDescription::from_file(path) {
            Ok(build) => build,
            Err(e) => {
                eprintln!("error: cannot load build description: {e}");
                return 1;
            }
        };
        if let Err(e) = build.verify() {
            eprintln!("error: {e}");
            return 1;
        }
        println!("all required build steps succeeded");
    }

    if let Some(ref dir) = args.sentinel_dir {
        let sentinels = SentinelDir::new(dir);

        if let Some(ref suite) = args.mark {
            return match run_suite(&sentinels, suite, &args.command) {
                Ok(code) => code,
                Err(e) => {
                    eprintln!("error: {e}");
                    1
                }
            };
        }

        if !args.suites.is_empty() {
            if let Err(e) = sentinels.verify(args.suites.iter().map(String::as_str)) {
                eprintln!("error: {e}");
                return 1;
            }
            println!("all suites completed");
        }
    }

    0
}

fn main() {
    logging::try_init().ok();

    let args = match parse_args(std::env::args_os()) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("try 'build-gate --help'");
            std::process::exit(2);
        }
    };

    if args.help
        || (args.build.is_none() && args.sentinel_dir.is_none())
    {
        print_help();
        return;
    }

    std::process::exit(run(args));
}
