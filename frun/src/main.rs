use std::env;
use std::path::{Path, PathBuf};
use std::process;

use clap::{crate_version, value_t, App, Arg, ArgMatches};

use frun::{assemble_file, run_file, Error, RunOptions};

fn assembler_stderr(kind: &str, message: &str) {
    eprintln!("[Assembler] ({}): {}", kind, message);
}

fn main() {
    // The `-run` flag predates the option parser; pull it out of the
    // argument list before clap sees it.
    let mut args: Vec<String> = env::args().collect();
    let run_flag = match args.iter().position(|arg| arg == "-run") {
        Some(index) => {
            args.remove(index);
            true
        }
        None => false,
    };

    let matches = App::new("frun")
        .version(crate_version!())
        .about("Assembles and runs programs for the FCPU 8-bit machine")
        .arg(
            Arg::with_name("INPUT")
                .help("The .asm file to assemble, or the .bin listing to run")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::with_name("OUTPUT")
                .help("Directory to place the assembled .bin listing in")
                .index(2),
        )
        .arg(
            Arg::with_name("hertz")
                .long("hertz")
                .takes_value(true)
                .value_name("HZ")
                .help("Throttles the clock to the given frequency"),
        )
        .arg(
            Arg::with_name("max_cycles")
                .long("max-cycles")
                .takes_value(true)
                .value_name("N")
                .help("Stops the machine after N cycles"),
        )
        .arg(
            Arg::with_name("trace")
                .long("trace")
                .help("Prints a line per CPU phase while running"),
        )
        .arg(
            Arg::with_name("dump_ram")
                .long("dump-ram")
                .help("Includes the RAM contents in the final status"),
        )
        .get_matches_from(args);

    if let Err(error) = dispatch(&matches, run_flag) {
        assembler_stderr("Error", &error.to_string());
        process::exit(1);
    }
}

fn dispatch(matches: &ArgMatches, run_flag: bool) -> Result<(), Error> {
    let input = PathBuf::from(matches.value_of("INPUT").unwrap());
    if !input.is_file() {
        return Err(Error::MissingFile(input));
    }

    let options = run_options(matches);
    let dump_ram = matches.is_present("dump_ram");

    match input.extension().and_then(|extension| extension.to_str()) {
        Some("bin") => {
            let (computer, exit_code) = run_file(&input, &options)?;
            print_status(&computer, exit_code, dump_ram);
            Ok(())
        }
        Some("asm") => {
            let output_dir = matches.value_of("OUTPUT").map(Path::new);
            if output_dir.is_none() {
                assembler_stderr(
                    "Warning",
                    "output folder not set, using the assembly script folder",
                );
            }

            let listing_path = assemble_file(&input, output_dir)?;

            if run_flag {
                let (computer, exit_code) = run_file(&listing_path, &options)?;
                print_status(&computer, exit_code, dump_ram);
            }
            Ok(())
        }
        _ => Err(Error::WrongExtension(input)),
    }
}

fn run_options(matches: &ArgMatches) -> RunOptions {
    let mut options = RunOptions::default();

    if matches.is_present("hertz") {
        options.clock_hz =
            value_t!(matches.value_of("hertz"), u32).unwrap_or_else(|error| error.exit());
    }
    if matches.is_present("max_cycles") {
        options.max_cycles = Some(
            value_t!(matches.value_of("max_cycles"), u64).unwrap_or_else(|error| error.exit()),
        );
    }
    options.trace = matches.is_present("trace");

    options
}

fn print_status(computer: &fcpu::Computer, exit_code: fcpu::ExitCode, dump_ram: bool) {
    if dump_ram {
        println!("{}", computer.status_with_ram());
    } else {
        println!("{}", computer.status());
    }
    println!("Exit code: {:?}", exit_code);
}
