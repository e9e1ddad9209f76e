//! The `netlist` command-line driver.
//!
//! Parses a netlist source file, schedules it and simulates it cycle by
//! cycle, prompting for input values and printing output values. Secondary
//! modes stop earlier in the pipeline: `--syntax-only`, `--dep-graph` and
//! `--schedule`.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use netlist_ir::{mask, Program, Word};
use netlist_sim::{parse_image, DependencyGraph, MemoryImage, Simulator};
use netlist_syntax::disassemble;

mod driver;

use driver::{format_duration, parse_value};

/// A netlist compiler and cycle-accurate simulator.
#[derive(Debug, Parser)]
#[command(name = "netlist", version, about, disable_version_flag = true)]
struct Args {
    /// The netlist source file.
    input_file: PathBuf,

    /// Print version information.
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: Option<bool>,

    /// Number of cycles to simulate; 0 loops until interrupted.
    #[arg(short = 'n', long = "cycles", value_name = "N", default_value_t = 0)]
    cycles: u64,

    /// Parse and type-check only.
    #[arg(long)]
    syntax_only: bool,

    /// Print the dependency graph in Graphviz DOT format and exit.
    #[arg(long = "dep-graph")]
    dep_graph: bool,

    /// Print the scheduled disassembly and exit.
    #[arg(long)]
    schedule: bool,

    /// Report the elapsed time of each cycle.
    #[arg(long)]
    timeit: bool,

    /// Batched simulation loop without per-cycle prompts; intended for
    /// programs with no inputs.
    #[arg(long)]
    fast: bool,

    /// Load a memory image for a block, e.g. `--image boot=boot.mem`.
    #[arg(long = "image", value_name = "NAME=FILE")]
    images: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error("failed to read `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{file}:{source}")]
    Syntax {
        file: String,
        source: netlist_syntax::SyntaxError,
    },
    #[error(transparent)]
    Schedule(#[from] netlist_sim::ScheduleError),
    #[error(transparent)]
    Image(#[from] netlist_sim::ImageError),
    #[error("`{spec}` is not a NAME=FILE image specification")]
    BadImageSpec { spec: String },
    #[error("end of input while reading `{name}`")]
    EndOfInput { name: String },
    #[error("--fast needs a cycle count or a program without inputs")]
    FastNeedsCycles,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), Error> {
    let source = std::fs::read_to_string(&args.input_file).map_err(|source| Error::Io {
        path: args.input_file.clone(),
        source,
    })?;

    let mut program = netlist_syntax::parse(&source).map_err(|source| Error::Syntax {
        file: args.input_file.display().to_string(),
        source,
    })?;

    if args.syntax_only {
        return Ok(());
    }

    let graph = DependencyGraph::build(&program);
    if args.dep_graph {
        print!("{}", graph.to_dot(&program));
        return Ok(());
    }

    graph.schedule(&mut program)?;
    if args.schedule {
        print!("{}", disassemble(&program));
        return Ok(());
    }

    let images = load_images(&args.images)?;
    let mut simulator = Simulator::with_images(&program, &images)?;

    if args.fast {
        run_fast(&mut simulator, args)
    } else {
        run_interactive(&mut simulator, args)
    }
}

fn load_images(specs: &[String]) -> Result<MemoryImage, Error> {
    let mut images = MemoryImage::new();
    for spec in specs {
        let (name, path) = spec.split_once('=').ok_or_else(|| Error::BadImageSpec {
            spec: spec.clone(),
        })?;
        let path = PathBuf::from(path);
        let text = std::fs::read_to_string(&path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        images.insert(name, parse_image(&text)?);
    }
    Ok(images)
}

fn run_interactive(simulator: &mut Simulator<'_>, args: &Args) -> Result<(), Error> {
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut step: u64 = 1;

    while args.cycles == 0 || step <= args.cycles {
        println!("Step {step}:");
        query_inputs(simulator, &mut lines)?;

        let start = Instant::now();
        simulator.cycle();
        let elapsed = start.elapsed();

        print_outputs(simulator);
        if args.timeit {
            println!("The cycle took {}", format_duration(elapsed));
        }
        step += 1;
    }

    Ok(())
}

fn run_fast(simulator: &mut Simulator<'_>, args: &Args) -> Result<(), Error> {
    if args.cycles == 0 {
        if !simulator.program().inputs().is_empty() {
            return Err(Error::FastNeedsCycles);
        }
        loop {
            simulator.simulate(1 << 16);
        }
    }

    let start = Instant::now();
    simulator.simulate(args.cycles);
    let elapsed = start.elapsed();

    print_outputs(simulator);
    if args.timeit {
        let per_cycle = elapsed / u32::try_from(args.cycles).unwrap_or(u32::MAX);
        println!(
            "The simulation took {} ({} per cycle)",
            format_duration(elapsed),
            format_duration(per_cycle)
        );
    }
    Ok(())
}

/// Prompts for every `INPUT` register, re-prompting until the value parses
/// and fits the register's width.
fn query_inputs(
    simulator: &mut Simulator<'_>,
    lines: &mut impl Iterator<Item = io::Result<String>>,
) -> Result<(), Error> {
    let program: &Program = simulator.program();
    for &input in program.inputs() {
        let name = program.register_name(input);
        let width = program.width(input);
        loop {
            print!("{name} ? ");
            let _ = io::stdout().flush();

            let line = match lines.next() {
                Some(line) => line.map_err(|source| Error::Io {
                    path: PathBuf::from("<stdin>"),
                    source,
                })?,
                None => {
                    return Err(Error::EndOfInput {
                        name: name.into_owned(),
                    })
                }
            };

            match parse_value(line.trim()) {
                Some(value) if value <= mask(width) => {
                    simulator.set_register(input, value);
                    break;
                }
                Some(value) => {
                    println!("{value:#b} does not fit in {width} bits.");
                }
                None => {
                    println!("`{}` is not a constant.", line.trim());
                }
            }
        }
    }
    Ok(())
}

fn print_outputs(simulator: &Simulator<'_>) {
    let program = simulator.program();
    for &output in program.outputs() {
        let width = program.width(output) as usize;
        let value: Word = simulator.get_register(output);
        println!(
            "=> {} = {value:0width$b}",
            program.register_name(output)
        );
    }
}
