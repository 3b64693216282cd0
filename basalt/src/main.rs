use std::fs;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use basalt::{Fault, Interpreter, Program};

/// How many instructions to execute per `run` call before yielding back to
/// the host loop.
const DEFAULT_CYCLES_PER_TICK: usize = 10_000;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Compiled program image to execute
    #[arg(help = "The .pcode image to run")]
    image: String,

    /// Instructions per cooperative tick
    #[arg(long, default_value_t = DEFAULT_CYCLES_PER_TICK)]
    cycles_per_tick: usize,

    /// Override the image's startup procedure
    #[arg(long)]
    entry: Option<usize>,
}

fn run(cli: &Cli) -> Result<(), Fault> {
    let image = fs::read(&cli.image)?;
    let program = Program::deserialize(&image)?;
    let entry = cli.entry.unwrap_or(program.startup_procedure_index);

    let mut interpreter = Interpreter::new(program);
    interpreter.init(entry)?;
    while interpreter.run(cli.cycles_per_tick)? {}

    if let Some(err) = interpreter.error() {
        error!(
            "program ended with unhandled error {}: {}",
            err.code.num.normalize(),
            err.message
        );
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(fault) => {
            error!("fatal: {fault}");
            ExitCode::FAILURE
        }
    }
}
