use anyhow::Result;
use clap::Parser;
use initproc_stub::{DEFAULT_INIT_PROC, logger};

/// Select the kernel's init process by generating `os/initproc.S`.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Name of the program the kernel runs first (UTF-8)
    #[arg(value_name = "INIT_PROC", default_value = DEFAULT_INIT_PROC)]
    init_proc: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    logger::init(logger::level_from_env());

    initproc_stub::generate(&cli.init_proc)
}
