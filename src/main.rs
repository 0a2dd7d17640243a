//! wait-for - block until a file exists and has the requested modes

use clap::error::ErrorKind;
use clap::Parser;
use wait_for::cli::Args;
use wait_for::error::{EXIT_SATISFIED, EXIT_USAGE};
use wait_for::{format_outcome, WaitOrchestrator};

fn main() {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) if e.kind() == ErrorKind::DisplayVersion => {
            let _ = e.print();
            std::process::exit(EXIT_SATISFIED);
        }
        Err(e) => {
            // help goes through the usage path, like any other argument problem
            eprint!("{}", e);
            std::process::exit(EXIT_USAGE);
        }
    };

    wait_for::logging::init(args.verbose);

    if let Err(e) = run(&args) {
        eprintln!("error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run(args: &Args) -> wait_for::Result<()> {
    let request = args.request()?;
    let config = args.config()?;

    let outcome = WaitOrchestrator::new(request.clone(), config).run()?;

    if let Some(report) = format_outcome(&request, &outcome, args.output_format())? {
        println!("{}", report);
    }
    Ok(())
}
