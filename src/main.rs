use clap::Parser;
use mt_edi::cli::{args::Args, commands};
use std::process;

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    // If no subcommand was provided, show help and available commands
    if args.command.is_none() {
        show_help_and_commands();
        process::exit(0);
    }

    match commands::run(args) {
        Ok(()) => process::exit(0),
        Err(error) => {
            // Error occurred - print to stderr and exit with error code
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}

/// Show help information and available commands when no subcommand is provided
fn show_help_and_commands() {
    println!("mt-edi - Magnetotelluric EDI file tool");
    println!("======================================");
    println!();
    println!("Read, inspect and rewrite EDI transfer-function files.");
    println!();
    println!("USAGE:");
    println!("    mt-edi <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("    inspect     Print station, position, frequencies and channels of a file");
    println!("    rewrite     Read a file and write it back in canonical form");
    println!("    scan        Summarise every EDI file under a directory");
    println!("    help        Show this help message or help for specific commands");
    println!();
    println!("OPTIONS:");
    println!("    -h, --help       Show help information");
    println!("    -V, --version    Show version information");
    println!("    -v, --verbose    Increase logging verbosity");
    println!("    -q, --quiet      Only show warnings and errors");
    println!();
    println!("Run 'mt-edi <COMMAND> --help' for more information on a specific command.");
}
