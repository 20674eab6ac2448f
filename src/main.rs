use clap::{value_parser, Arg, ArgAction, Command};
use colored::*;

use rocm_top::commands;
use rocm_top::TopError;

fn build_cli() -> Command {
    Command::new("rocm-top")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Live dashboard of AMD GPUs and the compute processes using them")
        .arg(
            Arg::new("interval")
                .short('i')
                .long("interval")
                .value_name("MS")
                .help("Refresh interval in milliseconds")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("cpu-window")
                .long("cpu-window")
                .value_name("MS")
                .help("Window over which per-process CPU usage is measured")
                .value_parser(value_parser!(u64)),
        )
        .arg(
            Arg::new("workers")
                .long("workers")
                .value_name("N")
                .help("Threads used to look up process information")
                .value_parser(value_parser!(usize)),
        )
        .arg(
            Arg::new("once")
                .long("once")
                .help("Print one table and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .help("Print one JSON frame per interval until Ctrl+C")
                .action(ArgAction::SetTrue)
                .conflicts_with("once"),
        )
        .arg(
            Arg::new("save-config")
                .long("save-config")
                .help("Persist the effective settings to the config file")
                .action(ArgAction::SetTrue),
        )
        .subcommand(Command::new("version").about("Shows version and ROCm support information"))
}

fn main() {
    rocm_top::init_logging();

    let matches = build_cli().get_matches();

    let result = match matches.subcommand() {
        Some(("version", _)) => commands::version(),
        _ => commands::monitor(&matches),
    };

    if let Err(err) = result {
        let code = err
            .downcast_ref::<TopError>()
            .map(TopError::exit_code)
            .unwrap_or(1);
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        std::process::exit(code);
    }
}
