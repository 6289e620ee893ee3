use std::process::ExitCode;

use bpaf::Bpaf;
use rde_cli_common::CLIGlobalOptions;
use rde_diagnostics::RdeError;

mod commands;
mod map_file;

use commands::bej::{BejCommand, bej_command};
use commands::generate_dictionaries::{GenerateDictionariesArgs, generate_dictionaries_args};

#[derive(Debug, Clone, Bpaf)]
#[bpaf(options, version, fallback_to_usage, generate(cli))]
#[allow(clippy::upper_case_acronyms)]
/// Redfish Device Enablement (RDE) dictionary and BEJ toolchain
struct CLI {
    #[bpaf(external(commands))]
    command: Commands,
}

#[derive(Debug, Clone, Bpaf)]
enum Commands {
    #[bpaf(command("generate-dictionaries"))]
    /// Scan CSDL/JSON Schema directories and emit binary dictionaries
    GenerateDictionaries(
        #[bpaf(external(cli_global_options), hide_usage)] CLIGlobalOptions,
        #[bpaf(external(generate_dictionaries_args))] GenerateDictionariesArgs,
    ),

    #[bpaf(command("bej"))]
    /// Encode/decode a JSON payload against a BEJ dictionary pair
    Bej(
        #[bpaf(external(cli_global_options), hide_usage)] CLIGlobalOptions,
        #[bpaf(external(bej_command))] BejCommand,
    ),
}

fn setup(global: &CLIGlobalOptions) {
    rde_diagnostics::init_tracing(global.log_level);
    rde_diagnostics::init_miette(global.colors.and_then(rde_cli_common::ColorsArg::force_colors));
}

fn main() -> ExitCode {
    let opts = cli().run();

    let result: Result<(), RdeError> = match opts.command {
        Commands::GenerateDictionaries(global, args) => {
            setup(&global);
            commands::generate_dictionaries::run(&args)
        }
        Commands::Bej(global, BejCommand::Encode(args)) => {
            setup(&global);
            commands::bej::run_encode(&args)
        }
        Commands::Bej(global, BejCommand::Decode(args)) => {
            setup(&global);
            commands::bej::run_decode(&args)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e:?}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_generate_dictionaries() {
        let parsed = cli()
            .run_inner(&["generate-dictionaries", "-x", "schemas", "-o", "out"])
            .unwrap();
        match parsed.command {
            Commands::GenerateDictionaries(_, args) => {
                assert_eq!(args.csdl_dirs, vec![std::path::PathBuf::from("schemas")]);
                assert_eq!(args.out_dirs, vec![std::path::PathBuf::from("out")]);
            }
            Commands::Bej(..) => panic!("expected GenerateDictionaries"),
        }
    }

    #[test]
    fn cli_parses_bej_encode() {
        let parsed = cli()
            .run_inner(&["bej", "encode", "-s", "schema.bin", "-a", "annot.bin"])
            .unwrap();
        match parsed.command {
            Commands::Bej(_, BejCommand::Encode(args)) => {
                assert_eq!(args.schema, std::path::PathBuf::from("schema.bin"));
            }
            _ => panic!("expected Bej::Encode"),
        }
    }

    #[test]
    fn cli_parses_bej_decode() {
        let parsed = cli()
            .run_inner(&["bej", "decode", "-s", "schema.bin", "-a", "annot.bin", "-b", "in.bej"])
            .unwrap();
        match parsed.command {
            Commands::Bej(_, BejCommand::Decode(args)) => {
                assert_eq!(args.input_bej, std::path::PathBuf::from("in.bej"));
            }
            _ => panic!("expected Bej::Decode"),
        }
    }

    #[test]
    fn cli_rejects_unknown_subcommand() {
        assert!(cli().run_inner(&["bogus"]).is_err());
    }
}
