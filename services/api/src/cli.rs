use crate::server;
use crate::terminal::{run_assess, run_catalog, run_wizard, AssessArgs, CatalogArgs, WizardArgs};
use clap::{Args, Parser, Subcommand};
use noise_wizard::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Noise Impact Wizard",
    about = "Guide a construction noise impact assessment and relay it to the calculation service",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk through the assessment interactively in the terminal
    Wizard(WizardArgs),
    /// Run one assessment from a JSON answers file
    Assess(AssessArgs),
    /// Print a reference catalog grouped the way the wizard shows it
    Catalog(CatalogArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Override the calculation service endpoint
    #[arg(long)]
    pub(crate) calculator_url: Option<String>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Wizard(args) => run_wizard(args).await,
        Command::Assess(args) => run_assess(args).await,
        Command::Catalog(args) => run_catalog(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_defaults_to_serve() {
        let cli = Cli::try_parse_from(["noise-wizard-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn assess_takes_answers_and_output_dir() {
        let cli = Cli::try_parse_from([
            "noise-wizard-api",
            "assess",
            "answers.json",
            "--output-dir",
            "out",
            "--json",
        ])
        .expect("parses");

        match cli.command {
            Some(Command::Assess(args)) => {
                assert_eq!(args.answers.to_str(), Some("answers.json"));
                assert_eq!(args.output_dir.as_deref().and_then(|p| p.to_str()), Some("out"));
                assert!(args.json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn catalog_rejects_unknown_tables() {
        assert!(Cli::try_parse_from(["noise-wizard-api", "catalog", "cranes"]).is_err());
        assert!(Cli::try_parse_from(["noise-wizard-api", "catalog", "plants"]).is_ok());
    }
}
