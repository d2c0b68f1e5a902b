use crate::commands::{run_requirements, run_token, RequirementsArgs, TokenArgs};
use crate::server;
use clap::{Args, Parser, Subcommand};
use visa_journey::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Visa Journey",
    about = "Run the visa journey service or inspect personalized requirements",
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
    /// Print the documents, steps and fees that apply to a set of answers
    Requirements(RequirementsArgs),
    /// Issue a bearer token signed with the configured secret (development aid)
    Token(TokenArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Requirements(args) => run_requirements(args),
        Command::Token(args) => run_token(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use visa_journey::catalog::AnswerValue;

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["visa-journey-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn requirements_collects_repeated_answers() {
        let cli = Cli::try_parse_from([
            "visa-journey-api",
            "requirements",
            "--origin",
            "india",
            "--destination",
            "uk",
            "--visa-type",
            "student",
            "--answer",
            "hasCAS=true",
            "--answer",
            "studyLocation=london",
        ])
        .expect("parses");

        let Some(Command::Requirements(args)) = cli.command else {
            panic!("expected requirements command");
        };
        assert_eq!(args.answers.len(), 2);
        assert_eq!(args.answers[0], ("hasCAS".to_string(), AnswerValue::Bool(true)));
    }
}
