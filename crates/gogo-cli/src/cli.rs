use clap::{ArgGroup, Parser};

/// CLI surface definition. Options come first; everything after the environment name is the
/// command to run.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "gogo",
    about = "Run a command with the variables of a named environment",
    version,
    arg_required_else_help = true,
    group(ArgGroup::new("mode").args(["init", "list", "add", "encrypt", "decrypt"]))
)]
pub struct Cli {
    /// Create .gogo.yaml in the current directory.
    #[arg(long)]
    pub init: bool,
    /// List the variables of an environment.
    #[arg(long)]
    pub list: bool,
    /// Add a variable to an environment.
    #[arg(long)]
    pub add: bool,
    /// Encrypt every value in .gogo.yaml.
    #[arg(long)]
    pub encrypt: bool,
    /// Decrypt every value in .gogo.yaml.
    #[arg(long)]
    pub decrypt: bool,
    /// Print the command instead of running it.
    #[arg(long)]
    pub dry: bool,
    /// Print the environment, injected variables and final command.
    #[arg(long)]
    pub verbose: bool,
    /// Environment name (e.g. dev, prod).
    pub env: Option<String>,
    /// Command and arguments to run in the environment.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

/// What a parsed command line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Init,
    List,
    Add,
    Encrypt,
    Decrypt,
    Run,
}

impl Cli {
    pub fn action(&self) -> Action {
        if self.init {
            Action::Init
        } else if self.list {
            Action::List
        } else if self.add {
            Action::Add
        } else if self.encrypt {
            Action::Encrypt
        } else if self.decrypt {
            Action::Decrypt
        } else {
            Action::Run
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn parses_run_with_hyphenated_arguments() {
        let cli = Cli::try_parse_from(["gogo", "dev", "ls", "-la", "--color", "$DIR"])
            .expect("parse should succeed");
        assert_eq!(cli.action(), Action::Run);
        assert_eq!(cli.env.as_deref(), Some("dev"));
        assert_eq!(cli.command, ["ls", "-la", "--color", "$DIR"]);
    }

    #[test]
    fn options_after_env_belong_to_the_command() {
        let cli = Cli::try_parse_from(["gogo", "--verbose", "dev", "echo", "--verbose"])
            .expect("parse should succeed");
        assert!(cli.verbose);
        assert_eq!(cli.command, ["echo", "--verbose"]);
    }

    #[test]
    fn parses_list_with_env() {
        let cli = Cli::try_parse_from(["gogo", "--list", "dev"]).expect("parse should succeed");
        assert_eq!(cli.action(), Action::List);
        assert_eq!(cli.env.as_deref(), Some("dev"));
        assert!(cli.command.is_empty());
    }

    #[test]
    fn parses_encrypt_without_env() {
        let cli = Cli::try_parse_from(["gogo", "--encrypt"]).expect("parse should succeed");
        assert_eq!(cli.action(), Action::Encrypt);
        assert_eq!(cli.env, None);
    }

    #[test]
    fn rejects_conflicting_modes() {
        let err = Cli::try_parse_from(["gogo", "--encrypt", "--decrypt"])
            .expect_err("modes are exclusive");
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn no_arguments_shows_help() {
        let err = Cli::try_parse_from(["gogo"]).expect_err("help expected");
        assert_eq!(
            err.kind(),
            ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
        );
    }

    #[test]
    fn version_flag_is_handled_by_clap() {
        let err = Cli::try_parse_from(["gogo", "--version"]).expect_err("version exits");
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
    }
}
