use color_eyre::Result;
use colored::Colorize;
use gogo_core::GogoError;
use gogo_storage::{init_config, ConfigStore, InitOutcome, KeyProvider};
use tracing::info;

use crate::{
    cli::{Action, Cli},
    config::{Paths, Settings},
    prompt, runner, storage,
};

const ENV_QUESTION: &str = "Enter env name: ";

/// Execute the parsed command line. Returns the process exit code.
pub async fn handle(cli: Cli, settings: &Settings, paths: &Paths) -> Result<i32> {
    match cli.action() {
        Action::Init => {
            let env = prompt::ask_if_missing(cli.env, ENV_QUESTION)?;
            init(paths, &env)?;
        }
        Action::List => {
            let env = prompt::ask_if_missing(cli.env, ENV_QUESTION)?;
            let store = storage::open_store(paths, settings)?;
            for line in list_lines(&store, &env)? {
                println!("{}", line.bright_black());
            }
        }
        Action::Add => {
            let env = prompt::ask_if_missing(cli.env, ENV_QUESTION)?;
            let store = storage::open_store(paths, settings)?;
            let name = prompt::ask("Enter variable name: ")?;
            let value = prompt::ask("Enter variable value: ")?;
            store.add_variable(&env, &name, &value)?;
            println!("{}", format!("Var added to env {env}: {name}").bright_black());
        }
        Action::Encrypt => {
            let store = storage::open_store(paths, settings)?;
            let outcome =
                store.encrypt(|| Ok(prompt::ask_password("Enter password (max. 32): ")?))?;
            println!("{outcome}");
        }
        Action::Decrypt => {
            let store = storage::open_store(paths, settings)?;
            let outcome = store.decrypt(|| Ok(prompt::ask_password("Enter password: ")?))?;
            println!("{outcome}");
        }
        Action::Run => {
            let env = cli.env.clone().ok_or(GogoError::MissingEnvironment)?;
            let store = storage::open_store(paths, settings)?;
            return run(&store, &env, &cli).await;
        }
    }
    Ok(0)
}

fn init(paths: &Paths, env: &str) -> Result<()> {
    match init_config(paths.locator.local_path(), env)? {
        InitOutcome::Created(path) => {
            info!(path = %path.display(), "configuration created");
            println!(
                "{}",
                format!("{} created with env {env}", path.display()).bright_black()
            );
        }
        InitOutcome::AlreadyExists(path) => println!("{} already exists", path.display()),
    }
    Ok(())
}

/// ` - NAME=VALUE` for every variable of `env`, sorted by name.
fn list_lines<P: KeyProvider>(store: &ConfigStore<P>, env: &str) -> Result<Vec<String>> {
    Ok(store
        .get_environment(env)?
        .into_iter()
        .map(|(name, value)| format!(" - {name}={value}"))
        .collect())
}

async fn run<P: KeyProvider>(store: &ConfigStore<P>, env: &str, cli: &Cli) -> Result<i32> {
    let vars = store.get_environment(env)?;
    let plan = runner::plan(&cli.command, &vars)?;

    if cli.verbose || cli.dry {
        eprintln!("{}", format!("env: {env}").bright_black());
        for name in vars.keys() {
            eprintln!("{}", format!(" - inject {name}").bright_black());
        }
        eprintln!("{}", plan.to_string().bright_black());
    }
    if cli.dry {
        return Ok(0);
    }
    runner::run(&plan).await
}
