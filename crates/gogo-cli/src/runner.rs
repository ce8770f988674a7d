use std::{fmt, process::Stdio};

use color_eyre::{
    eyre::{bail, eyre, WrapErr},
    Result,
};
use colored::Colorize;
use gogo_core::Variables;
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Command,
};
use tracing::debug;

/// A fully resolved child invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandPlan {
    pub program: String,
    pub args: Vec<String>,
    pub vars: Variables,
}

impl fmt::Display for CommandPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(token: &str) -> String {
    if token.is_empty() || token.chars().any(char::is_whitespace) {
        format!("'{}'", token.replace('\'', r"'\''"))
    } else {
        token.to_string()
    }
}

/// Substitute `$NAME` in every token and split the first token on whitespace, so both
/// `gogo dev ls -la` and `gogo dev "ls -la"` run `ls` with `-la`.
pub fn plan(tokens: &[String], vars: &Variables) -> Result<CommandPlan> {
    let mut substituted = tokens.iter().map(|token| substitute(token, vars));
    let first = substituted
        .next()
        .ok_or_else(|| eyre!("no command given"))?;

    let mut words = first.split_whitespace().map(str::to_string);
    let Some(program) = words.next() else {
        bail!("no command given");
    };
    let args = words.chain(substituted).collect();

    Ok(CommandPlan {
        program,
        args,
        vars: vars.clone(),
    })
}

// One left-to-right pass: at each `$` the longest matching name wins, and substituted values are
// never scanned again.
fn substitute(token: &str, vars: &Variables) -> String {
    let mut out = String::with_capacity(token.len());
    let mut rest = token;
    while let Some(at) = rest.find('$') {
        out.push_str(&rest[..at]);
        let after = &rest[at + 1..];
        let longest = vars
            .iter()
            .filter(|(name, _)| !name.is_empty() && after.starts_with(name.as_str()))
            .max_by_key(|(name, _)| name.len());
        match longest {
            Some((name, value)) => {
                out.push_str(value);
                rest = &after[name.len()..];
            }
            None => {
                out.push('$');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Run the plan with inherited stdin, relaying stdout and stderr line by line. Returns the exit
/// code to report.
pub async fn run(plan: &CommandPlan) -> Result<i32> {
    let mut child = Command::new(&plan.program)
        .args(&plan.args)
        .envs(&plan.vars)
        .stdin(Stdio::inherit())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .wrap_err_with(|| format!("could not start {}", plan.program))?;
    debug!(pid = ?child.id(), program = %plan.program, "child started");

    let stdout = child.stdout.take().map(|out| {
        tokio::spawn(relay_lines(out, |line| println!("{line}")))
    });
    let stderr = child.stderr.take().map(|err| {
        tokio::spawn(relay_lines(err, |line| eprintln!("{}", line.red())))
    });

    let status = child
        .wait()
        .await
        .wrap_err_with(|| format!("could not wait for {}", plan.program))?;
    for relay in [stdout, stderr].into_iter().flatten() {
        relay.await.wrap_err("output relay panicked")??;
    }

    debug!(%status, "child exited");
    Ok(exit_code(status))
}

async fn relay_lines<R, F>(reader: R, mut sink: F) -> Result<()>
where
    R: AsyncRead + Unpin,
    F: FnMut(String),
{
    let mut lines = BufReader::new(reader).lines();
    while let Some(line) = lines.next_line().await? {
        sink(line);
    }
    Ok(())
}

#[cfg(unix)]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| 128 + signal))
        .unwrap_or(1)
}

#[cfg(not(unix))]
fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(1)
}
