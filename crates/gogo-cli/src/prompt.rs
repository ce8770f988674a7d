use std::io::{self, BufRead, Write};

/// Print `question` and read one line from stdin.
pub fn ask(question: &str) -> io::Result<String> {
    print!("{question}");
    io::stdout().flush()?;
    read_answer(io::stdin().lock())
}

/// Prompt for a password without echoing it.
pub fn ask_password(question: &str) -> io::Result<String> {
    rpassword::prompt_password(question)
}

/// Ask only when `value` is missing or empty.
pub fn ask_if_missing(value: Option<String>, question: &str) -> io::Result<String> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        _ => ask(question),
    }
}

fn read_answer<R: BufRead>(mut reader: R) -> io::Result<String> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "no input available",
        ));
    }
    let trimmed = line.strip_suffix('\n').unwrap_or(&line);
    Ok(trimmed.strip_suffix('\r').unwrap_or(trimmed).to_string())
}
