//! Read-eval-print loop over a [`Session`]

use anyhow::Result;
use dialoguer::Input;
use std::io::{self, BufRead, IsTerminal, Write};

use sheetai_core::Session;

/// What the loop should do with one line of input
#[derive(Debug, PartialEq, Eq)]
enum Line<'a> {
    Quit,
    Help,
    Skip,
    Request(&'a str),
}

fn classify(raw: &str) -> Line<'_> {
    let trimmed = raw.trim();
    if trimmed.eq_ignore_ascii_case("quit") || trimmed.eq_ignore_ascii_case("exit") {
        Line::Quit
    } else if trimmed == "--help" {
        Line::Help
    } else if trimmed.is_empty() {
        Line::Skip
    } else {
        Line::Request(trimmed)
    }
}

/// Next line from a non-interactive reader; `None` at end of input
fn next_line(reader: &mut impl BufRead) -> Option<String> {
    let mut line = String::new();
    match reader.read_line(&mut line) {
        Ok(0) => None,
        Ok(_) => Some(line),
        Err(e) => {
            tracing::debug!("Input closed: {}", e);
            None
        }
    }
}

fn prompt(interactive: bool) -> Option<String> {
    if interactive {
        match Input::<String>::new()
            .with_prompt("You")
            .allow_empty(true)
            .interact_text()
        {
            Ok(line) => Some(line),
            // Ctrl-D ends the session like `exit`
            Err(e) => {
                tracing::debug!("Input closed: {}", e);
                None
            }
        }
    } else {
        print!("You: ");
        let _ = io::stdout().flush();
        next_line(&mut io::stdin().lock())
    }
}

/// Prompt until `quit` / `exit` or end of input
pub async fn run(session: &mut Session) -> Result<()> {
    session.output().print_welcome();
    // dialoguer needs a terminal; piped input is read line by line
    let interactive = io::stdin().is_terminal();

    loop {
        println!();
        let Some(raw) = prompt(interactive) else {
            break;
        };

        match classify(&raw) {
            Line::Quit => break,
            Line::Help => session.output().print_help(),
            Line::Skip => continue,
            Line::Request(request) => {
                session.handle_turn(request).await;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(classify("quit"), Line::Quit);
        assert_eq!(classify("  EXIT \n"), Line::Quit);
        assert_eq!(classify("Quit"), Line::Quit);
        assert_eq!(classify("--help"), Line::Help);
        assert_eq!(classify("   "), Line::Skip);
        assert_eq!(classify(" read A1 "), Line::Request("read A1"));
        assert_eq!(classify("quit please"), Line::Request("quit please"));
    }

    #[test]
    fn test_piped_lines_until_end_of_input() {
        let mut input = io::Cursor::new("list my sheets\n\nquit\n");

        let lines: Vec<_> = std::iter::from_fn(|| next_line(&mut input)).collect();
        assert_eq!(lines, ["list my sheets\n", "\n", "quit\n"]);

        let kinds: Vec<_> = lines.iter().map(|l| classify(l)).collect();
        assert_eq!(
            kinds,
            [Line::Request("list my sheets"), Line::Skip, Line::Quit]
        );
        assert_eq!(next_line(&mut input), None);
    }
}
