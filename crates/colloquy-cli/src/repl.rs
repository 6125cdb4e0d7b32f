//! Line-oriented REPL — the stand-in chat transport.
//!
//! Reads one line per turn from stdin and prints the engine's reply.
//! Option lists are printed as numbered rows; a numeric answer picks the
//! corresponding option, like tapping a keyboard button in a real chat.

use std::io::{BufRead, Write};

use colloquy_engine::{Interpreter, Reply};

/// Run the REPL until EOF or `/quit`.
pub async fn run(
    interpreter: &Interpreter,
    identity: &str,
    input: impl BufRead,
    mut output: impl Write,
) -> std::io::Result<()> {
    writeln!(output, "colloquy — type /help for help, /quit to exit")?;

    // Options of the previous reply, so a bare number can select one.
    let mut pending_options: Option<Vec<String>> = None;

    for line in input.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.eq_ignore_ascii_case("/quit") {
            writeln!(output, "bye")?;
            break;
        }

        let text = resolve_option(trimmed, pending_options.as_deref());
        let reply = interpreter.handle_turn(identity, &text).await;
        print_reply(&mut output, &reply)?;
        pending_options = reply.options;
    }

    Ok(())
}

/// Map a bare number onto the matching pending option, when the previous
/// step offered options and the number is in range.
fn resolve_option(input: &str, options: Option<&[String]>) -> String {
    if let (Some(options), Ok(n)) = (options, input.parse::<usize>()) {
        // Only translate when the options themselves are not numeric —
        // a step expecting "1"/"2"/"3" must receive the digits verbatim.
        let numeric_options = options.iter().all(|o| o.parse::<usize>().is_ok());
        if !numeric_options && n >= 1 && n <= options.len() {
            return options[n - 1].clone();
        }
    }
    input.to_string()
}

fn print_reply(output: &mut impl Write, reply: &Reply) -> std::io::Result<()> {
    writeln!(output, "{}", reply.text)?;
    if let Some(options) = &reply.options {
        for (i, option) in options.iter().enumerate() {
            writeln!(output, "  {}. {}", i + 1, option)?;
        }
    }
    writeln!(output)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
