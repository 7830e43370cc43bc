//! Terminal chat with the HR analyst assistant.

use crate::completion::{CompletionService, OpenAiCompletion};
use crate::config::{resolve_api_key, ExitIntelConfig};
use crate::context::GREETING;
use crate::insights::{open_session, InsightsSession};
use crate::ExitIntelError;
use std::io::{BufRead, Write};
use std::path::Path;

const HELP: &str = "Commands: /retry resends an unanswered question, /quit exits.";

/// Line-oriented chat over `input`. Completion failures are reported inline
/// and the loop keeps going; only I/O errors end it early.
pub fn chat_loop<R: BufRead, W: Write>(
    session: &mut InsightsSession,
    service: &dyn CompletionService,
    input: R,
    mut output: W,
) -> Result<(), ExitIntelError> {
    writeln!(output, "{GREETING}")?;
    writeln!(output, "{HELP}")?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        let line = line.trim();
        let result = match line {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => {
                writeln!(output, "{HELP}")?;
                continue;
            }
            "/retry" => session.retry(service),
            question => session.ask(service, question),
        };
        match result {
            Ok(reply) => writeln!(output, "\n{reply}\n")?,
            Err(e) => {
                log::warn!("chat turn failed: {e}");
                writeln!(output, "error: {e} (type /retry to resend)")?;
            }
        }
        output.flush()?;
    }
    Ok(())
}

pub fn handle_chat(config: &ExitIntelConfig, corpus_path: &Path) -> Result<(), ExitIntelError> {
    let api_key = resolve_api_key(&config.completion)?;
    let mut session = open_session(config, corpus_path)?;
    let service = OpenAiCompletion::new(&config.completion, api_key);

    let stdin = std::io::stdin();
    chat_loop(&mut session, &service, stdin.lock(), std::io::stdout())
}
