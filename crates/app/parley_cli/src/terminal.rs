//! Line-oriented terminal driver for [`ChatSurface`].
//!
//! A terminal delivers whole lines, so key presses are reconstructed: a line
//! ending in `\` is Shift+Enter (the newline is kept and input continues),
//! any other line end is Enter. A line starting with `//` is sent with one
//! leading `/` instead of being read as a command.

use std::io::{IsTerminal, Write};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::Result;
use crate::client::RelayClient;
use crate::surface::{
    ChatSurface, GENERIC_FAILURE, Key, KeyAction, KeyInput, Phase, Role, SubmitOutcome,
    SurfaceView,
};

const TYPING: &str = "assistant is typing...";

const HELP: &str = "\
commands:
  /history   show the transcript
  /dismiss   hide the last error
  /quit      leave the session
end a line with \\ to continue on the next line
start a line with // to send a message that begins with /";

/// Shows the typing indicator on stdout while a request is in flight.
pub struct TerminalView {
    enabled: bool,
}

impl TerminalView {
    pub fn new() -> Self {
        Self {
            enabled: std::io::stdout().is_terminal(),
        }
    }
}

impl Default for TerminalView {
    fn default() -> Self {
        Self::new()
    }
}

impl SurfaceView for TerminalView {
    fn phase_changed(&mut self, phase: Phase) {
        if !self.enabled {
            return;
        }
        let mut out = std::io::stdout();
        let _ = match phase {
            Phase::Sending => write!(out, "{TYPING}"),
            Phase::Settled | Phase::Failed => write!(out, "\r\x1b[2K"),
            Phase::Idle => Ok(()),
        };
        let _ = out.flush();
    }
}

enum Command {
    Quit,
    Dismiss,
    History,
    Help,
    Unknown(String),
}

fn parse_command(line: &str) -> Option<Command> {
    let cmd = line.trim().strip_prefix('/')?;
    if cmd.starts_with('/') {
        return None;
    }
    Some(match cmd {
        "quit" | "exit" => Command::Quit,
        "dismiss" => Command::Dismiss,
        "history" => Command::History,
        "help" => Command::Help,
        other => Command::Unknown(other.to_string()),
    })
}

/// Run an interactive session until `/quit` or end of input.
pub async fn run_chat<C, R, W>(surface: &mut ChatSurface<C>, input: R, out: &mut W) -> Result<()>
where
    C: RelayClient,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(out, "conversation {}", surface.conversation_id())?;
    writeln!(out, "type /help for commands")?;

    let mut lines = input.lines();
    while let Some(line) = lines.next_line().await? {
        if surface.draft().is_empty()
            && let Some(command) = parse_command(&line)
        {
            match command {
                Command::Quit => break,
                Command::Dismiss => surface.dismiss_error(),
                Command::History => print_history(surface, out)?,
                Command::Help => writeln!(out, "{HELP}")?,
                Command::Unknown(name) => writeln!(out, "unknown command: /{name}")?,
            }
            continue;
        }

        let line = if surface.draft().is_empty() && line.trim_start().starts_with("//") {
            line.trim_start()[1..].to_string()
        } else {
            line
        };
        let (text, continued) = match line.strip_suffix('\\') {
            Some(text) => (text, true),
            None => (line.as_str(), false),
        };
        for c in text.chars() {
            surface.on_key(KeyInput::plain(Key::Char(c)));
        }
        if continued {
            surface.on_key(KeyInput::shifted(Key::Enter));
            continue;
        }

        if surface.on_key(KeyInput::plain(Key::Enter)) == KeyAction::Submit {
            match surface.submit().await {
                SubmitOutcome::Rejected => {
                    surface.clear_draft();
                    writeln!(out, "(nothing to send)")?
                }
                SubmitOutcome::Settled(reply) => writeln!(out, "assistant> {reply}")?,
                SubmitOutcome::Failed => {
                    let error = surface.error().unwrap_or(GENERIC_FAILURE);
                    writeln!(out, "error: {error} (/dismiss to hide)")?
                }
            }
        }
    }

    out.flush()?;
    Ok(())
}

fn print_history<C: RelayClient, W: Write>(surface: &ChatSurface<C>, out: &mut W) -> Result<()> {
    for message in surface.transcript() {
        let who = match message.role {
            Role::User => "you",
            Role::Assistant => "assistant",
        };
        writeln!(out, "{who}> {}", message.content)?;
    }
    if let Some(error) = surface.error() {
        writeln!(out, "error: {error}")?;
    }
    Ok(())
}
