//! Interactive prompts and banners

use std::io::{self, BufRead, IsTerminal, Write};

use inquire::{Confirm, InquireError, Select};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use super::download::Channel;
use super::error::PatchError;
use super::readme::ReadmeChoice;
use crate::config::PatcherConfig;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Display welcome banner
pub fn show_welcome() {
    let mut stdout = StandardStream::stdout(ColorChoice::Always);

    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
    let _ = writeln!(stdout, "\n{RULE}");
    let _ = stdout.reset();

    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
    let _ = writeln!(stdout, "\n                H E A R T H S T O N E   A C C E S S");
    let _ = stdout.reset();

    let _ = writeln!(stdout, "\n                          Patcher v{}", env!("CARGO_PKG_VERSION"));

    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)));
    let _ = writeln!(stdout, "\n{RULE}\n");
    let _ = stdout.reset();

    let _ = writeln!(stdout, "Please close Hearthstone and the Battle.net launcher before patching.\n");
}

/// Ask which release channel to install. A single channel is used without
/// asking.
pub fn select_channel(config: &PatcherConfig) -> Result<&Channel, PatchError> {
    if let [only] = config.channels.as_slice() {
        return Ok(only);
    }

    let names: Vec<&str> = config.channels.iter().map(|c| c.name.as_str()).collect();
    let picked = Select::new("Which version of the patch do you want to install?", names)
        .with_help_message("Use the arrow keys, then press Enter")
        .prompt()
        .map_err(prompt_error)?;

    config.channel(picked)
}

/// Ask whether the patch notes should go to the desktop
pub fn ask_readme() -> Result<ReadmeChoice, PatchError> {
    let keep = Confirm::new("Do you want the readme with all the latest changes placed on your desktop?")
        .with_default(true)
        .with_help_message("Otherwise it is deleted along with the other temporary files")
        .prompt()
        .map_err(prompt_error)?;

    Ok(if keep {
        ReadmeChoice::Desktop
    } else {
        ReadmeChoice::Discard
    })
}

/// Keep the console window open until the user presses Enter
pub fn pause_for_exit() {
    if !io::stdin().is_terminal() {
        return;
    }
    print!("\nPress Enter to exit...");
    let _ = io::stdout().flush();
    let mut line = String::new();
    let _ = io::stdin().lock().read_line(&mut line);
}

fn prompt_error(e: InquireError) -> PatchError {
    match e {
        InquireError::OperationCanceled | InquireError::OperationInterrupted => PatchError::Cancelled,
        other => PatchError::Config(format!("prompt failed: {other}")),
    }
}
