use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::patch::readme::ReadmeChoice;

#[derive(Parser, Debug)]
#[command(name = "hsa-patcher", version, about = "Install the Hearthstone Access patch")]
pub struct Args {
    /// Sub‑commands (patch, channels, locate)
    #[command(subcommand)]
    pub sub: Option<Cmd>,

    /// Path to configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Release channel to install, skipping the selection prompt
    #[arg(long, global = true)]
    pub channel: Option<String>,

    /// What to do with the patch notes, skipping the question
    #[arg(long, value_enum, global = true)]
    pub readme: Option<ReadmeChoice>,

    /// Game folder to use instead of searching for it (not remembered)
    #[arg(long, global = true)]
    pub dir: Option<PathBuf>,

    /// Never prompt; fail when the game folder cannot be found
    #[arg(long, global = true)]
    pub no_interaction: bool,

    /// Exit immediately instead of waiting for Enter
    #[arg(long, global = true)]
    pub no_pause: bool,

    /// Mirror the diagnostic log to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    /// Download and apply the patch (default if no sub‑command)
    Patch,
    /// List the configured release channels
    Channels,
    /// Find the game folder and print it
    Locate,
}

impl Args {
    /// Selected command, `patch` when none was given
    pub fn command(&self) -> Cmd {
        self.sub.clone().unwrap_or(Cmd::Patch)
    }

    /// Prompts are allowed for this run
    pub fn interactive(&self) -> bool {
        !self.no_interaction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_means_patch() {
        let args = Args::try_parse_from(["hsa-patcher"]).unwrap();
        assert_eq!(args.command(), Cmd::Patch);
        assert!(args.interactive());
    }

    #[test]
    fn patch_options_parse() {
        let args = Args::try_parse_from([
            "hsa-patcher",
            "patch",
            "--channel",
            "Default",
            "--readme",
            "discard",
            "--no-interaction",
            "--dir",
            r"D:\Games\Hearthstone",
        ])
        .unwrap();

        assert_eq!(args.command(), Cmd::Patch);
        assert_eq!(args.channel.as_deref(), Some("Default"));
        assert_eq!(args.readme, Some(ReadmeChoice::Discard));
        assert!(!args.interactive());
        assert_eq!(args.dir, Some(PathBuf::from(r"D:\Games\Hearthstone")));
    }

    #[test]
    fn options_work_without_a_subcommand() {
        let args = Args::try_parse_from(["hsa-patcher", "--channel", "duos", "--no-pause"]).unwrap();
        assert_eq!(args.command(), Cmd::Patch);
        assert_eq!(args.channel.as_deref(), Some("duos"));
        assert!(args.no_pause);
    }

    #[test]
    fn unknown_readme_choice_is_rejected() {
        assert!(Args::try_parse_from(["hsa-patcher", "patch", "--readme", "keep"]).is_err());
    }
}
