//! Entry points for each command

use std::io::Write;
use std::path::{Path, PathBuf};

use log::{info, warn};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use super::download::Channel;
use super::error::PatchError;
use super::orchestration::{self, PatchJob};
use super::progress::Step;
use super::readme::{self, ReadmeChoice};
use super::report::{Failure, Reporter, RunSummary};
use super::resolve::{
    DirectoryResolver, FileStore, NoPrompt, PathPrompt, SettingStore, TerminalPrompt,
    platform_store, resolve_explicit,
};
use super::wizard;
use crate::cli::Args;
use crate::config::PatcherConfig;

/// Load the configuration named on the command line, or the default one
pub fn load_config(path: Option<&Path>) -> Result<PatcherConfig, PatchError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => PatcherConfig::default_path()?,
    };
    PatcherConfig::load_or_create(&path)
}

/// Download and apply the patch; returns the exit status
pub async fn run_patch(args: &Args, log_path: Option<PathBuf>) -> i32 {
    if args.interactive() {
        wizard::show_welcome();
    }

    let mut reporter = reporter(log_path);
    let outcome = patch(args, &mut reporter).await;
    reporter.finish(&outcome)
}

async fn patch<W: WriteColor>(args: &Args, reporter: &mut Reporter<W>) -> Result<RunSummary, Failure> {
    let config = reporter.require(Step::Configure, load_config(args.config.as_deref()))?;
    let channel = reporter.require(Step::Channel, pick_channel(args, &config))?;
    info!("Selected channel {} ({})", channel.name, channel.source);

    let install_dir = locate(args, &config, reporter)?;
    let job = PatchJob {
        config: &config,
        channel,
        install_dir,
        show_progress: true,
    };
    let choice = args.readme;
    let interactive = args.interactive();
    orchestration::apply_patch(job, reporter, move || readme_target(choice, interactive)).await
}

/// Print the game folder the patcher would use
pub fn run_locate(args: &Args, log_path: Option<PathBuf>) -> i32 {
    let mut reporter = reporter(log_path);

    let located = match reporter.require(Step::Configure, load_config(args.config.as_deref())) {
        Ok(config) => locate(args, &config, &mut reporter),
        Err(failure) => Err(failure),
    };
    match located {
        Ok(dir) => {
            println!("{}", dir.display());
            0
        }
        Err(failure) => reporter.fail(&failure),
    }
}

/// List the configured release channels
pub fn run_channels(args: &Args, log_path: Option<PathBuf>) -> i32 {
    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(error) => {
            let failure = Failure {
                step: Step::Configure,
                error,
            };
            return reporter(log_path).fail(&failure);
        }
    };

    let mut stdout = StandardStream::stdout(ColorChoice::Always);
    let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Cyan)).set_bold(true));
    let _ = writeln!(stdout, "Available patch channels:");
    let _ = stdout.reset();
    for channel in &config.channels {
        let _ = stdout.set_color(ColorSpec::new().set_fg(Some(Color::Green)));
        let _ = write!(stdout, "  • {}", channel.name);
        let _ = stdout.reset();
        let _ = writeln!(stdout, "  {}", channel.source);
    }
    0
}

fn reporter(log_path: Option<PathBuf>) -> Reporter<StandardStream> {
    let reporter = Reporter::new(StandardStream::stdout(ColorChoice::Always));
    match log_path {
        Some(path) => reporter.with_log_path(path),
        None => reporter,
    }
}

fn pick_channel<'a>(args: &Args, config: &'a PatcherConfig) -> Result<&'a Channel, PatchError> {
    let channel = match (&args.channel, args.interactive()) {
        (Some(name), _) => config.channel(name)?,
        (None, true) => wizard::select_channel(config)?,
        (None, false) => config
            .channels
            .first()
            .ok_or_else(|| PatchError::Config("no channels configured".to_string()))?,
    };
    Ok(channel)
}

fn locate<W: WriteColor>(
    args: &Args,
    config: &PatcherConfig,
    reporter: &mut Reporter<W>,
) -> Result<PathBuf, Failure> {
    if let Some(dir) = &args.dir {
        reporter.begin(Step::Resolve);
        let resolution = reporter.require(Step::Resolve, resolve_explicit(dir, &config.marker))?;
        return Ok(orchestration::accept_resolution(reporter, resolution));
    }

    let store: Box<dyn SettingStore> = match platform_store() {
        Ok(store) => store,
        Err(e) => {
            reporter.warn(Step::Remember, e);
            let fallback = std::env::temp_dir().join("hsa-patcher-settings.toml");
            warn!("Remembering the game folder in {}", fallback.display());
            Box::new(FileStore::new(fallback))
        }
    };
    let prompt: Box<dyn PathPrompt> = if args.interactive() {
        Box::new(TerminalPrompt::new(config.marker.clone()))
    } else {
        Box::new(NoPrompt::new(config.marker.clone()))
    };

    let resolver = DirectoryResolver::new(
        config.default_dir.clone(),
        config.marker.clone(),
        config.env_key.clone(),
        store,
        prompt,
    );
    orchestration::locate_game(reporter, resolver)
}

/// Folder the readme should be moved to, `None` to discard it
fn readme_target(choice: Option<ReadmeChoice>, interactive: bool) -> Result<Option<PathBuf>, PatchError> {
    let choice = match choice {
        Some(choice) => choice,
        None if interactive => wizard::ask_readme()?,
        None => ReadmeChoice::Discard,
    };
    match choice {
        ReadmeChoice::Desktop => readme::desktop_dir().map(Some),
        ReadmeChoice::Discard => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_interactive_readme_defaults_to_discard() {
        assert_eq!(readme_target(None, false).unwrap(), None);
        assert_eq!(readme_target(Some(ReadmeChoice::Discard), true).unwrap(), None);
    }

    #[test]
    fn explicit_config_path_is_used_and_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patcher.toml");

        let config = load_config(Some(&path)).unwrap();

        assert!(path.is_file());
        assert_eq!(config.channels[0].name, "Default");
    }

    fn unattended(sub: crate::cli::Cmd) -> Args {
        Args {
            sub: Some(sub),
            config: None,
            channel: None,
            readme: None,
            dir: None,
            no_interaction: true,
            no_pause: true,
            verbose: false,
        }
    }

    #[tokio::test]
    async fn broken_config_is_reported_with_its_hint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patcher.toml");
        std::fs::write(&path, "channels = 5\n").unwrap();
        let mut args = unattended(crate::cli::Cmd::Patch);
        args.config = Some(path);
        let mut reporter = Reporter::new(termcolor::Buffer::no_color());

        let outcome = patch(&args, &mut reporter).await;

        let failure = outcome.as_ref().unwrap_err();
        assert_eq!(failure.step, Step::Configure);
        assert!(matches!(failure.error, PatchError::Config(_)));
        assert_eq!(reporter.finish(&outcome), 1);
        let text = String::from_utf8(reporter.into_inner().into_inner()).unwrap();
        assert!(text.contains("Patching failed while reading the configuration"));
        assert!(text.contains("Fix or delete the configuration file"));
    }

    #[test]
    fn unknown_channel_is_a_config_error() {
        let mut args = unattended(crate::cli::Cmd::Patch);
        args.channel = Some("Nightly".into());
        let config = PatcherConfig::default();

        let err = pick_channel(&args, &config).unwrap_err();
        assert!(matches!(err, PatchError::Config(_)));

        args.channel = Some("default".into());
        assert_eq!(pick_channel(&args, &config).unwrap().name, "Default");
    }

    #[test]
    fn locate_with_explicit_dir_validates_the_marker() {
        let game = tempfile::tempdir().unwrap();
        let mut args = unattended(crate::cli::Cmd::Locate);
        args.dir = Some(game.path().to_path_buf());
        let config = PatcherConfig::default();
        let mut reporter = Reporter::new(termcolor::Buffer::no_color());

        let missing = locate(&args, &config, &mut reporter).unwrap_err();
        assert!(matches!(missing.error, PatchError::NotFound { .. }));

        std::fs::write(game.path().join("Hearthstone.exe"), b"MZ").unwrap();
        assert_eq!(locate(&args, &config, &mut reporter).unwrap(), game.path());
    }
}
