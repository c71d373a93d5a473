//! Idle Orbit CLI
//!
//! Runs a session against the real desktop (Windows) or a simulated one,
//! and inspects motion profiles.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use idle_orbit::config::parse_assignment;
use idle_orbit::engine::{arm_console_break, disarm_console_break};
use idle_orbit::{ControlDeck, Desktop, MotionProfile, SimulatedDesktop};

/// Idle Orbit - keeps the pointer drifting around where you left it
#[derive(Parser, Debug)]
#[command(name = "orbit")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Engage a session; stop with Ctrl+Alt+Q or Ctrl+C
    Run {
        /// Profile JSON file
        #[arg(short, long)]
        profile: Option<PathBuf>,

        /// Built-in profile used when no file is given
        #[arg(long, value_enum, default_value = "default")]
        preset: Preset,

        /// Override one option, e.g. --set radius=180
        #[arg(long = "set", value_name = "KEY=VALUE")]
        overrides: Vec<String>,

        /// Fixed session seed
        #[arg(long)]
        seed: Option<u64>,

        /// Stop after this many seconds of motion
        #[arg(short, long)]
        duration: Option<f64>,

        /// Drive a simulated desktop instead of the real pointer
        #[arg(long)]
        dry_run: bool,
    },

    /// Inspect or create profiles
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    /// Print a built-in profile as JSON
    Defaults {
        #[arg(long, value_enum, default_value = "default")]
        preset: Preset,

        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Summarize a profile file
    Show { file: PathBuf },

    /// Validate a profile file
    Check { file: PathBuf },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Preset {
    Default,
    Calm,
    Lively,
}

impl Preset {
    fn profile(self) -> MotionProfile {
        match self {
            Preset::Default => MotionProfile::default(),
            Preset::Calm => MotionProfile::calm(),
            Preset::Lively => MotionProfile::lively(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match cli.command {
        Commands::Run {
            profile,
            preset,
            overrides,
            seed,
            duration,
            dry_run,
        } => {
            let mut motion = match profile {
                Some(path) => MotionProfile::load(&path)
                    .with_context(|| format!("Failed to load profile {}", path.display()))?,
                None => preset.profile(),
            };
            for assignment in &overrides {
                let (key, value) = parse_assignment(assignment)?;
                motion.apply_option(key, value)?;
            }
            run_session(motion, seed, duration, dry_run)
        }
        Commands::Profile { action } => match action {
            ProfileAction::Defaults { preset, output } => {
                let profile = preset.profile();
                match output {
                    Some(path) => {
                        profile.save(&path)?;
                        println!("Wrote {}", path.display());
                    }
                    None => println!("{}", serde_json::to_string_pretty(&profile)?),
                }
                Ok(())
            }
            ProfileAction::Show { file } => {
                let profile = MotionProfile::load(&file)?;
                println!("Profile {}", file.display());
                for line in profile.summary() {
                    println!("  {}", line);
                }
                Ok(())
            }
            ProfileAction::Check { file } => {
                let profile = MotionProfile::load(&file)?;
                check_against_display(&profile)?;
                println!("{}: OK", file.display());
                Ok(())
            }
        },
    }
}

fn run_session(
    profile: MotionProfile,
    seed: Option<u64>,
    duration: Option<f64>,
    dry_run: bool,
) -> Result<()> {
    println!("Idle Orbit");
    println!("==========");
    for line in profile.summary() {
        println!("  {}", line);
    }
    println!();

    let simulated = SimulatedDesktop::full_hd();
    let desktop: Box<dyn Desktop> = if dry_run {
        println!("Dry run: driving a simulated 1920x1080 desktop");
        Box::new(simulated.clone())
    } else {
        real_desktop()?
    };

    let mut deck = ControlDeck::new(MotionProfile::default());
    deck.replace_profile(profile)?;
    if let Some(seed) = seed {
        deck = deck.with_seed(seed);
    }
    if let Some(duration) = duration {
        deck = deck.with_time_limit(duration);
    }

    // Wired once; the deck keeps the same token across sessions
    let token = deck.cancel_token();
    let _hotkey = listen_for_hotkey(&token)?;
    arm_console_break(&token).context("Failed to install Ctrl+C handler")?;

    let seed = match deck.engage(desktop) {
        Ok(seed) => seed,
        Err(e) => {
            disarm_console_break();
            return Err(e.into());
        }
    };
    log::info!("Session seed {}", seed);
    println!("Press Ctrl+Alt+Q (or Ctrl+C) to stop.");

    let mut last_status = Instant::now();
    while deck.is_active() {
        thread::sleep(Duration::from_millis(50));
        if last_status.elapsed() >= Duration::from_secs(1) {
            println!("{}", deck.telemetry().status_line());
            last_status = Instant::now();
        }
    }

    disarm_console_break();
    let report = deck.wait().context("Session ended without a report")?;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if dry_run {
        let cursor = simulated.cursor();
        println!(
            "Simulated pointer ended at ({:.0}, {:.0}) after {} moves",
            cursor.x,
            cursor.y,
            simulated.moves()
        );
    }
    if !report.stuck_keys.is_empty() {
        bail!("Keys may still be held: {:?}", report.stuck_keys);
    }
    Ok(())
}

#[cfg(windows)]
fn real_desktop() -> Result<Box<dyn Desktop>> {
    Ok(Box::new(idle_orbit::input::windows::WindowsDesktop::new()))
}

#[cfg(not(windows))]
fn real_desktop() -> Result<Box<dyn Desktop>> {
    bail!("Real input injection is only available on Windows; use --dry-run")
}

#[cfg(windows)]
fn listen_for_hotkey(
    token: &idle_orbit::CancelToken,
) -> Result<Option<idle_orbit::input::windows::HotkeyListener>> {
    let token = token.clone();
    let listener = idle_orbit::input::windows::HotkeyListener::spawn(move || token.cancel())?;
    Ok(Some(listener))
}

#[cfg(not(windows))]
fn listen_for_hotkey(_token: &idle_orbit::CancelToken) -> Result<Option<()>> {
    Ok(None)
}

#[cfg(windows)]
fn check_against_display(profile: &MotionProfile) -> Result<()> {
    use idle_orbit::input::DisplayReader;

    let area = idle_orbit::input::windows::WindowsDesktop::new().display_area()?;
    profile.validate_for_display(area.width, area.height)?;
    Ok(())
}

#[cfg(not(windows))]
fn check_against_display(_profile: &MotionProfile) -> Result<()> {
    Ok(())
}
