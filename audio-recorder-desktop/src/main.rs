mod cli;

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use crossbeam_channel::RecvTimeoutError;

use audio_recorder_core::models::audio_models::RecordingOption;
use audio_recorder_core::models::config::{LevelSource, PlaybackConfiguration, RecorderConfiguration};
use audio_recorder_core::models::session::FileNameOption;
use audio_recorder_core::playback::controller::PlaybackController;
use audio_recorder_core::playback::coordinator::PlaybackCoordinator;
use audio_recorder_core::session::recorder::Recorder;
use audio_recorder_core::storage::files::remove_recording;
use audio_recorder_core::traits::player::PlayerFactory;
use audio_recorder_desktop::{
    default_path_resolver, CpalInputProvider, CpalSessionGateway, MicrophonePermission, RodioCuePlayer,
    RodioPlayerFactory,
};

use cli::{Args, CliError, Command, PlayArgs, RecordArgs};

fn main() -> ExitCode {
    let args = Args::parse();
    cli::init_logging(&args);

    let result = match args.command {
        Command::Record(record) => run_record(record),
        Command::Play(play) => run_play(play),
        Command::Delete { path } => remove_recording(&path).map_err(CliError::from).map(|()| {
            println!("Deleted {}", path.display());
        }),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn recorder_config(args: &RecordArgs) -> Result<RecorderConfiguration, CliError> {
    let mut config = match &args.config {
        Some(path) => RecorderConfiguration::from_json_file(path)?,
        None => RecorderConfiguration::default(),
    };
    if let Some(format) = args.format {
        config.output_format = format;
    }
    if let Some(name) = &args.name {
        config.file_name = FileNameOption::Custom(name.clone());
    }
    if args.stereo {
        config.recording_option = RecordingOption::Stereo;
    }
    if args.meter {
        config.level_source = LevelSource::Meter;
    }
    if args.metadata {
        config.write_metadata = true;
    }
    Ok(config)
}

fn run_record(args: RecordArgs) -> Result<(), CliError> {
    let config = recorder_config(&args)?;

    let mut recorder = Recorder::new(
        CpalInputProvider::new(),
        CpalSessionGateway::new(),
        Arc::new(MicrophonePermission),
        Arc::new(default_path_resolver()),
    );
    // Cues are optional; recording works without an output device.
    let output = match RodioPlayerFactory::new() {
        Ok(factory) => {
            recorder = recorder.with_cues(Arc::new(RodioCuePlayer::new(factory.output_handle())));
            Some(factory)
        }
        Err(e) => {
            log::warn!("Cues disabled: {}", e);
            None
        }
    };
    recorder.configure(config)?;

    let elapsed = recorder.events().elapsed.subscribe();
    recorder.record()?;

    let total = Duration::from_secs(args.seconds);
    let pause_at = args.pause_at.map(Duration::from_secs);
    let started = Instant::now();
    let mut paused = false;
    while started.elapsed() < total {
        if let Some(at) = pause_at {
            if !paused && started.elapsed() >= at {
                recorder.pause();
                println!("\npaused");
                thread::sleep(Duration::from_secs(1));
                recorder.record()?;
                paused = true;
            }
        }
        match elapsed.recv_timeout(Duration::from_millis(100)) {
            Ok(time) => {
                let level = recorder.power_levels().last().copied().unwrap_or(0.0);
                print!("\r{}  {:<20}", time, "#".repeat((level * 20.0).round() as usize));
                let _ = std::io::stdout().flush();
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    println!();

    match recorder.stop()? {
        Some(result) => println!(
            "Saved {} ({:.1}s, sha256 {})",
            result.file_path.display(),
            result.duration_secs,
            result.checksum
        ),
        None => println!("Nothing recorded"),
    }
    let diagnostics = recorder.diagnostics();
    log::info!(
        "{} callbacks, {} frames, {} write errors",
        diagnostics.callbacks,
        diagnostics.frames,
        diagnostics.write_errors
    );

    drop(recorder);
    drop(output);
    Ok(())
}

fn run_play(args: PlayArgs) -> Result<(), CliError> {
    let factory: Arc<dyn PlayerFactory> = Arc::new(RodioPlayerFactory::new()?);
    let coordinator = Arc::new(PlaybackCoordinator::new());
    let controller = PlaybackController::new(&args.path, factory, coordinator, PlaybackConfiguration::default())?;
    controller.configure()?;

    let progress = controller.events().progress.subscribe();
    controller.play()?;
    if let Some(secs) = args.skip {
        controller.forward(secs)?;
    }

    loop {
        match progress.recv_timeout(Duration::from_millis(500)) {
            Ok(update) => {
                print!("\r{} {}", update.current_time, update.remaining_time);
                let _ = std::io::stdout().flush();
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
        if controller.state().is_stopped() {
            break;
        }
    }
    println!();
    Ok(())
}
