//! CLI entry point: record spoken answers, denoise stored artifacts, and
//! analyze recorded interview videos.

use anyhow::{bail, Context, Result};
use rehearse::audio::{self, rms_db, Endpointer, EnergyClassifier, SpeechClassifier};
use rehearse::config::{AppConfig, ClassifierKind, CALIBRATION_MARGIN_DB};
use std::path::Path;
use std::time::Duration;

fn main() {
    let config = match AppConfig::parse_args() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(2);
        }
    };
    rehearse::init_observability(&config);

    if let Err(err) = run(&config) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run(config: &AppConfig) -> Result<()> {
    if config.list_input_devices {
        return list_input_devices();
    }
    if config.mic_meter {
        return run_mic_meter(config);
    }
    if let Some(input) = &config.denoise_wav {
        return denoise_artifact(config, input);
    }
    if let Some(output) = &config.record {
        return record_answer(config, output);
    }
    if let Some(video) = &config.analyze {
        return analyze_video(config, video);
    }
    bail!("nothing to do; pass --record, --analyze, --denoise-wav, --mic-meter, or --list-input-devices")
}

fn list_input_devices() -> Result<()> {
    let devices = Endpointer::list_devices().context("Failed to list audio input devices")?;
    if devices.is_empty() {
        println!("no audio input devices detected");
        return Ok(());
    }
    println!("audio input devices:");
    for name in devices {
        println!("  {name}");
    }
    Ok(())
}

fn run_mic_meter(config: &AppConfig) -> Result<()> {
    let endpointer = Endpointer::new(config.capture_config(), config.input_device.as_deref())?;
    println!(
        "sampling ambient noise on '{}' for {} ms...",
        endpointer.device_name(),
        config.mic_meter_ms
    );
    let ambient = endpointer.record_for(Duration::from_millis(config.mic_meter_ms))?;
    let level = rms_db(&ambient);
    println!("ambient level: {level:.1} dB");
    println!(
        "suggested --energy-threshold-db: {:.1}",
        level + CALIBRATION_MARGIN_DB
    );
    Ok(())
}

fn record_answer(config: &AppConfig, output: &Path) -> Result<()> {
    let capture_cfg = config.capture_config();
    let mut endpointer = Endpointer::new(capture_cfg.clone(), config.input_device.as_deref())?;

    let classifier: Box<dyn SpeechClassifier + Send> = match capture_cfg.classifier {
        ClassifierKind::Energy => {
            println!("calibrating to ambient noise...");
            let ambient = endpointer.record_for(Duration::from_millis(config.mic_meter_ms))?;
            let mut energy = EnergyClassifier::new(capture_cfg.energy_threshold_db);
            energy.calibrate(&ambient, CALIBRATION_MARGIN_DB);
            Box::new(energy)
        }
        ClassifierKind::Earshot => audio::create_classifier(&capture_cfg),
    };

    endpointer.start(classifier)?;
    println!(
        "recording on '{}'; stops after {} ms of silence",
        endpointer.device_name(),
        capture_cfg.silence_timeout_ms
    );
    endpointer.wait()?;
    let path = endpointer.stop(config.denoise_strength, output)?;
    println!("answer saved to {}", path.display());
    Ok(())
}

fn denoise_artifact(config: &AppConfig, input: &Path) -> Result<()> {
    let (samples, sample_rate) = audio::read_wav(input)?;
    let result = audio::denoise(&samples, sample_rate, config.denoise_strength);

    let stem = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("artifact");
    let denoised_path = input.with_file_name(format!("{stem}_denoised.wav"));
    let noise_path = input.with_file_name(format!("{stem}_noise.wav"));
    audio::write_wav(&denoised_path, &result.denoised, result.sample_rate)?;
    audio::write_wav(&noise_path, &result.noise, result.sample_rate)?;
    println!(
        "wrote {} and {}",
        denoised_path.display(),
        noise_path.display()
    );
    Ok(())
}

#[cfg(feature = "video")]
fn analyze_video(config: &AppConfig, video: &Path) -> Result<()> {
    use rehearse::posture::annotate::{AnnotatedVideoSink, VideoFileSource};
    use rehearse::posture::{FrameSource, PostureAnalysisEngine, RecordedDetections};

    let landmarks_path = config
        .landmarks
        .as_ref()
        .context("--analyze requires --landmarks")?;
    let mut source = VideoFileSource::open(video)?;
    let mut detector = RecordedDetections::open(landmarks_path)?;
    let engine = PostureAnalysisEngine::new(config.posture_thresholds()?);

    let mut sink = match &config.annotated_out {
        Some(path) => Some(AnnotatedVideoSink::create(
            path,
            source.fps(),
            source.frame_size(),
        )?),
        None => None,
    };

    let summary = match sink.as_mut() {
        Some(sink) => engine.analyze(&mut source, &mut detector, &config.mistake_log, Some(sink))?,
        None => engine.analyze(&mut source, &mut detector, &config.mistake_log, None)?,
    };

    if config.summary_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
        println!("mistake log written to {}", config.mistake_log.display());
        if let Some(path) = &config.annotated_out {
            println!("annotated video written to {}", path.display());
        }
    }
    Ok(())
}

#[cfg(not(feature = "video"))]
fn analyze_video(_config: &AppConfig, _video: &Path) -> Result<()> {
    bail!("this build has no video analysis; rebuild with --features video")
}

#[cfg(feature = "video")]
fn print_summary(summary: &rehearse::posture::AnalysisSummary) {
    println!(
        "analyzed {} frames ({:.2} s at {:.1} fps)",
        summary.total_frames, summary.duration_secs, summary.fps
    );
    if summary.mistakes.is_empty() {
        println!("no posture mistakes detected");
    }
    for total in &summary.mistakes {
        println!(
            "- {}: {} frames ({:.2} s)",
            total.message, total.count, total.seconds
        );
    }
    if summary.valid_frames == 0 {
        println!("no landmarks detected");
        return;
    }
    for total in &summary.gaze {
        println!(
            "- {}: {} frames ({:.1}%)",
            total.label, total.count, total.percent
        );
    }
}
