//! ausine - plays an 880 Hz sine tone on the default output for five seconds
//!
//! Run with: cargo run

use ausine::TonePlayer;
use tracing::info;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt().with_target(false).init();

    let report = TonePlayer::new().play()?;

    info!(
        device = %report.device,
        sample_rate = report.sample_rate,
        channels = report.channels,
        frames = report.frames_rendered,
        "done"
    );
    Ok(())
}
