mod session;

use anyhow::{Context, Result};
use scene_camera::{Camera, ManualClock};
use session::{FrameRecord, Session};
use settings::{CameraConfig, SettingsStore};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};

/// Longest session we are willing to step through.
const MAX_FRAMES: usize = 100_000;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args_os().skip(1).map(PathBuf::from);
    let session = match args.next() {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read session {}", path.display()))?;
            serde_json::from_str::<Session>(&text)
                .with_context(|| format!("failed to parse session {}", path.display()))?
        }
        None => session::demo(load_user_config()),
    };

    let stdout = std::io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let summary = replay(&session, |record| {
        serde_json::to_writer(&mut out, record)?;
        writeln!(out)?;
        Ok(())
    })?;
    out.flush().context("failed to flush frame output")?;

    info!(
        frames = summary.frames,
        redraws = summary.redraws,
        history = summary.history_len,
        "replay finished"
    );
    Ok(())
}

fn load_user_config() -> CameraConfig {
    let store = match SettingsStore::new() {
        Ok(store) => store,
        Err(err) => {
            warn!("Using default camera settings (no config dir): {err}");
            return CameraConfig::default();
        }
    };
    match store.load() {
        Ok(config) => {
            info!("Loaded camera settings from {}", store.path().display());
            config
        }
        Err(err) => {
            warn!("Using default camera settings (failed to load): {err}");
            CameraConfig::default()
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Summary {
    frames: usize,
    redraws: usize,
    history_len: usize,
}

/// Steps the camera frame by frame, delivering each scripted event at its
/// timestamp before the frame that follows it. `emit` sees every frame.
fn replay(
    session: &Session,
    mut emit: impl FnMut(&FrameRecord) -> Result<()>,
) -> Result<Summary> {
    anyhow::ensure!(
        session.frame_ms.is_finite() && session.frame_ms > 0.0,
        "frame_ms must be positive, got {}",
        session.frame_ms
    );

    let clock = ManualClock::new(0.0);
    let mut camera = Camera::new(session.config.clone(), clock.clone());
    camera.resize(session.viewport[0], session.viewport[1]);

    let mut events = session.events.iter().peekable();
    let mut summary = Summary::default();
    let mut t = 0.0;
    while t <= session.duration_ms {
        anyhow::ensure!(
            summary.frames < MAX_FRAMES,
            "session exceeds {MAX_FRAMES} frames"
        );
        while let Some(timed) = events.next_if(|timed| timed.at <= t) {
            clock.set(timed.at);
            timed.event.apply(&mut camera);
        }
        clock.set(t);
        let dirty = camera.tick();
        summary.frames += 1;
        if dirty {
            summary.redraws += 1;
        }
        emit(&FrameRecord::capture(t, dirty, &camera))?;
        t += session.frame_ms;
    }
    summary.history_len = camera.log_len();
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use session::{InputEvent, TimedEvent};

    #[test]
    fn idle_session_redraws_once() {
        let session = Session {
            duration_ms: 320.0,
            ..Session::default()
        };
        let mut dirty_frames = Vec::new();
        let summary = replay(&session, |record| {
            if record.dirty {
                dirty_frames.push(record.t);
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(summary.frames, 21);
        assert_eq!(dirty_frames, vec![0.0]);
    }

    #[test]
    fn demo_session_moves_the_camera() {
        let session = session::demo(CameraConfig::default());
        let mut first = None;
        let mut last = None;
        let summary = replay(&session, |record| {
            first.get_or_insert(record.state.eye);
            last = Some(record.clone());
            Ok(())
        })
        .unwrap();
        assert!(summary.redraws > 1);
        let last = last.unwrap();
        assert_eq!(last.mode, "turntable");
        assert!(last.state.matrix.is_finite());
        assert!(first.unwrap().distance(last.state.eye) > 1e-3);
    }

    #[test]
    fn events_after_the_session_are_not_delivered() {
        let session = Session {
            duration_ms: 100.0,
            events: vec![TimedEvent {
                at: 500.0,
                event: InputEvent::Mode {
                    mode: "pan".into(),
                },
            }],
            ..Session::default()
        };
        let mut modes = Vec::new();
        replay(&session, |record| {
            modes.push(record.mode.clone());
            Ok(())
        })
        .unwrap();
        assert!(modes.iter().all(|mode| mode == "orbit"));
    }

    #[test]
    fn rejects_non_positive_frame_step() {
        let session = Session {
            frame_ms: 0.0,
            ..Session::default()
        };
        assert!(replay(&session, |_| Ok(())).is_err());
    }

    #[test]
    fn bundled_turntable_session_replays() {
        let session: Session =
            serde_json::from_str(include_str!("../../../demos/turntable_session.json")).unwrap();
        let mut last = None;
        replay(&session, |record| {
            last = Some(record.clone());
            Ok(())
        })
        .unwrap();
        let last = last.unwrap();
        assert_eq!(last.mode, "turntable");
        assert!(last.state.matrix.is_finite());
        assert!((5.0..=8.0).contains(&last.state.distance));
    }
}
