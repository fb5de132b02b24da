use bvh_pose::{load_bvh_from_file, Clip};
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn print_clip(clip: &Clip, frame: f64) {
    println!(
        "{} joints, {} frames at {} fps ({:.2}s)",
        clip.joint_count(),
        clip.frame_count(),
        clip.fps(),
        clip.duration()
    );

    let pose = clip.pose_at(frame);
    for (joint, world) in clip.joints().iter().zip(&pose) {
        let name = if joint.name.is_empty() { "<unnamed>" } else { joint.name.as_str() };
        let channels: Vec<&str> = joint.channels.iter().map(|c| c.name()).collect();
        println!(
            "{:indent$}{} [{}] at ({:.3}, {:.3}, {:.3})",
            "",
            name,
            channels.join(" "),
            world.offset.x,
            world.offset.y,
            world.offset.z,
            indent = joint.depth * 2
        );
    }
}

fn main() -> ExitCode {
    init_logging();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        eprintln!("usage: bvh_pose <file.bvh> [frame]");
        return ExitCode::FAILURE;
    };
    let frame = match args.next().map(|s| s.parse::<f64>()) {
        None => 0.0,
        Some(Ok(frame)) => frame,
        Some(Err(err)) => {
            eprintln!("invalid frame: {err}");
            return ExitCode::FAILURE;
        }
    };

    match load_bvh_from_file(&path) {
        Ok(clip) => {
            print_clip(&clip, frame);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(path = %path, "{err}");
            ExitCode::FAILURE
        }
    }
}
