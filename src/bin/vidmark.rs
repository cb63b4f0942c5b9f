use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use vidmark::{FrameSink as _, FrameSource as _};

#[derive(Parser, Debug)]
#[command(name = "vidmark", version, about = "Video keypoint annotation tools")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fill the gaps of an annotation file and save it next to a backup.
    Postproc(PostprocArgs),
    /// Re-encode a video with its annotations drawn on (requires `ffmpeg` on PATH).
    Replay(ReplayArgs),
    /// Write a numbered test video for exercising the frame cache.
    Mktest(MktestArgs),
    /// Print a JSON summary of an annotation file.
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct PostprocArgs {
    /// Video the annotations belong to.
    video: PathBuf,

    /// Annotation file to read.
    keypoints: PathBuf,

    /// Annotation file to write; an existing one is kept as `<OUTPUT>~`.
    output: PathBuf,

    #[arg(short, long, value_enum, default_value_t = AlgorithmChoice::Interpolate)]
    algorithm: AlgorithmChoice,

    /// Use `FRAMESxHEIGHTxWIDTH` instead of probing VIDEO.
    #[arg(long, value_parser = parse_shape)]
    shape: Option<vidmark::VideoShape>,

    /// Field separator of the annotation files.
    #[arg(long, default_value = " ")]
    separator: String,
}

#[derive(Parser, Debug)]
struct ReplayArgs {
    /// Video to replay.
    video: PathBuf,

    /// Annotation file for VIDEO.
    keypoints: PathBuf,

    /// Output MP4 path.
    output: PathBuf,

    /// Radius of the keypoint markers, in pixels.
    #[arg(short = 'd', long = "annotation-radius", default_value_t = 4)]
    radius: u32,

    #[arg(short, long, value_enum, default_value_t = AlgorithmChoice::None)]
    algorithm: AlgorithmChoice,

    #[arg(long, default_value = " ")]
    separator: String,
}

#[derive(Parser, Debug)]
struct MktestArgs {
    /// Output MP4 path.
    output: PathBuf,

    #[arg(short = 'n', long = "number-of-frames", default_value_t = 100)]
    frames: u64,

    #[arg(long, default_value_t = 640)]
    width: u32,

    #[arg(long, default_value_t = 480)]
    height: u32,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Annotation file to summarize.
    keypoints: PathBuf,

    #[arg(long, default_value = " ")]
    separator: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum AlgorithmChoice {
    None,
    Interpolate,
    Expand,
}

impl From<AlgorithmChoice> for vidmark::FillAlgorithm {
    fn from(choice: AlgorithmChoice) -> Self {
        match choice {
            AlgorithmChoice::None => Self::None,
            AlgorithmChoice::Interpolate => Self::Interpolate,
            AlgorithmChoice::Expand => Self::Expand,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.cmd {
        Command::Postproc(args) => cmd_postproc(args),
        Command::Replay(args) => cmd_replay(args),
        Command::Mktest(args) => cmd_mktest(args),
        Command::Inspect(args) => cmd_inspect(args),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        _ => tracing::Level::DEBUG,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn parse_shape(s: &str) -> Result<vidmark::VideoShape, String> {
    let dims = s
        .split('x')
        .map(|d| d.trim().parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid shape '{s}': {e}"))?;
    let [frames, height, width] = dims[..] else {
        return Err(format!("shape '{s}' must look like FRAMESxHEIGHTxWIDTH"));
    };
    let height = u32::try_from(height).map_err(|_| format!("height {height} is too large"))?;
    let width = u32::try_from(width).map_err(|_| format!("width {width} is too large"))?;
    Ok(vidmark::VideoShape::new(frames, height, width))
}

fn codec_options(separator: &str) -> anyhow::Result<vidmark::CodecOptions> {
    let options = vidmark::CodecOptions::with_separator(separator);
    options.validate()?;
    Ok(options)
}

fn open_video(path: &Path) -> anyhow::Result<vidmark::FfmpegVideo> {
    vidmark::FfmpegVideo::open(path).with_context(|| format!("open video '{}'", path.display()))
}

fn cmd_postproc(args: PostprocArgs) -> anyhow::Result<()> {
    let shape = match args.shape {
        Some(shape) => shape,
        None => open_video(&args.video)?.shape(),
    };
    let opts = vidmark::PostprocessOpts {
        algorithm: args.algorithm.into(),
        codec: codec_options(&args.separator)?,
    };

    let table = vidmark::postprocess(&args.keypoints, &args.output, shape, &opts)
        .with_context(|| format!("post-process '{}'", args.keypoints.display()))?;

    eprintln!(
        "wrote {} ({} annotated frames)",
        args.output.display(),
        table.len()
    );
    Ok(())
}

fn cmd_replay(args: ReplayArgs) -> anyhow::Result<()> {
    let video = open_video(&args.video)?;
    let style = vidmark::OverlayStyle {
        radius: args.radius,
        ..vidmark::OverlayStyle::default()
    };
    style.validate()?;
    let opts = vidmark::PostprocessOpts {
        algorithm: args.algorithm.into(),
        codec: codec_options(&args.separator)?,
    };

    let cfg = vidmark::default_mp4_config(
        &args.output,
        video.width(),
        video.height(),
        video.frame_rate(),
    );
    let mut encoder = vidmark::FfmpegEncoder::new(cfg)?;
    let stats = vidmark::replay(&video, &args.keypoints, &mut encoder, &opts, &style)?;
    encoder.finish()?;

    eprintln!(
        "wrote {} ({} of {} frames annotated)",
        args.output.display(),
        stats.frames_annotated,
        stats.frames_total
    );
    Ok(())
}

fn cmd_mktest(args: MktestArgs) -> anyhow::Result<()> {
    if args.frames == 0 {
        anyhow::bail!("cannot write a test video with 0 frames");
    }

    let fps = vidmark::Fps::new(10, 1)?;
    let cfg = vidmark::default_mp4_config(&args.output, args.width, args.height, fps);
    let mut encoder = vidmark::FfmpegEncoder::new(cfg)?;
    for i in 0..args.frames {
        let frame = vidmark::MemoryVideo::numbered_frame(i, args.width, args.height);
        encoder
            .push_frame(&frame)
            .with_context(|| format!("encode test frame {i}"))?;
    }
    encoder.finish()?;

    eprintln!("wrote {} ({} frames)", args.output.display(), args.frames);
    Ok(())
}

#[derive(serde::Serialize)]
struct Summary {
    path: String,
    labels: Vec<String>,
    keypoints: usize,
    frames: usize,
    first_frame: Option<u64>,
    last_frame: Option<u64>,
    missing_frames: u64,
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let options = codec_options(&args.separator)?;
    let (table, header) = vidmark::codec::load_from_path(&args.keypoints, &options)
        .with_context(|| format!("load annotations '{}'", args.keypoints.display()))?;

    let first_frame = table.first_frame().map(|f| f.0);
    let last_frame = table.last_frame().map(|f| f.0);
    let missing_frames = match (first_frame, last_frame) {
        (Some(first), Some(last)) => (last - first + 1) - table.len() as u64,
        _ => 0,
    };
    let summary = Summary {
        path: args.keypoints.display().to_string(),
        labels: header.0,
        keypoints: table.keypoint_count().unwrap_or(0),
        frames: table.len(),
        first_frame,
        last_frame,
        missing_frames,
    };

    let json = serde_json::to_string_pretty(&summary).context("serialize summary")?;
    println!("{json}");
    Ok(())
}
