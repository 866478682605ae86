use anyhow::{anyhow, bail, Context};
use cardscan::{CardDetector, CardSide, CropCascade, Frame, ScanConfig, SharpnessEstimator};
use serde_json::json;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;

fn main() -> anyhow::Result<()> {
    cardscan::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let options = Options::parse(&args[2..])?;
    let config = match &options.config {
        Some(path) => ScanConfig::load_from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ScanConfig::load_or_default(),
    };

    let command = &args[1];
    match command.as_str() {
        "detect" => cmd_detect(&options, &config),
        "sharpness" => cmd_sharpness(&options, &config),
        "crop" => cmd_crop(&options, &config),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            std::process::exit(1);
        }
    }
}

fn print_usage() {
    eprintln!("Usage: cardscan-cli <command> [args] [--config <file>] [--json]");
    eprintln!("  detect <image>");
    eprintln!("  sharpness <image>");
    eprintln!("  crop <image> <out_dir> [--side front|back]");
}

#[derive(Debug, Default)]
struct Options {
    positional: Vec<String>,
    side: Option<CardSide>,
    config: Option<PathBuf>,
    json: bool,
}

impl Options {
    fn parse(args: &[String]) -> anyhow::Result<Self> {
        let mut options = Options::default();
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--json" => options.json = true,
                "--side" => {
                    let value = iter.next().ok_or_else(|| anyhow!("--side needs a value"))?;
                    options.side = Some(value.parse()?);
                }
                "--config" => {
                    let value = iter.next().ok_or_else(|| anyhow!("--config needs a path"))?;
                    options.config = Some(PathBuf::from(value));
                }
                flag if flag.starts_with("--") => bail!("unknown flag: {}", flag),
                _ => options.positional.push(arg.clone()),
            }
        }
        Ok(options)
    }

    fn image(&self) -> anyhow::Result<Frame> {
        let path = self
            .positional
            .first()
            .ok_or_else(|| anyhow!("image path required"))?;
        Ok(Frame::open(path)?)
    }
}

fn cmd_detect(options: &Options, config: &ScanConfig) -> anyhow::Result<()> {
    let frame = options.image()?;
    let detector = CardDetector::from_config(config);
    let sample = detector.detect_still(&frame);

    if options.json {
        println!(
            "{}",
            json!({
                "width": frame.width(),
                "height": frame.height(),
                "found": sample.found,
                "boundary": sample.boundary,
                "quality": sample.quality,
            })
        );
    } else {
        match sample.boundary {
            Some(b) => println!(
                "Card at x={} y={} {}x{} (quality {})",
                b.x, b.y, b.width, b.height, sample.quality
            ),
            None => println!("No card found in {}x{} image", frame.width(), frame.height()),
        }
    }
    Ok(())
}

fn cmd_sharpness(options: &Options, config: &ScanConfig) -> anyhow::Result<()> {
    let path = options
        .positional
        .first()
        .ok_or_else(|| anyhow!("image path required"))?;
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path))?;

    let estimator = SharpnessEstimator::from_config(&config.quality);
    let file_score = estimator.score_encoded_bytes(&bytes);
    let frame = Frame::from_bytes(&bytes, path.as_str())?;
    let live_score = estimator.score(&frame);

    if options.json {
        println!(
            "{}",
            json!({
                "byte_difference": file_score,
                "laplacian": live_score,
            })
        );
    } else {
        println!("Byte-difference score: {}", file_score);
        println!("Laplacian score:       {}", live_score);
    }
    Ok(())
}

fn cmd_crop(options: &Options, config: &ScanConfig) -> anyhow::Result<()> {
    let out_dir = options
        .positional
        .get(1)
        .ok_or_else(|| anyhow!("output directory required"))?;
    let frame = options.image()?;
    let side = options.side.unwrap_or(CardSide::Front);

    let detector = Arc::new(CardDetector::from_config(config));
    let cascade = CropCascade::new(&config.capture, detector);
    let output = cascade.capture(frame, None, side);

    let format = config.capture.image_format()?;
    let (cropped, original) = output.save_to_dir(out_dir, format, config.capture.jpeg_quality)?;

    if options.json {
        println!(
            "{}",
            json!({
                "side": side,
                "strategy": output.strategy,
                "cropped": cropped,
                "original": original,
            })
        );
    } else {
        println!("Strategy: {:?}", output.strategy);
        println!("Cropped:  {}", cropped.display());
        println!("Original: {}", original.display());
    }
    Ok(())
}
