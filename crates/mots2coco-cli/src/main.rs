// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use clap::{Parser, Subcommand, ValueEnum};
use mots2coco::{
    BboxConvention, Conversion, Error, ManifestFormat, Settings,
    coco::{CocoReader, verify_document},
    convert_label_dir, convert_manifest_file, emit,
};
use std::path::{Path, PathBuf};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file (TOML, JSON or YAML). Values may also be given as
    /// MOTS2COCO_* environment variables.
    #[clap(long, env = "MOTS2COCO_CONFIG")]
    config: Option<PathBuf>,

    /// Conversion Command
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Convert a text manifest of pre-encoded RLE masks into a COCO document,
    /// copying the referenced frames into the image directory.
    Manifest {
        /// Manifest file, one object instance per line
        manifest: PathBuf,

        /// Root of the source frames, laid out as
        /// {source_root}/new_images/{group}/{frame}
        #[clap(long, default_value = ".")]
        source_root: PathBuf,

        /// Directory receiving the copied frames
        #[clap(long, default_value = "images")]
        images_dir: PathBuf,

        /// Output document (.json, or .zip to pack the frames as well)
        #[clap(long, short)]
        output: PathBuf,

        /// Manifest column layout
        #[clap(long, value_enum)]
        format: Option<Layout>,

        /// How the extended layout's box columns are read
        #[clap(long, value_enum)]
        bbox: Option<BoxColumns>,

        /// Abort when a referenced frame is missing
        #[clap(long)]
        strict: bool,

        /// Do not copy frames, only write the annotations
        #[clap(long)]
        no_copy: bool,

        /// Pretty-print the JSON output
        #[clap(long)]
        pretty: bool,
    },
    /// Convert a directory of 16-bit instance label images laid out as
    /// {instances}/{group}/{frame}.png into a COCO document.
    Instances {
        /// Instances directory
        instances: PathBuf,

        /// Output document (.json, or .zip to pack the frames as well)
        #[clap(long, short)]
        output: PathBuf,

        /// Divisor recovering the class id from a pixel value
        #[clap(long)]
        id_divisor: Option<u32>,

        /// Extension of the camera frames named in file_name
        #[clap(long)]
        image_ext: Option<String>,

        /// Directory the frames named in file_name are read from when
        /// writing a .zip output
        #[clap(long, default_value = ".")]
        images_base: PathBuf,

        /// Pretty-print the JSON output
        #[clap(long)]
        pretty: bool,
    },
    /// Check a COCO document (.json or .zip) for structural problems.
    Verify {
        /// Document to verify
        document: PathBuf,
    },
}

#[derive(ValueEnum, PartialEq, Eq, Clone, Copy, Debug)]
enum Layout {
    /// 12 columns with an embedded bounding box
    Extended,
    /// Canonical 6-column MOTS layout
    Mots,
}

impl From<Layout> for ManifestFormat {
    fn from(layout: Layout) -> Self {
        match layout {
            Layout::Extended => ManifestFormat::Extended,
            Layout::Mots => ManifestFormat::Mots,
        }
    }
}

#[derive(ValueEnum, PartialEq, Eq, Clone, Copy, Debug)]
enum BoxColumns {
    /// Inclusive corners x_min y_min x_max y_max
    Corners,
    /// left top width height
    Xywh,
}

impl From<BoxColumns> for BboxConvention {
    fn from(columns: BoxColumns) -> Self {
        match columns {
            BoxColumns::Corners => BboxConvention::Corners,
            BoxColumns::Xywh => BboxConvention::Xywh,
        }
    }
}

fn print_summary(conversion: &Conversion, output: &Path) {
    let summary = &conversion.summary;
    println!("Images: {}", summary.images);
    println!("Annotations: {}", summary.annotations);
    if summary.skipped_lines > 0 {
        println!("Skipped lines: {}", summary.skipped_lines);
    }
    if summary.skipped_frames > 0 {
        println!("Skipped frames: {}", summary.skipped_frames);
    }
    println!("Output: {}", output.display());
    println!("last annotation id: {}", summary.last_annotation_id());
}

#[allow(clippy::too_many_arguments)]
fn handle_manifest(
    mut settings: Settings,
    manifest: PathBuf,
    source_root: PathBuf,
    images_dir: PathBuf,
    output: PathBuf,
    format: Option<Layout>,
    bbox: Option<BoxColumns>,
    strict: bool,
    no_copy: bool,
    pretty: bool,
) -> Result<(), Error> {
    if let Some(format) = format {
        settings.manifest.format = format.into();
    }
    if let Some(bbox) = bbox {
        settings.manifest.bbox = bbox.into();
    }
    settings.strict |= strict;
    settings.copy_images &= !no_copy;
    settings.output.pretty |= pretty;

    let conversion = convert_manifest_file(&manifest, &source_root, &images_dir, &settings)?;
    emit(&conversion, &output, &settings.output, &images_dir)?;
    print_summary(&conversion, &output);
    Ok(())
}

fn handle_instances(
    mut settings: Settings,
    instances: PathBuf,
    output: PathBuf,
    id_divisor: Option<u32>,
    image_ext: Option<String>,
    images_base: PathBuf,
    pretty: bool,
) -> Result<(), Error> {
    if let Some(id_divisor) = id_divisor {
        settings.id_divisor = id_divisor;
    }
    if let Some(image_ext) = image_ext {
        settings.labels.image_ext = image_ext;
    }
    settings.output.pretty |= pretty;
    settings.validate()?;

    let conversion = convert_label_dir(&instances, &settings)?;
    emit(&conversion, &output, &settings.output, &images_base)?;
    print_summary(&conversion, &output);
    Ok(())
}

fn handle_verify(document: PathBuf) -> Result<(), Error> {
    let coco = CocoReader::new().read(&document)?;
    let report = verify_document(&coco);
    println!("{}", report);
    if report.is_valid() {
        Ok(())
    } else {
        Err(Error::CocoError(report.summary()))
    }
}

/// `RUST_LOG` directives, `info` when unset or unparsable.
#[cfg(feature = "profiling")]
fn log_filter() -> tracing_subscriber::EnvFilter {
    use tracing_subscriber::EnvFilter;

    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(feature = "profiling")]
fn init_tracing() {
    use tracing_subscriber::fmt::format::FmtSpan;

    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<(), Error> {
    #[cfg(feature = "profiling")]
    init_tracing();
    #[cfg(not(feature = "profiling"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref())?;
    log::debug!("{:?}", args);

    match args.cmd {
        Command::Manifest {
            manifest,
            source_root,
            images_dir,
            output,
            format,
            bbox,
            strict,
            no_copy,
            pretty,
        } => handle_manifest(
            settings,
            manifest,
            source_root,
            images_dir,
            output,
            format,
            bbox,
            strict,
            no_copy,
            pretty,
        ),
        Command::Instances {
            instances,
            output,
            id_divisor,
            image_ext,
            images_base,
            pretty,
        } => handle_instances(
            settings,
            instances,
            output,
            id_divisor,
            image_ext,
            images_base,
            pretty,
        ),
        Command::Verify { document } => handle_verify(document),
    }
}
