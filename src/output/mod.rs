//! Build directory persistence
//!
//! ```text
//! build/
//!   images/{n}.png
//!   json/{n}.json
//!   json/_metadata.json
//!   gifs/{n}.gif        (animation export only)
//! ```

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::codecs::gif::{GifEncoder, Repeat};
use image::{Delay, Frame, RgbaImage};
use log::{debug, info};
use serde::Serialize;

use crate::config::{GeneratorConfig, GifConfig};
use crate::engine::{Edition, EditionSink};
use crate::error::{Result, StrataError};
use crate::metadata::EditionMetadata;

/// Name of the aggregate metadata document inside `json/`.
pub const AGGREGATE_METADATA_FILE: &str = "_metadata.json";

/// Remove any previous build and create a fresh directory tree.
pub fn build_setup(build_dir: &Path, with_gifs: bool) -> Result<()> {
    if build_dir.exists() {
        fs::remove_dir_all(build_dir).map_err(|source| StrataError::DirectoryCreate {
            path: build_dir.to_path_buf(),
            source,
        })?;
    }

    let mut dirs = vec![build_dir.join("images"), build_dir.join("json")];
    if with_gifs {
        dirs.push(build_dir.join("gifs"));
    }
    for dir in dirs {
        fs::create_dir_all(&dir).map_err(|source| StrataError::DirectoryCreate { path: dir.clone(), source })?;
    }

    debug!("Build directory ready: {}", build_dir.display());
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).map_err(|source| StrataError::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Encode captured frames as an animated GIF.
///
/// `quality` 1-100 maps onto the encoder's speed: 100 is the slowest, best
/// palette.
pub fn write_gif(path: &Path, frames: &[RgbaImage], config: &GifConfig) -> Result<()> {
    if frames.is_empty() {
        return Ok(());
    }

    let file = File::create(path).map_err(|source| StrataError::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;
    let speed = (31 - i32::from(config.quality.clamp(1, 100)) * 30 / 100).clamp(1, 30);
    let mut encoder = GifEncoder::new_with_speed(BufWriter::new(file), speed);

    let repeat = match config.repeat {
        0 => Repeat::Infinite,
        n => Repeat::Finite(n),
    };
    encoder.set_repeat(repeat)?;

    for image in frames {
        let delay = Delay::from_numer_denom_ms(config.delay, 1);
        encoder.encode_frame(Frame::from_parts(image.clone(), 0, 0, delay))?;
    }
    Ok(())
}

/// Writes editions into a build directory prepared by [`build_setup`].
#[derive(Debug)]
pub struct BuildWriter {
    build_dir: PathBuf,
    gif: GifConfig,
    records: Vec<EditionMetadata>,
}

impl BuildWriter {
    pub fn new(build_dir: &Path, gif: &GifConfig) -> Self {
        Self {
            build_dir: build_dir.to_path_buf(),
            gif: gif.clone(),
            records: Vec::new(),
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(&config.build_dir, &config.gif)
    }

    /// Metadata of every edition persisted so far, in creation order.
    pub fn records(&self) -> &[EditionMetadata] {
        &self.records
    }

    pub fn image_path(&self, edition: u32) -> PathBuf {
        self.build_dir.join("images").join(format!("{}.png", edition))
    }

    pub fn json_path(&self, edition: u32) -> PathBuf {
        self.build_dir.join("json").join(format!("{}.json", edition))
    }

    pub fn gif_path(&self, edition: u32) -> PathBuf {
        self.build_dir.join("gifs").join(format!("{}.gif", edition))
    }

    pub fn aggregate_path(&self) -> PathBuf {
        self.build_dir.join("json").join(AGGREGATE_METADATA_FILE)
    }
}

impl EditionSink for BuildWriter {
    fn persist(&mut self, edition: &Edition) -> Result<()> {
        edition.image.save(self.image_path(edition.number))?;
        if self.gif.export {
            write_gif(&self.gif_path(edition.number), &edition.frames, &self.gif)?;
        }
        write_json(&self.json_path(edition.number), &edition.metadata)?;
        self.records.push(edition.metadata.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let path = self.aggregate_path();
        write_json(&path, &self.records)?;
        info!("Wrote {} records to {}", self.records.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{Attribute, MetadataAssembler};
    use image::Rgba;
    use tempfile::tempdir;

    fn edition(number: u32, frames: Vec<RgbaImage>) -> Edition {
        let assembler = MetadataAssembler::from_config(&GeneratorConfig::default());
        Edition {
            number,
            dna: format!("{}:a.png", number),
            profile: None,
            image: RgbaImage::from_pixel(2, 2, Rgba([1, 2, 3, 255])),
            frames,
            metadata: assembler.assemble(number, "0:a.png", vec![Attribute::new("Background", "a")]),
        }
    }

    #[test]
    fn test_build_setup_wipes_previous_run() {
        let dir = tempdir().unwrap();
        let build = dir.path().join("build");
        fs::create_dir_all(build.join("images")).unwrap();
        fs::write(build.join("images/stale.png"), b"old").unwrap();

        build_setup(&build, true).unwrap();
        assert!(!build.join("images/stale.png").exists());
        assert!(build.join("json").is_dir());
        assert!(build.join("gifs").is_dir());
    }

    #[test]
    fn test_persist_and_finish() {
        let dir = tempdir().unwrap();
        build_setup(dir.path(), false).unwrap();
        let mut writer = BuildWriter::new(dir.path(), &GifConfig::default());

        writer.persist(&edition(1, Vec::new())).unwrap();
        writer.persist(&edition(2, Vec::new())).unwrap();
        writer.finish().unwrap();

        assert!(writer.image_path(1).exists());
        let single: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(writer.json_path(2)).unwrap()).unwrap();
        assert_eq!(single["edition"], 2);

        let all: Vec<serde_json::Value> =
            serde_json::from_str(&fs::read_to_string(writer.aggregate_path()).unwrap()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0]["name"], "Your Collection #1");
    }

    #[test]
    fn test_gif_written_when_enabled() {
        let dir = tempdir().unwrap();
        build_setup(dir.path(), true).unwrap();
        let gif = GifConfig {
            export: true,
            delay: 100,
            ..Default::default()
        };
        let mut writer = BuildWriter::new(dir.path(), &gif);
        let frames = vec![
            RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255])),
            RgbaImage::from_pixel(2, 2, Rgba([0, 255, 0, 255])),
        ];

        writer.persist(&edition(3, frames)).unwrap();
        assert!(writer.gif_path(3).exists());
        assert!(image::open(writer.gif_path(3)).is_ok());
    }
}
