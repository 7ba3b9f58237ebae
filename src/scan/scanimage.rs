//! ScanImage TIFF headers
//!
//! ScanImage writes its acquisition state as `key = value` lines. Version 5.1
//! and earlier put them in the `ImageDescription` tag with a `scanimage.`
//! prefix; later versions move the static `SI.*` block into the `Software`
//! tag. Both tags of the first IFD are read and merged.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tiff::decoder::Decoder;
use tiff::tags::Tag;
use tracing::debug;

use super::ImageStackReader;
use crate::{Error, Result};

const FRAME_RATE_KEY: &str = "SI.hRoiManager.scanFrameRate";
const VOLUME_RATE_KEY: &str = "SI.hRoiManager.scanVolumeRate";
const NUM_SLICES_KEY: &str = "SI.hStackManager.numSlices";
const FRAMES_PER_VOLUME_KEY: &str = "SI.hFastZ.numFramesPerVolume";

/// Parsed ScanImage `key = value` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanImageHeader {
    entries: HashMap<String, String>,
}

impl ScanImageHeader {
    /// Parse header text. Lines without `=` are ignored.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let entries = text
            .lines()
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| {
                let key = key.trim();
                let key = key.strip_prefix("scanimage.").unwrap_or(key);
                (key.to_string(), value.trim().trim_matches('\'').to_string())
            })
            .collect();
        Self { entries }
    }

    /// Raw value of a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    fn number(&self, key: &str) -> Result<Option<f64>> {
        self.get(key)
            .map(|raw| {
                raw.parse::<f64>().map_err(|e| {
                    Error::ScanRead(format!("{key} is not a number ({raw:?}): {e}"))
                })
            })
            .transpose()
    }

    /// Number of scanning depths, defaulting to 1 when the stack manager is silent.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ScanRead`] if the value is not a positive integer.
    pub fn num_scanning_depths(&self) -> Result<usize> {
        let depths = match self.number(NUM_SLICES_KEY)? {
            Some(slices) => slices,
            None => self.number(FRAMES_PER_VOLUME_KEY)?.unwrap_or(1.0),
        };
        if depths < 1.0 || depths.fract() != 0.0 {
            return Err(Error::ScanRead(format!(
                "invalid number of scanning depths: {depths}"
            )));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(depths as usize)
    }

    /// Acquisition rate: volume rate for multi-plane stacks, frame rate otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ScanRead`] if no rate is recorded or the recorded
    /// rate is not a finite positive number.
    pub fn fps(&self) -> Result<f64> {
        let volume_rate = if self.num_scanning_depths()? > 1 {
            self.number(VOLUME_RATE_KEY)?
        } else {
            None
        };
        let (key, rate) = match volume_rate {
            Some(rate) => (VOLUME_RATE_KEY, rate),
            None => (
                FRAME_RATE_KEY,
                self.number(FRAME_RATE_KEY)?
                    .ok_or_else(|| Error::ScanRead(format!("header has no {FRAME_RATE_KEY}")))?,
            ),
        };
        if !rate.is_finite() || rate <= 0.0 {
            return Err(Error::ScanRead(format!(
                "{key} must be a finite positive rate, got {rate}"
            )));
        }
        Ok(rate)
    }
}

/// ScanImage TIFF stack opened for metadata queries.
#[derive(Debug, Clone)]
pub struct ScanImageTiff {
    path: PathBuf,
    num_planes: usize,
    frame_rate: f64,
}

impl ScanImageTiff {
    /// Open a ScanImage TIFF and read its acquisition header.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InputNotFound`] if the file does not exist and
    /// [`Error::ScanRead`] if it is not a TIFF or carries no usable header.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let file = File::open(path)?;
        let mut decoder = Decoder::new(BufReader::new(file))
            .map_err(|e| Error::ScanRead(format!("{}: {e}", path.display())))?;

        let mut text = String::new();
        for tag in [Tag::Software, Tag::ImageDescription] {
            let value = decoder
                .find_tag(tag)
                .map_err(|e| Error::ScanRead(format!("{}: {e}", path.display())))?;
            if let Some(value) = value {
                let block = value
                    .into_string()
                    .map_err(|e| Error::ScanRead(format!("{}: {e}", path.display())))?;
                text.push_str(&block);
                text.push('\n');
            }
        }

        let header = ScanImageHeader::parse(&text);
        let num_planes = header.num_scanning_depths()?;
        let frame_rate = header.fps()?;
        debug!(path = %path.display(), num_planes, frame_rate, "opened ScanImage stack");

        Ok(Self {
            path: path.to_path_buf(),
            num_planes,
            frame_rate,
        })
    }
}

impl ImageStackReader for ScanImageTiff {
    fn num_planes(&self) -> usize {
        self.num_planes
    }

    fn frame_rate(&self) -> f64 {
        self.frame_rate
    }

    fn source(&self) -> &Path {
        &self.path
    }
}
