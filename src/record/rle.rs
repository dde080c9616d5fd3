//! Run-length encoded binary masks in COCO order.
//!
//! COCO stores masks column-major (pixel `(x, y)` lives at `y + h * x`) as
//! alternating run lengths, starting with a background run. That run may be
//! zero when the first pixel is foreground.

use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// A run-length encoded mask. Counts alternate background/foreground.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rle {
    counts: Vec<u32>,
}

impl Rle {
    /// Wraps counts that are already in COCO order.
    pub fn from_coco(counts: impl Into<Vec<u32>>) -> Self {
        Self {
            counts: counts.into(),
        }
    }

    /// Converts Kaggle-style `start length` pairs into COCO counts.
    ///
    /// Starts are 1-based pixel positions and must be strictly increasing
    /// without overlap. The trailing background run is left implicit.
    pub fn from_kaggle(pairs: &[u32]) -> Result<Self, RecordError> {
        if pairs.len() % 2 != 0 {
            return Err(RecordError::InvalidRle {
                message: format!(
                    "kaggle counts must come in start/length pairs, got {} values",
                    pairs.len()
                ),
            });
        }

        let mut counts = Vec::with_capacity(pairs.len());
        let mut cursor: u32 = 0;
        for pair in pairs.chunks_exact(2) {
            let (start, length) = (pair[0], pair[1]);
            let offset = start
                .checked_sub(1)
                .filter(|&offset| offset >= cursor)
                .ok_or_else(|| RecordError::InvalidRle {
                    message: format!("run start {} overlaps the previous run", start),
                })?;
            counts.push(offset - cursor);
            counts.push(length);
            cursor = offset
                .checked_add(length)
                .ok_or_else(|| RecordError::InvalidRle {
                    message: format!("run {}+{} overflows", start, length),
                })?;
        }

        Ok(Self { counts })
    }

    /// Parses Kaggle text such as `"1 3 10 5"`, split on `sep`.
    pub fn from_string(text: &str, sep: char) -> Result<Self, RecordError> {
        let pairs = text
            .split(sep)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| {
                token.parse::<u32>().map_err(|e| RecordError::InvalidRle {
                    message: format!("invalid run value '{}': {}", token, e),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_kaggle(&pairs)
    }

    /// Encodes a column-major bitmap of `h * w` pixels. Any non-zero byte is foreground.
    pub fn encode(mask: &[u8], h: u32, w: u32) -> Result<Self, RecordError> {
        let n = h as usize * w as usize;
        if mask.len() != n {
            return Err(RecordError::InvalidRle {
                message: format!("mask has {} pixels, expected {}x{}", mask.len(), h, w),
            });
        }

        let mut counts = Vec::new();
        let mut previous = false;
        let mut run: u32 = 0;
        for &value in mask {
            let value = value != 0;
            if value != previous {
                counts.push(run);
                run = 0;
                previous = value;
            }
            run += 1;
        }
        counts.push(run);

        Ok(Self { counts })
    }

    /// Expands to a column-major bitmap of `h * w` pixels.
    ///
    /// Counts may cover fewer pixels than the mask (implicit trailing
    /// background) but never more.
    pub fn decode(&self, h: u32, w: u32) -> Result<Vec<u8>, RecordError> {
        let n = h as usize * w as usize;
        let covered: u64 = self.counts.iter().map(|&c| u64::from(c)).sum();
        if covered > n as u64 {
            return Err(RecordError::InvalidRle {
                message: format!("runs cover {} pixels, mask {}x{} has {}", covered, h, w, n),
            });
        }

        let mut mask = vec![0u8; n];
        let mut idx = 0usize;
        for (i, &count) in self.counts.iter().enumerate() {
            let end = idx + count as usize;
            if i % 2 == 1 {
                mask[idx..end].fill(1);
            }
            idx = end;
        }
        Ok(mask)
    }

    /// Number of foreground pixels (the odd-indexed runs).
    pub fn area(&self) -> u64 {
        self.counts
            .iter()
            .skip(1)
            .step_by(2)
            .map(|&c| u64::from(c))
            .sum()
    }

    pub fn counts(&self) -> &[u32] {
        &self.counts
    }

    /// The counts list COCO tooling expects for an uncompressed RLE.
    pub fn to_coco(&self) -> Vec<u32> {
        self.counts.clone()
    }

    /// Compresses counts into the COCO string form.
    ///
    /// Each count past the second is stored as a delta against the count two
    /// positions back, then written in 5-bit groups offset by 48.
    pub fn to_compressed(&self) -> String {
        let mut out = String::new();
        for (i, &count) in self.counts.iter().enumerate() {
            let mut x = i64::from(count);
            if i > 2 {
                x -= i64::from(self.counts[i - 2]);
            }
            loop {
                let mut c = (x & 0x1f) as u8;
                x >>= 5;
                let more = if c & 0x10 != 0 { x != -1 } else { x != 0 };
                if more {
                    c |= 0x20;
                }
                out.push(char::from(c + 48));
                if !more {
                    break;
                }
            }
        }
        out
    }

    /// Parses the COCO compressed string form.
    pub fn from_compressed(text: &str) -> Result<Self, RecordError> {
        let bytes = text.as_bytes();
        let mut counts: Vec<u32> = Vec::new();
        let mut p = 0usize;

        while p < bytes.len() {
            let mut x: i64 = 0;
            let mut k = 0u32;
            loop {
                let raw = bytes[p];
                if !(48..48 + 64).contains(&raw) || 5 * k >= 60 {
                    return Err(RecordError::InvalidRle {
                        message: format!("invalid compressed byte at offset {}", p),
                    });
                }
                let c = i64::from(raw - 48);
                x |= (c & 0x1f) << (5 * k);
                p += 1;
                k += 1;
                let more = c & 0x20 != 0;
                if !more {
                    if c & 0x10 != 0 {
                        x |= -1i64 << (5 * k);
                    }
                    break;
                }
                if p >= bytes.len() {
                    return Err(RecordError::InvalidRle {
                        message: "compressed counts end mid-value".to_string(),
                    });
                }
            }

            if counts.len() > 2 {
                x += i64::from(counts[counts.len() - 2]);
            }
            let count = u32::try_from(x).map_err(|_| RecordError::InvalidRle {
                message: format!("decoded run {} is out of range", x),
            })?;
            counts.push(count);
        }

        Ok(Self { counts })
    }
}
