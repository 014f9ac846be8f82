//! Tick Bitmap Scanner
//!
//! Enumerates every initialized tick of a concentrated-liquidity pool from
//! its `tickBitmap` words. Each word covers 256 compressed ticks
//! (`tick / tickSpacing`); bit `p` of word `w` set means tick
//! `(w * 256 + p) * tickSpacing` is initialized.
//!
//! Word reads are independent, so the full range is split into batches that
//! are fetched concurrently and joined once before aggregation.
//!
//! Created: 2026-10-15

use crate::chain::ChainReader;
use crate::error::{ArbError, ConfigError};
use alloy::primitives::{Address, U256};
use futures::future::try_join_all;
use std::ops::RangeInclusive;
use tracing::{debug, info};

/// Lowest tick usable by any concentrated-liquidity pool
pub const MIN_TICK: i32 = -887272;
/// Highest tick usable by any concentrated-liquidity pool
pub const MAX_TICK: i32 = 887272;

/// Words fetched per multicall request
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// Word index of `tick`: `floor(floor(tick / spacing) / 256)`.
///
/// Both divisions floor toward negative infinity, so `tick = -1` with
/// spacing 60 lands in word -1, not 0.
pub fn word_index(tick: i32, tick_spacing: i32) -> i32 {
    tick.div_euclid(tick_spacing).div_euclid(256)
}

/// [`word_index`] narrowed to the `int16` the pool contract takes.
///
/// # Panics
/// If the index does not fit in an i16. That only happens for ticks far
/// outside `MIN_TICK..=MAX_TICK` and is a caller bug.
pub fn word_position(tick: i32, tick_spacing: i32) -> i16 {
    let word = word_index(tick, tick_spacing);
    i16::try_from(word).unwrap_or_else(|_| {
        panic!(
            "tick {} with spacing {} maps to word {}, outside int16",
            tick, tick_spacing, word
        )
    })
}

/// One 256-bit bitmap word as read from the pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickBitmapWord {
    pub index: i16,
    pub bitmap: U256,
}

/// Result of a full-range scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickScan {
    pub tick_spacing: i32,
    pub words_scanned: usize,
    /// Words with at least one bit set
    pub non_empty_words: usize,
    /// Initialized ticks, ascending
    pub ticks: Vec<i32>,
}

/// Scanner bound to a tick spacing
#[derive(Debug, Clone, Copy)]
pub struct TickBitmapScanner {
    tick_spacing: i32,
    batch_size: usize,
}

impl TickBitmapScanner {
    pub fn new(tick_spacing: i32) -> Result<Self, ArbError> {
        if tick_spacing <= 0 {
            return Err(ConfigError::InvalidTickSpacing(tick_spacing).into());
        }
        Ok(Self {
            tick_spacing,
            batch_size: DEFAULT_BATCH_SIZE,
        })
    }

    /// Words per request. Clamped to at least 1.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn tick_spacing(&self) -> i32 {
        self.tick_spacing
    }

    /// Every word index between `MIN_TICK` and `MAX_TICK`
    pub fn word_range(&self) -> RangeInclusive<i16> {
        word_position(MIN_TICK, self.tick_spacing)..=word_position(MAX_TICK, self.tick_spacing)
    }

    /// Initialized ticks of one word, ascending by bit position.
    /// Ticks outside `MIN_TICK..=MAX_TICK` are dropped.
    pub fn ticks_in_word(&self, word: &TickBitmapWord) -> Vec<i32> {
        let mut ticks = Vec::new();
        let mut bitmap = word.bitmap;
        let base = word.index as i32 * 256;

        while !bitmap.is_zero() {
            let bit = bitmap.trailing_zeros() as i32;
            let tick = (base + bit) * self.tick_spacing;
            if (MIN_TICK..=MAX_TICK).contains(&tick) {
                ticks.push(tick);
            }
            // clear lowest set bit
            bitmap &= bitmap - U256::from(1u8);
        }

        ticks
    }

    /// Aggregate words into the ordered tick sequence.
    pub fn collect(&self, words: &[TickBitmapWord]) -> Vec<i32> {
        let mut sorted: Vec<&TickBitmapWord> = words.iter().filter(|w| !w.bitmap.is_zero()).collect();
        sorted.sort_by_key(|w| w.index);
        sorted.into_iter().flat_map(|w| self.ticks_in_word(w)).collect()
    }

    /// Read every word of `pool` from `source` and return its initialized ticks.
    pub async fn scan<C>(&self, source: &C, pool: Address) -> Result<TickScan, ArbError>
    where
        C: ChainReader + ?Sized,
    {
        let indices: Vec<i16> = self.word_range().collect();
        debug!(
            "Scanning {} tickBitmap words of {:?} in batches of {}",
            indices.len(),
            pool,
            self.batch_size
        );

        let batches = indices.chunks(self.batch_size).map(|chunk| async move {
            let bitmaps = source.tick_bitmap_words(pool, chunk).await?;
            Ok::<_, ArbError>(
                chunk
                    .iter()
                    .zip(bitmaps)
                    .map(|(&index, bitmap)| TickBitmapWord { index, bitmap })
                    .collect::<Vec<_>>(),
            )
        });

        let words: Vec<TickBitmapWord> = try_join_all(batches).await?.into_iter().flatten().collect();

        let non_empty_words = words.iter().filter(|w| !w.bitmap.is_zero()).count();
        let ticks = self.collect(&words);

        info!(
            "Tick scan {:?}: {} initialized ticks in {}/{} words (spacing {})",
            pool,
            ticks.len(),
            non_empty_words,
            words.len(),
            self.tick_spacing
        );

        Ok(TickScan {
            tick_spacing: self.tick_spacing,
            words_scanned: words.len(),
            non_empty_words,
            ticks,
        })
    }
}
