//! Admission of input batches against a player's processed-input cursor.
//!
//! A batch is a redundant window of samples: most of it has usually been
//! simulated already. Admission decides whether anything in it is new and,
//! if so, which sample the replay starts from.

use kinesync_sim::{InputBatch, Tick, tick_is_newer, tick_span};

/// Decision for one incoming batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// No samples.
    Empty,
    /// The batch's last tick is not newer than the cursor.
    Stale { last_tick: Tick, cursor: Tick },
    /// Replay samples `[start, len - 1)` and move the cursor to `last_tick`.
    Replay { start: usize, last_tick: Tick },
}

/// Decide what to do with `batch` given the player's cursor.
///
/// When the cursor falls inside the batch, replay starts at the cursor's own
/// sample; when it is older than the first sample (samples lost in transit
/// beyond the redundancy window) replay starts at the first sample.
pub fn admit(batch: &InputBatch, cursor: Option<Tick>) -> Admission {
    let (Some(first_tick), Some(last_tick)) = (batch.first_tick(), batch.last_tick()) else {
        return Admission::Empty;
    };

    let Some(cursor) = cursor else {
        return Admission::Replay {
            start: 0,
            last_tick,
        };
    };

    if !tick_is_newer(last_tick, cursor) {
        return Admission::Stale { last_tick, cursor };
    }

    let start = if tick_is_newer(cursor, first_tick) {
        usize::from(tick_span(first_tick, cursor)).min(batch.len() - 1)
    } else {
        0
    };

    Admission::Replay { start, last_tick }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinesync_sim::InputSample;

    fn batch(ticks: impl IntoIterator<Item = Tick>) -> InputBatch {
        InputBatch::new(ticks.into_iter().map(InputSample::idle).collect())
    }

    #[test]
    fn test_empty_batch() {
        assert_eq!(admit(&InputBatch::default(), Some(3)), Admission::Empty);
        assert_eq!(admit(&InputBatch::default(), None), Admission::Empty);
    }

    #[test]
    fn test_first_batch_starts_at_zero() {
        assert_eq!(
            admit(&batch(10..14), None),
            Admission::Replay {
                start: 0,
                last_tick: 13
            }
        );
    }

    #[test]
    fn test_stale_when_last_tick_not_newer() {
        assert_eq!(
            admit(&batch(40..46), Some(45)),
            Admission::Stale {
                last_tick: 45,
                cursor: 45
            }
        );
        assert_eq!(
            admit(&batch(40..44), Some(45)),
            Admission::Stale {
                last_tick: 43,
                cursor: 45
            }
        );
    }

    #[test]
    fn test_start_at_cursor_offset() {
        assert_eq!(
            admit(&batch(50..56), Some(52)),
            Admission::Replay {
                start: 2,
                last_tick: 55
            }
        );
    }

    #[test]
    fn test_gap_before_first_sample_starts_at_zero() {
        assert_eq!(
            admit(&batch(50..56), Some(30)),
            Admission::Replay {
                start: 0,
                last_tick: 55
            }
        );
    }

    #[test]
    fn test_cursor_offset_across_wrap() {
        let samples = [65533u16, 65534, 65535, 0, 1];
        assert_eq!(
            admit(&batch(samples), Some(65535)),
            Admission::Replay {
                start: 2,
                last_tick: 1
            }
        );
    }
}
