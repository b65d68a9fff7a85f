//! Construction of the redundant input upload.
//!
//! Every tick the client resends every sample the server has not yet
//! acknowledged. Loss is tolerated by that redundancy alone; there is no
//! retransmission tracking.

use kinesync_sim::{InputBatch, InputSample, MAX_BATCH_TICKS, Tick, TickHistory, tick_span};

/// Samples for ticks `[acked, current)`, capped to the newest
/// [`MAX_BATCH_TICKS`].
///
/// `acked` is the tick of the newest authoritative snapshot: the server has
/// consumed every input before it, so its own input is the first one still
/// owed. Slots that were never written are sent as idle samples.
pub fn unacknowledged_batch(
    inputs: &TickHistory<InputSample>,
    acked: Tick,
    current: Tick,
) -> InputBatch {
    let span = usize::from(tick_span(acked, current)).min(MAX_BATCH_TICKS) as u16;
    let start = current.wrapping_sub(span);

    let samples = (0..span)
        .map(|offset| {
            let tick = start.wrapping_add(offset);
            inputs
                .get(tick)
                .copied()
                .unwrap_or_else(|| InputSample::idle(tick))
        })
        .collect();

    InputBatch::new(samples)
}
