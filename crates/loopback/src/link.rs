//! One-directional in-memory link with fixed latency and random loss.
//!
//! Latency is counted in driver ticks. Only unreliable packets are subject to
//! loss; reliable packets always arrive. Delivery order equals send order.

use std::collections::VecDeque;

use kinesync_wire::Channel;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Link conditions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkConfig {
    /// Ticks between send and delivery.
    pub latency_ticks: u64,
    /// Probability in `[0, 1]` that an unreliable packet is dropped.
    pub loss: f64,
}

impl LinkConfig {
    pub const PERFECT: Self = Self {
        latency_ticks: 0,
        loss: 0.0,
    };

    pub fn new(latency_ticks: u64, loss: f64) -> Self {
        let loss = if loss.is_nan() { 0.0 } else { loss.clamp(0.0, 1.0) };
        Self {
            latency_ticks,
            loss,
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::new(3, 0.0)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub sent: u64,
    pub dropped: u64,
    pub delivered: u64,
}

pub struct LossyLink {
    config: LinkConfig,
    rng: ChaCha8Rng,
    in_flight: VecDeque<(u64, Vec<u8>)>,
    stats: LinkStats,
}

impl LossyLink {
    pub fn new(config: LinkConfig, seed: u64) -> Self {
        Self {
            config,
            rng: ChaCha8Rng::seed_from_u64(seed),
            in_flight: VecDeque::new(),
            stats: LinkStats::default(),
        }
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Queue `bytes` sent at tick `now`. Returns false if the packet was lost.
    pub fn send(&mut self, now: u64, channel: Channel, bytes: Vec<u8>) -> bool {
        self.stats.sent += 1;
        if channel == Channel::Unreliable
            && self.config.loss > 0.0
            && self.rng.gen_bool(self.config.loss)
        {
            self.stats.dropped += 1;
            return false;
        }
        self.in_flight
            .push_back((now + self.config.latency_ticks, bytes));
        true
    }

    /// Packets due at or before `now`, oldest first.
    pub fn deliver(&mut self, now: u64) -> Vec<Vec<u8>> {
        let mut due = Vec::new();
        while let Some((deliver_at, _)) = self.in_flight.front() {
            if *deliver_at > now {
                break;
            }
            if let Some((_, bytes)) = self.in_flight.pop_front() {
                due.push(bytes);
            }
        }
        self.stats.delivered += due.len() as u64;
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_delays_delivery() {
        let mut link = LossyLink::new(LinkConfig::new(2, 0.0), 7);
        link.send(10, Channel::Unreliable, vec![1]);
        link.send(11, Channel::Reliable, vec![2]);

        assert!(link.deliver(11).is_empty());
        assert_eq!(link.deliver(12), vec![vec![1]]);
        assert_eq!(link.deliver(20), vec![vec![2]]);
        assert_eq!(link.stats().delivered, 2);
    }

    #[test]
    fn test_total_loss_spares_reliable() {
        let mut link = LossyLink::new(LinkConfig::new(0, 1.0), 7);
        assert!(!link.send(0, Channel::Unreliable, vec![1]));
        assert!(link.send(0, Channel::Reliable, vec![2]));

        assert_eq!(link.deliver(0), vec![vec![2]]);
        assert_eq!(link.stats().dropped, 1);
    }

    #[test]
    fn test_loss_is_seeded() {
        let run = |seed| {
            let mut link = LossyLink::new(LinkConfig::new(0, 0.5), seed);
            (0..64)
                .map(|i| link.send(i, Channel::Unreliable, Vec::new()))
                .collect::<Vec<_>>()
        };
        assert_eq!(run(3), run(3));
        let dropped = run(3).iter().filter(|sent| !**sent).count();
        assert!(dropped > 0 && dropped < 64);
    }

    #[test]
    fn test_loss_clamped() {
        assert_eq!(LinkConfig::new(0, 3.0).loss, 1.0);
        assert_eq!(LinkConfig::new(0, f64::NAN).loss, 0.0);
    }
}
