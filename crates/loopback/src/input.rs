//! Input sources that stand in for a player.

use kinesync_client::InputSource;
use kinesync_sim::{Intents, Quat, Tick};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Hold `intents` and `look` for `ticks` ticks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub ticks: u32,
    pub intents: Intents,
    pub look: Quat,
}

impl Segment {
    pub fn new(ticks: u32, intents: Intents) -> Self {
        Self {
            ticks,
            intents,
            look: Quat::IDENTITY,
        }
    }

    pub fn looking(mut self, yaw: f32) -> Self {
        self.look = Quat::from_rotation_y(yaw);
        self
    }
}

/// Plays segments in order, then idles.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    segments: Vec<Segment>,
    index: usize,
    elapsed: u32,
}

impl ScriptedInput {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self {
            segments,
            index: 0,
            elapsed: 0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.index >= self.segments.len()
    }
}

impl InputSource for ScriptedInput {
    fn capture(&mut self, _tick: Tick) -> (Intents, Quat) {
        while let Some(segment) = self.segments.get(self.index) {
            if self.elapsed < segment.ticks {
                self.elapsed += 1;
                return (segment.intents, segment.look);
            }
            self.index += 1;
            self.elapsed = 0;
        }
        (Intents::empty(), Quat::IDENTITY)
    }
}

/// Seeded random walk: new intents and heading every `hold_ticks`.
#[derive(Debug, Clone)]
pub struct WanderInput {
    rng: ChaCha8Rng,
    hold_ticks: u32,
    remaining: u32,
    intents: Intents,
    yaw: f32,
}

impl WanderInput {
    pub fn new(seed: u64, hold_ticks: u32) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            hold_ticks: hold_ticks.max(1),
            remaining: 0,
            intents: Intents::empty(),
            yaw: 0.0,
        }
    }

    fn reroll(&mut self) {
        let mut intents = Intents::empty();
        for flag in [Intents::FORWARD, Intents::BACK, Intents::LEFT, Intents::RIGHT] {
            if self.rng.gen_bool(0.3) {
                intents.insert(flag);
            }
        }
        if self.rng.gen_bool(0.1) {
            intents.insert(Intents::JUMP);
        }
        self.intents = intents;
        self.yaw = self.rng.gen_range(0.0..std::f32::consts::TAU);
        self.remaining = self.hold_ticks;
    }
}

impl InputSource for WanderInput {
    fn capture(&mut self, _tick: Tick) -> (Intents, Quat) {
        if self.remaining == 0 {
            self.reroll();
        }
        self.remaining -= 1;
        (self.intents, Quat::from_rotation_y(self.yaw))
    }
}
