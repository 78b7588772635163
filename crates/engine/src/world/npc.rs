use rand::Rng;
use serde::{Deserialize, Serialize};

use super::collision::{CollisionMap, Footprint};
use super::geometry::{Direction, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NpcState {
    Idle,
    Walking,
    Sleeping,
}

/// Half-open tick range `[min, max)`; a degenerate range always yields `min`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TickRange {
    pub min: u32,
    pub max: u32,
}

impl TickRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u32 {
        if self.max <= self.min {
            return self.min;
        }
        rng.random_range(self.min..self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct BehaviorTuning {
    /// Probability that an expired idle period starts a walk.
    pub walk_chance: f32,
    /// Probability band right after `walk_chance` that starts a nap.
    pub sleep_chance: f32,
    pub idle_ticks: TickRange,
    pub walk_ticks: TickRange,
    pub sleep_ticks: TickRange,
    pub speed: f32,
    pub ticks_per_anim_frame: u32,
    pub walk_anim_frames: u8,
}

impl Default for BehaviorTuning {
    fn default() -> Self {
        Self {
            walk_chance: 0.6,
            sleep_chance: 0.05,
            idle_ticks: TickRange::new(120, 360),
            walk_ticks: TickRange::new(60, 240),
            sleep_ticks: TickRange::new(300, 900),
            speed: 0.5,
            ticks_per_anim_frame: 10,
            walk_anim_frames: 4,
        }
    }
}

/// An autonomous wanderer that idles, strolls in a straight cardinal line and naps.
#[derive(Debug, Clone)]
pub struct WanderingNpc {
    name: String,
    position: Vec2,
    direction: Direction,
    state: NpcState,
    state_timer: i64,
    anim_frame: u8,
    anim_timer: u32,
}

impl WanderingNpc {
    pub fn new<R: Rng + ?Sized>(
        name: impl Into<String>,
        position: Vec2,
        tuning: &BehaviorTuning,
        rng: &mut R,
    ) -> Self {
        Self {
            name: name.into(),
            position,
            direction: Direction::Down,
            state: NpcState::Idle,
            state_timer: i64::from(tuning.idle_ticks.sample(rng)),
            anim_frame: 0,
            anim_timer: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn state(&self) -> NpcState {
        self.state
    }

    pub fn anim_frame(&self) -> u8 {
        self.anim_frame
    }

    pub fn remaining_ticks(&self) -> i64 {
        self.state_timer
    }

    pub fn foot_y(&self) -> f32 {
        Footprint::WANDERER.foot_y(self.position)
    }

    /// Advances one fixed tick. The timer is decremented before any state check.
    pub fn tick<R: Rng + ?Sized>(
        &mut self,
        collision: &CollisionMap,
        tuning: &BehaviorTuning,
        rng: &mut R,
    ) {
        self.state_timer -= 1;

        match self.state {
            NpcState::Idle => {
                if self.state_timer > 0 {
                    return;
                }
                let roll = rng.random::<f32>();
                if roll < tuning.walk_chance {
                    self.start_walking(tuning, rng);
                } else if roll < tuning.walk_chance + tuning.sleep_chance {
                    self.state = NpcState::Sleeping;
                    self.direction = Direction::Down;
                    self.state_timer = i64::from(tuning.sleep_ticks.sample(rng));
                } else {
                    self.state_timer = i64::from(tuning.idle_ticks.sample(rng));
                }
            }
            NpcState::Walking => {
                let target = self.position + self.direction.unit() * tuning.speed;
                if collision.is_blocked(&Footprint::WANDERER, target) {
                    self.enter_idle(tuning, rng);
                    return;
                }
                self.position = target;

                self.anim_timer += 1;
                if tuning.ticks_per_anim_frame > 0
                    && self.anim_timer % tuning.ticks_per_anim_frame == 0
                {
                    self.anim_frame = (self.anim_frame + 1) % tuning.walk_anim_frames.max(1);
                }

                if self.state_timer <= 0 {
                    self.enter_idle(tuning, rng);
                    self.anim_frame = 0;
                }
            }
            NpcState::Sleeping => {
                if self.state_timer <= 0 {
                    self.enter_idle(tuning, rng);
                }
            }
        }
    }

    fn start_walking<R: Rng + ?Sized>(&mut self, tuning: &BehaviorTuning, rng: &mut R) {
        self.state = NpcState::Walking;
        self.direction = Direction::ALL[rng.random_range(0..Direction::ALL.len())];
        self.state_timer = i64::from(tuning.walk_ticks.sample(rng));
        self.anim_frame = 0;
        self.anim_timer = 0;
    }

    fn enter_idle<R: Rng + ?Sized>(&mut self, tuning: &BehaviorTuning, rng: &mut R) {
        self.state = NpcState::Idle;
        self.state_timer = i64::from(tuning.idle_ticks.sample(rng));
    }

    #[cfg(test)]
    pub(crate) fn force_walking(&mut self, direction: Direction, ticks: i64) {
        self.state = NpcState::Walking;
        self.direction = direction;
        self.state_timer = ticks;
    }
}

/// A character that never moves. Its box is placed so the feet sit centred on
/// the bottom edge of `tile`.
#[derive(Debug, Clone)]
pub struct StaticNpc {
    name: String,
    position: Vec2,
    footprint: Footprint,
    proximity: f32,
}

impl StaticNpc {
    pub fn at_tile(
        name: impl Into<String>,
        tile_col: u32,
        tile_row: u32,
        tile_size: u32,
        footprint: Footprint,
        proximity: f32,
    ) -> Self {
        let tile = tile_size as f32;
        let foot_x = tile_col as f32 * tile + tile / 2.0;
        let foot_y = (tile_row + 1) as f32 * tile;
        Self {
            name: name.into(),
            position: Vec2::new(foot_x - footprint.size / 2.0, foot_y - footprint.size),
            footprint,
            proximity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn footprint(&self) -> Footprint {
        self.footprint
    }

    pub fn foot_y(&self) -> f32 {
        self.footprint.foot_y(self.position)
    }

    /// Centre-to-centre distance test against another entity's box.
    pub fn is_near(&self, other_position: Vec2, other_footprint: &Footprint) -> bool {
        let mine = self.footprint.center(self.position);
        let theirs = other_footprint.center(other_position);
        mine.distance(theirs) < self.proximity
    }
}
