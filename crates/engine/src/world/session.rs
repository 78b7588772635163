use std::f32::consts::FRAC_1_SQRT_2;

use rand::Rng;
use tracing::{debug, info};

use super::collision::{CollisionMap, Footprint};
use super::geometry::{Direction, Vec2};
use super::interact::{nearest_interactable, InteractableZone, InteractionEvent};
use super::npc::{BehaviorTuning, StaticNpc, WanderingNpc};

pub const PLAYER_TICKS_PER_ANIM_FRAME: u32 = 8;
pub const PLAYER_WALK_FRAMES: u8 = 4;

/// Everything a session needs that does not change while it runs.
#[derive(Debug, Clone)]
pub struct SessionSetup {
    pub collision: CollisionMap,
    pub interactables: Vec<InteractableZone>,
    pub interaction_distance: f32,
    pub player_start: Vec2,
    pub player_speed: f32,
    pub static_npc: Option<StaticNpc>,
    pub wanderers: Vec<(String, Vec2)>,
    pub behavior: BehaviorTuning,
    pub heart_ticks: u32,
}

/// Input sampled for one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameInput {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    /// Edge-triggered: true only on the tick the key went down.
    pub interact_pressed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerSnapshot {
    pub position: Vec2,
    pub direction: Direction,
    pub is_moving: bool,
    pub anim_frame: u8,
}

/// Things that happened during one tick that a collaborator may react to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameEvents {
    pub interaction: Option<InteractionEvent>,
    pub heart_started: bool,
}

/// Identifies an entity taking part in depth sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKey {
    Player,
    StaticNpc,
    Wanderer(usize),
}

#[derive(Debug, Clone, Copy)]
struct PlayerState {
    position: Vec2,
    direction: Direction,
    is_moving: bool,
    anim_frame: u8,
    anim_timer: u32,
}

/// All mutable scene state, advanced one fixed tick at a time.
pub struct GameSession<R> {
    collision: CollisionMap,
    interactables: Vec<InteractableZone>,
    interaction_distance: f32,
    player_speed: f32,
    player: PlayerState,
    static_npc: Option<StaticNpc>,
    wanderers: Vec<WanderingNpc>,
    behavior: BehaviorTuning,
    heart_ticks: u32,
    heart_timer: u32,
    nearby: Option<usize>,
    active_interaction: Option<InteractionEvent>,
    foot_ys: Vec<(EntityKey, f32)>,
    tick: u64,
    rng: R,
}

impl<R: Rng> GameSession<R> {
    pub fn new(setup: SessionSetup, mut rng: R) -> Self {
        let wanderers = setup
            .wanderers
            .into_iter()
            .map(|(name, position)| WanderingNpc::new(name, position, &setup.behavior, &mut rng))
            .collect::<Vec<_>>();
        let mut session = Self {
            collision: setup.collision,
            interactables: setup.interactables,
            interaction_distance: setup.interaction_distance,
            player_speed: setup.player_speed,
            player: PlayerState {
                position: setup.player_start,
                direction: Direction::Down,
                is_moving: false,
                anim_frame: 0,
                anim_timer: 0,
            },
            static_npc: setup.static_npc,
            wanderers,
            behavior: setup.behavior,
            heart_ticks: setup.heart_ticks,
            heart_timer: 0,
            nearby: None,
            active_interaction: None,
            foot_ys: Vec::new(),
            tick: 0,
            rng,
        };
        session.nearby = session.find_nearby();
        session.refresh_foot_ys();
        session
    }

    /// Runs one fixed tick: interaction, player movement, timers, NPCs, depth keys.
    pub fn step(&mut self, input: &FrameInput) -> FrameEvents {
        self.tick = self.tick.saturating_add(1);
        let mut events = FrameEvents::default();

        if input.interact_pressed && self.active_interaction.is_none() {
            self.handle_interact(&mut events);
        }

        if self.active_interaction.is_none() {
            self.move_player(input);
            self.nearby = self.find_nearby();
        } else {
            self.player.is_moving = false;
        }

        self.heart_timer = self.heart_timer.saturating_sub(1);

        for npc in &mut self.wanderers {
            npc.tick(&self.collision, &self.behavior, &mut self.rng);
        }

        self.refresh_foot_ys();
        events
    }

    fn handle_interact(&mut self, events: &mut FrameEvents) {
        if self.player_near_static_npc() {
            self.heart_timer = self.heart_ticks;
            events.heart_started = true;
            info!(tick = self.tick, "heart_bubble_started");
            return;
        }

        let Some(zone) = self.nearby.and_then(|index| self.interactables.get(index)) else {
            return;
        };
        let event = InteractionEvent {
            kind: zone.kind,
            id: zone.id.clone(),
        };
        info!(
            tick = self.tick,
            interactable_type = %event.kind,
            interactable_id = %event.id,
            "interaction_triggered"
        );
        self.active_interaction = Some(event.clone());
        events.interaction = Some(event);
    }

    fn move_player(&mut self, input: &FrameInput) {
        let speed = self.player_speed;
        let mut dx = 0.0;
        let mut dy = 0.0;
        // Later checks override earlier ones, for both displacement and facing.
        if input.up {
            dy = -speed;
            self.player.direction = Direction::Up;
        }
        if input.down {
            dy = speed;
            self.player.direction = Direction::Down;
        }
        if input.left {
            dx = -speed;
            self.player.direction = Direction::Left;
        }
        if input.right {
            dx = speed;
            self.player.direction = Direction::Right;
        }
        if dx != 0.0 && dy != 0.0 {
            dx *= FRAC_1_SQRT_2;
            dy *= FRAC_1_SQRT_2;
        }

        self.player.is_moving = dx != 0.0 || dy != 0.0;
        if !self.player.is_moving {
            return;
        }

        self.player.position = self.collision.resolve_move(
            &Footprint::PLAYER,
            self.player.position,
            Vec2::new(dx, dy),
        );
        self.player.anim_timer = self.player.anim_timer.wrapping_add(1);
        if self.player.anim_timer % PLAYER_TICKS_PER_ANIM_FRAME == 0 {
            self.player.anim_frame = (self.player.anim_frame + 1) % PLAYER_WALK_FRAMES;
        }
    }

    fn find_nearby(&self) -> Option<usize> {
        let center = Footprint::PLAYER.center(self.player.position);
        nearest_interactable(
            &self.interactables,
            center,
            self.collision.tile_size(),
            self.interaction_distance,
        )
        .map(|(index, _)| index)
    }

    fn refresh_foot_ys(&mut self) {
        self.foot_ys.clear();
        self.foot_ys.push((
            EntityKey::Player,
            Footprint::PLAYER.foot_y(self.player.position),
        ));
        if let Some(npc) = &self.static_npc {
            self.foot_ys.push((EntityKey::StaticNpc, npc.foot_y()));
        }
        for (index, npc) in self.wanderers.iter().enumerate() {
            self.foot_ys.push((EntityKey::Wanderer(index), npc.foot_y()));
        }
    }

    /// Called by the UI collaborator once it has dismissed the interaction view.
    pub fn close_interaction(&mut self) {
        if let Some(event) = self.active_interaction.take() {
            debug!(interactable_id = %event.id, "interaction_closed");
        }
    }

    pub fn active_interaction(&self) -> Option<&InteractionEvent> {
        self.active_interaction.as_ref()
    }

    pub fn nearby_id(&self) -> Option<&str> {
        self.nearby_zone().map(|zone| zone.id.as_str())
    }

    pub fn nearby_zone(&self) -> Option<&InteractableZone> {
        self.nearby.and_then(|index| self.interactables.get(index))
    }

    pub fn player(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            position: self.player.position,
            direction: self.player.direction,
            is_moving: self.player.is_moving,
            anim_frame: self.player.anim_frame,
        }
    }

    pub fn player_near_static_npc(&self) -> bool {
        self.static_npc
            .as_ref()
            .is_some_and(|npc| npc.is_near(self.player.position, &Footprint::PLAYER))
    }

    /// Fade progress of the heart cue in `[0, 1)`, or `None` when it is not showing.
    pub fn heart_progress(&self) -> Option<f32> {
        if self.heart_timer == 0 || self.heart_ticks == 0 {
            return None;
        }
        Some(1.0 - self.heart_timer as f32 / self.heart_ticks as f32)
    }

    pub fn static_npc(&self) -> Option<&StaticNpc> {
        self.static_npc.as_ref()
    }

    pub fn wanderers(&self) -> &[WanderingNpc] {
        &self.wanderers
    }

    pub fn interactables(&self) -> &[InteractableZone] {
        &self.interactables
    }

    /// Depth keys recomputed at the end of the last tick.
    pub fn foot_ys(&self) -> &[(EntityKey, f32)] {
        &self.foot_ys
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn tile_size(&self) -> u32 {
        self.collision.tile_size()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::world::collision::WalkableGrid;
    use crate::world::interact::InteractableType;

    fn open_grid() -> WalkableGrid {
        let mut rows = vec!["0000000000".to_string()];
        for _ in 0..8 {
            rows.push("0111111110".to_string());
        }
        rows.push("0000000000".to_string());
        WalkableGrid::from_rows(&rows).expect("grid")
    }

    fn setup() -> SessionSetup {
        SessionSetup {
            collision: CollisionMap::new(open_grid(), 16),
            interactables: vec![InteractableZone {
                id: "diary".to_string(),
                kind: InteractableType::Book,
                x: 1,
                y: 1,
                width: 2,
                height: 1,
                label: "Diary".to_string(),
            }],
            interaction_distance: 24.0,
            player_start: Vec2::new(64.0, 64.0),
            player_speed: 1.5,
            static_npc: None,
            wanderers: vec![("bwcat".to_string(), Vec2::new(100.0, 100.0))],
            behavior: BehaviorTuning::default(),
            heart_ticks: 180,
        }
    }

    fn session(setup: SessionSetup) -> GameSession<ChaCha8Rng> {
        GameSession::new(setup, ChaCha8Rng::seed_from_u64(9))
    }

    #[test]
    fn diagonal_speed_is_normalized() {
        let mut game = session(setup());
        let start = game.player().position;
        game.step(&FrameInput {
            down: true,
            right: true,
            ..FrameInput::default()
        });
        let moved = game.player().position;
        let travelled = start.distance(moved);
        assert!((travelled - 1.5).abs() < 1e-4, "travelled={travelled}");
        assert_eq!(game.player().direction, Direction::Right);
        assert!(game.player().is_moving);
    }

    #[test]
    fn opposite_keys_resolve_to_later_axis_check() {
        let mut game = session(setup());
        let start = game.player().position;
        game.step(&FrameInput {
            up: true,
            down: true,
            ..FrameInput::default()
        });
        assert_eq!(game.player().position, Vec2::new(start.x, start.y + 1.5));
        assert_eq!(game.player().direction, Direction::Down);
    }

    #[test]
    fn walk_animation_steps_every_eight_moving_ticks() {
        let mut game = session(setup());
        let input = FrameInput {
            right: true,
            ..FrameInput::default()
        };
        for _ in 0..7 {
            game.step(&input);
        }
        assert_eq!(game.player().anim_frame, 0);
        game.step(&input);
        assert_eq!(game.player().anim_frame, 1);
    }

    #[test]
    fn interact_near_zone_raises_event_and_freezes_movement() {
        let mut setup = setup();
        setup.player_start = Vec2::new(20.0, 20.0);
        let mut game = session(setup);
        assert_eq!(game.nearby_id(), Some("diary"));

        let events = game.step(&FrameInput {
            interact_pressed: true,
            ..FrameInput::default()
        });
        assert_eq!(
            events.interaction,
            Some(InteractionEvent {
                kind: InteractableType::Book,
                id: "diary".to_string()
            })
        );
        assert!(game.active_interaction().is_some());

        let before = game.player().position;
        let events = game.step(&FrameInput {
            right: true,
            interact_pressed: true,
            ..FrameInput::default()
        });
        assert_eq!(events, FrameEvents::default());
        assert_eq!(game.player().position, before);

        game.close_interaction();
        game.step(&FrameInput {
            right: true,
            ..FrameInput::default()
        });
        assert_ne!(game.player().position, before);
    }

    #[test]
    fn interact_away_from_everything_does_nothing() {
        let mut setup = setup();
        setup.player_start = Vec2::new(100.0, 40.0);
        let mut game = session(setup);
        assert_eq!(game.nearby_id(), None);
        let events = game.step(&FrameInput {
            interact_pressed: true,
            ..FrameInput::default()
        });
        assert_eq!(events, FrameEvents::default());
    }

    #[test]
    fn static_npc_takes_priority_and_starts_heart_cue() {
        let mut setup = setup();
        setup.player_start = Vec2::new(20.0, 20.0);
        setup.static_npc = Some(StaticNpc::at_tile(
            "man",
            2,
            2,
            16,
            Footprint::PLAYER,
            48.0,
        ));
        let mut game = session(setup);
        assert!(game.player_near_static_npc());

        let events = game.step(&FrameInput {
            interact_pressed: true,
            ..FrameInput::default()
        });
        assert!(events.heart_started);
        assert!(events.interaction.is_none());
        let progress = game.heart_progress().expect("heart showing");
        assert!((progress - 1.0 / 180.0).abs() < 1e-6);

        for _ in 0..179 {
            game.step(&FrameInput::default());
        }
        assert!(game.heart_progress().is_none());
    }

    #[test]
    fn foot_ys_cover_every_entity() {
        let game = session(setup());
        let keys = game.foot_ys().iter().map(|(key, _)| *key).collect::<Vec<_>>();
        assert_eq!(keys, vec![EntityKey::Player, EntityKey::Wanderer(0)]);
        assert_eq!(game.foot_ys()[0].1, 64.0 + 28.0);
        assert_eq!(game.foot_ys()[1].1, 100.0 + 20.0);
    }
}
