mod collision;
mod geometry;
mod interact;
mod npc;
mod session;

pub use collision::{CollisionMap, Footprint, WalkableGrid, WalkableGridError};
pub use geometry::{Direction, PixelRect, Vec2};
pub use interact::{nearest_interactable, InteractableType, InteractableZone, InteractionEvent};
pub use npc::{BehaviorTuning, NpcState, StaticNpc, TickRange, WanderingNpc};
pub use session::{
    EntityKey, FrameEvents, FrameInput, GameSession, PlayerSnapshot, SessionSetup,
    PLAYER_TICKS_PER_ANIM_FRAME, PLAYER_WALK_FRAMES,
};
