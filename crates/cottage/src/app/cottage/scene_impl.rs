use std::time::Duration;

use engine::{GameSession, InputSnapshot, PixelBuffer, Scene, SceneCommand, SceneView};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use super::ui_bridge::UiBridge;

pub(crate) struct CottageScene {
    session: GameSession<ChaCha8Rng>,
    view: SceneView,
    ui: UiBridge,
}

impl CottageScene {
    pub(crate) fn new(session: GameSession<ChaCha8Rng>, view: SceneView) -> Self {
        Self {
            session,
            view,
            ui: UiBridge::default(),
        }
    }
}

impl Scene for CottageScene {
    fn canvas_size(&self) -> (u32, u32) {
        self.view.canvas_size()
    }

    fn load(&mut self) {
        self.ui.track_nearby(self.session.nearby_id());
        info!(
            interactables = self.session.interactables().len(),
            wanderers = self.session.wanderers().len(),
            has_static_npc = self.session.static_npc().is_some(),
            "cottage_scene_loaded"
        );
    }

    fn update(&mut self, _fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        if input.quit_requested() {
            return SceneCommand::Quit;
        }

        let mut frame_input = input.frame_input();
        // The same press that dismisses a view must not reopen it.
        if frame_input.interact_pressed && self.ui.close().is_some() {
            self.session.close_interaction();
            frame_input.interact_pressed = false;
        }

        let events = self.session.step(&frame_input);
        if let Some(event) = events.interaction {
            self.ui.open(event);
        }
        if events.heart_started {
            debug!(tick = self.session.tick_count(), "heart_cue_shown");
        }
        self.ui.track_nearby(self.session.nearby_id());
        SceneCommand::None
    }

    fn render(&mut self, canvas: &mut PixelBuffer, elapsed: Duration) {
        self.view
            .render(canvas, &self.session, elapsed.as_secs_f64() * 1000.0);
    }

    fn unload(&mut self) {
        info!(
            ticks = self.session.tick_count(),
            views_opened = self.ui.opened_count(),
            "cottage_scene_unloaded"
        );
    }

    fn debug_title(&self) -> Option<String> {
        let view = self
            .ui
            .open_view()
            .map(|event| format!("{}:{}", event.kind, event.id))
            .unwrap_or_else(|| "-".to_string());
        Some(format!(
            "Cottage | view {view} | nearby {}",
            self.ui.nearby_id().unwrap_or("-")
        ))
    }
}

#[cfg(test)]
mod tests {
    use engine::world::{
        BehaviorTuning, CollisionMap, InteractableType, InteractableZone, SessionSetup, Vec2,
        WalkableGrid,
    };
    use engine::{InputAction, SceneImages};
    use rand::SeedableRng;

    use super::*;

    fn scene_at(player_start: Vec2) -> CottageScene {
        let grid = WalkableGrid::from_rows(&["11111111"; 8]).expect("grid");
        let session = GameSession::new(
            SessionSetup {
                collision: CollisionMap::new(grid, 16),
                interactables: vec![InteractableZone {
                    id: "book_1".to_string(),
                    kind: InteractableType::Book,
                    x: 2,
                    y: 2,
                    width: 1,
                    height: 1,
                    label: "Book".to_string(),
                }],
                interaction_distance: 24.0,
                player_start,
                player_speed: 1.5,
                static_npc: None,
                wanderers: Vec::new(),
                behavior: BehaviorTuning::default(),
                heart_ticks: 180,
            },
            ChaCha8Rng::seed_from_u64(3),
        );
        let view = SceneView::new(SceneImages::default(), 128, 128, 16, [0, 0, 0, 255]);
        CottageScene::new(session, view)
    }

    fn press() -> InputSnapshot {
        InputSnapshot::empty().with_interact_pressed(true)
    }

    #[test]
    fn interact_opens_view_and_next_press_closes_it() {
        let mut scene = scene_at(Vec2::new(32.0, 40.0));
        scene.load();
        assert_eq!(scene.ui.nearby_id(), Some("book_1"));

        assert_eq!(scene.update(1.0 / 60.0, &press()), SceneCommand::None);
        let opened = scene.ui.open_view().expect("view opened");
        assert_eq!(opened.kind, InteractableType::Book);
        assert!(scene.session.active_interaction().is_some());

        scene.update(1.0 / 60.0, &press());
        assert!(scene.ui.open_view().is_none());
        assert!(scene.session.active_interaction().is_none());
        assert_eq!(scene.ui.opened_count(), 1);
    }

    #[test]
    fn movement_is_frozen_while_a_view_is_open() {
        let mut scene = scene_at(Vec2::new(32.0, 40.0));
        scene.update(1.0 / 60.0, &press());
        let before = scene.session.player().position;

        let walk = InputSnapshot::empty().with_action_down(InputAction::MoveRight, true);
        scene.update(1.0 / 60.0, &walk);
        assert_eq!(scene.session.player().position, before);
        assert!(!scene.session.player().is_moving);
    }

    #[test]
    fn renders_without_images_and_reports_title() {
        let mut scene = scene_at(Vec2::new(32.0, 40.0));
        assert_eq!(scene.canvas_size(), (128, 128));
        assert_eq!(
            scene.update(1.0 / 60.0, &InputSnapshot::empty()),
            SceneCommand::None
        );
        assert!(scene
            .debug_title()
            .is_some_and(|title| title.contains("view -")));

        let mut canvas = PixelBuffer::transparent(128, 128);
        scene.render(&mut canvas, Duration::from_millis(16));
        assert_eq!(canvas.pixel(0, 0).map(|pixel| pixel[3]), Some(255));
    }
}
