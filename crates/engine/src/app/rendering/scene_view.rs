use std::path::Path;

use rand::Rng;
use tracing::info;

use super::depth_sort::{plan_draw_order, DrawOp, ForegroundStrips};
use super::hud::{apply_ambient_light, draw_heart_bubble, draw_highlight, draw_prompt_bubble};
use super::sprites::{
    cat_sheet_row, draw_image_scaled, draw_region_scaled, load_images, player_sheet_row,
    DestRect, ImageRequest, CAT_SHEET, CAT_WALK_SEQUENCE, PLAYER_SHEET, PLAYER_WALK_SEQUENCE,
};
use crate::asset_keys::asset_path;
use crate::bake::{baked_dir, CompositeTarget};
use crate::config::SceneConfig;
use crate::tiles::PixelBuffer;
use crate::world::{EntityKey, Footprint, GameSession, NpcState, StaticNpc, Vec2, WanderingNpc};

const PLAYER_DRAW_WIDTH: u32 = 38;
const PLAYER_DRAW_HEIGHT: u32 = 52;
const PLAYER_PLACEHOLDER_COLOR: [u8; 4] = [255, 143, 171, 255];
const STATIC_NPC_DRAW_WIDTH: u32 = 26;
const STATIC_NPC_DRAW_HEIGHT: u32 = 52;
const CAT_DRAW_SIZE: u32 = 26;
const PROMPT_LIFT: f32 = 10.0;
const HEART_LIFT: f32 = 6.0;
const STATIC_NPC_PROMPT_LABEL: &str = "Say hi";

/// Every image the runtime draws. Absent entries are simply not drawn, except
/// the background, which falls back to a solid fill.
#[derive(Debug, Clone, Default)]
pub struct SceneImages {
    pub background: Option<PixelBuffer>,
    pub foreground: Option<PixelBuffer>,
    pub frame: Option<PixelBuffer>,
    pub player: Option<PixelBuffer>,
    pub static_npc: Option<PixelBuffer>,
    pub wanderers: Vec<Option<PixelBuffer>>,
}

impl SceneImages {
    /// Loads baked layers and sprite sheets concurrently.
    pub fn load(assets_dir: &Path, config: &SceneConfig) -> Self {
        let baked = baked_dir(assets_dir, &config.bake);
        let mut requests = CompositeTarget::ALL
            .iter()
            .map(|target| ImageRequest {
                label: target.as_str().to_string(),
                path: baked.join(target.file_name()),
            })
            .collect::<Vec<_>>();
        let sprite = |label: &str, key: &str| ImageRequest {
            label: label.to_string(),
            path: asset_path(assets_dir, key, "png"),
        };
        requests.push(sprite("player", &config.player.sprite));
        let has_static_npc = config.static_npc.is_some();
        if let Some(npc) = &config.static_npc {
            requests.push(sprite(&npc.name, &npc.sprite));
        }
        requests.extend(
            config
                .wanderers
                .iter()
                .map(|wanderer| sprite(&wanderer.name, &wanderer.sprite)),
        );

        let mut loaded = load_images(&requests).into_iter();
        let mut next = || loaded.next().flatten();
        let images = Self {
            background: next(),
            foreground: next(),
            frame: next(),
            player: next(),
            static_npc: if has_static_npc { next() } else { None },
            wanderers: config.wanderers.iter().map(|_| next()).collect(),
        };
        info!(
            requested = requests.len(),
            background = images.background.is_some(),
            foreground = images.foreground.is_some(),
            frame = images.frame.is_some(),
            player = images.player.is_some(),
            "scene_images_loaded"
        );
        images
    }
}

/// Draws a [`GameSession`] in layer order: background, depth-sorted foreground
/// strips and entities, frame overlay, then the interaction cues and lighting.
#[derive(Debug, Clone)]
pub struct SceneView {
    width: u32,
    height: u32,
    tile_size: u32,
    background: Option<PixelBuffer>,
    background_fill: [u8; 4],
    strips: ForegroundStrips,
    present_rows: Vec<bool>,
    frame: Option<PixelBuffer>,
    player: Option<PixelBuffer>,
    static_npc: Option<PixelBuffer>,
    wanderers: Vec<Option<PixelBuffer>>,
}

impl SceneView {
    pub fn new(
        images: SceneImages,
        width: u32,
        height: u32,
        tile_size: u32,
        background_fill: [u8; 4],
    ) -> Self {
        let strips = images
            .foreground
            .as_ref()
            .map(|foreground| ForegroundStrips::slice(foreground, tile_size))
            .unwrap_or_default();
        info!(
            rows = strips.row_count(),
            non_empty_rows = strips.non_empty_count(),
            "foreground_rows_sliced"
        );
        let present_rows = strips.present_rows();
        Self {
            width,
            height,
            tile_size,
            background: images.background,
            background_fill,
            strips,
            present_rows,
            frame: images.frame,
            player: images.player,
            static_npc: images.static_npc,
            wanderers: images.wanderers,
        }
    }

    pub fn canvas_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn render<R: Rng>(
        &self,
        canvas: &mut PixelBuffer,
        session: &GameSession<R>,
        elapsed_ms: f64,
    ) {
        let painted = self
            .background
            .as_ref()
            .is_some_and(|background| canvas.copy_from(background));
        if !painted {
            canvas.fill(self.background_fill);
        }

        for op in plan_draw_order(session.foot_ys(), &self.present_rows, self.tile_size) {
            match op {
                DrawOp::Entity(key) => self.draw_entity(canvas, session, key),
                DrawOp::Strip(row) => {
                    if let Some(strip) = self.strips.strip(row) {
                        canvas.draw_image(strip, 0, i64::from(row * self.tile_size));
                    }
                }
            }
        }

        if let Some(frame) = &self.frame {
            canvas.draw_image(frame, 0, 0);
        }

        self.draw_cues(canvas, session, elapsed_ms);
        apply_ambient_light(canvas);
    }

    fn draw_cues<R: Rng>(
        &self,
        canvas: &mut PixelBuffer,
        session: &GameSession<R>,
        elapsed_ms: f64,
    ) {
        let tile_size = session.tile_size();
        if let Some(zone) = session.nearby_zone() {
            draw_highlight(canvas, zone.pixel_rect(tile_size), elapsed_ms);
        }

        let player = session.player();
        let player_center = Footprint::PLAYER.center(player.position);
        let modal_open = session.active_interaction().is_some();
        let heart = session.heart_progress();

        if !modal_open {
            if let Some(zone) = session.nearby_zone() {
                draw_prompt_bubble(
                    canvas,
                    player_center.x,
                    player.position.y - PROMPT_LIFT,
                    &zone.label,
                    elapsed_ms,
                );
            }
            if heart.is_none() && session.player_near_static_npc() {
                draw_prompt_bubble(
                    canvas,
                    player_center.x,
                    player.position.y - PROMPT_LIFT,
                    STATIC_NPC_PROMPT_LABEL,
                    elapsed_ms,
                );
            }
        }

        if let (Some(progress), Some(npc)) = (heart, session.static_npc()) {
            draw_heart_bubble(
                canvas,
                player_center.x,
                player.position.y - HEART_LIFT,
                elapsed_ms,
                progress,
            );
            let npc_center = npc.footprint().center(npc.position());
            draw_heart_bubble(
                canvas,
                npc_center.x,
                npc.position().y - HEART_LIFT,
                elapsed_ms,
                progress,
            );
        }
    }

    fn draw_entity<R: Rng>(
        &self,
        canvas: &mut PixelBuffer,
        session: &GameSession<R>,
        key: EntityKey,
    ) {
        match key {
            EntityKey::Player => self.draw_player(canvas, session),
            EntityKey::StaticNpc => {
                if let (Some(npc), Some(sprite)) = (session.static_npc(), &self.static_npc) {
                    draw_static_npc(canvas, npc, sprite);
                }
            }
            EntityKey::Wanderer(index) => {
                let sheet = self.wanderers.get(index).and_then(Option::as_ref);
                if let (Some(npc), Some(sheet)) = (session.wanderers().get(index), sheet) {
                    draw_wanderer(canvas, npc, sheet);
                }
            }
        }
    }

    fn draw_player<R: Rng>(&self, canvas: &mut PixelBuffer, session: &GameSession<R>) {
        let player = session.player();
        let center = Footprint::PLAYER.center(player.position);
        let Some(sheet) = &self.player else {
            fill_disc(canvas, center, Footprint::PLAYER.size / 2.0, PLAYER_PLACEHOLDER_COLOR);
            return;
        };
        let column = if player.is_moving {
            PLAYER_WALK_SEQUENCE[usize::from(player.anim_frame) % PLAYER_WALK_SEQUENCE.len()]
        } else {
            0
        };
        draw_region_scaled(
            canvas,
            sheet,
            PLAYER_SHEET.frame(column, player_sheet_row(player.direction)),
            centered(center, PLAYER_DRAW_WIDTH, PLAYER_DRAW_HEIGHT),
        );
    }
}

fn centered(center: Vec2, width: u32, height: u32) -> DestRect {
    DestRect {
        x: center.x - width as f32 / 2.0,
        y: center.y - height as f32 / 2.0,
        width,
        height,
    }
}

fn draw_static_npc(canvas: &mut PixelBuffer, npc: &StaticNpc, sprite: &PixelBuffer) {
    let center = npc.footprint().center(npc.position());
    draw_image_scaled(
        canvas,
        sprite,
        centered(center, STATIC_NPC_DRAW_WIDTH, STATIC_NPC_DRAW_HEIGHT),
    );
}

fn draw_wanderer(canvas: &mut PixelBuffer, npc: &WanderingNpc, sheet: &PixelBuffer) {
    let column = if npc.state() == NpcState::Walking {
        CAT_WALK_SEQUENCE[usize::from(npc.anim_frame()) % CAT_WALK_SEQUENCE.len()]
    } else {
        0
    };
    let center = Footprint::WANDERER.center(npc.position());
    draw_region_scaled(
        canvas,
        sheet,
        CAT_SHEET.frame(column, cat_sheet_row(npc.direction())),
        centered(center, CAT_DRAW_SIZE, CAT_DRAW_SIZE),
    );
}

fn fill_disc(canvas: &mut PixelBuffer, center: Vec2, radius: f32, color: [u8; 4]) {
    let min_x = (center.x - radius).floor() as i64;
    let max_x = (center.x + radius).ceil() as i64;
    let min_y = (center.y - radius).floor() as i64;
    let max_y = (center.y + radius).ceil() as i64;
    for y in min_y..max_y {
        for x in min_x..max_x {
            let dx = x as f32 + 0.5 - center.x;
            let dy = y as f32 + 0.5 - center.y;
            if dx * dx + dy * dy <= radius * radius {
                canvas.blend_pixel(x, y, color);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::world::{BehaviorTuning, CollisionMap, SessionSetup, WalkableGrid};

    fn session(player_start: Vec2) -> GameSession<ChaCha8Rng> {
        let grid = WalkableGrid::from_rows(&["1111", "1111", "1111", "1111"]).expect("grid");
        GameSession::new(
            SessionSetup {
                collision: CollisionMap::new(grid, 16),
                interactables: Vec::new(),
                interaction_distance: 24.0,
                player_start,
                player_speed: 1.5,
                static_npc: None,
                wanderers: Vec::new(),
                behavior: BehaviorTuning::default(),
                heart_ticks: 180,
            },
            ChaCha8Rng::seed_from_u64(7),
        )
    }

    #[test]
    fn missing_background_uses_fill_and_missing_player_draws_placeholder() {
        let view = SceneView::new(SceneImages::default(), 64, 64, 16, [5, 3, 3, 255]);
        let mut canvas = PixelBuffer::transparent(64, 64);
        view.render(&mut canvas, &session(Vec2::new(10.0, 10.0)), 0.0);

        // Player box centre is (24, 24); a far corner only sees fill and lighting.
        let centre = canvas.pixel(24, 24).expect("centre");
        assert!(centre[0] > 200 && centre[2] > 120);
        let corner = canvas.pixel(63, 63).expect("corner");
        assert!(corner[0] < 20);
    }

    #[test]
    fn foreground_row_covers_a_player_standing_above_it() {
        let mut foreground = PixelBuffer::transparent(64, 64);
        for x in 0..64 {
            for y in 16..32 {
                foreground.set_pixel(x, y, [0, 0, 255, 255]);
            }
        }
        let images = SceneImages {
            foreground: Some(foreground),
            ..SceneImages::default()
        };
        let view = SceneView::new(images, 64, 64, 16, [0, 0, 0, 255]);

        // Feet at y = 30 lie inside row 1, so the row 1 strip paints over the body.
        let mut canvas = PixelBuffer::transparent(64, 64);
        view.render(&mut canvas, &session(Vec2::new(10.0, 2.0)), 0.0);
        let covered = canvas.pixel(24, 20).expect("pixel");
        assert!(covered[2] > 200 && covered[0] < 30);

        // Feet at y = 40 are below row 1, so the body is drawn over the strip.
        let mut canvas = PixelBuffer::transparent(64, 64);
        view.render(&mut canvas, &session(Vec2::new(10.0, 12.0)), 0.0);
        let in_front = canvas.pixel(24, 26).expect("pixel");
        assert!(in_front[0] > 200);
    }

    #[test]
    fn frame_overlay_covers_an_entity_drawn_after_every_strip() {
        let mut foreground = PixelBuffer::transparent(64, 64);
        for x in 0..64 {
            for y in 16..32 {
                foreground.set_pixel(x, y, [0, 0, 255, 255]);
            }
        }
        let mut frame = PixelBuffer::transparent(64, 64);
        for x in 20..28 {
            for y in 44..52 {
                frame.set_pixel(x, y, [0, 255, 0, 255]);
            }
        }
        let player = session(Vec2::new(10.0, 34.0));
        assert_eq!(player.player().position.y + Footprint::PLAYER.size, 62.0);

        let without_frame = SceneView::new(
            SceneImages {
                foreground: Some(foreground.clone()),
                ..SceneImages::default()
            },
            64,
            64,
            16,
            [0, 0, 0, 255],
        );
        let mut canvas = PixelBuffer::transparent(64, 64);
        without_frame.render(&mut canvas, &player, 0.0);
        assert!(canvas.pixel(24, 48).expect("pixel")[0] > 200);

        let with_frame = SceneView::new(
            SceneImages {
                foreground: Some(foreground),
                frame: Some(frame),
                ..SceneImages::default()
            },
            64,
            64,
            16,
            [0, 0, 0, 255],
        );
        let mut canvas = PixelBuffer::transparent(64, 64);
        with_frame.render(&mut canvas, &player, 0.0);
        let covered = canvas.pixel(24, 48).expect("pixel");
        assert!(covered[1] > 200 && covered[0] < 40);
    }
}
