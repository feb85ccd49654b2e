mod config;
mod motion;
mod sheet;

use std::path::PathBuf;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowId;

use websprite_engine::core::{App, AppControl, FrameCtx};
use websprite_engine::device::GpuInit;
use websprite_engine::logging::{init_logging, LoggingConfig};
use websprite_engine::render::{sprite_schema, Atlas, SpriteRenderer};
use websprite_engine::soa::{ColumnarBuffer, Row};
use websprite_engine::time::{FpsMeter, FrameTime};
use websprite_engine::window::{Runtime, RuntimeConfig};

use config::{DemoConfig, Motion};
use motion::{spiral_position, Mover};

const DEFAULT_CONFIG: &str = "websprite.json";

const CLEAR: wgpu::Color = wgpu::Color {
    r: 0.05,
    g: 0.05,
    b: 0.07,
    a: 1.0,
};

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let config = DemoConfig::load(&path)?;

    let demo = SpriteDemo::new(config)?;
    let gpu_init = GpuInit {
        vertex_buffers: demo.renderer.layout().len() as u32 + 1,
        ..GpuInit::default()
    };
    log::info!(
        "{} sprites, capacity {} ({} bytes)",
        demo.buffer.len(),
        demo.buffer.capacity(),
        demo.buffer.byte_len()
    );

    Runtime::run(
        RuntimeConfig {
            title: "websprite".to_string(),
            initial_size: LogicalSize::new(1280.0, 720.0),
        },
        gpu_init,
        demo,
    )
}

struct SpriteDemo {
    config: DemoConfig,
    buffer: ColumnarBuffer,
    movers: Vec<Mover>,
    renderer: SpriteRenderer,
    atlas: Option<Atlas>,
    fps: FpsMeter,
    rng: StdRng,
}

impl SpriteDemo {
    fn new(config: DemoConfig) -> Result<Self> {
        let mut buffer = ColumnarBuffer::new(sprite_schema()?, config.initial_capacity)?;

        // One sprite per atlas tile; positions are assigned once the frame size is known.
        let size = config.sprite_size();
        let tile = [config.tile_w as f32, config.tile_h as f32];
        for [sx, sy] in sheet::tile_origins(config.atlas_w, config.atlas_h, config.tile_w, config.tile_h) {
            let row = Row::new()
                .with("dest", [0.0f32, 0.0, 0.0])
                .with("dest_size", size)
                .with("src", [sx as f32, sy as f32])
                .with("src_size", tile);
            buffer.push_row(&row)?;
        }

        let mut renderer = SpriteRenderer::new(buffer.fields())?;
        renderer.set_frame_depth(config.frame_depth);

        Ok(Self {
            config,
            buffer,
            movers: Vec::new(),
            renderer,
            atlas: None,
            fps: FpsMeter::default(),
            rng: StdRng::from_entropy(),
        })
    }

    fn load_atlas(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Result<Atlas> {
        if let Some(path) = &self.config.atlas {
            match Atlas::load(device, queue, path) {
                Ok(atlas) => return Ok(atlas),
                Err(e) => log::warn!("{e:#}; falling back to generated atlas"),
            }
        }

        let c = &self.config;
        let image = sheet::checker_atlas(c.atlas_w, c.atlas_h, c.tile_w, c.tile_h);
        Atlas::from_rgba(device, queue, &image).context("generated atlas rejected")
    }

    fn animate(&mut self, frame: [f32; 2], time: FrameTime) -> Result<()> {
        let size = self.config.sprite_size();

        match self.config.motion {
            Motion::Bounce => {
                if self.movers.len() != self.buffer.len() {
                    let (rng, max_speed) = (&mut self.rng, self.config.max_speed);
                    self.movers = (0..self.buffer.len())
                        .map(|_| Mover::random(&mut *rng, frame, size, max_speed))
                        .collect();
                }

                let dest = self.buffer.column_mut::<f32>("dest")?;
                for (mover, xyz) in self.movers.iter_mut().zip(dest.chunks_exact_mut(3)) {
                    mover.step(time.dt, frame, size);
                    let [x, y] = mover.pixel();
                    xyz[0] = x;
                    xyz[1] = y;
                }
            }

            Motion::Spiral => {
                let count = self.buffer.len();
                let mut row = Row::with_capacity(1);
                for i in 0..count {
                    let [x, y] = spiral_position(i, count, time.elapsed, frame, size);
                    row.insert("dest", [x, y, 0.0]);
                    self.buffer.patch_row(i, &row)?;
                }
            }
        }

        Ok(())
    }
}

impl App for SpriteDemo {
    fn on_window_event(&mut self, _window_id: WindowId, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape) =>
            {
                AppControl::Exit
            }
            _ => AppControl::Continue,
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> Result<AppControl> {
        if self.atlas.is_none() {
            self.atlas = Some(self.load_atlas(ctx.gpu.device(), ctx.gpu.queue())?);
        }

        let viewport = ctx.viewport();
        if !viewport.is_valid() {
            return Ok(AppControl::Continue);
        }

        // ── simulate ──────────────────────────────────────────────────────
        self.animate(viewport.size(), ctx.time)?;

        if let Some(fps) = self.fps.record(ctx.time.dt) {
            log::info!("{fps:.2} fps, {} sprites", self.buffer.len());
        }

        // ── upload + draw ─────────────────────────────────────────────────
        let Some(atlas) = self.atlas.as_ref() else {
            return Ok(AppControl::Continue);
        };
        let renderer = &mut self.renderer;
        let buffer = &self.buffer;

        ctx.render(CLEAR, |rctx, target| renderer.render(rctx, target, atlas, buffer))
    }
}
