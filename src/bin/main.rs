use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context as _;
use clap::{Parser, ValueEnum};
use constellation::{Color, Host, PixelBuffer, RenderTarget, Sketch, SketchConfig, Vector2D};
use eframe::egui;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Preset {
    Constellation,
    Flow,
    Jitter,
}

impl Preset {
    fn config(self) -> SketchConfig {
        match self {
            Preset::Constellation => SketchConfig::constellation(),
            Preset::Flow => SketchConfig::flow(),
            Preset::Jitter => SketchConfig::jitter(),
        }
    }
}

/// Live viewer for the background sketches.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Built-in sketch, ignored when --config is given.
    #[arg(long, value_enum, default_value_t = Preset::Constellation)]
    preset: Preset,
    /// TOML sketch configuration.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    seed: Option<u64>,
    /// Draw into a software pixel buffer and upload it as a texture.
    #[arg(long)]
    raster: bool,
}

/// Host inputs sampled from egui for one frame.
struct PanelHost {
    size: (f32, f32),
    pointer: Option<(f32, f32)>,
    elapsed_ms: f64,
}

impl Host for PanelHost {
    fn viewport_size(&self) -> (f32, f32) {
        self.size
    }

    fn pointer_position(&self) -> Option<(f32, f32)> {
        self.pointer
    }

    fn elapsed_ms(&self) -> f64 {
        self.elapsed_ms
    }
}

fn color32(color: Color) -> egui::Color32 {
    let [r, g, b, a] = color.to_rgba8();
    egui::Color32::from_rgba_unmultiplied(r, g, b, a)
}

/// Forwards draw calls to an egui painter, offset to the panel origin.
struct PainterTarget<'a> {
    painter: &'a egui::Painter,
    origin: egui::Pos2,
}

impl PainterTarget<'_> {
    fn at(&self, v: Vector2D) -> egui::Pos2 {
        self.origin + egui::vec2(v.x, v.y)
    }

    fn rect(&self, x: f32, y: f32, width: f32, height: f32) -> egui::Rect {
        egui::Rect::from_min_size(self.at(Vector2D::new(x, y)), egui::vec2(width, height))
    }
}

impl RenderTarget for PainterTarget<'_> {
    // egui starts every frame from an empty canvas.
    fn clear_rect(&mut self, _x: f32, _y: f32, _width: f32, _height: f32) {}

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Color) {
        self.painter
            .rect_filled(self.rect(x, y, width, height), 0.0, color32(color));
    }

    fn fill_circle(&mut self, center: Vector2D, radius: f32, color: Color) {
        self.painter
            .circle_filled(self.at(center), radius, color32(color));
    }

    fn stroke_line(&mut self, from: Vector2D, to: Vector2D, color: Color, width: f32) {
        self.painter
            .line_segment([self.at(from), self.at(to)], (width, color32(color)));
    }
}

struct Raster {
    buffer: PixelBuffer,
    texture: Option<egui::TextureHandle>,
}

struct Viewer {
    config: SketchConfig,
    sketch: Option<Sketch>,
    started: Instant,
    last_frame_time: Instant,
    raster: Option<Raster>,
    failure: Option<String>,
}

impl Viewer {
    fn new(config: SketchConfig, raster: bool) -> Self {
        Self {
            config,
            sketch: None,
            started: Instant::now(),
            last_frame_time: Instant::now(),
            raster: raster.then(|| Raster {
                buffer: PixelBuffer::new(0, 0),
                texture: None,
            }),
            failure: None,
        }
    }

    fn render_ui_panel(&mut self, ui: &mut egui::Ui, frame_time: f32) {
        ui.label(format!("FPS: {:.1}", 1.0 / frame_time.max(1e-6)));
        ui.label(format!("Frame Time: {:.3}ms", frame_time * 1000.0));

        if let Some(sketch) = &self.sketch {
            let particles = sketch.particles();
            ui.separator();
            ui.label(format!("Tier: {:?}", particles.tier()));
            ui.label(format!("Particles: {}", particles.members().len()));
            ui.label(format!("Connections: {}", particles.edges().len()));
            match sketch.orbs() {
                Some(orbs) => ui.label(format!("Orbs: {}", orbs.members().len())),
                None => ui.label("Orbs: waiting for pointer"),
            };
        }

        if ui.button("Restart").clicked() {
            self.sketch = None;
            self.started = Instant::now();
        }

        if let Some(failure) = &self.failure {
            ui.separator();
            ui.colored_label(egui::Color32::RED, failure);
        }
    }

    fn draw(&mut self, ui: &mut egui::Ui, host: &PanelHost, rect: egui::Rect) {
        if rect.width() < 1.0 || rect.height() < 1.0 {
            return;
        }
        if self.sketch.is_none() {
            match Sketch::new(self.config.clone(), host) {
                Ok(sketch) => self.sketch = Some(sketch),
                Err(err) => {
                    error!(%err, "failed to start sketch");
                    self.failure = Some(err.to_string());
                    return;
                }
            }
        }
        let Some(sketch) = &mut self.sketch else {
            return;
        };

        let result = match &mut self.raster {
            Some(raster) => {
                let (width, height) = (rect.width() as usize, rect.height() as usize);
                if raster.buffer.width() != width || raster.buffer.height() != height {
                    raster.buffer.resize(width, height);
                }
                let result = sketch.frame(host, &mut raster.buffer);
                if matches!(result, Ok(true)) || raster.texture.is_none() {
                    let image = egui::ColorImage::from_rgba_unmultiplied(
                        [width, height],
                        raster.buffer.as_rgba(),
                    );
                    match &mut raster.texture {
                        Some(texture) => texture.set(image, egui::TextureOptions::LINEAR),
                        None => {
                            raster.texture = Some(ui.ctx().load_texture(
                                "sketch",
                                image,
                                egui::TextureOptions::LINEAR,
                            ))
                        }
                    }
                }
                if let Some(texture) = &raster.texture {
                    let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                    ui.painter().image(texture.id(), rect, uv, egui::Color32::WHITE);
                }
                result
            }
            None => {
                let painter = ui.painter_at(rect);
                let mut target = PainterTarget {
                    painter: &painter,
                    origin: rect.min,
                };
                let result = sketch.frame(host, &mut target);
                if matches!(result, Ok(false)) {
                    sketch.render(&mut target);
                }
                result
            }
        };

        if let Err(err) = result {
            error!(%err, "sketch frame failed");
            self.failure = Some(err.to_string());
            self.sketch = None;
        }
    }
}

impl eframe::App for Viewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let current_time = Instant::now();
        let frame_time = current_time.duration_since(self.last_frame_time);
        self.last_frame_time = current_time;

        egui::SidePanel::left("Control Panel").show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                self.render_ui_panel(ui, frame_time.as_secs_f32());
                ui.allocate_space(ui.available_size());
            });
        });

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let (rect, response) =
                    ui.allocate_exact_size(ui.available_size(), egui::Sense::hover());
                let host = PanelHost {
                    size: (rect.width(), rect.height()),
                    pointer: response
                        .hover_pos()
                        .map(|p| (p.x - rect.min.x, p.y - rect.min.y)),
                    elapsed_ms: self.started.elapsed().as_secs_f64() * 1000.0,
                };
                self.draw(ui, &host, rect);
            });

        ctx.request_repaint();
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => SketchConfig::from_path(path)
            .with_context(|| format!("loading sketch config {}", path.display()))?,
        None => args.preset.config(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.validate()?;
    info!(preset = ?args.preset, seed = config.seed, raster = args.raster, "starting viewer");

    let raster = args.raster;
    eframe::run_native(
        "Constellation",
        eframe::NativeOptions {
            renderer: eframe::Renderer::Wgpu,
            ..Default::default()
        },
        Box::new(move |_cc| Box::new(Viewer::new(config, raster))),
    )
    .map_err(|err| anyhow::anyhow!("viewer exited with an error: {err}"))
}
