use std::sync::{Arc, Mutex};
use std::thread;

use eframe::egui;
use eframe::egui::{Color32, PointerButton, Pos2, Rect, Sense, TextureHandle, TextureOptions, Ui};
use eframe::run_native;
use life::controller::lock;
use life::{tick_shared, Button, Canvas, Config, Controller, FrameSink, InputEvent, TITLE};

/// Height reserved above the grid for the heading and buttons.
const HEADER_HEIGHT: f32 = 64.0;

/// Uploads each repainted canvas into an egui texture.
struct EguiSink {
    ctx: egui::Context,
    texture: Option<TextureHandle>,
}

impl EguiSink {
    fn new(ctx: egui::Context) -> Self {
        Self { ctx, texture: None }
    }
}

impl FrameSink for EguiSink {
    fn repaint(&mut self, canvas: &Canvas) {
        let image = egui::ColorImage::from_rgba_unmultiplied([canvas.width(), canvas.height()], &canvas.to_rgba());
        match self.texture.as_mut() {
            Some(texture) => texture.set(image, TextureOptions::NEAREST),
            None => self.texture = Some(self.ctx.load_texture("life-canvas", image, TextureOptions::NEAREST)),
        }
        self.ctx.request_repaint();
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = Config::from_env();
    let size = [
        (config.width * config.scale) as f32 + 16.0,
        (config.height * config.scale) as f32 + HEADER_HEIGHT + 16.0,
    ];
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size(size).with_title(TITLE),
        ..Default::default()
    };

    run_native(
        "Game of Life GUI",
        options,
        Box::new(move |cc| {
            let controller = Controller::new(&config, EguiSink::new(cc.egui_ctx.clone()))?;
            let shared = Arc::new(Mutex::new(controller));
            let ctx = cc.egui_ctx.clone();
            let worker = Arc::clone(&shared);

            // The simulation loop runs beside the UI; it holds the lock only to
            // step and to redraw, so input is handled while it waits.
            thread::spawn(move || loop {
                if tick_shared(&worker).fps_refreshed {
                    GuiOfLife::set_title(&ctx, lock(&worker).status_label());
                }
            });

            Ok(Box::new(GuiOfLife::new(cc, shared)))
        }),
    )
    .map_err(|err| anyhow::anyhow!("{err}"))
}

type SharedController = Arc<Mutex<Controller<EguiSink>>>;

struct GuiOfLife {
    controller: SharedController,
}

impl GuiOfLife {
    fn new(cc: &eframe::CreationContext<'_>, controller: SharedController) -> Self {
        Self::set_title(&cc.egui_ctx, lock(&controller).status_label());
        Self { controller }
    }

    fn set_title(ctx: &egui::Context, label: String) {
        ctx.send_viewport_cmd(egui::ViewportCommand::Title(label));
    }

    fn create_grid(controller: &mut Controller<EguiSink>, ui: &mut Ui) {
        let canvas = controller.canvas();
        let (rect, response) = ui.allocate_exact_size(
            egui::vec2(canvas.width() as f32, canvas.height() as f32),
            Sense::click_and_drag(),
        );

        if let Some(texture) = &controller.sink().texture {
            ui.painter().image(
                texture.id(),
                rect,
                Rect::from_min_max(Pos2::ZERO, egui::pos2(1.0, 1.0)),
                Color32::WHITE,
            );
        }

        let to_canvas = |pos: Pos2| [pos.x - rect.min.x, pos.y - rect.min.y];
        let (events, scroll) = ui.input(|i| (i.events.clone(), i.raw_scroll_delta.y));
        let mut dispatch = |input: InputEvent| {
            if let Some(label) = controller.handle(input) {
                Self::set_title(ui.ctx(), label);
            }
        };

        for event in events {
            let input = match event {
                egui::Event::PointerButton { pos, button, pressed, .. } => {
                    let Some(button) = to_button(button) else { continue };
                    let at = to_canvas(pos);
                    match pressed {
                        // Presses outside the grid belong to other widgets.
                        true if rect.contains(pos) => InputEvent::Pressed { button, at },
                        true => continue,
                        false => InputEvent::Released { button, at },
                    }
                }
                egui::Event::PointerMoved(pos) => InputEvent::Moved { at: to_canvas(pos) },
                _ => continue,
            };
            dispatch(input);
        }

        if response.hovered() && scroll != 0.0 {
            dispatch(InputEvent::Scrolled { steps: scroll.signum() as i32 });
        }
    }
}

fn to_button(button: PointerButton) -> Option<Button> {
    match button {
        PointerButton::Primary => Some(Button::Primary),
        PointerButton::Secondary => Some(Button::Secondary),
        PointerButton::Middle => Some(Button::Middle),
        _ => None,
    }
}

impl eframe::App for GuiOfLife {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut controller = lock(&self.controller);

        if ctx.input(|i| i.key_pressed(egui::Key::Space)) {
            Self::set_title(ctx, controller.toggle_pause());
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(TITLE);
            ui.horizontal(|ui| {
                if ui.button("Randomize").clicked() {
                    controller.reseed(false);
                    Self::set_title(ctx, controller.status_label());
                }
                let pause = if controller.is_paused() { "Resume" } else { "Pause" };
                if ui.button(pause).clicked() {
                    Self::set_title(ctx, controller.toggle_pause());
                }
                ui.label(format!("{} ms", controller.interval_ms()));
            });

            Self::create_grid(&mut controller, ui);
        });
    }
}
