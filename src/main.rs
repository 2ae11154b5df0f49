// main.rs — viewer window: menus, status bar, 3D interaction, background light extraction

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod config;
mod i18n;
mod panorama;
mod renderer;

use config::ViewerConfig;
use panorama::{EnvironmentViewer, ProjectionMode};
use renderer::Renderer;

use fisheye_envmap::visualize::draw_estimate;
use fisheye_envmap::{
    CandidateOrder, CutStrategy, Illumination, IlluminationExtractor, LightSet, SourceProjection,
};

use winit::{
    dpi::{LogicalSize, PhysicalPosition},
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, Window, WindowBuilder},
};

use anyhow::{anyhow, Context};
use image::io::Reader as ImageReader;
use image::{GenericImageView, RgbImage};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];
const MAX_LIGHTS: usize = 64;

/// What the background worker starts from.
enum Input {
    Path(PathBuf),
    Photo(Arc<RgbImage>),
}

/// Result of one background extraction.
struct Processed {
    photo: Arc<RgbImage>,
    illumination: Illumination,
}

/// Worker reply, stamped with the request generation it answers.
type Reply = (u64, anyhow::Result<Processed>);

/// Requests raised by the UI and keyboard, applied after the frame is drawn.
enum UiAction {
    Open(PathBuf, SourceProjection),
    Reestimate,
    SavePanorama(PathBuf),
    SaveDebug(PathBuf),
    Exit,
}

/// Everything the UI edits besides the camera.
struct Session {
    source: SourceProjection,
    light_count: usize,
    cut: CutStrategy,
    order: CandidateOrder,
    lang: String,
    photo: Option<Arc<RgbImage>>,
    illumination: Option<Illumination>,
    lights: LightSet,
    lights_dirty: bool,
    is_loading: bool,
    last_error: Option<String>,
    // latest request handed to a worker; replies for older ones are dropped
    generation: u64,
    // request whose result goes to --save-panorama / --save-debug
    cli_request: Option<u64>,
}

impl Session {
    fn new(config: &ViewerConfig) -> Self {
        Self {
            source: config.source,
            light_count: config.light_count,
            cut: config.cut,
            order: config.order,
            lang: config.lang.clone(),
            photo: None,
            illumination: None,
            lights: LightSet::default(),
            lights_dirty: true,
            is_loading: false,
            last_error: None,
            generation: 0,
            cli_request: None,
        }
    }

    /// Stamp a new background request. It supersedes every request still running.
    fn begin_request(&mut self) -> u64 {
        self.generation += 1;
        self.is_loading = true;
        self.generation
    }

    fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    /// True once, for the reply to the request started from the command line.
    fn take_cli_outputs(&mut self, generation: u64) -> bool {
        if self.cli_request == Some(generation) {
            self.cli_request = None;
            return true;
        }
        false
    }

    fn extractor(&self) -> IlluminationExtractor {
        IlluminationExtractor::new(self.light_count)
            .with_source(self.source)
            .with_strategy(self.cut)
            .with_order(self.order)
    }

    fn accept(&mut self, processed: Processed) {
        self.lights = LightSet::from_estimates(&processed.illumination.lights);
        self.lights_dirty = true;
        self.photo = Some(processed.photo);
        self.illumination = Some(processed.illumination);
        self.last_error = None;
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ViewerConfig::from_args()?;
    i18n::init(config.lang.clone());

    if config.headless {
        return run_headless(&config);
    }

    let event_loop = EventLoop::new();
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(i18n::tr("app.title"))
            .with_inner_size(LogicalSize::new(1280, 720))
            .build(&event_loop)
            .context("creating window")?,
    );

    let mut renderer = pollster::block_on(Renderer::new(window.clone()))?;
    let mut viewer = EnvironmentViewer::new(config.fov, config.sensitivity);
    let mut session = Session::new(&config);

    let mut mouse_pressed = false;
    let mut last_mouse_pos: Option<PhysicalPosition<f64>> = None;

    let mut last_frame_time = Instant::now();
    let mut frame_count = 0;
    let mut fps = 0.0;
    let mut show_fps = false;

    let (tx, rx): (Sender<Reply>, Receiver<Reply>) = channel();

    if let Some(path) = config.image.clone() {
        let generation = session.begin_request();
        session.cli_request = Some(generation);
        start_processing(Input::Path(path), session.extractor(), generation, tx.clone());
    }

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        while let Ok((generation, result)) = rx.try_recv() {
            if !session.is_current(generation) {
                log::debug!("dropping superseded result #{}", generation);
                continue;
            }
            session.is_loading = false;
            match result {
                Ok(processed) => {
                    let panorama = image::DynamicImage::ImageRgb8(processed.illumination.panorama.clone());
                    renderer.load_panorama(panorama.to_rgba8());
                    if session.take_cli_outputs(generation) {
                        save_outputs(&config, &processed.illumination);
                    }
                    session.accept(processed);
                }
                Err(e) => {
                    log::error!("{:#}", e);
                    session.last_error = Some(format!("{:#}", e));
                }
            }
        }

        let mut actions: Vec<UiAction> = Vec::new();

        match event {
            Event::WindowEvent { event, .. } => {
                let response = renderer.egui_state.on_event(&renderer.egui_ctx, &event);
                if response.consumed {
                    return;
                }

                match event {
                    WindowEvent::CloseRequested => {
                        *control_flow = ControlFlow::Exit;
                    }

                    WindowEvent::Resized(new_size) => {
                        renderer.resize(new_size);
                    }

                    WindowEvent::KeyboardInput { input, .. } => {
                        if input.state == ElementState::Pressed {
                            match input.virtual_keycode {
                                Some(VirtualKeyCode::O) => {
                                    if let Some(path) = pick_image() {
                                        actions.push(UiAction::Open(path, session.source));
                                    }
                                }
                                Some(VirtualKeyCode::F11) => toggle_fullscreen(&mut viewer, &window),
                                Some(VirtualKeyCode::Return) | Some(VirtualKeyCode::NumpadEnter) => {
                                    session.lights.cycle_active();
                                    session.lights_dirty = true;
                                }
                                Some(VirtualKeyCode::L) => {
                                    session.lights.toggle();
                                    session.lights_dirty = true;
                                }
                                Some(VirtualKeyCode::Space) => {
                                    viewer.show_probe = !viewer.show_probe;
                                }
                                Some(VirtualKeyCode::I) => viewer.reset(),
                                Some(VirtualKeyCode::Q) | Some(VirtualKeyCode::Escape) => {
                                    actions.push(UiAction::Exit);
                                }
                                _ => {}
                            }
                        }
                    }

                    WindowEvent::MouseInput { state, button, .. } => {
                        if button == MouseButton::Left {
                            mouse_pressed = state == ElementState::Pressed;
                            if !mouse_pressed {
                                last_mouse_pos = None;
                            }
                        }
                    }

                    WindowEvent::CursorMoved { position, .. } => {
                        if mouse_pressed {
                            if let Some(last_pos) = last_mouse_pos {
                                viewer.drag(
                                    (position.x - last_pos.x) as f32,
                                    (position.y - last_pos.y) as f32,
                                    renderer.size.width as f32,
                                    renderer.size.height as f32,
                                );
                            }
                            last_mouse_pos = Some(position);
                        }
                    }

                    WindowEvent::MouseWheel { delta, .. } => {
                        let scroll = match delta {
                            MouseScrollDelta::LineDelta(_, y) => y,
                            MouseScrollDelta::PixelDelta(pos) => pos.y as f32 / 20.0,
                        };
                        viewer.zoom(scroll);
                    }

                    WindowEvent::DroppedFile(path) => {
                        actions.push(UiAction::Open(path, session.source));
                    }

                    _ => {}
                }
            }

            Event::RedrawRequested(_) => {
                frame_count += 1;
                let now = Instant::now();
                if now.duration_since(last_frame_time).as_secs_f32() >= 1.0 {
                    fps = frame_count as f32 / now.duration_since(last_frame_time).as_secs_f32();
                    frame_count = 0;
                    last_frame_time = now;
                }

                renderer.update_camera(&viewer);
                if session.lights_dirty {
                    renderer.update_lights(&session.lights, session.source);
                    session.lights_dirty = false;
                }

                let render_result = renderer.render_with_ui(&window, |ctx| {
                    draw_ui(ctx, &mut viewer, &mut session, &mut actions, &mut show_fps, fps, &window);
                });

                match render_result {
                    Ok(_) => {}
                    Err(wgpu::SurfaceError::Lost) => renderer.resize(renderer.size),
                    Err(wgpu::SurfaceError::OutOfMemory) => *control_flow = ControlFlow::Exit,
                    Err(e) => log::warn!("render error: {:?}", e),
                }
            }

            Event::MainEventsCleared => {
                window.request_redraw();
            }

            _ => {}
        }

        for action in actions {
            match action {
                UiAction::Open(path, source) => {
                    session.source = source;
                    let generation = session.begin_request();
                    start_processing(Input::Path(path), session.extractor(), generation, tx.clone());
                }
                UiAction::Reestimate => {
                    if let Some(photo) = session.photo.clone() {
                        let generation = session.begin_request();
                        start_processing(Input::Photo(photo), session.extractor(), generation, tx.clone());
                    }
                }
                UiAction::SavePanorama(path) => {
                    if let Some(illumination) = &session.illumination {
                        report_save(&mut session.last_error, save_panorama(&path, illumination));
                    }
                }
                UiAction::SaveDebug(path) => {
                    if let Some(illumination) = &session.illumination {
                        report_save(&mut session.last_error, save_debug(&path, illumination));
                    }
                }
                UiAction::Exit => *control_flow = ControlFlow::Exit,
            }
        }
    });
}

fn run_headless(config: &ViewerConfig) -> anyhow::Result<()> {
    let path = config
        .image
        .as_deref()
        .ok_or_else(|| anyhow!(i18n::tr("error.headless_needs_image")))?;
    let photo = load_photo(path)?;
    let illumination = Session::new(config).extractor().extract(&photo)?;
    log_lights(&illumination);

    if let Some(out) = &config.save_panorama {
        save_panorama(out, &illumination)?;
    }
    if let Some(out) = &config.save_debug {
        save_debug(out, &illumination)?;
    }
    Ok(())
}

fn start_processing(
    input: Input,
    extractor: IlluminationExtractor,
    generation: u64,
    tx: Sender<Reply>,
) {
    thread::spawn(move || {
        if tx.send((generation, process(input, extractor))).is_err() {
            log::error!("{}", i18n::tr("error.send_to_main_failed"));
        }
    });
}

fn process(input: Input, extractor: IlluminationExtractor) -> anyhow::Result<Processed> {
    let photo = match input {
        Input::Path(path) => Arc::new(load_photo(&path)?),
        Input::Photo(photo) => photo,
    };
    let illumination = extractor.extract(&photo)?;
    log_lights(&illumination);
    Ok(Processed {
        photo,
        illumination,
    })
}

fn load_photo(path: &Path) -> anyhow::Result<RgbImage> {
    log::info!(
        "{}",
        i18n::tr_with("log.loading_image_bg", &[("path", path.display().to_string())])
    );

    let file = File::open(path)
        .with_context(|| i18n::tr_with("error.open_file", &[("path", path.display().to_string())]))?;
    let mut reader = ImageReader::new(BufReader::new(file))
        .with_guessed_format()
        .context(i18n::tr("error.decode_image"))?;
    reader.no_limits();
    let img = reader.decode().context(i18n::tr("error.decode_image"))?;

    let (w, h) = img.dimensions();
    log::info!(
        "{}",
        i18n::tr_with("log.image_loaded_size", &[("w", w.to_string()), ("h", h.to_string())])
    );
    Ok(img.to_rgb8())
}

fn log_lights(illumination: &Illumination) {
    log::info!(
        "{}",
        i18n::tr_with(
            "log.lights_estimated",
            &[("n", illumination.lights.len().to_string())]
        )
    );
    for (i, light) in illumination.lights.iter().enumerate() {
        let d = light.direction;
        let [r, g, b] = light.color;
        log::info!(
            "  #{} pixel ({}, {}) direction ({:.3}, {:.3}, {:.3}) color ({:.2}, {:.2}, {:.2})",
            i + 1,
            light.position.x,
            light.position.y,
            d.x,
            d.y,
            d.z,
            r,
            g,
            b
        );
    }
}

fn save_panorama(path: &Path, illumination: &Illumination) -> anyhow::Result<()> {
    illumination
        .panorama
        .save(path)
        .with_context(|| i18n::tr_with("error.save_image", &[("path", path.display().to_string())]))?;
    log::info!("{}", i18n::tr_with("log.saved", &[("path", path.display().to_string())]));
    Ok(())
}

fn save_debug(path: &Path, illumination: &Illumination) -> anyhow::Result<()> {
    draw_estimate(&illumination.panorama, &illumination.estimate)
        .save(path)
        .with_context(|| i18n::tr_with("error.save_image", &[("path", path.display().to_string())]))?;
    log::info!("{}", i18n::tr_with("log.saved", &[("path", path.display().to_string())]));
    Ok(())
}

/// Apply the --save-panorama / --save-debug paths to the command-line image's result.
fn save_outputs(config: &ViewerConfig, illumination: &Illumination) {
    if let Some(out) = &config.save_panorama {
        if let Err(e) = save_panorama(out, illumination) {
            log::error!("{:#}", e);
        }
    }
    if let Some(out) = &config.save_debug {
        if let Err(e) = save_debug(out, illumination) {
            log::error!("{:#}", e);
        }
    }
}

fn report_save(last_error: &mut Option<String>, result: anyhow::Result<()>) {
    if let Err(e) = result {
        log::error!("{:#}", e);
        *last_error = Some(format!("{:#}", e));
    }
}

fn pick_image() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter(&i18n::tr("file.filter.images"), &IMAGE_EXTENSIONS)
        .pick_file()
}

fn pick_png_target() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter("PNG", &["png"])
        .set_file_name("panorama.png")
        .save_file()
}

fn toggle_fullscreen(viewer: &mut EnvironmentViewer, window: &Window) {
    viewer.is_fullscreen = !viewer.is_fullscreen;
    if viewer.is_fullscreen {
        window.set_fullscreen(Some(Fullscreen::Borderless(None)));
    } else {
        window.set_fullscreen(None);
    }
}

fn draw_ui(
    ctx: &egui::Context,
    viewer: &mut EnvironmentViewer,
    session: &mut Session,
    actions: &mut Vec<UiAction>,
    show_fps: &mut bool,
    fps: f32,
    window: &Window,
) {
    let has_result = session.illumination.is_some();

    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            ui.menu_button(i18n::tr("menu.file"), |ui| {
                if ui.button(i18n::tr("menu.open_fisheye")).clicked() {
                    ui.close_menu();
                    if let Some(path) = pick_image() {
                        actions.push(UiAction::Open(path, SourceProjection::Fisheye));
                    }
                }
                if ui.button(i18n::tr("menu.open_mirrorball")).clicked() {
                    ui.close_menu();
                    if let Some(path) = pick_image() {
                        actions.push(UiAction::Open(path, SourceProjection::Mirrorball));
                    }
                }
                ui.separator();
                if ui
                    .add_enabled(has_result, egui::Button::new(i18n::tr("menu.save_panorama")))
                    .clicked()
                {
                    ui.close_menu();
                    if let Some(path) = pick_png_target() {
                        actions.push(UiAction::SavePanorama(path));
                    }
                }
                if ui
                    .add_enabled(has_result, egui::Button::new(i18n::tr("menu.save_debug")))
                    .clicked()
                {
                    ui.close_menu();
                    if let Some(path) = pick_png_target() {
                        actions.push(UiAction::SaveDebug(path));
                    }
                }
                ui.separator();
                if ui.button(i18n::tr("menu.exit")).clicked() {
                    ui.close_menu();
                    actions.push(UiAction::Exit);
                }
            });

            ui.menu_button(i18n::tr("menu.view"), |ui| {
                if ui.button(i18n::tr("view.reset")).clicked() {
                    viewer.reset();
                    ui.close_menu();
                }

                if ui
                    .button(if viewer.is_fullscreen {
                        i18n::tr("view.fullscreen.exit")
                    } else {
                        i18n::tr("view.fullscreen.enter")
                    })
                    .clicked()
                {
                    toggle_fullscreen(viewer, window);
                    ui.close_menu();
                }

                ui.checkbox(&mut viewer.show_probe, i18n::tr("view.show_probe"));

                ui.separator();
                ui.menu_button(i18n::tr("view.projection_mode"), |ui| {
                    for mode in ProjectionMode::ALL {
                        if ui
                            .radio_value(&mut viewer.projection_mode, mode, i18n::tr(mode.i18n_key()))
                            .clicked()
                        {
                            viewer.zoom(0.0);
                            ui.close_menu();
                        }
                    }
                });

                ui.separator();
                ui.menu_button(i18n::tr("view.input_sensitivity"), |ui| {
                    ui.add(
                        egui::Slider::new(&mut viewer.sensitivity_scale, 0.1..=5.0)
                            .text(i18n::tr("view.multiplier")),
                    );
                    if ui.button(i18n::tr("view.reset_1_0")).clicked() {
                        viewer.sensitivity_scale = 1.0;
                    }
                });

                ui.separator();
                if ui.checkbox(show_fps, i18n::tr("view.show_fps")).clicked() {
                    ui.close_menu();
                }
            });

            ui.menu_button(i18n::tr("menu.lights"), |ui| {
                let mut enabled = session.lights.is_enabled();
                if ui.checkbox(&mut enabled, i18n::tr("lights.enabled")).clicked() {
                    session.lights.toggle();
                    session.lights_dirty = true;
                }

                ui.separator();
                ui.label(i18n::tr("lights.active"));
                if session.lights.is_empty() {
                    ui.label(egui::RichText::new(i18n::tr("lights.none")).weak());
                }
                let active = session.lights.active_index();
                let mut picked = None;
                for (i, light) in session.lights.lights().iter().enumerate() {
                    let d = light.direction;
                    let label = i18n::tr_with(
                        "lights.entry",
                        &[
                            ("n", (i + 1).to_string()),
                            ("dir", format!("({:.2}, {:.2}, {:.2})", d.x, d.y, d.z)),
                        ],
                    );
                    if ui.radio(i == active, label).clicked() {
                        picked = Some(i);
                    }
                }
                if let Some(i) = picked {
                    session.lights.select(i);
                    session.lights_dirty = true;
                }

                ui.separator();
                let response = ui.add(
                    egui::Slider::new(&mut session.light_count, 1..=MAX_LIGHTS)
                        .text(i18n::tr("lights.count")),
                );
                if response.drag_released() || (response.changed() && !response.dragged()) {
                    actions.push(UiAction::Reestimate);
                }

                ui.separator();
                ui.label(i18n::tr("lights.cut"));
                for (strategy, key) in [
                    (CutStrategy::MedianCut, "lights.cut.median"),
                    (CutStrategy::VarianceCut, "lights.cut.variance"),
                ] {
                    if ui.radio_value(&mut session.cut, strategy, i18n::tr(key)).clicked() {
                        actions.push(UiAction::Reestimate);
                    }
                }

                ui.label(i18n::tr("lights.order"));
                for (order, key) in [
                    (CandidateOrder::Ascending, "lights.order.ascending"),
                    (CandidateOrder::Descending, "lights.order.descending"),
                ] {
                    if ui.radio_value(&mut session.order, order, i18n::tr(key)).clicked() {
                        actions.push(UiAction::Reestimate);
                    }
                }
            });

            ui.menu_button(i18n::tr("menu.language"), |ui| {
                for (code, name) in i18n::LANGUAGES {
                    if ui.radio_value(&mut session.lang, code.to_string(), name).clicked() {
                        i18n::init(session.lang.clone());
                        window.set_title(&i18n::tr("app.title"));
                        ui.close_menu();
                    }
                }
            });
        });
    });

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if session.is_loading {
                ui.label(egui::RichText::new(i18n::tr("status.processing")).color(egui::Color32::YELLOW));
                ui.label("|");
            } else if let Some(err) = &session.last_error {
                ui.label(egui::RichText::new(err).color(egui::Color32::RED));
                ui.label("|");
            }

            ui.label(format!(
                "{} {}",
                i18n::tr("status.mode_prefix"),
                i18n::tr(viewer.projection_mode.i18n_key())
            ));
            ui.label("|");
            ui.label(format!("FOV: {:.1}°", viewer.fov));
            ui.label("|");
            ui.label(format!("Yaw: {:.1}°", viewer.yaw));
            ui.label("|");
            ui.label(format!("Pitch: {:.1}°", viewer.pitch));
            ui.label("|");

            let lights_text = match session.lights.active() {
                Some(_) => i18n::tr_with(
                    "status.lights",
                    &[
                        ("active", (session.lights.active_index() + 1).to_string()),
                        ("n", session.lights.len().to_string()),
                    ],
                ),
                None => i18n::tr("status.lights_off"),
            };
            ui.label(lights_text);

            if *show_fps {
                ui.label("|");
                ui.label(egui::RichText::new(format!("FPS: {:.1}", fps)).color(egui::Color32::GREEN));
            }
        });
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use config::{Cli, FileConfig};

    fn session() -> Session {
        let cli = Cli::try_parse_from(["fisheye_envmap", "sky.jpg"]).unwrap();
        Session::new(&ViewerConfig::resolve(cli, FileConfig::default()))
    }

    #[test]
    fn older_requests_are_superseded() {
        let mut session = session();
        let variance = session.begin_request();
        let median = session.begin_request();
        assert!(session.is_loading);
        assert!(!session.is_current(variance));
        assert!(session.is_current(median));
    }

    #[test]
    fn command_line_outputs_are_written_once() {
        let mut session = session();
        let first = session.begin_request();
        session.cli_request = Some(first);
        assert!(session.take_cli_outputs(first));
        assert!(!session.take_cli_outputs(first));

        let reestimate = session.begin_request();
        assert!(!session.take_cli_outputs(reestimate));
    }
}
