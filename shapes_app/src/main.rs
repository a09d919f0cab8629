//! Demo application: a spinning circle, ring, and cube rendered through
//! the shape engine's Vulkan harness.

use shape_engine::{
    geometry::{self, ShapeKind},
    AppConfig, ShapeRenderer, Window,
};

const CONFIG_PATH: &str = "shapes.toml";

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load_or_default(CONFIG_PATH)?;
    if let Err(reason) = config.shaders.validate() {
        log::warn!("{reason} (run a build with VULKAN_SDK set to compile shaders)");
    }

    let mut window = Window::new(
        &config.window.title,
        config.window.width,
        config.window.height,
    )?;

    let shapes: Vec<_> = [ShapeKind::Circle, ShapeKind::Ring, ShapeKind::Cube]
        .into_iter()
        .enumerate()
        .map(|(index, kind)| geometry::generate_shape(kind, index as u32))
        .collect();

    let mut renderer = ShapeRenderer::new(&mut window, &config, shapes)?;

    log::info!("Entering render loop");
    while !window.should_close() {
        for event in window.process_events() {
            if let glfw::WindowEvent::Key(glfw::Key::Escape, _, glfw::Action::Press, _) = event {
                window.set_should_close(true);
            }
        }

        renderer.draw_frame(&mut window)?;
    }

    renderer.wait_idle()?;
    Ok(())
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    log::info!("Starting shapes demo");

    if let Err(e) = run() {
        log::error!("Fatal error: {e}");
        std::process::exit(1);
    }

    log::info!("Shapes demo finished");
}
