//! Impasto - headless painting demo
//!
//! Paints onto a software-rendered canvas the way an interactive session
//! would: an optional background image, a startup curve, a scripted drag
//! with a second color and one pan. The composited screen is written to a
//! PNG file.

use std::process::ExitCode;

use impasto_config::ImpastoConfig;
use painting::{
    BackendError, Key, KeyEvent, PaintError, PaintSession, Point, RenderBackend, SoftwareBackend,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod export;
mod script;

use config::AppConfig;
use export::ImageError;

/// Color of the scripted drag
const SECOND_COLOR: [f32; 3] = [0.1, 0.6, 0.9];

/// Pointer samples in the scripted drag
const DRAG_SAMPLES: usize = 40;

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Paint(#[from] PaintError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Image(#[from] ImageError),
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = ImpastoConfig::from_env();
    let app = AppConfig::from_env();

    info!(
        "Starting Impasto: {}x{} canvas, output {}",
        config.canvas.width,
        config.canvas.height,
        app.output.display()
    );

    match run(&config, &app) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: &ImpastoConfig, app: &AppConfig) -> Result<(), AppError> {
    let canvas = config.canvas;
    let mut gl = SoftwareBackend::new(canvas.width, canvas.height);
    let mut session = PaintSession::new(&mut gl, config)?;

    if let Some(path) = &app.image {
        let image = export::load_image(path)?;
        let view = *session.view();
        session.layers_mut().load_image(&mut gl, &image, &view)?;
    }

    let paint = session
        .layers_mut()
        .new_layer(&mut gl, canvas.width, canvas.height)?;
    session.layers_mut().set_active(paint)?;

    session.draw_curve(
        &mut gl,
        Point::new(100.0, 50.0),
        Point::new(400.0, 300.0),
        Point::new(800.0, 100.0),
    )?;

    session.set_color(&mut gl, SECOND_COLOR)?;
    for event in script::wave_stroke(canvas.width_f32(), canvas.height_f32(), DRAG_SAMPLES) {
        session.handle_pointer(&mut gl, event)?;
    }

    session.handle_key(KeyEvent::press(Key::Space));
    for event in script::pan_drag((200.0, 200.0), (-40.0, 25.0), 4) {
        session.handle_pointer(&mut gl, event)?;
    }
    session.handle_key(KeyEvent::release(Key::Space));

    session.composite(&mut gl)?;
    let pixels = gl.read_pixels(None)?;
    export::save_png(&app.output, canvas.width, canvas.height, &pixels)?;

    info!(
        "Wrote {} ({} layers, pan {:?})",
        app.output.display(),
        session.layers().len(),
        session.view().offset()
    );
    Ok(())
}
