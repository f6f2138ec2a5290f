//! Headless прогон CARSYNC
//!
//! Грузит модель, ждёт "кадр", собирает машину и едет вперёд N тиков.
//!
//! ```text
//! carsync_simulation [model.json] [settings.toml]
//! ```

use carsync_simulation::logger::{self, LogLevel};
use carsync_simulation::{
    create_headless_app_with, run_fixed_tick, DriveInput, Session, SetupPhase, SimulationSettings,
    DEFAULT_MODEL_PATH,
};

const TICKS: u32 = 600;

fn main() {
    let mut args = std::env::args().skip(1);
    let model_path = args.next().unwrap_or_else(|| DEFAULT_MODEL_PATH.to_string());
    let settings = match args.next() {
        Some(path) => match SimulationSettings::load(&path) {
            Ok(settings) => settings,
            Err(err) => {
                eprintln!("{err}");
                std::process::exit(2);
            }
        },
        None => SimulationSettings::default(),
    };

    println!("Starting CARSYNC headless simulation (model: {})", model_path);

    let mut app = create_headless_app_with(settings);
    logger::set_log_level(LogLevel::Info);

    if let Err(err) = app.world_mut().resource_mut::<Session>().load_model(&model_path) {
        eprintln!("Model load failed: {err}");
        std::process::exit(1);
    }

    // Рендера нет: "кадр" считается отрисованным сразу
    app.world_mut().resource_mut::<Session>().notify_frame_rendered();

    for tick in 0..TICKS {
        // Первые 2 секунды стоим, дальше газ
        let throttle = if tick < 120 { 0.0 } else { 1.0 };
        app.insert_resource(DriveInput { throttle, steer: 0.0 });
        run_fixed_tick(&mut app);

        let session = app.world().resource::<Session>();
        if session.phase() == SetupPhase::Halted {
            logger::log_warning("Vehicle setup halted, stopping run");
            break;
        }
        if tick % 60 == 0 {
            if let Some(center) = session.chassis_center() {
                println!("Tick {}: chassis center = {:?}", tick, center);
            }
        }
    }

    let session = app.world().resource::<Session>();
    println!(
        "Simulation complete: {} ticks, phase {:?}, chassis at {:?}",
        session.ticks(),
        session.phase(),
        session.chassis_center()
    );
}
