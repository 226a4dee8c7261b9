mod app;
mod filemanager;
mod pattern;

use std::process::ExitCode;

use log::error;

fn main() -> ExitCode {
    let matches = app::create_cmd_args().get_matches();

    if let Err(e) = lib_rawpng::init_logging(app::log_level(&matches)) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match app::run(&matches) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Could not complete command, reason: {}", e);
            ExitCode::FAILURE
        }
    }
}
