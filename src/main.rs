#![cfg_attr(windows, windows_subsystem = "windows")]

use std::process::ExitCode;

use oemkey::config::{get_config, OemKeyConfig};
use oemkey::{app, clipboard, firmware, logging, notify};

fn main() -> ExitCode {
    let (config, config_error) = match get_config() {
        Ok(config) => (config.clone(), None),
        Err(e) => (OemKeyConfig::default(), Some(e)),
    };

    // Without a console the key and the log would go nowhere.
    #[cfg(windows)]
    let console = (!config.display.dialogs || config.logging.enabled)
        && notify::windows::attach_parent_console();

    logging::init(&config.logging);
    #[cfg(windows)]
    log::debug!("Parent console attached: {}", console);
    if let Some(e) = config_error {
        log::warn!("{}; using defaults", e);
    }

    #[cfg(windows)]
    let _com = notify::windows::ComApartment::init();

    let fw = firmware::platform();
    let clip = config.clipboard.enabled.then(clipboard::platform);
    let chain = notify::platform_chain(config.display.dialogs);

    match app::run(fw.as_ref(), clip.as_deref(), &chain) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => ExitCode::from(e.exit_code()),
    }
}
