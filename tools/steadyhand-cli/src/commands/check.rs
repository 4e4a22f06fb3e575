//! Check platform support and configuration.

use std::path::Path;

use steadyhand_common::config::AppConfig;
use steadyhand_platform_core::{normalize_process_name, FunctionKey};

pub fn run(config_path: &Path) -> anyhow::Result<()> {
    println!("SteadyHand System Check");
    println!("{}", "=".repeat(50));

    let platform_ok = steadyhand_platform_windows::is_supported();
    if platform_ok {
        println!("[OK] Platform: low-level mouse hook available");
    } else {
        println!("[FAIL] Platform: the mouse hook and injection require Windows");
    }

    let config_ok = match AppConfig::load_from(config_path) {
        Ok(config) => {
            println!("[OK] Configuration: {}", config_path.display());
            print_summary(&config);
            true
        }
        Err(e) => {
            println!("[FAIL] Configuration: {e}");
            println!("       Create one with `steadyhand config init`.");
            false
        }
    };

    println!();
    if platform_ok && config_ok {
        println!("All checks passed. SteadyHand is ready.");
    } else {
        println!("Some checks failed. See above for fixes.");
    }

    Ok(())
}

fn print_summary(config: &AppConfig) {
    println!(
        "     speed range {}..{} px/s, alpha {}..{}",
        config.v_min, config.v_max, config.alpha_min, config.alpha_max
    );
    println!(
        "     deadzone {} px below {} px/s, extra damping {}",
        config.jitter_deadzone_px, config.jitter_speed_max, config.extra_damp_factor
    );
    if let (Ok(toggle), Ok(quit)) = (
        FunctionKey::parse(&config.hotkey_toggle),
        FunctionKey::parse(&config.hotkey_quit),
    ) {
        println!("     hotkeys: {toggle} toggle, {quit} quit");
    }
    if !config.blacklist.is_empty() {
        let names: Vec<String> = config
            .blacklist
            .iter()
            .map(|name| normalize_process_name(name))
            .collect();
        println!("     blacklist: {}", names.join(", "));
    }
}
