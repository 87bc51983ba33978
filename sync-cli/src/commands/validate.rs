//! Validate command - print the effective configuration.

use zwave_sync_manager::Config;

/// Run the validate command. Loading already checked the values.
pub fn run(config: &Config) {
    println!("=== zwsync config ===");
    println!();
    println!("Driver:");
    println!("  Config path:     {}", config.driver.config_path.display());
    println!("  Poll interval:   {} ms", config.driver.poll_interval_ms);
    println!("  Save log level:  {:?}", config.driver.save_log_level);
    println!();
    println!("Session:");
    println!("  Controller:      {}", config.session.controller_path);
    println!(
        "  Queue:           {} notifications",
        config.session.notification_queue
    );
    println!(
        "  Teardown limit:  {} s",
        config.session.teardown_timeout_secs
    );
    println!();
    println!("Broadcast:");
    println!("  Capacity:        {}", config.broadcast.capacity);
    println!(
        "  Value changes:   {}",
        on_off(config.broadcast.value_changes)
    );
    println!(
        "  Query complete:  {}",
        on_off(config.broadcast.query_complete)
    );
    println!();
    println!("HTTP:");
    if config.http.enabled {
        println!("  Listening on:    {}", config.http.bind_address);
    } else {
        println!("  Disabled");
    }
    println!();
    println!("OK");
}

fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}
