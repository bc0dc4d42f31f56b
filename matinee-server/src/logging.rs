use colored::Colorize;
use log::Level;

/// External crates only need to log warnings and errors
const ALLOWED_EXTERNAL_LEVELS: [Level; 2] = [Level::Warn, Level::Error];
const ALLOWED_LEVELS: [Level; 4] = [Level::Info, Level::Warn, Level::Error, Level::Debug];

pub fn init_logger() {
    fern::Dispatch::new()
        .format(move |out, message, record| {
            let now = chrono::Local::now();

            out.finish(format_args!(
                "{:^5} {} {:^8} {}",
                level_to_string(&record.level()),
                now.format("%H:%M:%S").to_string().bright_black(),
                target_label(record.target()),
                message
            ))
        })
        .filter(|meta| {
            let is_local = is_local_target(meta.target());

            let is_allowed = ALLOWED_LEVELS.contains(&meta.level());
            let is_severe = ALLOWED_EXTERNAL_LEVELS.contains(&meta.level());

            is_local && is_allowed || is_severe
        })
        .chain(std::io::stdout())
        .apply()
        .expect("logging is initialized")
}

fn is_local_target(target: &str) -> bool {
    let module = target.split("::").next().unwrap_or_default();
    matches!(module, "matinee_server" | "matinee_collab")
}

fn target_label(target: &str) -> String {
    let module = target.split("::").next().unwrap_or_default();

    match module {
        "matinee_server" => "SERVER".bright_green().to_string(),
        "matinee_collab" => "COLLAB".bright_purple().to_string(),
        other => other.to_string(),
    }
}

fn level_to_string(level: &Level) -> String {
    match level {
        Level::Error => " ERR ".black().on_red().bold().to_string(),
        Level::Warn => " WRN ".black().on_yellow().bold().to_string(),
        Level::Info => " INF ".black().on_blue().bold().to_string(),
        Level::Debug => " DBG ".white().on_black().to_string(),
        Level::Trace => " TRC ".to_string(),
    }
}
