use std::fmt::Display;

use colored::{Color, ColoredString, Colorize};
use log::{Level, LevelFilter, Metadata};

/// Crates outside the workspace only get through with warnings and errors
const EXTERNAL_LEVEL: LevelFilter = LevelFilter::Warn;

/// Colors used for emphasis outside of the log prefix
pub struct LogColor;

impl LogColor {
    pub const RED: Color = Color::Red;
    pub const DIMMED: Color = Color::BrightBlack;
}

/// Installs the global logger. `local_level` applies to the workspace crates.
pub fn init_logger(local_level: LevelFilter) -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{:^5} {} {:^8} {}",
                badge(record.level()),
                chrono::Local::now().format("%H:%M:%S").to_string().bright_black(),
                Target::of(record.target()),
                message
            ))
        })
        .filter(move |meta| is_enabled(meta, local_level))
        .chain(std::io::stdout())
        .apply()
}

fn is_enabled(meta: &Metadata, local_level: LevelFilter) -> bool {
    let limit = match Target::of(meta.target()) {
        Target::External(_) => EXTERNAL_LEVEL,
        _ => local_level,
    };

    meta.level() <= limit
}

#[derive(Debug, PartialEq)]
enum Target<'a> {
    External(&'a str),
    Main,
    Server,
    Collab,
}

impl<'a> Target<'a> {
    fn of(target: &'a str) -> Self {
        let krate = target.split("::").next().unwrap_or_default();

        match krate {
            "classroom" => Self::Main,
            "classroom_server" => Self::Server,
            "classroom_collab" => Self::Collab,
            other => Self::External(other),
        }
    }

    fn label(&self) -> ColoredString {
        match self {
            Self::External(name) => name.clear(),
            Self::Main => "MAIN".bright_cyan(),
            Self::Server => "SERVER".bright_green(),
            Self::Collab => "COLLAB".bright_purple(),
        }
    }
}

impl Display for Target<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.label(), f)
    }
}

fn badge(level: Level) -> ColoredString {
    match level {
        Level::Error => " ERR ".black().on_red().bold(),
        Level::Warn => " WRN ".black().on_yellow().bold(),
        Level::Info => " INF ".black().on_blue().bold(),
        Level::Debug => " DBG ".white().on_black(),
        Level::Trace => " TRC ".normal(),
    }
}
