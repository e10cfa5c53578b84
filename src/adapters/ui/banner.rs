//! Neon ASCII banner (SCHOOL-DESK) with a status line for the desk that is starting.

use crossterm::ExecutableCommand;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use figlet_rs::FIGfont;
use std::io::{Write, stdout};

/// Neon Purple (#bc13fe).
const NEON_PURPLE: (u8, u8, u8) = (0xbc, 0x13, 0xfe);
/// Cyber Green (#0ff0fc).
const CYBER_GREEN: (u8, u8, u8) = (0x0f, 0xf0, 0xfc);
/// Amber (#ffb000), used when the scheduler is off.
const AMBER: (u8, u8, u8) = (0xff, 0xb0, 0x00);

const TITLE: &str = "SCHOOL-DESK";

/// What the desk is about to run with, shown under the title.
#[derive(Debug, Clone, Copy)]
pub struct StartupStatus<'a> {
    pub data_dir: &'a str,
    pub scheduler_running: bool,
    pub tick_secs: u64,
    pub grace_minutes: Option<u32>,
}

/// One color per art line, fading from purple to green.
fn gradient(lines: usize) -> Vec<(u8, u8, u8)> {
    let lerp = |a: u8, b: u8, t: f64| (f64::from(a) * (1.0 - t) + f64::from(b) * t).round() as u8;
    (0..lines)
        .map(|i| {
            let t = if lines <= 1 {
                1.0
            } else {
                i as f64 / (lines - 1) as f64
            };
            (
                lerp(NEON_PURPLE.0, CYBER_GREEN.0, t),
                lerp(NEON_PURPLE.1, CYBER_GREEN.1, t),
                lerp(NEON_PURPLE.2, CYBER_GREEN.2, t),
            )
        })
        .collect()
}

/// Render the title with the built-in figlet font. Falls back to plain text.
fn render_title() -> String {
    FIGfont::standard()
        .ok()
        .and_then(|font| font.convert(TITLE).map(|f| f.to_string()))
        .unwrap_or_else(|| TITLE.to_string())
}

fn status_line(status: &StartupStatus<'_>) -> String {
    let scheduler = if status.scheduler_running {
        format!("auto-absence every {}s", status.tick_secs)
    } else {
        "auto-absence off".to_string()
    };
    let grace = status
        .grace_minutes
        .map(|m| format!("grace {} min", m))
        .unwrap_or_else(|| "grace unavailable".to_string());
    format!(
        "v{} | data {} | {} | {}",
        env!("CARGO_PKG_VERSION"),
        status.data_dir,
        scheduler,
        grace
    )
}

/// Prints the title art with a vertical gradient, then the status line: green when the
/// scheduler is running, amber when it is not.
pub fn print_welcome(status: &StartupStatus<'_>) {
    let mut out = stdout();
    let art = render_title();
    let lines: Vec<&str> = art.lines().collect();

    for (line, (r, g, b)) in lines.iter().zip(gradient(lines.len())) {
        let _ = out.execute(SetForegroundColor(Color::Rgb { r, g, b }));
        let _ = out.execute(Print(line));
        let _ = out.execute(Print("\r\n"));
        let _ = out.execute(ResetColor);
    }

    let (r, g, b) = if status.scheduler_running {
        CYBER_GREEN
    } else {
        AMBER
    };
    let _ = out.execute(SetForegroundColor(Color::Rgb { r, g, b }));
    let _ = out.execute(Print(format!("{}\r\n", status_line(status))));
    let _ = out.execute(ResetColor);
    let _ = out.flush();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gradient_endpoints() {
        let colors = gradient(5);
        assert_eq!(colors.len(), 5);
        assert_eq!(colors[0], NEON_PURPLE);
        assert_eq!(colors[4], CYBER_GREEN);
        assert_eq!(gradient(1), vec![CYBER_GREEN]);
    }

    #[test]
    fn title_renders_multiline() {
        assert!(render_title().lines().count() > 1);
    }

    #[test]
    fn status_line_shows_scheduler_and_grace() {
        let running = StartupStatus {
            data_dir: "./data",
            scheduler_running: true,
            tick_secs: 300,
            grace_minutes: Some(15),
        };
        let line = status_line(&running);
        assert!(line.contains("data ./data"));
        assert!(line.contains("auto-absence every 300s"));
        assert!(line.ends_with("grace 15 min"));

        let stopped = StartupStatus {
            scheduler_running: false,
            grace_minutes: None,
            ..running
        };
        let line = status_line(&stopped);
        assert!(line.contains("auto-absence off"));
        assert!(line.ends_with("grace unavailable"));
    }
}
