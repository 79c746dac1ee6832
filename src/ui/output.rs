use crate::ui::Icons;
use owo_colors::{OwoColorize, Style};
use std::sync::OnceLock;

static PALETTE: OnceLock<Palette> = OnceLock::new();

/// Style per output role, resolved once at first print
struct Palette {
    header: Style,
    success: Style,
    error: Style,
    warn: Style,
    info: Style,
    dim: Style,
    muted: Style,
}

fn palette() -> &'static Palette {
    PALETTE.get_or_init(|| {
        let color = console::Term::stdout().is_term() && console::colors_enabled();
        let on = |style: Style| if color { style } else { Style::new() };
        Palette {
            header: on(Style::new().blue().bold()),
            success: on(Style::new().green().bold()),
            error: on(Style::new().red().bold()),
            warn: on(Style::new().yellow().bold()),
            info: on(Style::new().cyan()),
            dim: on(Style::new().white().dimmed()),
            muted: on(Style::new().bright_black()),
        }
    })
}

pub fn header(text: &str) {
    println!("{} {}", Icons::BALL, text.style(palette().header.clone()));
}

pub fn status(icon: &str, label: &str, value: &str) {
    println!("{} {}: {}", icon, label.style(palette().dim.clone()), value);
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(palette().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(palette().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(palette().warn.clone()));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(palette().info.clone()),
        label.style(palette().dim.clone()),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(palette().header.clone()));
}

pub fn dim(text: &str) -> String {
    text.style(palette().dim.clone()).to_string()
}

pub fn muted(text: &str) -> String {
    text.style(palette().muted.clone()).to_string()
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(palette().dim.clone()), value);
}
