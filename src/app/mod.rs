pub mod actions;
pub mod menu;
pub mod state;
pub mod ui;

use std::io::Stdout;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{execute, ExecutableCommand};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};

use crate::orchestrator::Backend;
use crate::platform::Platform;
use crate::toolchain::ToolchainId;

pub use menu::{Menu, MenuItem};
pub use state::{Control, Screen};

pub struct AppOptions {
    pub platform: Platform,
    pub poll_interval: Duration,
    pub dry_run: bool,
    pub use_sudo: bool,
    /// Ids from `--select`; skips the menu when set.
    pub preselected: Option<Vec<ToolchainId>>,
}

pub struct App {
    pub(crate) screen: Screen,
    pub(crate) menu: Menu,
    pub(crate) backend: Arc<dyn Backend>,
    pub(crate) preselected: Option<Vec<ToolchainId>>,
    pub(crate) platform: Platform,
    pub(crate) dry_run: bool,
    use_sudo: bool,
    poll_interval: Duration,
}

impl App {
    pub fn new(menu: Menu, backend: Arc<dyn Backend>, options: AppOptions) -> Self {
        Self {
            screen: Screen::Menu,
            menu,
            backend,
            preselected: options.preselected,
            platform: options.platform,
            dry_run: options.dry_run,
            use_sudo: options.use_sudo,
            poll_interval: options.poll_interval,
        }
    }

    fn needs_sudo(&self) -> bool {
        !self.dry_run && self.use_sudo
    }

    pub fn run(&mut self) -> Result<()> {
        if self.preselected.is_some() {
            if self.needs_sudo() {
                authenticate_sudo();
            }
            actions::start_install(self);
        }

        enable_raw_mode().context("failed to enable raw mode")?;
        let mut stdout = std::io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            disable_raw_mode().ok();
            return Err(e).context("failed to enter alternate screen");
        }

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = match Terminal::new(backend) {
            Ok(t) => t,
            Err(e) => {
                disable_raw_mode().ok();
                std::io::stdout().execute(LeaveAlternateScreen).ok();
                return Err(e).context("failed to create terminal");
            }
        };

        let result = self.event_loop(&mut terminal);

        disable_raw_mode().ok();
        terminal.backend_mut().execute(LeaveAlternateScreen).ok();
        terminal.show_cursor().ok();

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        loop {
            if let Screen::Install(orchestrator) = &mut self.screen {
                orchestrator.tick();
            }

            terminal
                .draw(|f| ui::render(self, f))
                .context("failed to draw frame")?;

            if !event::poll(self.poll_interval).context("event poll failed")? {
                continue;
            }
            let key = match event::read().context("failed to read event")? {
                Event::Key(key) if key.kind == KeyEventKind::Press => key,
                _ => continue,
            };

            match actions::handle_key(self, key) {
                Control::Continue => {}
                Control::Quit => {
                    info!("quit requested");
                    break;
                }
                Control::StartInstall => {
                    if self.needs_sudo() {
                        disable_raw_mode().ok();
                        std::io::stdout().execute(LeaveAlternateScreen).ok();
                        authenticate_sudo();
                        std::io::stdout().execute(EnterAlternateScreen).ok();
                        enable_raw_mode().ok();
                        terminal.clear().ok();
                        terminal.hide_cursor().ok();
                    }
                    actions::start_install(self);
                }
            }
        }
        Ok(())
    }
}

/// Prompt for the sudo password once, so runner threads can use cached
/// credentials without a terminal.
fn authenticate_sudo() {
    println!("\n[sudo] Authenticating for system installation...");
    match Command::new("sudo").arg("-v").status() {
        Ok(status) if status.success() => {}
        Ok(status) => warn!("sudo -v exited with {status}"),
        Err(e) => warn!("failed to run sudo -v: {e}"),
    }
}
