use crate::orchestrator::Orchestrator;

/// Which screen the event loop is driving.
pub enum Screen {
    Menu,
    Install(Box<Orchestrator>),
}

/// What the event loop should do after a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    StartInstall,
    Quit,
}
