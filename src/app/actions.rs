use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::info;

use crate::app::menu::Menu;
use crate::app::{App, Control, Screen};
use crate::orchestrator::{Orchestrator, Phase, PromptInput};

pub fn handle_key(app: &mut App, key: KeyEvent) -> Control {
    let quit = matches!(key.code, KeyCode::Char('q'))
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL));
    if quit {
        return Control::Quit;
    }
    match &mut app.screen {
        Screen::Menu => menu_key(&mut app.menu, key.code),
        Screen::Install(orchestrator) => install_key(orchestrator, key.code),
    }
}

pub fn menu_key(menu: &mut Menu, code: KeyCode) -> Control {
    match code {
        KeyCode::Up | KeyCode::Char('k') => menu.up(),
        KeyCode::Down | KeyCode::Char('j') => menu.down(),
        KeyCode::Enter | KeyCode::Char(' ') => menu.toggle(),
        KeyCode::Char('n') => return Control::StartInstall,
        _ => {}
    }
    Control::Continue
}

fn install_key(orchestrator: &mut Orchestrator, code: KeyCode) -> Control {
    match orchestrator.phase() {
        Phase::Prompting => {
            if let Some(input) = prompt_input(code) {
                orchestrator.handle(input);
            }
            Control::Continue
        }
        Phase::Complete if code == KeyCode::Enter => Control::Quit,
        _ => Control::Continue,
    }
}

pub fn prompt_input(code: KeyCode) -> Option<PromptInput> {
    match code {
        KeyCode::Char('y') | KeyCode::Enter => Some(PromptInput::AcceptDefault),
        KeyCode::Char('n') | KeyCode::Char('s') => Some(PromptInput::Skip),
        KeyCode::Char('u') => Some(PromptInput::Update),
        KeyCode::Char('i') => Some(PromptInput::Install),
        KeyCode::Char('r') => Some(PromptInput::Reinstall),
        _ => None,
    }
}

/// Leave the menu and hand the selection to a fresh orchestrator.
pub fn start_install(app: &mut App) {
    let selection = app.preselected.take().unwrap_or_else(|| app.menu.selection());
    info!(count = selection.len(), "starting installation flow");
    let mut orchestrator = Orchestrator::new(selection, Arc::clone(&app.backend));
    orchestrator.start();
    app.screen = Screen::Install(Box::new(orchestrator));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::menu::MenuItem;
    use crate::toolchain::ToolchainId;

    #[test]
    fn test_prompt_keys() {
        assert_eq!(prompt_input(KeyCode::Enter), Some(PromptInput::AcceptDefault));
        assert_eq!(prompt_input(KeyCode::Char('y')), Some(PromptInput::AcceptDefault));
        assert_eq!(prompt_input(KeyCode::Char('n')), Some(PromptInput::Skip));
        assert_eq!(prompt_input(KeyCode::Char('s')), Some(PromptInput::Skip));
        assert_eq!(prompt_input(KeyCode::Char('u')), Some(PromptInput::Update));
        assert_eq!(prompt_input(KeyCode::Char('i')), Some(PromptInput::Install));
        assert_eq!(prompt_input(KeyCode::Char('r')), Some(PromptInput::Reinstall));
        assert_eq!(prompt_input(KeyCode::Char('x')), None);
    }

    #[test]
    fn test_menu_keys() {
        let mut menu = Menu::new(vec![
            MenuItem {
                id: ToolchainId::new("go"),
                name: "Go",
            },
            MenuItem {
                id: ToolchainId::new("python"),
                name: "Python",
            },
        ]);
        assert_eq!(menu_key(&mut menu, KeyCode::Char('j')), Control::Continue);
        assert_eq!(menu_key(&mut menu, KeyCode::Char(' ')), Control::Continue);
        assert_eq!(menu_key(&mut menu, KeyCode::Char('n')), Control::StartInstall);
        assert_eq!(menu.selection(), vec![ToolchainId::new("python")]);
    }
}
