use dialoguer::{Confirm, Input};
use kerntrack_core::{Identity, IdentityPrompt};
use std::path::{Path, PathBuf};

/// Asks on the terminal before deleting an existing clone. Defaults to No.
pub struct TerminalConfirm;

impl kerntrack_core::Confirm for TerminalConfirm {
    fn confirm_replace(&self, path: &Path) -> bool {
        Confirm::new()
            .with_prompt(format!(
                "Folder {} already exists. Delete it and clone again?",
                path.display()
            ))
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

pub struct TerminalIdentity;

impl IdentityPrompt for TerminalIdentity {
    fn ask(&self) -> Option<Identity> {
        let email: String = Input::new()
            .with_prompt("Committer email")
            .interact_text()
            .ok()?;
        let name: String = Input::new()
            .with_prompt("Committer name")
            .interact_text()
            .ok()?;

        Some(Identity {
            email: email.trim().to_string(),
            name: name.trim().to_string(),
        })
    }
}

/// Ask for the parent directory of a clone. An empty answer or an aborted
/// prompt means the user cancelled.
pub fn parent_directory(display_name: &str) -> Option<PathBuf> {
    let home = std::env::var("HOME").unwrap_or_default();
    let answer: String = Input::new()
        .with_prompt(format!("Folder to clone {} into", display_name))
        .default(home)
        .allow_empty(true)
        .interact_text()
        .ok()?;

    let answer = answer.trim();
    if answer.is_empty() {
        None
    } else {
        Some(PathBuf::from(answer))
    }
}
