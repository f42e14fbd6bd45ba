use anyhow::Result;
use colored::Colorize;
use kerntrack_core::Identity;
use std::path::PathBuf;

pub fn run(email: Option<String>, name: Option<String>, config: Option<PathBuf>) -> Result<()> {
    let store = super::get_settings_store(config)?;
    let mut settings = store.load()?;

    if let (Some(email), Some(name)) = (email, name) {
        settings.identity = Some(Identity { email, name });
        store.save(&settings)?;
        println!("{}", "✓ Committer identity saved".green().bold());
    }

    match &settings.identity {
        Some(identity) => {
            println!("{}", "Committer Identity".bold().cyan());
            println!("  {}: {}", "Name".bold(), identity.name);
            println!("  {}: {}", "Email".bold(), identity.email);
        }
        None => {
            println!("{}", "No committer identity cached".yellow());
            println!(
                "Set one with {} or let {} ask for it",
                "kerntrack identity --email <e> --name <n>".cyan(),
                "kerntrack push".cyan()
            );
        }
    }
    println!("  {}: {}", "Settings".bold(), store.path().display().to_string().dimmed());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use kerntrack_core::SettingsStore;
    use tempfile::TempDir;

    #[test]
    fn test_identity_is_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");

        run(
            Some("dev@example.com".to_string()),
            Some("Dev".to_string()),
            Some(path.clone()),
        )
        .unwrap();

        let settings = SettingsStore::new(&path).load().unwrap();
        assert_eq!(
            settings.identity,
            Some(Identity {
                email: "dev@example.com".to_string(),
                name: "Dev".to_string(),
            })
        );
    }

    #[test]
    fn test_show_without_settings_file_does_not_create_it() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");

        run(None, None, Some(path.clone())).unwrap();
        assert!(!path.exists());
    }
}
