use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use scribe_editor::{ContentStore, DocumentRef, FsContentStore, StoreError};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Content directory
    #[arg(short, long, default_value = "content")]
    pub content_root: String,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    // Check if config already exists
    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing Scribe project...".bright_blue().bold());

    let config = Config {
        content_root: args.content_root.clone(),
        ..Config::default()
    };

    // Seed a first post from the new-document template
    let store = FsContentStore::new(config.get_content_root(cwd));
    let welcome = DocumentRef::new("posts", "welcome.md");
    match store.create(&welcome, &config.editor.new_document_template) {
        Ok(()) => println!("  {} Created {}/{}", "✓".green(), args.content_root, welcome),
        Err(StoreError::AlreadyExists { .. }) => {}
        Err(err) => return Err(err.into()),
    }

    // Write config file
    let config_json = serde_json::to_string_pretty(&config)?;
    fs::write(&config_path, config_json)?;

    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);
    println!();
    println!("{}", "✅ Project initialized!".green().bold());
    println!();
    println!("Next steps:");
    println!("  1. Edit {}/{}", args.content_root, welcome);
    println!("  2. Run: scribe watch {}/{} --out preview.html", args.content_root, welcome);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_config_and_welcome_post() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().display().to_string();

        init(
            InitArgs {
                content_root: "content".into(),
                force: false,
            },
            &cwd,
        )
        .unwrap();

        let config = Config::load(&cwd).unwrap();
        assert_eq!(config.content_root, "content");
        let welcome = fs::read_to_string(dir.path().join("content/posts/welcome.md")).unwrap();
        assert_eq!(welcome, config.editor.new_document_template);
    }
}
