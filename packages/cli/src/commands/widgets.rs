use anyhow::Result;
use clap::Args;
use colored::Colorize;
use scribe_evaluator::CapabilitySet;

#[derive(Debug, Args)]
pub struct WidgetsArgs {
    /// Also print each widget's usage template
    #[arg(short, long)]
    pub templates: bool,
}

pub fn widgets(args: WidgetsArgs) -> Result<()> {
    let capabilities = CapabilitySet::builtins();
    println!("{} {} widgets", "🧩".bright_blue(), capabilities.len());

    for name in capabilities.names() {
        let Some(widget) = capabilities.get(name) else {
            continue;
        };
        println!("  {} {}", name.bright_white().bold(), widget.describe().dimmed());

        if args.templates {
            for line in widget.template().lines() {
                println!("      {}", line);
            }
        }
    }

    Ok(())
}
