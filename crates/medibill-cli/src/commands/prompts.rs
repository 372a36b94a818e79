//! Prompts-related command implementations

use std::collections::HashMap;

use anyhow::Result;
use chrono::Local;
use medibill_core::prompts::{default_prompts_dir, PromptId, PromptLibrary};

/// List prompts and their override status, optionally with the rendered text
pub fn cmd_prompts(show: bool) -> Result<()> {
    let mut library = PromptLibrary::new();
    print!("{}", list_prompts(&mut library));

    if show {
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        print!("{}", show_prompt(&mut library, PromptId::AnalyzeBill, &today)?);
    }

    Ok(())
}

/// Prompt table plus where overrides go
pub fn list_prompts(library: &mut PromptLibrary) -> String {
    let mut out = String::from("Available Prompts:\n\n");

    out.push_str(&format!(
        "{:<20} {:>7}  {:<20}  {}\n",
        "ID", "VERSION", "TASK TYPE", "OVERRIDE"
    ));
    out.push_str(&format!("{}\n", "-".repeat(62)));

    for info in library.list() {
        let override_status = match &info.override_path {
            Some(path) if info.has_override => format!("✓ Custom ({})", path.display()),
            _ => "Default".to_string(),
        };
        out.push_str(&format!(
            "{:<20} {:>7}  {:<20}  {}\n",
            info.id, info.version, info.task_type, override_status
        ));
    }

    let dir = library
        .override_dir()
        .cloned()
        .or_else(default_prompts_dir)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not available)".to_string());
    out.push_str(&format!("\nOverride directory: {}\n", dir));

    out
}

/// The prompt as it would be sent on `date`
pub fn show_prompt(library: &mut PromptLibrary, id: PromptId, date: &str) -> Result<String> {
    let prompt = library.get(id)?;

    let mut vars = HashMap::new();
    vars.insert("date", date);

    let mut out = String::new();
    out.push_str(&format!("\nPrompt: {}\n", prompt.metadata.id));
    out.push_str(&format!("Version: {}\n", prompt.metadata.version));
    out.push_str(&format!(
        "Source: {}\n",
        if prompt.is_override {
            "Override"
        } else {
            "Default"
        }
    ));

    if let Some(system) = prompt.system_section() {
        out.push_str("\n--- System ---\n");
        out.push_str(system.trim());
        out.push('\n');
    }
    out.push_str("\n--- User ---\n");
    out.push_str(prompt.render_user(&vars).trim());
    out.push('\n');

    Ok(out)
}
