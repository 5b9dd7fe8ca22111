//! Check-config command

use colored::Colorize;

use crate::context::Context;
use crate::error::Result;

/// Print the validated configuration. Loading already validated it.
pub fn run_check_config(ctx: &Context) -> Result<()> {
    let config = &ctx.config;

    println!("{}", "Configuration OK".green().bold());
    println!();
    println!("{}:    {}", "File".dimmed(), ctx.path.display());
    println!("{}: {}", "Workdir".dimmed(), ctx.workdir_root().display());
    println!("{}:    {}", "Host".dimmed(), config.git.host);
    println!(
        "{}:   {} via {}",
        "Model".dimmed(),
        config.model.model.cyan(),
        config.model.base_url
    );
    if std::env::var(&config.model.api_key_env).map_or(true, |v| v.is_empty()) {
        println!(
            "  {} {} is not set; conflicted merges cannot be resolved",
            "!".yellow(),
            config.model.api_key_env
        );
    }
    println!(
        "{}:   {}",
        "Tests".dimmed(),
        if config.run.run_tests { "enabled" } else { "disabled" }
    );
    println!(
        "{}: {}",
        "Reports".dimmed(),
        if config.report.enabled { "enabled" } else { "disabled" }
    );
    println!();

    if ctx.accounts.is_empty() {
        println!("{}", "No accounts configured".yellow());
        return Ok(());
    }

    for account in &ctx.accounts {
        println!("{} ({} pair(s))", account.name.bold(), account.repos.len());
        for pair in &account.repos {
            println!("  {} {} {} {}", "+".green(), pair.upstream, "->".dimmed(), pair.fork.to_string().cyan());
        }
    }

    Ok(())
}
