//! Dependency check command.

use console::style;

use roadcap::config::Settings;
use roadcap::download::check_dependencies;

use crate::cli::display::print_dependencies;

/// Report external tool availability.
pub async fn cmd_check(settings: &Settings) -> anyhow::Result<()> {
    let report = check_dependencies(&settings.ytdlp).await;
    print_dependencies(&report);

    #[cfg(feature = "browser")]
    {
        match roadcap::browser::find_browser(settings.browser.executable.as_ref()) {
            Ok(path) => println!(
                "  {:<10} {} {}",
                "browser",
                style("✓ found").green(),
                style(path.display()).dim()
            ),
            Err(e) => println!("  {:<10} {} {}", "browser", style("✗").red(), e),
        }
    }

    println!();
    if report.ready() {
        println!("{} Ready to download", style("✓").green());
    } else {
        println!("{} Install the missing tools above", style("✗").red());
    }
    Ok(())
}
