//! Open a URL in the user's default browser.

use color_eyre::Result;
use std::process::{Command, Stdio};

/// Platform command that hands a URL to the default browser.
fn opener(url: &str) -> Command {
    if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        cmd.arg(url);
        cmd
    } else if cfg!(target_os = "windows") {
        let mut cmd = Command::new("cmd");
        // empty title argument so `start` does not treat the URL as the window title
        cmd.args(["/C", "start", "", url]);
        cmd
    } else {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(url);
        cmd
    }
}

/// Launch the browser without waiting for it.
pub fn open(url: &str) -> Result<()> {
    let child = opener(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;
    log::debug!("browser launched (pid {})", child.id());
    Ok(())
}
