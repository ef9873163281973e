//! Startup banner and session summary display.

use crate::consts::{AUTHOR, HOMEPAGE, REPO, format_number};

/// Startup results for display in the banner.
pub struct BannerInfo<'a> {
    pub engine_id: &'a str,
    pub instance: u64,
    pub entry_point: &'a str,
    /// `"created"` or `"reused"`.
    pub outcome: &'a str,
    pub timeout_secs: u64,
    pub settings: &'a str,
}

/// Print the startup banner with session info.
pub fn print_banner(info: &BannerInfo) {
    println!(
        r#"
   ╔═══════════════════════════════════════╗
   ║           M E D T R A C K             ║
   ║   reminders that run in the dark      ║
   ╚═══════════════════════════════════════╝

   version   {}
   by        {}
   home      {}
   repo      {}
   engine    {} #{} ({})
   entry     {}
   timeout   {}s
   settings  {}
"#,
        env!("CARGO_PKG_VERSION"),
        AUTHOR,
        HOMEPAGE,
        REPO,
        info.engine_id,
        info.instance,
        info.outcome,
        info.entry_point,
        info.timeout_secs,
        info.settings,
    );
}

/// Print the session summary (dispatch count + farewell).
pub fn print_session_summary(dispatched: u64) {
    if dispatched > 0 {
        println!("session: {} trigger(s) dispatched", format_number(dispatched));
    }
    println!("goodbye.");
}
