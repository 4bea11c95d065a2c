use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::types::{BossLayerState, BossReport, BossStatus};

/// Render the status board text for one boss.
///
/// Timestamps use the chat platform's `<t:UNIX>` markup so each reader sees
/// their own local time.
pub fn render_board(report: &BossReport) -> String {
    let mut out = format!("# {} Scouting Report", report.boss.display_name());
    for layer in report.layers() {
        out.push('\n');
        out.push_str(&render_layer(layer));
    }
    let _ = write!(out, "\n-# total kills: {}", report.total_kills);
    out
}

fn render_layer(state: &BossLayerState) -> String {
    let label = state.layer().label();
    match state.status() {
        BossStatus::Alive => format!("- **{label}:** 👿 **Alive**"),
        BossStatus::Dead | BossStatus::Defeated => {
            let respawn = state
                .next_respawn()
                .map(|t| format!("**{}**", timestamp_tag(t)))
                .unwrap_or_else(|| "*unknown*".to_string());
            format!("- ~~**{label}:**~~ 💀 - respawn: {respawn}")
        }
        BossStatus::Unknown => match state.last_scouted() {
            Some(seen) => format!("- **{label}:** *👀: {}*", timestamp_tag(seen)),
            None => format!("- **{label}:** *unknown*"),
        },
    }
}

fn timestamp_tag(at: DateTime<Utc>) -> String {
    format!("<t:{}>", at.timestamp())
}
