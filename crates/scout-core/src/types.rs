use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ScoutError;
use crate::respawn::next_respawn;

/// Number of parallel layers every boss exists in.
pub const LAYER_COUNT: u8 = 9;

// ---------------------------------------------------------------------------
// BossId
// ---------------------------------------------------------------------------

/// One of the fixed set of tracked world bosses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BossId {
    #[serde(rename = "azzy")]
    Azuregos,
    #[serde(rename = "kazzy")]
    Kazzak,
}

impl BossId {
    pub const ALL: [BossId; 2] = [BossId::Azuregos, BossId::Kazzak];

    /// Stable short key used in storage and in inbound requests.
    pub fn key(&self) -> &'static str {
        match self {
            BossId::Azuregos => "azzy",
            BossId::Kazzak => "kazzy",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            BossId::Azuregos => "Azuregos",
            BossId::Kazzak => "Lord Kazzak",
        }
    }
}

impl fmt::Display for BossId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for BossId {
    type Err = ScoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BossId::ALL
            .into_iter()
            .find(|boss| boss.key() == s)
            .ok_or_else(|| ScoutError::UnknownBoss(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Layer
// ---------------------------------------------------------------------------

/// A layer number in `1..=LAYER_COUNT`, labelled `"Layer N"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Layer(u8);

impl Layer {
    pub fn new(number: u8) -> Option<Self> {
        (1..=LAYER_COUNT).contains(&number).then_some(Self(number))
    }

    /// All layers in ascending order.
    pub fn all() -> impl Iterator<Item = Layer> {
        (1..=LAYER_COUNT).map(Layer)
    }

    pub fn number(&self) -> u8 {
        self.0
    }

    /// Parse a human-entered layer number such as `"3"` or `" 7 "`.
    pub fn parse_input(input: &str) -> Result<Self, ScoutError> {
        input
            .trim()
            .parse::<u8>()
            .ok()
            .and_then(Layer::new)
            .ok_or_else(|| ScoutError::InvalidLayer(input.to_string()))
    }

    /// Resolve a canonical label (`"Layer 3"`) back to a layer.
    pub fn from_label(label: &str) -> Result<Self, ScoutError> {
        label
            .strip_prefix("Layer ")
            .and_then(|n| n.parse::<u8>().ok())
            .and_then(Layer::new)
            .ok_or_else(|| ScoutError::UnknownLayer(label.to_string()))
    }

    pub fn label(&self) -> String {
        format!("Layer {}", self.0)
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Layer {}", self.0)
    }
}

impl TryFrom<String> for Layer {
    type Error = ScoutError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Layer::from_label(&value)
    }
}

impl From<Layer> for String {
    fn from(layer: Layer) -> Self {
        layer.label()
    }
}

// ---------------------------------------------------------------------------
// BossStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BossStatus {
    Unknown,
    Alive,
    Dead,
    Defeated,
}

impl BossStatus {
    /// Dead and defeated layers wait on a respawn timer.
    pub fn awaits_respawn(&self) -> bool {
        matches!(self, BossStatus::Dead | BossStatus::Defeated)
    }
}

impl fmt::Display for BossStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BossStatus::Unknown => "unknown",
            BossStatus::Alive => "alive",
            BossStatus::Dead => "dead",
            BossStatus::Defeated => "defeated",
        };
        f.write_str(s)
    }
}

impl FromStr for BossStatus {
    type Err = ScoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(BossStatus::Unknown),
            "alive" => Ok(BossStatus::Alive),
            "dead" => Ok(BossStatus::Dead),
            "defeated" => Ok(BossStatus::Defeated),
            other => Err(ScoutError::InvalidStatus(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// BossLayerState
// ---------------------------------------------------------------------------

/// Tracked state of one layer of one boss for one tenant.
///
/// `next_respawn` is present exactly while the status is dead or defeated.
/// `last_scouted` is never cleared and only moves forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossLayerState {
    layer: Layer,
    status: BossStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    last_scouted: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    next_respawn: Option<DateTime<Utc>>,
}

impl BossLayerState {
    pub fn new(layer: Layer) -> Self {
        Self {
            layer,
            status: BossStatus::Unknown,
            last_scouted: None,
            next_respawn: None,
        }
    }

    pub fn layer(&self) -> Layer {
        self.layer
    }

    pub fn status(&self) -> BossStatus {
        self.status
    }

    pub fn last_scouted(&self) -> Option<DateTime<Utc>> {
        self.last_scouted
    }

    pub fn next_respawn(&self) -> Option<DateTime<Utc>> {
        self.next_respawn
    }

    /// Apply a human sighting reporting `status` at `now`.
    pub fn apply_sighting(&mut self, status: BossStatus, now: DateTime<Utc>) {
        self.status = status;
        self.last_scouted = Some(self.last_scouted.map_or(now, |prev| prev.max(now)));
        self.next_respawn = status.awaits_respawn().then(|| next_respawn(now));
    }

    /// Reset to `Unknown` if the respawn timer has elapsed at `now`.
    ///
    /// Returns `true` when a transition happened.
    pub fn respawn_if_due(&mut self, now: DateTime<Utc>) -> bool {
        match self.next_respawn {
            Some(at) if self.status.awaits_respawn() && now >= at => {
                self.status = BossStatus::Unknown;
                self.next_respawn = None;
                true
            }
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// BossReport
// ---------------------------------------------------------------------------

/// Everything a tenant tracks about one boss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BossReport {
    pub boss: BossId,
    layers: Vec<BossLayerState>,
    pub total_kills: u64,
    /// Handle of the posted status board, owned by the platform.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_ref: Option<String>,
    /// Bumped on every change; lets collaborators drop stale snapshots.
    #[serde(default)]
    revision: u64,
}

impl BossReport {
    pub fn new(boss: BossId) -> Self {
        Self {
            boss,
            layers: Layer::all().map(BossLayerState::new).collect(),
            total_kills: 0,
            message_ref: None,
            revision: 0,
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Record a new board handle (or clear it).
    pub fn set_message_ref(&mut self, message_ref: Option<String>) {
        self.message_ref = message_ref;
        self.revision += 1;
    }

    pub fn layers(&self) -> &[BossLayerState] {
        &self.layers
    }

    pub fn layer(&self, layer: Layer) -> Option<&BossLayerState> {
        self.layers.iter().find(|l| l.layer == layer)
    }

    /// Apply a sighting to one layer, bumping the kill counter on `Defeated`.
    pub fn apply_sighting(
        &mut self,
        layer: Layer,
        status: BossStatus,
        now: DateTime<Utc>,
    ) -> Result<BossLayerState, ScoutError> {
        let state = self
            .layers
            .iter_mut()
            .find(|l| l.layer == layer)
            .ok_or_else(|| ScoutError::UnknownLayer(layer.label()))?;
        state.apply_sighting(status, now);
        let updated = state.clone();
        if status == BossStatus::Defeated {
            self.total_kills += 1;
        }
        self.revision += 1;
        Ok(updated)
    }

    /// Reset every layer whose respawn timer elapsed; returns the layers reset.
    pub fn respawn_due(&mut self, now: DateTime<Utc>) -> Vec<Layer> {
        let reset: Vec<Layer> = self
            .layers
            .iter_mut()
            .filter_map(|l| l.respawn_if_due(now).then_some(l.layer))
            .collect();
        if !reset.is_empty() {
            self.revision += 1;
        }
        reset
    }

    /// Repair a report loaded from storage: one entry per layer, ascending,
    /// with the respawn field consistent with the status.
    pub fn normalized(mut self) -> Self {
        let mut layers: Vec<BossLayerState> = Layer::all()
            .map(|layer| {
                self.layers
                    .iter()
                    .find(|l| l.layer == layer)
                    .cloned()
                    .unwrap_or_else(|| BossLayerState::new(layer))
            })
            .collect();
        for state in &mut layers {
            if !state.status.awaits_respawn() {
                state.next_respawn = None;
            } else if state.next_respawn.is_none() {
                match state.last_scouted {
                    Some(seen) => state.next_respawn = Some(next_respawn(seen)),
                    None => state.status = BossStatus::Unknown,
                }
            }
        }
        self.layers = layers;
        self
    }
}

// ---------------------------------------------------------------------------
// TenantBossReports
// ---------------------------------------------------------------------------

/// The full state of one tenant: one report per boss.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantBossReports {
    reports: Vec<BossReport>,
}

impl TenantBossReports {
    pub fn new() -> Self {
        Self {
            reports: BossId::ALL.into_iter().map(BossReport::new).collect(),
        }
    }

    pub fn reports(&self) -> &[BossReport] {
        &self.reports
    }

    pub fn get(&self, boss: BossId) -> Option<&BossReport> {
        self.reports.iter().find(|r| r.boss == boss)
    }

    pub fn get_mut(&mut self, boss: BossId) -> Option<&mut BossReport> {
        self.reports.iter_mut().find(|r| r.boss == boss)
    }

    /// Replace the report for `report.boss` (used when hydrating from storage).
    pub fn insert(&mut self, report: BossReport) {
        let report = report.normalized();
        match self.get_mut(report.boss) {
            Some(slot) => *slot = report,
            None => self.reports.push(report),
        }
    }
}

impl Default for TenantBossReports {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// ScoutReport
// ---------------------------------------------------------------------------

/// Immutable log record of a single sighting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoutReport {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub tenant_id: String,
    pub boss: BossId,
    pub layer: Layer,
    pub status: BossStatus,
    pub reporter_id: String,
}

impl ScoutReport {
    pub fn new(
        tenant_id: impl Into<String>,
        boss: BossId,
        layer: Layer,
        status: BossStatus,
        reporter_id: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp,
            tenant_id: tenant_id.into(),
            boss,
            layer,
            status,
            reporter_id: reporter_id.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// TenantConfig
// ---------------------------------------------------------------------------

pub const DEFAULT_FOUND_MESSAGE: &str = "@everyone %BOSS% is up on layer %LAYER%!";
pub const DEFAULT_RESPAWN_MESSAGE: &str = "%BOSS% will respawn soon on layer %LAYER%.";

/// Per-tenant notification settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantConfig {
    pub tenant_id: String,
    /// Channel notifications and boards are posted to; `None` until chosen.
    pub notification_channel: Option<String>,
    pub found_message: String,
    pub respawn_message: String,
    pub layer_notifications: bool,
}

impl TenantConfig {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            notification_channel: None,
            found_message: DEFAULT_FOUND_MESSAGE.to_string(),
            respawn_message: DEFAULT_RESPAWN_MESSAGE.to_string(),
            layer_notifications: true,
        }
    }
}

/// Substitute `%BOSS%` and `%LAYER%` in a tenant message template.
pub fn render_template(template: &str, boss: BossId, layer: Layer) -> String {
    template
        .replace("%BOSS%", boss.display_name())
        .replace("%LAYER%", &layer.number().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn layer_input_accepts_one_through_nine() {
        assert_eq!(Layer::parse_input("1").unwrap().number(), 1);
        assert_eq!(Layer::parse_input(" 9 ").unwrap().number(), 9);
        for bad in ["0", "10", "-1", "three", "", "Layer 3"] {
            assert!(
                matches!(Layer::parse_input(bad), Err(ScoutError::InvalidLayer(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn layer_label_round_trip() {
        let layer = Layer::new(4).unwrap();
        assert_eq!(layer.label(), "Layer 4");
        assert_eq!(Layer::from_label("Layer 4").unwrap(), layer);
        assert!(matches!(
            Layer::from_label("Layer 12"),
            Err(ScoutError::UnknownLayer(_))
        ));
    }

    #[test]
    fn boss_keys_parse() {
        assert_eq!("azzy".parse::<BossId>().unwrap(), BossId::Azuregos);
        assert_eq!("kazzy".parse::<BossId>().unwrap(), BossId::Kazzak);
        assert!(matches!(
            "onyxia".parse::<BossId>(),
            Err(ScoutError::UnknownBoss(_))
        ));
    }

    #[test]
    fn new_report_has_nine_unknown_layers() {
        let report = BossReport::new(BossId::Kazzak);
        assert_eq!(report.layers().len(), 9);
        assert_eq!(report.total_kills, 0);
        let numbers: Vec<u8> = report.layers().iter().map(|l| l.layer().number()).collect();
        assert_eq!(numbers, (1..=9).collect::<Vec<_>>());
        assert!(report
            .layers()
            .iter()
            .all(|l| l.status() == BossStatus::Unknown && l.next_respawn().is_none()));
    }

    #[test]
    fn dead_sighting_schedules_respawn() {
        let mut state = BossLayerState::new(Layer::new(2).unwrap());
        let now = at(2024, 1, 3, 12);
        state.apply_sighting(BossStatus::Dead, now);
        assert_eq!(state.status(), BossStatus::Dead);
        assert_eq!(state.last_scouted(), Some(now));
        assert_eq!(state.next_respawn(), Some(next_respawn(now)));
    }

    #[test]
    fn alive_and_unknown_sightings_clear_respawn() {
        for status in [BossStatus::Alive, BossStatus::Unknown] {
            let mut state = BossLayerState::new(Layer::new(2).unwrap());
            state.apply_sighting(BossStatus::Defeated, at(2024, 1, 3, 12));
            state.apply_sighting(status, at(2024, 1, 4, 12));
            assert_eq!(state.status(), status);
            assert!(state.next_respawn().is_none());
            assert_eq!(state.last_scouted(), Some(at(2024, 1, 4, 12)));
        }
    }

    #[test]
    fn last_scouted_never_moves_backwards() {
        let mut state = BossLayerState::new(Layer::new(1).unwrap());
        state.apply_sighting(BossStatus::Alive, at(2024, 1, 5, 0));
        state.apply_sighting(BossStatus::Alive, at(2024, 1, 4, 0));
        assert_eq!(state.last_scouted(), Some(at(2024, 1, 5, 0)));
    }

    #[test]
    fn respawn_only_fires_once_due() {
        let mut state = BossLayerState::new(Layer::new(1).unwrap());
        let killed = at(2024, 1, 3, 12);
        state.apply_sighting(BossStatus::Dead, killed);
        let due = state.next_respawn().unwrap();

        assert!(!state.respawn_if_due(due - chrono::Duration::seconds(1)));
        assert!(state.respawn_if_due(due));
        assert_eq!(state.status(), BossStatus::Unknown);
        assert_eq!(state.last_scouted(), Some(killed));
        assert!(!state.respawn_if_due(due));
    }

    #[test]
    fn defeated_sighting_counts_every_time() {
        let mut report = BossReport::new(BossId::Azuregos);
        let layer = Layer::new(5).unwrap();
        report
            .apply_sighting(layer, BossStatus::Defeated, at(2024, 1, 3, 12))
            .unwrap();
        report
            .apply_sighting(layer, BossStatus::Defeated, at(2024, 1, 3, 13))
            .unwrap();
        report
            .apply_sighting(layer, BossStatus::Dead, at(2024, 1, 3, 14))
            .unwrap();
        assert_eq!(report.total_kills, 2);
    }

    #[test]
    fn revision_moves_only_on_change() {
        let mut report = BossReport::new(BossId::Kazzak);
        assert_eq!(report.revision(), 0);

        let killed = at(2024, 1, 3, 12);
        report
            .apply_sighting(Layer::new(1).unwrap(), BossStatus::Dead, killed)
            .unwrap();
        assert_eq!(report.revision(), 1);

        assert!(report.respawn_due(killed).is_empty());
        assert_eq!(report.revision(), 1);
        assert_eq!(report.respawn_due(next_respawn(killed)).len(), 1);
        assert_eq!(report.revision(), 2);

        report.set_message_ref(Some("board".into()));
        assert_eq!(report.revision(), 3);
    }

    #[test]
    fn normalized_repairs_stored_report() {
        let json = r#"{
            "boss": "kazzy",
            "layers": [
                {"layer": "Layer 3", "status": "alive", "next_respawn": "2024-01-06T12:00:00Z"},
                {"layer": "Layer 1", "status": "dead", "last_scouted": "2024-01-03T12:00:00Z"}
            ],
            "total_kills": 4
        }"#;
        let report: BossReport = serde_json::from_str(json).unwrap();
        let report = report.normalized();

        assert_eq!(report.layers().len(), 9);
        assert_eq!(report.layers()[0].layer().number(), 1);
        assert_eq!(
            report.layers()[0].next_respawn(),
            Some(next_respawn(at(2024, 1, 3, 12)))
        );
        assert!(report.layers()[2].next_respawn().is_none());
        assert_eq!(report.total_kills, 4);
    }

    #[test]
    fn template_substitutes_every_placeholder() {
        let text = render_template(
            "%BOSS% on %LAYER% (%LAYER%)",
            BossId::Kazzak,
            Layer::new(3).unwrap(),
        );
        assert_eq!(text, "Lord Kazzak on 3 (3)");
    }
}
