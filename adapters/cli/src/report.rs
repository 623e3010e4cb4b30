use std::fmt;

use encounter_oracle_core::{Encounter, LinearMatch, Rarity, SearchOutcome};
use encounter_oracle_memory::{ActiveSpawn, WildBattler, HIDDEN_ABILITY_SLOT};
use encounter_oracle_reference_data::NameTable;
use encounter_oracle_system_aggressive_path::AdvanceMatch;
use encounter_oracle_system_linear_search::{OutbreakRound, RoundMatch, ScanHit, SpawnKind};
use encounter_oracle_system_passive_path::PassiveReport;
use serde::Serialize;

const INDENT: &str = "  ";

const fn shiny_label(rarity: Rarity) -> &'static str {
    match rarity {
        Rarity::Common => "false",
        Rarity::Star => "star",
        Rarity::Square => "square",
    }
}

fn join_stats(stats: &[u8]) -> String {
    stats.iter().map(u8::to_string).collect::<Vec<_>>().join("/")
}

fn write_encounter(
    f: &mut fmt::Formatter<'_>,
    encounter: &Encounter,
    species: Option<&str>,
    natures: &NameTable,
) -> fmt::Result {
    let record = encounter.record();
    writeln!(f, "{INDENT}Generator Seed: {:X}", encounter.generator_seed())?;
    writeln!(f, "{INDENT}Seed: {:X}", encounter.seed())?;
    match species {
        Some(species) => writeln!(f, "{INDENT}Species: {species} (slot {:.3})", encounter.slot())?,
        None => writeln!(f, "{INDENT}Slot: {:.3}", encounter.slot())?,
    }
    if encounter.is_alpha() {
        writeln!(f, "{INDENT}Alpha: true")?;
    }
    writeln!(f, "{INDENT}Shiny: {}", shiny_label(record.rarity()))?;
    writeln!(
        f,
        "{INDENT}EC: {:X} PID: {:X}",
        record.identity_constant(),
        record.personality_value()
    )?;
    writeln!(
        f,
        "{INDENT}Nature: {} Ability: {} Gender: {}",
        natures.name_or_index(usize::from(record.personality_trait_index())),
        record.secondary_trait(),
        record.sex_value()
    )?;
    writeln!(f, "{INDENT}IVs: {}", join_stats(&record.genetic_stats()))
}

fn write_round(f: &mut fmt::Formatter<'_>, round: &OutbreakRound, natures: &NameTable) -> fmt::Result {
    for spawn in round.spawns() {
        let (label, index) = match spawn.kind() {
            SpawnKind::Initial { index } => ("Initial", index),
            SpawnKind::Respawn { index } => ("Respawn", index),
        };
        let marker = if spawn.matched() { " *" } else { "" };
        writeln!(f, "{label} {index}{marker}")?;
        write_encounter(f, spawn.encounter(), None, natures)?;
    }
    Ok(())
}

fn write_exhausted(f: &mut fmt::Formatter<'_>, ceiling: u32) -> fmt::Result {
    writeln!(f, "No results before limit ({ceiling})")
}

/// Current encounter and next filtered advance of one spawner.
#[derive(Serialize)]
pub(crate) struct SeedReport<'a> {
    pub(crate) group_seed: u64,
    pub(crate) current: Encounter,
    pub(crate) current_species: Option<String>,
    pub(crate) outcome: SearchOutcome<LinearMatch>,
    pub(crate) outcome_species: Option<String>,
    pub(crate) within_threshold: Option<bool>,
    #[serde(skip)]
    pub(crate) natures: &'a NameTable,
}

impl fmt::Display for SeedReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Group Seed: {:X}", self.group_seed)?;
        writeln!(f, "Current:")?;
        write_encounter(f, &self.current, self.current_species.as_deref(), self.natures)?;
        match &self.outcome {
            SearchOutcome::Found(found) => {
                let close = if self.within_threshold == Some(true) {
                    " (within threshold)"
                } else {
                    ""
                };
                writeln!(f, "Next Filtered: {}{close}", found.advance())?;
                write_encounter(
                    f,
                    found.encounter(),
                    self.outcome_species.as_deref(),
                    self.natures,
                )
            }
            SearchOutcome::Exhausted { ceiling } => write_exhausted(f, *ceiling),
        }
    }
}

/// Spawners of a location that match within the ceiling.
#[derive(Serialize)]
pub(crate) struct ScanReport<'a> {
    pub(crate) hits: Vec<ScanHit<u32>>,
    #[serde(skip)]
    pub(crate) natures: &'a NameTable,
}

impl fmt::Display for ScanReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits.is_empty() {
            return writeln!(f, "No spawner matches before the limit");
        }
        for hit in &self.hits {
            writeln!(f, "Group {}: advance {}", hit.key(), hit.found().advance())?;
            write_encounter(f, hit.found().encounter(), None, self.natures)?;
        }
        Ok(())
    }
}

/// Current round of a mass outbreak and the next round holding a match.
#[derive(Serialize)]
pub(crate) struct OutbreakReport<'a> {
    pub(crate) group_seed: u64,
    pub(crate) current: OutbreakRound,
    pub(crate) outcome: SearchOutcome<RoundMatch>,
    #[serde(skip)]
    pub(crate) natures: &'a NameTable,
}

impl fmt::Display for OutbreakReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Group Seed: {:X}", self.group_seed)?;
        write_round(f, &self.current, self.natures)?;
        match &self.outcome {
            SearchOutcome::Found(found) => {
                writeln!(
                    f,
                    "Next Filtered: advance {} (group seed {:X})",
                    found.advance(),
                    found.round().group_seed()
                )?;
                write_round(f, found.round(), self.natures)
            }
            SearchOutcome::Exhausted { ceiling } => write_exhausted(f, *ceiling),
        }
    }
}

/// Passive paths found for one group seed.
#[derive(Serialize)]
pub(crate) struct PassiveView<'a> {
    pub(crate) report: PassiveReport,
    #[serde(skip)]
    pub(crate) natures: &'a NameTable,
}

impl fmt::Display for PassiveView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Group Seed: {:X}", self.report.group_seed())?;
        if self.report.is_empty() {
            return writeln!(
                f,
                "No paths found ({} candidates simulated)",
                self.report.candidates_simulated()
            );
        }
        for found in self.report.info().values() {
            writeln!(f, "Paths:")?;
            for path in found.paths() {
                writeln!(f, "{INDENT}{path}")?;
            }
            write_encounter(f, found.encounter(), None, self.natures)?;
        }
        Ok(())
    }
}

/// Batch paths through the first group seed that yields a match.
#[derive(Serialize)]
pub(crate) struct AggressiveView<'a> {
    pub(crate) group_seed: u64,
    pub(crate) outcome: SearchOutcome<AdvanceMatch>,
    #[serde(skip)]
    pub(crate) natures: &'a NameTable,
}

impl fmt::Display for AggressiveView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Group Seed: {:X}", self.group_seed)?;
        let found = match &self.outcome {
            SearchOutcome::Found(found) => found,
            SearchOutcome::Exhausted { ceiling } => return write_exhausted(f, *ceiling),
        };
        let report = found.report();
        writeln!(
            f,
            "Advance {} (group seed {:X}, {} paths simulated)",
            found.advance(),
            report.group_seed(),
            report.paths_simulated()
        )?;
        for found in report.matches() {
            writeln!(
                f,
                "Path: {} (full {}) spawn {}",
                found.effective_path(),
                found.full_path(),
                found.spawn_number()
            )?;
            write_encounter(f, found.encounter(), None, self.natures)?;
        }
        Ok(())
    }
}

/// Spawner able to produce a candidate, with the candidate's share of its table.
#[derive(Serialize)]
pub(crate) struct PossibleSpawner {
    pub(crate) group_id: u32,
    pub(crate) name: String,
    pub(crate) share_percent: f64,
}

/// Every spawner of a location able to produce a candidate.
#[derive(Serialize)]
pub(crate) struct PossibleReport {
    pub(crate) spawners: Vec<PossibleSpawner>,
}

impl fmt::Display for PossibleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.spawners.is_empty() {
            return writeln!(f, "No spawner can produce it under these conditions");
        }
        for spawner in &self.spawners {
            writeln!(
                f,
                "Group {} ({}): {:.2}%",
                spawner.group_id, spawner.name, spawner.share_percent
            )?;
        }
        Ok(())
    }
}

/// Bytes written to move the player.
#[derive(Serialize)]
pub(crate) struct TeleportReport {
    pub(crate) pointer: String,
    pub(crate) bytes: String,
}

impl fmt::Display for TeleportReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} <- {}", self.pointer, self.bytes)
    }
}

/// Wild individuals of the current battle.
#[derive(Serialize)]
pub(crate) struct BattleReport<'a> {
    pub(crate) battlers: Vec<WildBattler>,
    #[serde(skip)]
    pub(crate) species: &'a NameTable,
    #[serde(skip)]
    pub(crate) natures: &'a NameTable,
}

impl fmt::Display for BattleReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.battlers.is_empty() {
            return writeln!(f, "No wild battlers");
        }
        for battler in &self.battlers {
            let record = battler.record();
            write!(
                f,
                "{} {}",
                u32::from(battler.index()) + 1,
                self.species.name_or_index(usize::from(record.species()))
            )?;
            if record.form() > 0 {
                write!(f, "-{}", record.form())?;
            }
            writeln!(f)?;
            writeln!(f, "{INDENT}Shiny: {}", shiny_label(record.rarity()))?;
            writeln!(
                f,
                "{INDENT}EC: {:08X} PID: {:08X}",
                record.identity_constant(),
                record.personality_value()
            )?;
            let ability = if record.ability_slot() >= HIDDEN_ABILITY_SLOT {
                "H".to_owned()
            } else {
                record.ability_slot().to_string()
            };
            writeln!(
                f,
                "{INDENT}Nature: {} Ability: {ability}",
                self.natures
                    .name_or_index(usize::from(record.personality_trait_index()))
            )?;
            writeln!(f, "{INDENT}IVs: {}", join_stats(&record.genetic_stats()))?;
        }
        Ok(())
    }
}

/// Player position.
#[derive(Serialize)]
pub(crate) struct CoordsReport {
    pub(crate) x: f32,
    pub(crate) y: f32,
    pub(crate) z: f32,
}

impl fmt::Display for CoordsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "x: {} y: {} z: {}", self.x, self.y, self.z)
    }
}

/// Spawner slots currently holding an individual.
#[derive(Serialize)]
pub(crate) struct PositionsReport {
    pub(crate) spawns: Vec<ActiveSpawn>,
}

impl fmt::Display for PositionsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.spawns.is_empty() {
            return writeln!(f, "No active spawners");
        }
        for spawn in &self.spawns {
            let [x, y, z] = spawn.position();
            writeln!(
                f,
                "Spawner {}: {x},{y},{z} seed {:X}",
                spawn.spawner_id(),
                spawn.seed()
            )?;
        }
        Ok(())
    }
}
