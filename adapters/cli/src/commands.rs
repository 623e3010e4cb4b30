use std::{
    fmt,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use encounter_oracle_core::{FilterCriteria, Population, SlotRange, OUTBREAK_SLOT_TOTAL};
use encounter_oracle_hierarchy::SpawnHierarchy;
use encounter_oracle_memory::{
    read_battle, read_group_seed, read_position, scan_active_spawners, write_position,
    SnapshotChannel,
};
use encounter_oracle_reference_data::{
    possible_spawners, LocationSlots, MarkerTable, NameTable, SpawnerSlots, ALL_WEATHER, ANY_TIME,
};
use encounter_oracle_system_aggressive_path::{AggressivePathSearch, Config as AggressiveConfig};
use encounter_oracle_system_encounter::{OutbreakProfile, SpawnerProfile};
use encounter_oracle_system_linear_search::{
    Config as LinearConfig, LinearSearch, MassOutbreak, MassOutbreakConfig, ScanTarget,
};
use encounter_oracle_system_passive_path::{Config as PassiveConfig, PassivePathSearch, SearchMode};
use serde::Serialize;
use tracing::warn;

use crate::{
    config::Settings,
    report::{
        AggressiveView, BattleReport, CoordsReport, OutbreakReport, PassiveView, PositionsReport,
        PossibleReport, PossibleSpawner, ScanReport, SeedReport, TeleportReport,
    },
    source::SourceArgs,
};

/// State shared by every command.
pub(crate) struct Session {
    pub(crate) settings: Settings,
    pub(crate) natures: NameTable,
    pub(crate) json: bool,
}

impl Session {
    fn emit<R: Serialize + fmt::Display>(&self, report: &R) -> Result<()> {
        if self.json {
            let encoded =
                serde_json::to_string_pretty(report).context("failed to encode report as json")?;
            println!("{encoded}");
        } else {
            print!("{report}");
        }
        Ok(())
    }
}

/// Searches offered by the command-line interface.
#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Predicts the next encounter of one spawner that passes the filter.
    Seed(SeedArgs),
    /// Searches every spawner of a location in a snapshot.
    Scan(ScanArgs),
    /// Shows the current mass outbreak round and the next one holding a match.
    Outbreak(OutbreakArgs),
    /// Finds revisit paths through a mass outbreak that reach a match.
    Passive(PassiveArgs),
    /// Finds batch paths, advancing the outbreak group until one matches.
    Aggressive(AggressiveArgs),
    /// Lists the spawners of a location able to produce a candidate.
    Possible(PossibleArgs),
    /// Moves the player, recording the write against a snapshot.
    Teleport(TeleportArgs),
    /// Lists the wild individuals of the current battle.
    Battle(BattleArgs),
    /// Prints the player's position.
    Coords(DumpArgs),
    /// Lists every spawner slot currently holding an individual.
    Positions(DumpArgs),
}

impl Command {
    pub(crate) fn run(self, session: &Session) -> Result<()> {
        match self {
            Self::Seed(args) => run_seed(&args, session),
            Self::Scan(args) => run_scan(&args, session),
            Self::Outbreak(args) => run_outbreak(&args, session),
            Self::Passive(args) => run_passive(&args, session),
            Self::Aggressive(args) => run_aggressive(&args, session),
            Self::Possible(args) => run_possible(&args, session),
            Self::Teleport(args) => run_teleport(&args, session),
            Self::Battle(args) => run_battle(&args, session),
            Self::Coords(args) => run_coords(&args, session),
            Self::Positions(args) => run_positions(&args, session),
        }
    }
}

/// Acceptance rules shared by the searches.
#[derive(Args, Debug, Clone, Copy)]
pub(crate) struct FilterArgs {
    /// Only accept rare encounters.
    #[arg(long)]
    rare: bool,
    /// Only accept alpha encounters.
    #[arg(long)]
    alpha: bool,
    /// Inclusive lower bound of the accepted slot band.
    #[arg(long, requires = "slot_max")]
    slot_min: Option<f64>,
    /// Exclusive upper bound of the accepted slot band.
    #[arg(long, requires = "slot_min")]
    slot_max: Option<f64>,
}

impl FilterArgs {
    fn criteria(self, slot_total: f64) -> FilterCriteria {
        let filter = FilterCriteria::new()
            .with_rare(self.rare)
            .with_alpha(self.alpha);
        match (self.slot_min, self.slot_max) {
            (Some(min), Some(max)) => filter.with_slot_range(SlotRange::new(min, max, slot_total)),
            _ => filter,
        }
    }
}

/// Conditions selecting a spawner's slot table.
#[derive(Args, Debug)]
pub(crate) struct ConditionArgs {
    /// Time of day the slot table applies to.
    #[arg(long, default_value = ANY_TIME)]
    time: String,
    /// Weather the slot table applies to.
    #[arg(long, default_value = ALL_WEATHER)]
    weather: String,
    /// Only accept this candidate, filtering on its slot band.
    #[arg(long)]
    species: Option<String>,
}

impl ConditionArgs {
    /// Slot total of `slots` under these conditions and the filter narrowed to
    /// the chosen candidate.
    fn apply(
        &self,
        slots: Option<&SpawnerSlots>,
        fallback_total: f64,
        filter: &FilterArgs,
    ) -> Result<(f64, FilterCriteria)> {
        let total = slots
            .and_then(|slots| slots.find_slots(&self.time, &self.weather))
            .map_or(fallback_total, |weights| weights.total());
        let criteria = filter.criteria(total);
        let Some(species) = &self.species else {
            return Ok((total, criteria));
        };
        let Some(slots) = slots else {
            bail!("--species needs a slot table for the spawner");
        };
        let range = slots.find_slot_range(&self.time, &self.weather, species);
        Ok((range.total(), criteria.with_slot_range(range)))
    }

    fn species_at<'a>(&self, slots: Option<&'a SpawnerSlots>, slot: f64) -> Option<&'a str> {
        slots.and_then(|slots| slots.slot_to_candidate(&self.time, &self.weather, slot))
    }
}

fn load_slots(path: Option<&Path>) -> Result<Option<LocationSlots>> {
    path.map(|path| LocationSlots::load(path).map_err(anyhow::Error::from))
        .transpose()
}

#[derive(Args, Debug)]
pub(crate) struct SeedArgs {
    #[command(flatten)]
    source: SourceArgs,
    #[command(flatten)]
    filter: FilterArgs,
    #[command(flatten)]
    conditions: ConditionArgs,
    /// Slot tables of the location, keyed by spawner name.
    #[arg(long, requires = "spawner")]
    slots: Option<PathBuf>,
    /// Spawner whose slot table applies.
    #[arg(long, requires = "slots")]
    spawner: Option<String>,
    /// Slot weight total used when no slot table is given.
    #[arg(long)]
    slot_total: Option<f64>,
    /// Confirmation attempts per encounter.
    #[arg(long)]
    rolls: Option<u32>,
    /// Genetic stats guaranteed at the maximum.
    #[arg(long, default_value_t = 0)]
    ivs: u32,
    /// The spawner has already produced its first encounter.
    #[arg(long)]
    spawned: bool,
    /// Largest advance searched.
    #[arg(long)]
    ceiling: Option<u32>,
    /// Flags matches at or below this advance.
    #[arg(long)]
    threshold: Option<u32>,
}

fn run_seed(args: &SeedArgs, session: &Session) -> Result<()> {
    let settings = session.settings;
    let group_seed = args.source.group_seed()?;
    let location = load_slots(args.slots.as_deref())?;
    let slots = match (&location, &args.spawner) {
        (Some(location), Some(name)) => Some(
            location
                .spawner(name)
                .with_context(|| format!("no slot table for spawner `{name}`"))?,
        ),
        _ => None,
    };

    let fallback_total = args.slot_total.unwrap_or(settings.slot_total);
    let (slot_total, filter) = args.conditions.apply(slots, fallback_total, &args.filter)?;
    let profile = SpawnerProfile::new(
        args.rolls.unwrap_or(settings.rolls),
        args.ivs,
        slot_total,
    );
    let search = LinearSearch::new(LinearConfig::new(
        args.ceiling.unwrap_or(settings.advance_ceiling),
        !args.spawned,
    ));

    let mut hierarchy = SpawnHierarchy::from_group_seed(group_seed);
    let current = search.current(&hierarchy, profile);
    let outcome = search.next_filtered(&mut hierarchy, profile, &filter)?;
    let outcome_species = outcome
        .found()
        .and_then(|found| args.conditions.species_at(slots, found.encounter().slot()));
    let within_threshold = args.threshold.and_then(|threshold| {
        outcome.found().map(|found| found.advance() <= threshold)
    });

    session.emit(&SeedReport {
        group_seed,
        current,
        current_species: args
            .conditions
            .species_at(slots, current.slot())
            .map(str::to_owned),
        outcome_species: outcome_species.map(str::to_owned),
        outcome,
        within_threshold,
        natures: &session.natures,
    })
}

#[derive(Args, Debug)]
pub(crate) struct ScanArgs {
    /// Captured memory snapshot holding the spawner table.
    #[arg(long)]
    dump: PathBuf,
    /// Marker table of the location.
    #[arg(long)]
    markers: PathBuf,
    /// Slot tables of the location, keyed by spawner name.
    #[arg(long)]
    slots: Option<PathBuf>,
    #[command(flatten)]
    filter: FilterArgs,
    #[command(flatten)]
    conditions: ConditionArgs,
    /// Confirmation attempts per encounter.
    #[arg(long)]
    rolls: Option<u32>,
    /// The spawners have already produced their first encounter.
    #[arg(long)]
    spawned: bool,
    /// Largest advance searched per spawner.
    #[arg(long)]
    ceiling: Option<u32>,
}

fn run_scan(args: &ScanArgs, session: &Session) -> Result<()> {
    let settings = session.settings;
    let markers = MarkerTable::load(&args.markers)?;
    let location = load_slots(args.slots.as_deref())?;
    let mut channel = SnapshotChannel::load(&args.dump)?;
    let rolls = args.rolls.unwrap_or(settings.rolls);

    let mut targets = Vec::new();
    for (group_id, marker) in markers.iter() {
        let slots = location.as_ref().and_then(|location| location.spawner(marker.name()));
        if location.is_some() && slots.is_none() {
            warn!(group_id, name = marker.name(), "marker has no slot table");
            continue;
        }
        let reading = match read_group_seed(&mut channel, group_id) {
            Ok(reading) => reading,
            Err(error) => {
                warn!(group_id, %error, "skipping spawner");
                continue;
            }
        };
        let (slot_total, filter) = args
            .conditions
            .apply(slots, settings.slot_total, &args.filter)?;
        let profile = SpawnerProfile::new(rolls, marker.guaranteed_high_stats(), slot_total);
        targets.push(ScanTarget::new(
            group_id,
            SpawnHierarchy::from_group_seed(reading.group_seed()),
            profile,
            filter,
        ));
    }

    let search = LinearSearch::new(LinearConfig::new(
        args.ceiling.unwrap_or(settings.advance_ceiling),
        !args.spawned,
    ));
    session.emit(&ScanReport {
        hits: search.scan(targets),
        natures: &session.natures,
    })
}

/// Parameters shared by the mass outbreak searches.
#[derive(Args, Debug)]
pub(crate) struct OutbreakParams {
    #[command(flatten)]
    source: SourceArgs,
    #[command(flatten)]
    filter: FilterArgs,
    /// Confirmation attempts per encounter.
    #[arg(long)]
    rolls: Option<u32>,
    /// Individuals the outbreak spawns in total.
    #[arg(long)]
    population: Option<u32>,
    /// Genetic stats guaranteed at the maximum for alphas of the initial batch.
    #[arg(long)]
    alpha_ivs: Option<u32>,
}

impl OutbreakParams {
    fn resolve(
        &self,
        settings: Settings,
    ) -> Result<(u64, Population, OutbreakProfile, FilterCriteria)> {
        let group_seed = self.source.group_seed()?;
        let population = Population::new(self.population.unwrap_or(settings.population))?;
        let profile = OutbreakProfile::new(self.rolls.unwrap_or(settings.rolls))
            .with_alpha_guarantee(
                self.alpha_ivs
                    .unwrap_or(settings.alpha_guaranteed_high_stats),
            );
        Ok((
            group_seed,
            population,
            profile,
            self.filter.criteria(OUTBREAK_SLOT_TOTAL),
        ))
    }
}

#[derive(Args, Debug)]
pub(crate) struct OutbreakArgs {
    #[command(flatten)]
    params: OutbreakParams,
    /// Largest number of rounds searched.
    #[arg(long)]
    ceiling: Option<u32>,
}

fn run_outbreak(args: &OutbreakArgs, session: &Session) -> Result<()> {
    let settings = session.settings;
    let (group_seed, population, profile, filter) = args.params.resolve(settings)?;
    // Outbreak rounds never guarantee alpha stats.
    let profile = profile.with_alpha_guarantee(0);
    let outbreak = MassOutbreak::new(MassOutbreakConfig::new(
        population,
        args.ceiling.unwrap_or(settings.advance_ceiling),
    ));

    let mut hierarchy = SpawnHierarchy::from_group_seed(group_seed);
    let current = outbreak.simulate_round(&mut hierarchy.clone(), &profile, &filter);
    let outcome = outbreak.next_matching_round(&mut hierarchy, &profile, &filter)?;
    session.emit(&OutbreakReport {
        group_seed,
        current,
        outcome,
        natures: &session.natures,
    })
}

#[derive(Args, Debug)]
pub(crate) struct PassiveArgs {
    #[command(flatten)]
    params: OutbreakParams,
    /// Longest revisit path explored.
    #[arg(long)]
    move_limit: Option<usize>,
    /// When the search stops once a match is found.
    #[arg(long, value_enum, default_value_t = PassiveMode::FirstMatch)]
    mode: PassiveMode,
}

/// Stopping rule of the passive search.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PassiveMode {
    /// Stop at the first matching path.
    FirstMatch,
    /// Finish every path as cheap as the first match.
    CheapestTier,
    /// Explore every path within the move limit.
    Exhaustive,
}

impl From<PassiveMode> for SearchMode {
    fn from(mode: PassiveMode) -> Self {
        match mode {
            PassiveMode::FirstMatch => Self::FirstMatch,
            PassiveMode::CheapestTier => Self::CheapestTier,
            PassiveMode::Exhaustive => Self::Exhaustive,
        }
    }
}

fn run_passive(args: &PassiveArgs, session: &Session) -> Result<()> {
    let settings = session.settings;
    let (group_seed, population, profile, filter) = args.params.resolve(settings)?;
    let search = PassivePathSearch::new(PassiveConfig::new(
        population,
        args.move_limit.unwrap_or(settings.passive_move_limit),
        args.mode.into(),
    ));

    let report = search.search(group_seed, &profile, &filter)?;
    session.emit(&PassiveView {
        report,
        natures: &session.natures,
    })
}

#[derive(Args, Debug)]
pub(crate) struct AggressiveArgs {
    #[command(flatten)]
    params: OutbreakParams,
    /// Largest number of group advances searched.
    #[arg(long)]
    ceiling: Option<u32>,
}

fn run_aggressive(args: &AggressiveArgs, session: &Session) -> Result<()> {
    let settings = session.settings;
    let (group_seed, population, profile, filter) = args.params.resolve(settings)?;
    let search = AggressivePathSearch::new(AggressiveConfig::new(
        population,
        args.ceiling.unwrap_or(settings.advance_ceiling),
    ));

    let mut hierarchy = SpawnHierarchy::from_group_seed(group_seed);
    let respawn = profile.with_alpha_guarantee(0);
    let outcome = search.next_matching(&mut hierarchy, &profile, &respawn, &filter)?;
    session.emit(&AggressiveView {
        group_seed,
        outcome,
        natures: &session.natures,
    })
}

#[derive(Args, Debug)]
pub(crate) struct PossibleArgs {
    /// Marker table of the location.
    #[arg(long)]
    markers: PathBuf,
    /// Slot tables of the location, keyed by spawner name.
    #[arg(long)]
    slots: PathBuf,
    /// Candidate to look for.
    #[arg(long)]
    species: String,
    /// Time of day the slot tables apply to.
    #[arg(long, default_value = ANY_TIME)]
    time: String,
    /// Weather the slot tables apply to.
    #[arg(long, default_value = ALL_WEATHER)]
    weather: String,
}

fn run_possible(args: &PossibleArgs, session: &Session) -> Result<()> {
    let markers = MarkerTable::load(&args.markers)?;
    let slots = LocationSlots::load(&args.slots)?;
    let found = possible_spawners(&markers, &slots, &args.time, &args.weather, &args.species)?;

    let spawners = found
        .into_iter()
        .map(|(group_id, share_percent)| PossibleSpawner {
            group_id,
            name: markers
                .get(group_id)
                .map(|marker| marker.name().to_owned())
                .unwrap_or_default(),
            share_percent,
        })
        .collect();
    session.emit(&PossibleReport { spawners })
}

#[derive(Args, Debug)]
pub(crate) struct TeleportArgs {
    /// Snapshot the write is recorded against; an empty one when omitted.
    #[arg(long)]
    dump: Option<PathBuf>,
    /// Destination coordinates.
    #[arg(
        required = true,
        num_args = 3,
        value_names = ["X", "Y", "Z"],
        allow_negative_numbers = true
    )]
    position: Vec<f32>,
}

fn run_teleport(args: &TeleportArgs, session: &Session) -> Result<()> {
    let position: [f32; 3] = match args.position.as_slice() {
        [x, y, z] => [*x, *y, *z],
        _ => bail!("teleport needs exactly three coordinates"),
    };
    let mut channel = match &args.dump {
        Some(dump) => SnapshotChannel::load(dump)?,
        None => SnapshotChannel::new(),
    };
    write_position(&mut channel, position)?;

    let Some((pointer, bytes)) = channel.writes().last() else {
        bail!("teleport recorded no write");
    };
    session.emit(&TeleportReport {
        pointer: pointer.to_string(),
        bytes: bytes.iter().map(|byte| format!("{byte:02X}")).collect(),
    })
}

/// Snapshot a read-only command reads from.
#[derive(Args, Debug)]
pub(crate) struct DumpArgs {
    /// Captured memory snapshot.
    #[arg(long)]
    dump: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct BattleArgs {
    #[command(flatten)]
    source: DumpArgs,
    /// Species names, one per line in species-number order.
    #[arg(long)]
    species: Option<PathBuf>,
}

fn run_battle(args: &BattleArgs, session: &Session) -> Result<()> {
    let species = match &args.species {
        Some(path) => NameTable::load(path)?,
        None => NameTable::default(),
    };
    let mut channel = SnapshotChannel::load(&args.source.dump)?;
    session.emit(&BattleReport {
        battlers: read_battle(&mut channel)?,
        species: &species,
        natures: &session.natures,
    })
}

fn run_coords(args: &DumpArgs, session: &Session) -> Result<()> {
    let mut channel = SnapshotChannel::load(&args.dump)?;
    let [x, y, z] = read_position(&mut channel)?;
    session.emit(&CoordsReport { x, y, z })
}

fn run_positions(args: &DumpArgs, session: &Session) -> Result<()> {
    let mut channel = SnapshotChannel::load(&args.dump)?;
    session.emit(&PositionsReport {
        spawns: scan_active_spawners(&mut channel)?,
    })
}
