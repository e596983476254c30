//! Replay command implementation for the Wayline CLI.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::info;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use wayline_core::{
    DEFAULT_MOVE_AWAY_THRESHOLD, FollowingInfo, LocationFix, MeasurementFormatter,
    MeasurementSystem, ResultCode, Route, RoutingSession, SessionConfig, SessionState,
    TurnDirection,
};

use crate::scenario::{ScenarioRouter, load_scenario};
use crate::{ARG_MOVE_AWAY_THRESHOLD, ARG_SCENARIO, ARG_UNITS, CliError, ENV_SCENARIO};

/// CLI arguments for the `replay` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    long_about = "Build the scenario's route through an in-process router, \
                 feed every recorded fix to a routing session and print one \
                 JSON object per fix. Options can come from CLI flags, \
                 configuration files, or environment variables.",
    about = "Replay recorded fixes against a route"
)]
#[ortho_config(prefix = "WAYLINE")]
pub(crate) struct ReplayArgs {
    /// Path to a JSON scenario file.
    #[arg(value_name = "path")]
    #[serde(default)]
    pub(crate) scenario: Option<Utf8PathBuf>,
    /// Unit family for formatted distances (metric, imperial or yards).
    #[arg(long = ARG_UNITS, value_name = "system")]
    #[serde(default)]
    pub(crate) units: Option<MeasurementSystem>,
    /// Misses tolerated before a rebuild is requested.
    #[arg(long = ARG_MOVE_AWAY_THRESHOLD, value_name = "fixes")]
    #[serde(default)]
    pub(crate) move_away_threshold: Option<u32>,
}

impl ReplayArgs {
    pub(crate) fn into_config(self) -> Result<ReplayConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        ReplayConfig::try_from(merged)
    }
}

/// Resolved `replay` command configuration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ReplayConfig {
    /// Path to the JSON scenario file.
    pub(crate) scenario: Utf8PathBuf,
    /// Unit family for formatted distances.
    pub(crate) units: MeasurementSystem,
    /// Session tuning.
    pub(crate) session: SessionConfig,
}

impl ReplayConfig {
    pub(crate) fn validate_sources(&self) -> Result<(), CliError> {
        Self::require_existing(&self.scenario, ARG_SCENARIO)
    }

    fn require_existing(path: &Utf8Path, field: &'static str) -> Result<(), CliError> {
        match wayline_fs::file_is_file(path) {
            Ok(true) => Ok(()),
            Ok(false) => Err(CliError::SourcePathNotFile {
                field,
                path: path.to_path_buf(),
            }),
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                Err(CliError::MissingSourceFile {
                    field,
                    path: path.to_path_buf(),
                })
            }
            Err(source) => Err(CliError::InspectSourcePath {
                field,
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl TryFrom<ReplayArgs> for ReplayConfig {
    type Error = CliError;

    fn try_from(args: ReplayArgs) -> Result<Self, Self::Error> {
        let scenario = args.scenario.ok_or(CliError::MissingArgument {
            field: ARG_SCENARIO,
            env: ENV_SCENARIO,
        })?;
        let session = SessionConfig::default().with_move_away_threshold(
            args.move_away_threshold
                .unwrap_or(DEFAULT_MOVE_AWAY_THRESHOLD),
        );
        Ok(Self {
            scenario,
            units: args.units.unwrap_or_default(),
            session,
        })
    }
}

/// One line of replay output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct ReplayRecord {
    pub(crate) timestamp: f64,
    pub(crate) state: SessionState,
    pub(crate) missed_fixes: u32,
    pub(crate) has_route: bool,
    pub(crate) distance_to_target: String,
    pub(crate) target_units_suffix: String,
    pub(crate) distance_to_turn: String,
    pub(crate) turn_units_suffix: String,
    pub(crate) turn: TurnDirection,
    pub(crate) exit_num: u32,
    pub(crate) time_secs: f64,
}

impl ReplayRecord {
    fn new(fix: &LocationFix, state: SessionState, missed_fixes: u32, info: FollowingInfo) -> Self {
        Self {
            timestamp: fix.timestamp,
            state,
            missed_fixes,
            has_route: info.is_valid(),
            distance_to_target: info.distance_to_target,
            target_units_suffix: info.target_units_suffix,
            distance_to_turn: info.distance_to_turn,
            turn_units_suffix: info.turn_units_suffix,
            turn: info.turn,
            exit_num: info.exit_num,
            time_secs: info.time.as_secs_f64(),
        }
    }
}

pub(super) fn run_replay(args: ReplayArgs) -> Result<(), CliError> {
    let mut stdout = std::io::stdout().lock();
    run_replay_with(args, &mut stdout)
}

pub(super) fn run_replay_with(args: ReplayArgs, writer: &mut dyn Write) -> Result<(), CliError> {
    let config = resolve_replay_config(args)?;
    let state = replay_scenario(&config, writer)?;
    info!("replay of {} finished in state {state}", config.scenario);
    Ok(())
}

fn resolve_replay_config(args: ReplayArgs) -> Result<ReplayConfig, CliError> {
    let config = args.into_config()?;
    config.validate_sources()?;
    Ok(config)
}

/// Replay the configured scenario, writing one JSON line per fix.
///
/// Returns the session state after the last fix.
pub(super) fn replay_scenario(
    config: &ReplayConfig,
    writer: &mut dyn Write,
) -> Result<SessionState, CliError> {
    let scenario = load_scenario(&config.scenario)?;
    let route = scenario
        .route
        .into_route()
        .map_err(|source| CliError::InvalidScenario {
            path: config.scenario.clone(),
            source,
        })?;

    let mut session = RoutingSession::new(config.session.clone())
        .with_formatter(MeasurementFormatter::new(config.units));
    session.set_router(Box::new(ScenarioRouter::new(
        route,
        scenario.profile,
        scenario.build_result,
    )));
    session.build_route(
        scenario.start,
        scenario.destination,
        |route: &Route, code: ResultCode| {
            info!("scenario build finished with {code} ({} m)", route.total_length());
        },
    )?;

    for fix in &scenario.fixes {
        let state = session.on_location_position_changed(fix);
        let info = session.route_following_info()?;
        write_record(
            writer,
            &ReplayRecord::new(fix, state, session.missed_fixes(), info),
        )?;
    }
    Ok(session.state())
}

fn write_record(writer: &mut dyn Write, record: &ReplayRecord) -> Result<(), CliError> {
    let line = serde_json::to_string(record).map_err(CliError::SerialiseRecord)?;
    writer
        .write_all(line.as_bytes())
        .map_err(CliError::WriteOutput)?;
    writer.write_all(b"\n").map_err(CliError::WriteOutput)?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn config_from_layers_for_test(
    layers: Vec<ortho_config::MergeLayer<'static>>,
) -> Result<ReplayConfig, CliError> {
    let merged = ReplayArgs::merge_from_layers(layers).map_err(CliError::from)?;
    ReplayConfig::try_from(merged)
}
