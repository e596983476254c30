//! Behaviour-driven step definitions driving the replay CLI scenarios.

use super::helpers::{ScenarioFiles, arrival_scenario, failing_scenario};
use super::*;
use clap::Parser;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::Value;
use std::cell::RefCell;

#[derive(Debug)]
struct ReplayWorld {
    files: ScenarioFiles,
    include_scenario: RefCell<bool>,
    cli_args: RefCell<Vec<String>>,
    stdout: RefCell<Vec<u8>>,
    result: RefCell<Option<Result<(), CliError>>>,
}

impl ReplayWorld {
    fn new() -> Self {
        Self {
            files: ScenarioFiles::new(),
            include_scenario: RefCell::new(true),
            cli_args: RefCell::new(Vec::new()),
            stdout: RefCell::new(Vec::new()),
            result: RefCell::new(None),
        }
    }

    fn build_command_line(&self) -> Vec<String> {
        let mut argv = vec!["wayline".to_owned(), "replay".to_owned()];
        if *self.include_scenario.borrow() {
            argv.push(self.files.scenario_path().as_str().to_owned());
        }
        argv.extend(self.cli_args.borrow().iter().cloned());
        argv
    }

    fn lines(&self) -> Vec<Value> {
        let stdout = String::from_utf8(self.stdout.borrow().clone()).expect("stdout utf-8");
        stdout
            .lines()
            .map(|line| serde_json::from_str(line).expect("each line is JSON"))
            .collect()
    }

    fn succeeded(&self) {
        let borrowed = self.result.borrow();
        let result = borrowed.as_ref().expect("result recorded");
        if let Err(err) = result {
            panic!("expected success, found {err:?}");
        }
    }
}

#[fixture]
fn world() -> ReplayWorld {
    ReplayWorld::new()
}

#[given("a scenario that follows the route to its end")]
fn arrival_scenario_exists(#[from(world)] world: &ReplayWorld) {
    world.files.write(&arrival_scenario());
}

#[given("a scenario whose route build fails")]
fn failing_scenario_exists(#[from(world)] world: &ReplayWorld) {
    world.files.write(&failing_scenario());
}

#[given("I pass --units yards")]
fn pass_yards(#[from(world)] world: &ReplayWorld) {
    world
        .cli_args
        .borrow_mut()
        .extend([format!("--{ARG_UNITS}"), "yards".to_owned()]);
}

#[given("I omit the scenario path")]
fn omit_scenario_path(#[from(world)] world: &ReplayWorld) {
    *world.include_scenario.borrow_mut() = false;
}

#[when("I run the replay command")]
fn run_replay_command(#[from(world)] world: &ReplayWorld) {
    let invocation = world.build_command_line();
    let parsed = Cli::try_parse_from(invocation).map_err(CliError::from);
    let outcome = parsed.and_then(|cli| match cli.command {
        Command::Replay(args) => {
            let mut buffer = world.stdout.borrow_mut();
            replay::run_replay_with(args, &mut *buffer)
        }
    });

    world.result.replace(Some(outcome));
}

#[then("the command prints 2 JSON lines")]
fn prints_two_lines(#[from(world)] world: &ReplayWorld) {
    world.succeeded();
    assert_eq!(world.lines().len(), 2);
}

#[then("the last line reports the finished state")]
fn last_line_finished(#[from(world)] world: &ReplayWorld) {
    let lines = world.lines();
    let last = lines.last().expect("at least one line");
    assert_eq!(last["state"], "finished");
}

#[then("the last line reports the not ready state")]
fn last_line_not_ready(#[from(world)] world: &ReplayWorld) {
    let lines = world.lines();
    let last = lines.last().expect("at least one line");
    assert_eq!(last["state"], "not_ready");
    assert_eq!(last["has_route"], false);
    assert_eq!(last["distance_to_target"], "");
}

#[then("the first line reports distances in yards")]
fn first_line_in_yards(#[from(world)] world: &ReplayWorld) {
    world.succeeded();
    let lines = world.lines();
    let first = lines.first().expect("at least one line");
    assert_eq!(first["target_units_suffix"], "yd");
}

#[then("the command fails because the scenario path is missing")]
fn fails_missing_scenario(#[from(world)] world: &ReplayWorld) {
    let borrowed = world.result.borrow();
    let error = borrowed
        .as_ref()
        .expect("result recorded")
        .as_ref()
        .expect_err("expected error");
    match error {
        CliError::MissingArgument { field, .. } => assert_eq!(*field, ARG_SCENARIO),
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

macro_rules! register_replay_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/replay_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: ReplayWorld) {
            let _ = world;
        }
    };
}

register_replay_scenario!(replay_arrival, "replaying a journey to its destination");
register_replay_scenario!(
    replay_failed_build,
    "replaying a journey whose route cannot be built"
);
register_replay_scenario!(replay_in_yards, "formatting distances in yards");
register_replay_scenario!(replay_missing_scenario, "rejecting missing scenario paths");
