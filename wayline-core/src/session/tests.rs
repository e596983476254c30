use std::cell::RefCell;
use std::fs;
use std::rc::Rc;

use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use tempfile::TempDir;

use super::*;
use crate::TravelProfile;
use crate::test_support::{DeferredRouter, StubRouter, straight_route};

type Outcomes = Rc<RefCell<Vec<(bool, ResultCode)>>>;

fn c(x: f64, y: f64) -> Coord<f64> {
    Coord { x, y }
}

fn fix_at(x: f64, y: f64, accuracy: f64) -> LocationFix {
    LocationFix::new(0.0, c(x, y), accuracy)
}

fn recorder(outcomes: &Outcomes) -> impl FnOnce(&Route, ResultCode) + 'static {
    let outcomes = Rc::clone(outcomes);
    move |route, code| outcomes.borrow_mut().push((route.is_valid(), code))
}

#[fixture]
fn outcomes() -> Outcomes {
    Rc::default()
}

/// Session tracking a 200 m route along the x axis.
#[fixture]
fn tracking_session(outcomes: Outcomes) -> RoutingSession {
    let mut session = RoutingSession::default();
    session.set_router(Box::new(StubRouter::succeeding(straight_route(&[
        0.0, 100.0, 200.0,
    ]))));
    session
        .build_route(c(0.0, 0.0), c(200.0, 0.0), recorder(&outcomes))
        .expect("router installed");
    session
}

struct Unspaced;

impl DistanceFormatter for Unspaced {
    fn format_distance(&self, metres: f64) -> String {
        format!("{metres:.0}m")
    }
}

#[rstest]
fn build_without_router_is_rejected(outcomes: Outcomes) {
    let mut session = RoutingSession::default();

    let result = session.build_route(c(0.0, 0.0), c(1.0, 0.0), recorder(&outcomes));

    assert_eq!(result, Err(SessionError::RouterNotSet));
    assert_eq!(session.state(), SessionState::Inactive);
    assert!(outcomes.borrow().is_empty());
}

#[rstest]
fn successful_build_adopts_route(outcomes: Outcomes) {
    let router = StubRouter::succeeding(straight_route(&[0.0, 100.0]));
    let probe = router.probe();
    let mut session = RoutingSession::default();
    session.set_router(Box::new(router));

    session
        .build_route(c(0.0, 0.0), c(100.0, 0.0), recorder(&outcomes))
        .expect("router installed");

    assert_eq!(session.state(), SessionState::NotStarted);
    assert!(session.is_active());
    assert!(session.route().is_valid());
    assert_eq!(*outcomes.borrow(), vec![(true, ResultCode::NoError)]);
    let log = probe.snapshot();
    assert_eq!(log.destinations, vec![c(100.0, 0.0)]);
    assert_eq!(log.starts, vec![c(0.0, 0.0)]);
}

#[rstest]
fn failed_build_leaves_no_route(outcomes: Outcomes) {
    let mut session = RoutingSession::default();
    session.set_router(Box::new(StubRouter::failing(ResultCode::NoRoute)));

    session
        .build_route(c(0.0, 0.0), c(100.0, 0.0), recorder(&outcomes))
        .expect("router installed");

    assert_eq!(session.state(), SessionState::NotReady);
    assert!(!session.route().is_valid());
    assert_eq!(*outcomes.borrow(), vec![(false, ResultCode::NoRoute)]);
    assert_eq!(
        session.route_following_info(),
        Ok(FollowingInfo::default())
    );
}

#[rstest]
fn success_without_usable_route_is_an_internal_error(outcomes: Outcomes) {
    let mut session = RoutingSession::default();
    session.set_router(Box::new(StubRouter::succeeding(Route::empty("car"))));

    session
        .rebuild_route(c(0.0, 0.0), recorder(&outcomes))
        .expect("router installed");

    assert_eq!(session.state(), SessionState::NotReady);
    assert_eq!(*outcomes.borrow(), vec![(false, ResultCode::InternalError)]);
}

#[rstest]
fn not_ready_requests_rebuild_after_threshold(outcomes: Outcomes) {
    let mut session = RoutingSession::default();
    session.set_router(Box::new(StubRouter::failing(ResultCode::NetworkError)));
    session
        .rebuild_route(c(0.0, 0.0), recorder(&outcomes))
        .expect("router installed");

    for expected in 1..=5 {
        let state = session.on_location_position_changed(&fix_at(0.0, 0.0, 5.0));
        assert_eq!(state, SessionState::NotReady);
        assert_eq!(session.missed_fixes(), expected);
    }
    let state = session.on_location_position_changed(&fix_at(0.0, 0.0, 5.0));
    assert_eq!(state, SessionState::NeedRebuild);
}

#[rstest]
fn fix_while_inactive_is_ignored() {
    let mut session = RoutingSession::default();
    let state = session.on_location_position_changed(&fix_at(0.0, 0.0, 5.0));
    assert_eq!(state, SessionState::Inactive);
    assert_eq!(session.missed_fixes(), 0);
}

#[rstest]
fn sustained_drift_requests_rebuild(mut tracking_session: RoutingSession) {
    let session = &mut tracking_session;
    assert_eq!(
        session.on_location_position_changed(&fix_at(50.0, 0.0, 5.0)),
        SessionState::OnRoute
    );
    assert_eq!(session.missed_fixes(), 0);

    for expected in 1..=5 {
        let state = session.on_location_position_changed(&fix_at(50.0, 10.0, 1.0));
        assert_eq!(state, SessionState::OnRoute);
        assert_eq!(session.missed_fixes(), expected);
        assert_eq!(session.last_sq_distance(), 100.0);
    }
    assert_eq!(
        session.on_location_position_changed(&fix_at(50.0, 10.0, 1.0)),
        SessionState::NeedRebuild
    );
}

#[rstest]
fn approaching_the_route_resets_the_counter(mut tracking_session: RoutingSession) {
    let session = &mut tracking_session;
    session.on_location_position_changed(&fix_at(50.0, 20.0, 1.0));
    assert_eq!(session.missed_fixes(), 1);
    assert_eq!(session.last_sq_distance(), 400.0);

    session.on_location_position_changed(&fix_at(50.0, 10.0, 1.0));
    assert_eq!(session.missed_fixes(), 0);
    assert_eq!(session.last_sq_distance(), 0.0);
}

#[rstest]
#[case(DEFAULT_DISTANCE_TOLERANCE_ULPS, 2)]
#[case(0, 0)]
fn near_equal_distance_counts_as_miss(
    outcomes: Outcomes,
    #[case] ulps: u64,
    #[case] expected_misses: u32,
) {
    let config = SessionConfig::default().with_distance_tolerance_ulps(ulps);
    let mut session = RoutingSession::new(config);
    session.set_router(Box::new(StubRouter::succeeding(straight_route(&[
        0.0, 100.0, 200.0,
    ]))));
    session
        .rebuild_route(c(0.0, 0.0), recorder(&outcomes))
        .expect("router installed");

    session.on_location_position_changed(&fix_at(50.0, 10.0, 1.0));
    session.on_location_position_changed(&fix_at(50.0, 10.0 - 1e-13, 1.0));

    assert_eq!(session.missed_fixes(), expected_misses);
}

#[rstest]
fn finished_is_sticky(mut tracking_session: RoutingSession) {
    let session = &mut tracking_session;
    assert_eq!(
        session.on_location_position_changed(&fix_at(198.0, 1.0, 5.0)),
        SessionState::Finished
    );
    assert_eq!(
        session.on_location_position_changed(&fix_at(50.0, 500.0, 5.0)),
        SessionState::Finished
    );
    assert_eq!(
        session.on_location_position_changed(&fix_at(100.0, 0.0, 5.0)),
        SessionState::Finished
    );
}

#[rstest]
fn stale_build_is_discarded(outcomes: Outcomes) {
    let router = DeferredRouter::default();
    let builds = router.builds();
    let mut session = RoutingSession::default();
    session.set_router(Box::new(router));

    session
        .build_route(c(0.0, 0.0), c(100.0, 0.0), recorder(&outcomes))
        .expect("router installed");
    session
        .rebuild_route(c(10.0, 0.0), recorder(&outcomes))
        .expect("router installed");
    assert_eq!(builds.requested(), 2);

    assert!(builds.complete(
        0,
        straight_route(&[0.0, 100.0]),
        ResultCode::NoError
    ));
    assert_eq!(session.poll_build_results(), None);
    assert_eq!(session.state(), SessionState::Building);
    assert!(outcomes.borrow().is_empty());

    assert!(builds.complete(1, Route::empty("car"), ResultCode::NoRoute));
    assert_eq!(session.poll_build_results(), Some(ResultCode::NoRoute));
    assert_eq!(session.state(), SessionState::NotReady);
    assert_eq!(*outcomes.borrow(), vec![(false, ResultCode::NoRoute)]);
}

#[rstest]
fn fixes_while_building_are_ignored(outcomes: Outcomes) {
    let router = DeferredRouter::default();
    let mut session = RoutingSession::default();
    session.set_router(Box::new(router));
    session
        .rebuild_route(c(0.0, 0.0), recorder(&outcomes))
        .expect("router installed");

    for _ in 0..10 {
        assert_eq!(
            session.on_location_position_changed(&fix_at(500.0, 500.0, 5.0)),
            SessionState::Building
        );
    }
    assert_eq!(session.missed_fixes(), 0);
}

#[rstest]
fn completion_after_reset_never_reaches_caller(outcomes: Outcomes) {
    let router = DeferredRouter::default();
    let builds = router.builds();
    let mut session = RoutingSession::default();
    session.set_router(Box::new(router));
    session
        .rebuild_route(c(0.0, 0.0), recorder(&outcomes))
        .expect("router installed");

    session.reset();
    assert!(builds.complete(0, straight_route(&[0.0, 100.0]), ResultCode::NoError));

    assert_eq!(
        session.on_location_position_changed(&fix_at(0.0, 0.0, 5.0)),
        SessionState::Inactive
    );
    assert!(outcomes.borrow().is_empty());
    assert!(!session.route().is_valid());
}

#[rstest]
fn reset_is_idempotent(mut tracking_session: RoutingSession) {
    tracking_session.on_location_position_changed(&fix_at(50.0, 30.0, 1.0));

    tracking_session.reset();
    let once = (
        tracking_session.state(),
        tracking_session.missed_fixes(),
        tracking_session.last_sq_distance(),
        tracking_session.route().clone(),
    );
    tracking_session.reset();
    let twice = (
        tracking_session.state(),
        tracking_session.missed_fixes(),
        tracking_session.last_sq_distance(),
        tracking_session.route().clone(),
    );

    assert_eq!(once, twice);
    assert_eq!(once.0, SessionState::Inactive);
    assert!(!tracking_session.is_active());
    assert!(tracking_session.router().is_some());
}

#[rstest]
fn set_router_discards_current_route(mut tracking_session: RoutingSession) {
    let replacement = StubRouter::failing(ResultCode::NoRoute).with_profile(TravelProfile::Bicycle);

    tracking_session.set_router(Box::new(replacement));

    assert_eq!(tracking_session.state(), SessionState::Inactive);
    assert!(!tracking_session.route().is_valid());
    assert_eq!(
        tracking_session.router().map(Router::profile),
        Some(TravelProfile::Bicycle)
    );
}

#[rstest]
fn reset_asks_router_to_cancel() {
    let router = DeferredRouter::default();
    let probe = router.probe();
    let mut session = RoutingSession::default();
    session.set_router(Box::new(router));

    session.reset();

    assert_eq!(probe.snapshot().cancels, 1);
}

#[rstest]
fn following_info_splits_values_and_units(mut tracking_session: RoutingSession) {
    tracking_session.on_location_position_changed(&fix_at(50.0, 0.0, 5.0));

    let info = tracking_session
        .route_following_info()
        .expect("metric formatter keeps the contract");

    assert_eq!(info.distance_to_target, "150");
    assert_eq!(info.target_units_suffix, "m");
    assert_eq!(info.distance_to_turn, "150");
    assert_eq!(info.turn_units_suffix, "m");
    assert_eq!(info.turn, crate::TurnDirection::ReachedYourDestination);
    assert_eq!(info.exit_num, 0);
    assert_eq!(info.time, std::time::Duration::ZERO);
}

#[rstest]
fn formatter_contract_breach_is_an_error(outcomes: Outcomes) {
    let mut session = RoutingSession::default().with_formatter(Unspaced);
    session.set_router(Box::new(StubRouter::succeeding(straight_route(&[
        0.0, 100.0,
    ]))));
    session
        .rebuild_route(c(0.0, 0.0), recorder(&outcomes))
        .expect("router installed");

    let err = session
        .route_following_info()
        .expect_err("unspaced output rejected");

    assert_eq!(
        err,
        SessionError::Format(crate::DistanceFormatError::MissingSeparator {
            text: "100m".into()
        })
    );
}

fn data_dir(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 temp path")
}

#[fixture]
fn temp_dir() -> TempDir {
    TempDir::new().expect("tempdir")
}

#[rstest]
fn delete_routing_data_removes_profile_file(temp_dir: TempDir, outcomes: Outcomes) {
    let dir = data_dir(&temp_dir);
    let file = dir.join("car.routing");
    fs::write(&file, b"graph").expect("write routing data");
    let router = StubRouter::succeeding(straight_route(&[0.0, 100.0]));
    let probe = router.probe();
    let mut session = RoutingSession::new(SessionConfig::default().with_data_dir(dir));
    session.set_router(Box::new(router));
    session
        .rebuild_route(c(0.0, 0.0), recorder(&outcomes))
        .expect("router installed");

    assert_eq!(session.delete_routing_data("car"), Ok(DataRemoval::Removed));
    assert!(!file.exists());
    assert_eq!(session.state(), SessionState::Inactive);
    assert_eq!(probe.snapshot().clears, 1);

    assert_eq!(session.delete_routing_data("car"), Ok(DataRemoval::Absent));
}

#[rstest]
fn delete_routing_data_reports_removal_failure(temp_dir: TempDir) {
    let dir = data_dir(&temp_dir);
    fs::create_dir(dir.join("car.routing")).expect("create blocking directory");
    let mut session = RoutingSession::new(SessionConfig::default().with_data_dir(dir));
    session.set_router(Box::new(StubRouter::failing(ResultCode::NoRoute)));

    assert_eq!(session.delete_routing_data("car"), Ok(DataRemoval::Failed));
}

#[rstest]
#[case("")]
#[case("..")]
#[case("../car")]
#[case("profiles/car")]
fn delete_routing_data_rejects_paths(#[case] profile_id: &str) {
    let mut session = RoutingSession::default();
    session.set_router(Box::new(StubRouter::failing(ResultCode::NoRoute)));

    assert_eq!(
        session.delete_routing_data(profile_id),
        Err(SessionError::InvalidProfileId {
            profile_id: profile_id.to_owned()
        })
    );
}

#[rstest]
fn delete_routing_data_requires_router() {
    let mut session = RoutingSession::default();
    assert_eq!(
        session.delete_routing_data("car"),
        Err(SessionError::RouterNotSet)
    );
}
