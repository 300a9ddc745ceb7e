mod common;

use common::{demo_city_engine, demo_city_engine_with, matched_driver, node_ride, seconds};
use ridedispatch_lib::{
    DispatchConfig, DispatchEvent, Dispatcher, Driver, Error, JsonRideStore, Location,
    ProximitySearch, RideStatus, RideSubmission, TaskKind, UnmatchedReason,
};

#[test]
fn full_lifecycle_releases_driver_at_destination() {
    let mut engine = demo_city_engine();
    let ride_id = engine.submit_request(node_ride("B", "J")).unwrap();
    assert_eq!(engine.ledger().get(&ride_id).unwrap().status, RideStatus::Pending);

    let events = engine.advance(seconds(1));
    assert_eq!(matched_driver(&events, &ride_id).as_deref(), Some("driver2"));

    let ride = engine.ledger().get(&ride_id).unwrap();
    assert_eq!(ride.status, RideStatus::Matched);
    assert_eq!(ride.assigned_driver_id.as_deref(), Some("driver2"));
    assert!(!engine.drivers().get("driver2").unwrap().available);

    // Stored route: driver at E to pickup B, then B to J.
    let stored = engine.ledger().route(&ride_id).expect("route stored");
    assert_eq!(stored.nodes(), ["E", "B", "E", "F", "J"]);
    assert_eq!(stored.distance, 15.0);
    assert_eq!(stored.estimated_time, 30);

    let events = engine.advance(seconds(2));
    assert_eq!(
        events,
        vec![DispatchEvent::TripStarted {
            ride_id: ride_id.clone()
        }]
    );

    engine.complete_request(&ride_id).unwrap();
    let driver = engine.drivers().get("driver2").unwrap();
    assert!(driver.available);
    assert_eq!(driver.location, Location::node("J"));
    assert_eq!(
        engine.ledger().get(&ride_id).unwrap().status,
        RideStatus::Completed
    );
}

#[test]
fn show_route_recomputes_trip_leg() {
    let mut engine = demo_city_engine();
    let ride_id = engine.submit_request(node_ride("B", "J")).unwrap();
    engine.advance(seconds(1));

    let before = engine.snapshot();
    let route = engine.show_route(&ride_id).unwrap();
    assert_eq!(route.nodes(), ["B", "E", "F", "J"]);
    assert_eq!(route.distance, 12.0);
    assert_eq!(route.estimated_time, 24);
    assert_eq!(engine.snapshot(), before);
}

#[test]
fn never_assigns_unavailable_driver() {
    // driver4 waits at the pickup but is off duty.
    let mut engine = demo_city_engine();
    let ride_id = engine.submit_request(node_ride("C", "A")).unwrap();
    let events = engine.advance(seconds(1));

    assert_eq!(matched_driver(&events, &ride_id).as_deref(), Some("driver2"));
    assert!(!engine.drivers().get("driver4").unwrap().available);
}

#[test]
fn exact_search_matches_same_driver_in_demo_city() {
    let config = DispatchConfig {
        proximity_search: ProximitySearch::Exact,
        ..DispatchConfig::default()
    };
    let mut engine = demo_city_engine_with(config);
    let ride_id = engine.submit_request(node_ride("B", "J")).unwrap();
    let events = engine.advance(seconds(1));
    assert_eq!(matched_driver(&events, &ride_id).as_deref(), Some("driver2"));
}

#[test]
fn cancel_matched_ride_frees_driver_in_place() {
    let mut engine = demo_city_engine();
    let ride_id = engine.submit_request(node_ride("B", "J")).unwrap();
    engine.advance(seconds(1));
    let location_before = engine.drivers().get("driver2").unwrap().location.clone();

    let canceled = engine.cancel_request(&ride_id).unwrap();
    assert_eq!(canceled.status, RideStatus::Matched);

    let driver = engine.drivers().get("driver2").unwrap();
    assert!(driver.available);
    assert_eq!(driver.location, location_before);
    assert!(engine.ledger().get(&ride_id).is_none());
    assert!(engine.ledger().route(&ride_id).is_none());
    assert_eq!(engine.ledger().active().count(), 0);
}

#[test]
fn canceled_ride_is_not_resurrected() {
    let mut engine = demo_city_engine();
    let ride_id = engine.submit_request(node_ride("B", "J")).unwrap();
    engine.advance(seconds(1));
    engine.cancel_request(&ride_id).unwrap();

    let events = engine.advance(seconds(5));
    assert_eq!(
        events,
        vec![DispatchEvent::Stale {
            ride_id: ride_id.clone(),
            task: TaskKind::BeginTrip
        }]
    );
    assert!(engine.ledger().is_empty());
    assert!(engine.drivers().get("driver2").unwrap().available);
}

#[test]
fn cancel_before_matching_skips_match() {
    let mut engine = demo_city_engine();
    let ride_id = engine.submit_request(node_ride("A", "J")).unwrap();
    engine.cancel_request(&ride_id).unwrap();

    let events = engine.run_until_idle();
    assert_eq!(
        events,
        vec![DispatchEvent::Stale {
            ride_id,
            task: TaskKind::MatchDriver
        }]
    );
    assert_eq!(engine.drivers().available_count(), 4);
}

#[test]
fn no_available_driver_leaves_ride_pending() {
    let scenario = common::abc_scenario(vec![
        Driver::at_node("driver1", "Alice", "A", 4.8).unavailable()
    ]);
    let mut engine = scenario.graph_engine(DispatchConfig::default()).unwrap();
    let ride_id = engine.submit_request(node_ride("A", "C")).unwrap();

    let events = engine.run_until_idle();
    assert_eq!(
        events,
        vec![DispatchEvent::Unmatched {
            ride_id: ride_id.clone(),
            reason: UnmatchedReason::NoDriver
        }]
    );
    assert_eq!(engine.ledger().get(&ride_id).unwrap().status, RideStatus::Pending);
    assert_eq!(engine.pending_tasks(), 0);
}

#[test]
fn missing_trip_route_prevents_assignment() {
    let scenario = common::abc_scenario(vec![Driver::at_node("driver1", "Alice", "A", 4.8)]);
    let mut engine = scenario.graph_engine(DispatchConfig::default()).unwrap();
    let ride_id = engine.submit_request(node_ride("A", "X")).unwrap();

    let events = engine.run_until_idle();
    assert_eq!(
        events,
        vec![DispatchEvent::Unmatched {
            ride_id: ride_id.clone(),
            reason: UnmatchedReason::NoPath
        }]
    );
    let ride = engine.ledger().get(&ride_id).unwrap();
    assert_eq!(ride.status, RideStatus::Pending);
    assert!(ride.assigned_driver_id.is_none());
    assert!(engine.drivers().get("driver1").unwrap().available);

    assert!(matches!(
        engine.show_route(&ride_id),
        Err(Error::RouteNotFound { .. })
    ));
}

#[test]
fn retry_matches_once_driver_returns() {
    let config = DispatchConfig {
        retry_unmatched_after_ms: Some(500),
        ..DispatchConfig::default()
    };
    let scenario = common::abc_scenario(vec![
        Driver::at_node("driver1", "Alice", "A", 4.8).unavailable()
    ]);
    let mut engine = scenario.graph_engine(config).unwrap();
    let ride_id = engine.submit_request(node_ride("B", "C")).unwrap();

    let events = engine.advance(seconds(1));
    assert!(matches!(
        events.as_slice(),
        [DispatchEvent::Unmatched {
            reason: UnmatchedReason::NoDriver,
            ..
        }]
    ));

    assert!(engine.toggle_driver_availability("driver1").unwrap());
    let events = engine.advance(std::time::Duration::from_millis(500));
    assert_eq!(matched_driver(&events, &ride_id).as_deref(), Some("driver1"));
}

#[test]
fn run_until_idle_stops_on_fruitless_retries() {
    let config = DispatchConfig {
        retry_unmatched_after_ms: Some(500),
        ..DispatchConfig::default()
    };
    let mut engine = common::abc_scenario(Vec::new())
        .graph_engine(config)
        .unwrap();
    engine.submit_request(node_ride("A", "C")).unwrap();

    let events = engine.run_until_idle();
    assert!(events
        .iter()
        .all(|event| matches!(event, DispatchEvent::Unmatched { .. })));
    assert_eq!(engine.pending_tasks(), 1, "retry stays queued");
}

#[test]
fn run_until_idle_still_starts_trips_while_retries_remain() {
    let config = DispatchConfig {
        retry_unmatched_after_ms: Some(500),
        ..DispatchConfig::default()
    };
    let mut engine = common::abc_scenario(vec![Driver::at_node("driver1", "Alice", "A", 4.8)])
        .graph_engine(config)
        .unwrap();
    let served = engine.submit_request(node_ride("A", "C")).unwrap();
    let waiting = engine.submit_request(node_ride("B", "C")).unwrap();

    // The second ride keeps retrying every 500 ms while the first ride's
    // trip start is still two seconds out.
    let events = engine.run_until_idle();
    assert!(events.contains(&DispatchEvent::TripStarted {
        ride_id: served.clone()
    }));
    assert_eq!(engine.ledger().get(&served).unwrap().status, RideStatus::InProgress);
    assert_eq!(engine.ledger().get(&waiting).unwrap().status, RideStatus::Pending);
    assert_eq!(engine.pending_tasks(), 1, "only the retry stays queued");
}

#[test]
fn engaged_driver_cannot_be_toggled() {
    let mut engine = demo_city_engine();
    let ride_id = engine.submit_request(node_ride("B", "J")).unwrap();
    engine.advance(seconds(3));

    let err = engine.toggle_driver_availability("driver2").unwrap_err();
    assert!(matches!(err, Error::DriverEngaged { ride_id: ref id, .. } if *id == ride_id));

    engine.complete_request(&ride_id).unwrap();
    assert!(!engine.toggle_driver_availability("driver2").unwrap());
    assert!(matches!(
        engine.toggle_driver_availability("ghost"),
        Err(Error::UnknownDriver { .. })
    ));
}

#[test]
fn completion_requires_trip_in_progress() {
    let mut engine = demo_city_engine();
    let ride_id = engine.submit_request(node_ride("B", "J")).unwrap();

    let err = engine.complete_request(&ride_id).unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("ride {ride_id} cannot move from pending to completed")
    );

    engine.advance(seconds(3));
    engine.complete_request(&ride_id).unwrap();
    let err = engine.cancel_request(&ride_id).unwrap_err();
    assert!(matches!(err, Error::InvalidTransition { to: "canceled", .. }));
    assert!(matches!(
        engine.complete_request("ride_0"),
        Err(Error::UnknownRide { .. })
    ));
}

#[test]
fn pickup_report_starts_trip_without_auto_advance() {
    let config = DispatchConfig {
        auto_advance: false,
        ..DispatchConfig::default()
    };
    let mut engine = demo_city_engine_with(config);
    let ride_id = engine.submit_request(node_ride("B", "J")).unwrap();
    engine.advance(seconds(60));
    assert_eq!(engine.ledger().get(&ride_id).unwrap().status, RideStatus::Matched);

    engine.report_pickup(&ride_id).unwrap();
    assert_eq!(
        engine.ledger().get(&ride_id).unwrap().status,
        RideStatus::InProgress
    );
    assert!(matches!(
        engine.report_pickup(&ride_id),
        Err(Error::InvalidTransition { .. })
    ));
}

#[test]
fn rejects_invalid_submissions_without_state_change() {
    let mut engine = demo_city_engine();

    let err = engine
        .submit_request(RideSubmission::new(
            "passenger_1",
            "   ",
            Location::node("A"),
            Location::node("B"),
        ))
        .unwrap_err();
    assert!(err.to_string().contains("passenger name is required"));

    let err = engine.submit_request(node_ride("A", "A")).unwrap_err();
    assert!(matches!(err, Error::InvalidRequest { .. }));

    let err = engine.submit_request(node_ride("A", "Hospitl")).unwrap_err();
    assert!(err.to_string().contains("Did you mean 'Hospital'?"));

    let err = engine
        .submit_request(common::coordinate_ride(
            ridedispatch_lib::LatLng::new(28.6, 77.2),
            ridedispatch_lib::LatLng::new(28.7, 77.3),
        ))
        .unwrap_err();
    assert!(matches!(err, Error::InvalidRequest { .. }));

    assert!(engine.ledger().is_empty());
    assert_eq!(engine.pending_tasks(), 0);
}

#[test]
fn same_millisecond_requests_get_distinct_ids() {
    let mut engine = demo_city_engine();
    let first = engine.submit_request(node_ride("A", "J")).unwrap();
    let second = engine.submit_request(node_ride("G", "C")).unwrap();

    assert_eq!(first, "ride_1700000000000");
    assert_eq!(second, "ride_1700000000000_1");

    let events = engine.advance(seconds(1));
    assert_eq!(matched_driver(&events, &first).as_deref(), Some("driver1"));
    assert_eq!(matched_driver(&events, &second).as_deref(), Some("driver5"));
}

#[test]
fn canceled_ride_id_is_not_reissued() {
    let mut engine = common::abc_scenario(vec![Driver::at_node("driver1", "Alice", "A", 4.8)])
        .graph_engine(DispatchConfig::default())
        .unwrap();
    let canceled = engine.submit_request(node_ride("A", "C")).unwrap();
    engine.cancel_request(&canceled).unwrap();
    let fresh = engine.submit_request(node_ride("B", "C")).unwrap();

    assert_eq!(canceled, "ride_0");
    assert_eq!(fresh, "ride_0_1");

    let events = engine.advance(seconds(1));
    assert_eq!(
        events[0],
        DispatchEvent::Stale {
            ride_id: canceled.clone(),
            task: TaskKind::MatchDriver,
        }
    );
    assert_eq!(matched_driver(&events, &fresh).as_deref(), Some("driver1"));
    assert!(engine.ledger().get(&canceled).is_none());
}

#[test]
fn route_to_any_node_from_pickup() {
    let mut engine = demo_city_engine();
    let ride_id = engine.submit_request(node_ride("B", "J")).unwrap();

    let route = engine.route_to_node(&ride_id, "G").unwrap();
    assert_eq!(route.nodes(), ["B", "H", "G"]);
    assert_eq!(route.distance, 12.0);
    assert!(matches!(
        engine.route_to_node(&ride_id, "Q"),
        Err(Error::UnknownNode { .. })
    ));
}

#[test]
fn store_mirrors_ledger() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = JsonRideStore::open(dir.path()).unwrap();
    let mut engine = demo_city_engine().with_store(Box::new(store.clone()));

    let ride_id = engine.submit_request(node_ride("B", "J")).unwrap();
    engine.advance(seconds(1));
    let stored = store.load(&ride_id).unwrap().expect("ride persisted");
    assert_eq!(stored.status, RideStatus::Matched);
    assert_eq!(stored.assigned_driver_id.as_deref(), Some("driver2"));

    engine.cancel_request(&ride_id).unwrap();
    assert!(store.load(&ride_id).unwrap().is_none());
}

#[test]
fn dispatcher_trait_drives_any_engine() {
    fn submit_and_snapshot(dispatcher: &mut dyn Dispatcher) -> usize {
        dispatcher
            .submit_request(node_ride("A", "C"))
            .expect("valid request");
        dispatcher.snapshot().rides.len()
    }

    let mut engine = demo_city_engine();
    assert_eq!(submit_and_snapshot(&mut engine), 1);
}
