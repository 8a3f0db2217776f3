mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{StubTripService, eventually, id, telemetry_json, test_config, within};
use tokio::sync::watch;
use tress_fleet::FleetError;
use tress_fleet::application::FleetQueryService;
use tress_fleet::domain::{DeviceStateRepository, TripService};
use tress_fleet::domain::model::{
    ConnectionStatus, DeviceReading, RouteComputationState, RouteRequest, StrategyKind,
};
use tress_fleet::domain::service::RouteStrategyPolicy;
use tress_fleet::domain::value_object::{DeviceIdentity, GeoPoint};
use tress_fleet::infrastructure::{InMemoryDeviceStateStore, InMemoryTelemetryChannel};
use tress_fleet::service::{FleetBootstrap, FleetContext, build_context};

fn context(strategy: RouteStrategyPolicy, trip: Option<Arc<StubTripService>>) -> FleetContext {
    let mut config = test_config(strategy);
    if trip.is_none() {
        config.trip_service = None;
    }
    build_context(
        config,
        Arc::new(InMemoryTelemetryChannel::new()),
        trip.map(|t| t as Arc<dyn TripService>),
    )
}

fn place(ctx: &FleetContext, identity: &DeviceIdentity, lat: f64, lng: f64) {
    ctx.ingestion
        .ingest(DeviceReading::new(identity.clone()).with_location(lat, lng));
}

#[tokio::test]
async fn two_device_route_starts_at_focus_for_both_strategies() {
    let start = id("chosun", 0);
    let other = id("chosun", 1);

    let exact = context(RouteStrategyPolicy::Exact, None);
    let delegated = context(
        RouteStrategyPolicy::Delegated,
        Some(Arc::new(StubTripService::identity_order())),
    );

    for ctx in [&exact, &delegated] {
        place(ctx, &start, 35.1408, 126.9300);
        place(ctx, &other, 35.1452, 126.9211);
        assert_eq!(ctx.session.focused(), Some(start.clone()));

        let result = within(ctx.planner.plan_route(vec![other.clone()])).await.unwrap();
        assert_eq!(result.order, vec![start.clone(), other.clone()]);

        let again = within(ctx.planner.plan_route(vec![other.clone()])).await.unwrap();
        assert_eq!(again.order, result.order);
    }

    assert_eq!(
        exact.session.active_route().unwrap().strategy,
        StrategyKind::Exact
    );
    assert_eq!(
        delegated.session.active_route().unwrap().strategy,
        StrategyKind::Delegated
    );
}

#[tokio::test]
async fn delegated_route_maps_waypoints_back_to_devices() {
    let stub = Arc::new(StubTripService::ok(vec![0, 3, 1, 2]));
    let ctx = context(RouteStrategyPolicy::Delegated, Some(stub.clone()));

    let s = id("chosun", 2);
    let a = id("chosun", 5);
    let b = id("gwangju", 0);
    let c = id("gwangju", 7);
    place(&ctx, &s, 35.1408, 126.9300);
    place(&ctx, &a, 35.1452, 126.9211);
    place(&ctx, &b, 35.1371, 126.9402);
    place(&ctx, &c, 35.1499, 126.9355);

    let result = within(ctx.planner.plan_route(vec![a.clone(), b.clone(), c.clone()]))
        .await
        .unwrap();

    // 输入 [S, A, B, C]，waypoint_index [0, 3, 1, 2] => 访问顺序 [S, B, C, A]
    assert_eq!(result.order, vec![s, b, c, a]);
    assert_eq!(result.summary.stop_count, 4);
    assert_eq!(result.summary.duration_seconds, Some(240.0));

    let submitted = stub.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(
        submitted[0],
        vec![
            GeoPoint::new(35.1408, 126.9300).unwrap(),
            GeoPoint::new(35.1452, 126.9211).unwrap(),
            GeoPoint::new(35.1371, 126.9402).unwrap(),
            GeoPoint::new(35.1499, 126.9355).unwrap(),
        ]
    );
}

#[tokio::test]
async fn non_ok_trip_code_fails_and_keeps_previous_route() {
    let exact_ctx = context(RouteStrategyPolicy::Auto, None);
    let start = id("chosun", 2);
    let other = id("chosun", 5);
    place(&exact_ctx, &start, 35.1408, 126.9300);
    place(&exact_ctx, &other, 35.1452, 126.9211);

    let stub = Arc::new(StubTripService::with_code("NoTrips", vec![0, 1]));
    let ctx = context(RouteStrategyPolicy::Delegated, Some(stub));
    place(&ctx, &start, 35.1408, 126.9300);
    place(&ctx, &other, 35.1452, 126.9211);

    let err = within(ctx.planner.plan_route(vec![other.clone()]))
        .await
        .unwrap_err();
    assert!(matches!(err, FleetError::RouteComputationFailed(_)));
    assert!(ctx.session.active_route().is_none());
    assert!(matches!(
        ctx.session.computation_state(),
        RouteComputationState::Failed { .. }
    ));

    let view = ctx.queries.route_view();
    assert_eq!(view.phase, "failed");
    assert!(view.failure.unwrap().contains("NoTrips"));

    // 成功后再失败，activeRoute 保留上一次的结果
    let first = within(exact_ctx.planner.plan_route(vec![other.clone()]))
        .await
        .unwrap();
    let missing = id("chosun", 99);
    let err = within(exact_ctx.planner.plan_route(vec![other.clone(), missing]))
        .await
        .unwrap_err();
    assert!(matches!(err, FleetError::RouteComputationFailed(_)));
    assert_eq!(exact_ctx.session.active_route(), Some(first));
}

#[tokio::test]
async fn misuse_is_rejected_before_any_work() {
    let stub = Arc::new(StubTripService::identity_order());
    let ctx = context(RouteStrategyPolicy::Delegated, Some(stub.clone()));

    let err = within(ctx.planner.plan_route(vec![id("a", 1), id("a", 2)]))
        .await
        .unwrap_err();
    assert!(matches!(err, FleetError::NoStartSelected));

    let only = id("a", 0);
    place(&ctx, &only, 35.0, 127.0);
    let err = within(ctx.planner.plan_route(vec![only.clone()]))
        .await
        .unwrap_err();
    assert!(matches!(err, FleetError::InsufficientTargets { distinct: 1 }));

    assert_eq!(stub.calls(), 0);
    assert_eq!(ctx.session.computation_state(), RouteComputationState::Idle);
}

#[tokio::test]
async fn explicit_request_with_zero_id_start() {
    let ctx = context(RouteStrategyPolicy::Exact, None);
    let zero = id("opA", 0);
    let one = id("opA", 1);
    let other_op = id("opB", 0);
    place(&ctx, &zero, 0.0, 0.0);
    place(&ctx, &one, 0.0, 0.02);
    place(&ctx, &other_op, 0.0, 0.01);

    let result = within(ctx.planner.plan(RouteRequest::new(
        Some(zero.clone()),
        vec![one.clone(), other_op.clone()],
    )))
    .await
    .unwrap();
    assert_eq!(result.order, vec![zero, other_op, one]);
}

#[tokio::test]
async fn newer_request_supersedes_in_flight_computation() {
    let stub = Arc::new(StubTripService::identity_order().slow_first_call(Duration::from_millis(500)));
    let ctx = context(RouteStrategyPolicy::Delegated, Some(stub.clone()));

    let start = id("chosun", 2);
    let a = id("chosun", 5);
    let b = id("chosun", 6);
    place(&ctx, &start, 35.1408, 126.9300);
    place(&ctx, &a, 35.1452, 126.9211);
    place(&ctx, &b, 35.1371, 126.9402);

    let planner = ctx.planner.clone();
    let first_targets = vec![a.clone()];
    let first = tokio::spawn(async move { planner.plan_route(first_targets).await });

    common::eventually("first trip call", || stub.calls() == 1).await;
    assert!(ctx.session.computation_state().is_computing());

    let second = within(ctx.planner.plan_route(vec![a.clone(), b.clone()]))
        .await
        .unwrap();
    let first = within(first).await.unwrap();

    assert!(matches!(first, Err(FleetError::RouteSuperseded)));
    assert_eq!(second.order, vec![start, a, b]);
    assert_eq!(ctx.session.active_route(), Some(second));
    assert_eq!(stub.calls(), 2);
}

#[tokio::test]
async fn slow_trip_service_times_out() {
    let stub = Arc::new(StubTripService::identity_order().slow_first_call(Duration::from_secs(2)));
    let mut config = test_config(RouteStrategyPolicy::Delegated);
    if let Some(trip) = config.trip_service.as_mut() {
        trip.timeout = Duration::from_millis(50);
    }
    let ctx = build_context(
        config,
        Arc::new(InMemoryTelemetryChannel::new()),
        Some(stub as Arc<dyn TripService>),
    );

    let start = id("chosun", 2);
    let other = id("chosun", 5);
    place(&ctx, &start, 35.1408, 126.9300);
    place(&ctx, &other, 35.1452, 126.9211);

    let err = within(ctx.planner.plan_route(vec![other])).await.unwrap_err();
    assert!(matches!(err, FleetError::RouteComputationFailed(ref m) if m.contains("timed out")));
}

#[tokio::test]
async fn route_view_reports_unknown_devices_as_not_found() {
    let ctx = context(RouteStrategyPolicy::Exact, None);
    let start = id("chosun", 2);
    let other = id("chosun", 5);
    place(&ctx, &start, 35.1408, 126.9300);
    place(&ctx, &other, 35.1452, 126.9211);

    within(ctx.planner.plan_route(vec![other.clone()])).await.unwrap();

    let view = ctx.queries.route_view();
    assert_eq!(view.phase, "succeeded");
    assert_eq!(view.stops.len(), 2);
    assert!(view.stops.iter().all(|stop| stop.device.is_some()));

    // 路线引用的设备不在快照中时按“未找到”呈现
    let (_status_tx, status_rx) = tokio::sync::watch::channel(ConnectionStatus::Connected);
    let empty_store: Arc<dyn DeviceStateRepository> = Arc::new(InMemoryDeviceStateStore::default());
    let detached = FleetQueryService::new(empty_store, ctx.session.clone(), status_rx);
    let stale = detached.route_view();
    assert_eq!(stale.stops.len(), 2);
    assert!(stale.stops.iter().all(|stop| stop.device.is_none()));
    assert_eq!(detached.connection_status(), ConnectionStatus::Connected);

    let fleet = ctx.queries.fleet_view();
    let json = serde_json::to_value(&fleet).unwrap();
    assert_eq!(json["route"]["stops"][0]["identity"]["operatorName"], "chosun");
    assert_eq!(json["devices"].as_array().unwrap().len(), 2);

    ctx.session.clear_route();
    assert!(ctx.queries.route_view().stops.is_empty());
    ctx.session.acknowledge_route();
    assert_eq!(ctx.queries.route_view().phase, "idle");
}

/// 阻塞线程池只有一个线程，先占住它，精确搜索就会停在排队阶段
fn single_blocking_thread_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .max_blocking_threads(1)
        .enable_all()
        .build()
        .unwrap()
}

fn occupy_blocking_pool() -> std::sync::mpsc::Sender<()> {
    let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();
    tokio::task::spawn_blocking(move || {
        let _ = release_rx.recv();
    });
    release_tx
}

#[tokio::test]
async fn auto_policy_delegates_above_exact_limit() {
    let stub = Arc::new(StubTripService::identity_order());
    let mut config = test_config(RouteStrategyPolicy::Auto);
    config.exact_max_stops = 3;
    let ctx = build_context(
        config,
        Arc::new(InMemoryTelemetryChannel::new()),
        Some(stub.clone() as Arc<dyn TripService>),
    );

    let start = id("chosun", 2);
    let a = id("chosun", 5);
    let b = id("gwangju", 0);
    let c = id("gwangju", 7);
    place(&ctx, &start, 35.1408, 126.9300);
    place(&ctx, &a, 35.1452, 126.9211);
    place(&ctx, &b, 35.1371, 126.9402);
    place(&ctx, &c, 35.1499, 126.9355);

    let wide = within(ctx.planner.plan_route(vec![a.clone(), b.clone(), c.clone()]))
        .await
        .unwrap();
    assert_eq!(wide.strategy, StrategyKind::Delegated);
    assert_eq!(wide.order.len(), 4);
    assert_eq!(stub.calls(), 1);

    let narrow = within(ctx.planner.plan_route(vec![a.clone(), b.clone()]))
        .await
        .unwrap();
    assert_eq!(narrow.strategy, StrategyKind::Exact);
    assert_eq!(narrow.order[0], start);
    assert_eq!(narrow.order.len(), 3);
    assert_eq!(stub.calls(), 1);
}

#[test]
fn newer_request_supersedes_pending_exact_search() {
    single_blocking_thread_runtime().block_on(async {
        let ctx = context(RouteStrategyPolicy::Exact, None);
        let start = id("chosun", 2);
        let a = id("chosun", 5);
        let b = id("chosun", 6);
        place(&ctx, &start, 35.1408, 126.9300);
        place(&ctx, &a, 35.1452, 126.9211);
        place(&ctx, &b, 35.1371, 126.9402);

        let release = occupy_blocking_pool();

        let planner = ctx.planner.clone();
        let first_targets = vec![a.clone()];
        let first = tokio::spawn(async move { planner.plan_route(first_targets).await });
        eventually("first computation", || {
            ctx.session.computation_state().is_computing()
        })
        .await;

        let planner = ctx.planner.clone();
        let second_targets = vec![a.clone(), b.clone()];
        let second = tokio::spawn(async move { planner.plan_route(second_targets).await });

        let first = within(first).await.unwrap();
        assert!(matches!(first, Err(FleetError::RouteSuperseded)));
        assert!(ctx.session.computation_state().is_computing());
        assert!(ctx.session.active_route().is_none());

        release.send(()).unwrap();
        let second = within(second).await.unwrap().unwrap();
        assert_eq!(second.strategy, StrategyKind::Exact);
        assert_eq!(second.order[0], start);
        assert_eq!(second.order.len(), 3);
        assert_eq!(ctx.session.active_route(), Some(second));
        assert_eq!(
            ctx.metrics
                .route_computations_total
                .with_label_values(&["exact", "superseded"])
                .get(),
            1
        );
    });
}

#[test]
fn ingestion_continues_while_exact_search_is_pending() {
    single_blocking_thread_runtime().block_on(async {
        let channel = Arc::new(InMemoryTelemetryChannel::new());
        let mut config = test_config(RouteStrategyPolicy::Exact);
        config.trip_service = None;
        let ctx = build_context(config, channel.clone(), None);

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let ingestion = FleetBootstrap::spawn_ingestion(&ctx, shutdown_rx);
        eventually("subscription", || channel.subscriber_count() == 1).await;

        let start = id("chosun", 2);
        let other = id("chosun", 5);
        channel.publish("trash/gps/chosun/2", telemetry_json("chosun", 2, 35.1408, 126.93));
        channel.publish("trash/gps/chosun/5", telemetry_json("chosun", 5, 35.1452, 126.9211));
        eventually("initial devices", || ctx.store.len() == 2).await;

        let release = occupy_blocking_pool();
        let planner = ctx.planner.clone();
        let targets = vec![other.clone()];
        let pending = tokio::spawn(async move { planner.plan_route(targets).await });
        eventually("computation", || ctx.session.computation_state().is_computing()).await;

        channel.publish("trash/gps/gwangju/7", telemetry_json("gwangju", 7, 35.1499, 126.9355));
        channel.publish(
            "trash/gps/chosun/5",
            r#"{"operatorName":"chosun","operatorId":5,"plastic":60}"#,
        );
        eventually("readings during search", || {
            ctx.store.len() == 3
                && ctx
                    .queries
                    .devices()
                    .get(&other)
                    .is_some_and(|d| d.peak_fill().is_some())
        })
        .await;
        assert!(ctx.session.computation_state().is_computing());

        release.send(()).unwrap();
        let route = within(pending).await.unwrap().unwrap();
        assert_eq!(route.order, vec![start, other]);

        shutdown_tx.send(true).unwrap();
        within(ingestion).await.unwrap();
    });
}

#[tokio::test]
async fn abandoned_caller_still_commits_result() {
    let stub = Arc::new(StubTripService::identity_order().slow_first_call(Duration::from_millis(200)));
    let ctx = context(RouteStrategyPolicy::Delegated, Some(stub.clone()));

    let start = id("chosun", 2);
    let other = id("chosun", 5);
    place(&ctx, &start, 35.1408, 126.9300);
    place(&ctx, &other, 35.1452, 126.9211);

    let planner = ctx.planner.clone();
    let targets = vec![other.clone()];
    let caller = tokio::spawn(async move { planner.plan_route(targets).await });
    eventually("trip call", || stub.calls() == 1).await;
    caller.abort();
    assert!(within(caller).await.unwrap_err().is_cancelled());

    eventually("committed route", || {
        matches!(
            ctx.session.computation_state(),
            RouteComputationState::Succeeded { .. }
        )
    })
    .await;
    let route = ctx.session.active_route().unwrap();
    assert_eq!(route.order, vec![start, other]);
}
