mod common;

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use trip_service::config::EnvironmentConfig;
use trip_service::dto::trip_dto::TripRequest;
use trip_service::listeners::{seat_update_listener, trip_status_listener, ListenerSet};
use trip_service::messaging::{topics, EventBus};
use trip_service::models::TripStatus;
use trip_service::realtime::TRIP_UPDATES_TOPIC;
use trip_service::repositories::TripStore;

use common::{at, context, day, eventually, quick_listener_config, trip, TestContext};

fn start(ctx: &TestContext) -> ListenerSet {
    let trips: Arc<dyn TripStore> = ctx.store.clone();
    ListenerSet::start(Arc::new(ctx.bus.clone()), trips, ctx.hub.clone(), &quick_listener_config())
}

async fn publish(ctx: &TestContext, topic: &str, payload: Value) {
    ctx.bus
        .publish(topic, Some("17"), payload.to_string().into_bytes())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_reserve_and_release_reconcile_stock() {
    let ctx = context(EnvironmentConfig::default());
    ctx.store.add_trip(trip(17, TripStatus::NotDeparted, 10));
    let listeners = start(&ctx);

    publish(&ctx, topics::SEATS_RESERVED, json!({ "tripId": "17", "seatCount": 3 })).await;
    eventually(|| ctx.store.trip(17).map(|t| t.stock) == Some(7)).await;

    publish(&ctx, topics::SEATS_RELEASED, json!({ "tripId": "17", "seatCount": 2 })).await;
    eventually(|| ctx.store.trip(17).map(|t| t.stock) == Some(9)).await;

    eventually(|| ctx.bus.committed_offset(seat_update_listener::GROUP_ID, topics::SEATS_RELEASED) == 1).await;
    listeners.stop().await;
}

#[tokio::test]
async fn test_redelivered_seat_event_is_applied_once() {
    let ctx = context(EnvironmentConfig::default());
    ctx.store.add_trip(trip(17, TripStatus::NotDeparted, 10));
    let listeners = start(&ctx);

    let event = json!({ "tripId": "17", "seatCount": 4, "eventId": "booking-88" });
    publish(&ctx, topics::SEATS_RESERVED, event.clone()).await;
    publish(&ctx, topics::SEATS_RESERVED, event).await;
    publish(&ctx, topics::SEATS_RESERVED, json!({ "tripId": "not-a-number", "seatCount": 1 })).await;

    eventually(|| ctx.bus.committed_offset(seat_update_listener::GROUP_ID, topics::SEATS_RESERVED) == 3).await;
    assert_eq!(ctx.store.trip(17).unwrap().stock, 6);
    listeners.stop().await;
}

#[tokio::test]
async fn test_restarted_listener_resumes_after_committed_position() {
    let ctx = context(EnvironmentConfig::default());
    ctx.store.add_trip(trip(17, TripStatus::NotDeparted, 10));

    let first = start(&ctx);
    publish(&ctx, topics::SEATS_RESERVED, json!({ "tripId": "17", "seatCount": 1 })).await;
    eventually(|| ctx.bus.committed_offset(seat_update_listener::GROUP_ID, topics::SEATS_RESERVED) == 1).await;
    first.stop().await;

    publish(&ctx, topics::SEATS_RESERVED, json!({ "tripId": "17", "seatCount": 1 })).await;
    let second = start(&ctx);
    eventually(|| ctx.bus.committed_offset(seat_update_listener::GROUP_ID, topics::SEATS_RESERVED) == 2).await;
    second.stop().await;

    assert_eq!(ctx.store.trip(17).unwrap().stock, 8);
}

#[tokio::test]
async fn test_trip_edit_keeps_reconciled_stock() {
    let ctx = context(EnvironmentConfig::default());
    ctx.store.add_trip(trip(17, TripStatus::NotDeparted, 10));
    let listeners = start(&ctx);

    publish(&ctx, topics::SEATS_RESERVED, json!({ "tripId": "17", "seatCount": 3 })).await;
    eventually(|| ctx.store.trip(17).map(|t| t.stock) == Some(7)).await;
    listeners.stop().await;

    let mut edit = TripRequest {
        departure_date: Some(day()),
        departure_time: Some(at(9, 0)),
        arrival_date: Some(day()),
        arrival_time: Some(at(15, 0)),
        vehicle_id: 3,
        route_id: 1,
        pickup_id: "10".into(),
        driver_id: None,
        total: Some(10),
        stock: None,
    };
    let updated = ctx.state.trips.update_trip(Some(5), 17, edit.clone()).await.unwrap();
    assert_eq!(updated.stock, 7);

    // Un stock enviado por el cliente tampoco pisa la conciliación
    edit.stock = Some(10);
    edit.total = Some(12);
    let updated = ctx.state.trips.update_trip(Some(5), 17, edit).await.unwrap();
    assert_eq!((updated.stock, updated.total), (9, 12));
    assert_eq!(ctx.store.trip(17).unwrap().stock, 9);
}

#[tokio::test]
async fn test_departure_is_broadcast_to_realtime_subscribers() {
    let ctx = context(EnvironmentConfig::default());
    ctx.store.add_trip(trip(1, TripStatus::NotDeparted, 10));
    ctx.store.add_trip(trip(2, TripStatus::NotDeparted, 10));
    ctx.store.add_trip(trip(3, TripStatus::Arrived, 10));
    let mut updates = ctx.hub.subscribe(TRIP_UPDATES_TOPIC).await;
    let listeners = start(&ctx);

    ctx.state.status_engine.update_status(Some(5), 2, 1).await.unwrap();

    let message = tokio::time::timeout(Duration::from_secs(2), updates.recv())
        .await
        .expect("no broadcast received")
        .unwrap();
    let trips: Value = serde_json::from_str(&message).unwrap();
    let ids: Vec<i64> = trips
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2]);
    assert_eq!(trips[1]["status"], 1);

    // Llegada: se consume pero no se difunde
    ctx.state.status_engine.update_status(Some(5), 2, 2).await.unwrap();
    eventually(|| {
        ctx.bus
            .committed_offset(trip_status_listener::GROUP_ID, topics::TRIP_STATUS_UPDATED)
            == 2
    })
    .await;
    assert!(updates.try_recv().is_err());

    listeners.stop().await;
}
