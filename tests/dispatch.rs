//! Registry dispatch: ordering, filtering, isolation, and error surfaces.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{Recorder, TestWorld};
use systemvisor::{
    ComponentQuery, ConfigError, DamageRecord, EntityId, PlayerId, SystemKind, SystemRegistry,
    SystemSpec, WorldId,
};

#[derive(Clone, Copy)]
struct TimeChange {
    dawn: bool,
}

#[derive(Clone, Copy)]
struct Ping;

#[test]
fn world_systems_run_in_priority_order() {
    let registry = SystemRegistry::new();
    let world = TestWorld::new();
    let log = world.recorder.clone();

    for (id, priority) in [("second", 5), ("first", -1), ("third", 9)] {
        let log = log.clone();
        registry
            .register(
                SystemSpec::on_world_event::<Ping, _>(id, move |_ctx, _ev| {
                    log.push(id);
                    Ok(())
                })
                .priority(priority),
            )
            .unwrap();
    }

    let report = registry.dispatch_event(&Ping, &world.view()).unwrap();
    assert_eq!(report.invoked, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(log.snapshot(), vec!["first", "second", "third"]);
}

#[test]
fn dependency_edges_override_priority() {
    let registry = SystemRegistry::new();
    let world = TestWorld::new();
    let log = world.recorder.clone();

    let l = log.clone();
    registry
        .register(
            // Lowest priority but declared after "main": must still run last.
            SystemSpec::on_world_event::<Ping, _>("cleanup", move |_ctx, _ev| {
                l.push("cleanup");
                Ok(())
            })
            .priority(-100)
            .after("main"),
        )
        .unwrap();
    let l = log.clone();
    registry
        .register(SystemSpec::on_world_event::<Ping, _>("main", move |_ctx, _ev| {
            l.push("main");
            Ok(())
        }))
        .unwrap();

    registry.dispatch_event(&Ping, &world.view()).unwrap();
    assert_eq!(log.snapshot(), vec!["main", "cleanup"]);
}

#[test]
fn failing_and_panicking_handlers_do_not_stop_later_systems() {
    common::init_tracing();
    let registry = SystemRegistry::new();
    let world = TestWorld::new();
    let log = world.recorder.clone();

    let l = log.clone();
    registry
        .register(
            SystemSpec::on_world_event::<Ping, _>("broken-err", move |_ctx, _ev| {
                l.push("broken-err");
                Err("handler bug".into())
            })
            .priority(0),
        )
        .unwrap();
    let l = log.clone();
    registry
        .register(
            SystemSpec::on_world_event::<Ping, _>("broken-panic", move |_ctx, _ev| {
                l.push("broken-panic");
                panic!("handler panic");
            })
            .priority(1),
        )
        .unwrap();
    let l = log.clone();
    registry
        .register(
            SystemSpec::on_world_event::<Ping, _>("healthy", move |_ctx, _ev| {
                l.push("healthy");
                Ok(())
            })
            .priority(2),
        )
        .unwrap();

    let report = registry.dispatch_event(&Ping, &world.view()).unwrap();
    assert_eq!(report.invoked, 3);
    assert_eq!(report.failed, 2);
    assert_eq!(log.snapshot(), vec!["broken-err", "broken-panic", "healthy"]);
}

#[test]
fn entity_event_runs_once_per_matching_entity_and_honors_filter() {
    let registry = SystemRegistry::new();
    let mut world = TestWorld::new();
    let greeter_a = world.spawn(1, &["greeting", "position"]);
    let greeter_b = world.spawn(2, &["greeting"]);
    world.spawn(3, &["position"]);
    let log = world.recorder.clone();

    let l = log.clone();
    registry
        .register(
            SystemSpec::on_entity_event::<TimeChange, _>("dawn-greeter", move |ctx, _ev| {
                l.push(format!("greet {}", ctx.entity));
                Ok(())
            })
            .query(ComponentQuery::with(["greeting"]))
            .filter(|ev: &TimeChange| ev.dawn),
        )
        .unwrap();

    // Dusk: filter rejects, nothing runs.
    let report = registry
        .dispatch_event(&TimeChange { dawn: false }, &world.view())
        .unwrap();
    assert_eq!(report.matched, 0);
    assert_eq!(report.invoked, 0);

    // Dawn: once per entity carrying the "greeting" component.
    let report = registry
        .dispatch_event(&TimeChange { dawn: true }, &world.view())
        .unwrap();
    assert_eq!(report.matched, 1);
    assert_eq!(report.invoked, 2);
    let mut seen = log.snapshot();
    seen.sort();
    assert_eq!(
        seen,
        vec![format!("greet {greeter_a}"), format!("greet {greeter_b}")]
    );
}

#[test]
fn events_of_other_types_are_not_delivered() {
    let registry = SystemRegistry::new();
    let world = TestWorld::new();
    let hits = Arc::new(AtomicUsize::new(0));

    let h = Arc::clone(&hits);
    registry
        .register(SystemSpec::on_world_event::<TimeChange, _>(
            "time-listener",
            move |_ctx, _ev| {
                h.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        ))
        .unwrap();

    registry.dispatch_event(&Ping, &world.view()).unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 0);

    registry
        .dispatch_event(&TimeChange { dawn: true }, &world.view())
        .unwrap();
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[test]
fn handlers_reach_the_host_command_buffer_by_downcast() {
    let registry = SystemRegistry::new();
    let mut world = TestWorld::new();
    world.spawn(1, &[]);

    registry
        .register(SystemSpec::on_entity_event::<Ping, _>(
            "command-writer",
            move |ctx, _ev| {
                let buffer = ctx
                    .commands_as::<Recorder>()
                    .ok_or("unexpected buffer type")?;
                buffer.push(format!("queued for {}", ctx.entity));
                Ok(())
            },
        ))
        .unwrap();

    let report = registry.dispatch_event(&Ping, &world.view()).unwrap();
    assert_eq!(report.failed, 0);
    assert_eq!(world.recorder.snapshot(), vec!["queued for entity:1"]);
}

#[test]
fn tick_systems_fire_on_interval_multiples() {
    let registry = SystemRegistry::new();
    let mut world = TestWorld::new();
    world.spawn(1, &["crop"]);
    let log = world.recorder.clone();

    let l = log.clone();
    registry
        .register(
            SystemSpec::on_tick("crop-growth", 5, move |ctx| {
                l.push(format!("tick {}", ctx.tick));
                Ok(())
            })
            .query(ComponentQuery::with(["crop"])),
        )
        .unwrap();

    for tick in 0..=20 {
        registry.dispatch_tick(tick, &world.view()).unwrap();
    }
    assert_eq!(
        log.snapshot(),
        vec!["tick 0", "tick 5", "tick 10", "tick 15", "tick 20"]
    );
}

#[test]
fn tick_interval_zero_is_rejected() {
    let registry = SystemRegistry::new();
    let err = registry
        .register(SystemSpec::on_tick("bad-interval", 0, |_ctx| Ok(())))
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidInterval { interval: 0, .. }));
    assert_eq!(registry.count(SystemKind::Tick), 0);
}

#[test]
fn damage_cancel_is_visible_to_later_systems() {
    let registry = SystemRegistry::new();
    let world = TestWorld::new();
    let log = world.recorder.clone();

    registry
        .register(
            SystemSpec::on_damage("fall-cancel", |ctx| {
                ctx.cancel_damage();
                Ok(())
            })
            .filter_damage(|rec| rec.cause.as_str() == "fall")
            .priority(-10),
        )
        .unwrap();
    let l = log.clone();
    registry
        .register(
            SystemSpec::on_damage("damage-logger", move |ctx| {
                l.push(format!(
                    "{} cancelled={} world={:?}",
                    ctx.damage.cause,
                    ctx.is_cancelled(),
                    ctx.world
                ));
                Ok(())
            })
            .after("fall-cancel"),
        )
        .unwrap();

    let fall = DamageRecord::new("fall", 4.0, EntityId(3)).with_player(PlayerId(1));
    let report = registry.dispatch_damage(&fall, &world.view()).unwrap();
    assert_eq!(report.matched, 2);
    assert!(fall.is_cancelled());

    let fire = DamageRecord::new("fire", 2.0, EntityId(3));
    let report = registry.dispatch_damage(&fire, &world.view()).unwrap();
    // The fall filter rejects fire damage; only the logger sees it.
    assert_eq!(report.matched, 1);
    assert!(!fire.is_cancelled());

    assert_eq!(
        log.snapshot(),
        vec![
            format!("fall cancelled=true world={:?}", Some(WorldId(101))),
            format!("fire cancelled=false world={:?}", None::<WorldId>),
        ]
    );
}

#[test]
fn duplicate_ids_are_rejected_per_kind() {
    let registry = SystemRegistry::new();
    registry
        .register(SystemSpec::on_world_event::<Ping, _>("echo", |_ctx, _ev| Ok(())))
        .unwrap();

    let err = registry
        .register(SystemSpec::on_world_event::<Ping, _>("echo", |_ctx, _ev| Ok(())))
        .unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateId { .. }));

    // Same id under a different kind is a distinct registration.
    registry
        .register(SystemSpec::on_tick("echo", 1, |_ctx| Ok(())))
        .unwrap();
    assert_eq!(registry.count(SystemKind::WorldEvent), 1);
    assert_eq!(registry.count(SystemKind::Tick), 1);
}

#[test]
fn cycle_registration_rolls_back_and_registry_stays_usable() {
    let registry = SystemRegistry::new();
    let world = TestWorld::new();
    let log = world.recorder.clone();

    let l = log.clone();
    registry
        .register(
            SystemSpec::on_world_event::<Ping, _>("a", move |_ctx, _ev| {
                l.push("a");
                Ok(())
            })
            .before("b"),
        )
        .unwrap();
    let err = registry
        .register(
            SystemSpec::on_world_event::<Ping, _>("b", |_ctx, _ev| Ok(())).before("a"),
        )
        .unwrap_err();
    assert!(matches!(err, ConfigError::DependencyCycle { .. }));
    assert_eq!(registry.count(SystemKind::WorldEvent), 1);

    // "a" still has an unresolved edge to the never-registered "b", which is
    // fine: edges to missing ids only bind once both ends exist.
    // Registering a non-cyclic "b" resolves it.
    let l = log.clone();
    registry
        .register(SystemSpec::on_world_event::<Ping, _>("b", move |_ctx, _ev| {
            l.push("b");
            Ok(())
        }))
        .unwrap();
    registry.dispatch_event(&Ping, &world.view()).unwrap();
    assert_eq!(log.snapshot(), vec!["a", "b"]);
}

#[test]
fn unresolved_dependency_surfaces_at_dispatch() {
    let registry = SystemRegistry::new();
    let world = TestWorld::new();

    registry
        .register(
            SystemSpec::on_world_event::<Ping, _>("orphan", |_ctx, _ev| Ok(())).after("ghost"),
        )
        .unwrap();

    let err = registry.dispatch_event(&Ping, &world.view()).unwrap_err();
    assert!(matches!(err, ConfigError::UnresolvedDependency { .. }));
}

#[test]
fn registration_invalidates_the_cached_order() {
    let registry = SystemRegistry::new();
    let world = TestWorld::new();
    let log = world.recorder.clone();

    let l = log.clone();
    registry
        .register(SystemSpec::on_world_event::<Ping, _>("early", move |_ctx, _ev| {
            l.push("early");
            Ok(())
        }))
        .unwrap();
    registry.dispatch_event(&Ping, &world.view()).unwrap();

    // A later registration with lower priority must land ahead of "early"
    // on the next dispatch, not be served from the stale cached order.
    let l = log.clone();
    registry
        .register(
            SystemSpec::on_world_event::<Ping, _>("earlier", move |_ctx, _ev| {
                l.push("earlier");
                Ok(())
            })
            .priority(-1),
        )
        .unwrap();
    registry.dispatch_event(&Ping, &world.view()).unwrap();

    assert_eq!(log.snapshot(), vec!["early", "earlier", "early"]);
}

#[test]
fn unregister_is_idempotent_and_stops_dispatch() {
    let registry = SystemRegistry::new();
    let world = TestWorld::new();
    let hits = Arc::new(AtomicUsize::new(0));

    let h = Arc::clone(&hits);
    registry
        .register(SystemSpec::on_world_event::<Ping, _>("echo", move |_ctx, _ev| {
            h.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }))
        .unwrap();
    registry.dispatch_event(&Ping, &world.view()).unwrap();

    let id = "echo".into();
    registry.unregister(&id, SystemKind::WorldEvent);
    registry.unregister(&id, SystemKind::WorldEvent);
    registry.dispatch_event(&Ping, &world.view()).unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert_eq!(registry.count(SystemKind::WorldEvent), 0);
}

#[test]
fn entity_systems_run_before_world_systems_for_the_same_event() {
    let registry = SystemRegistry::new();
    let mut world = TestWorld::new();
    world.spawn(1, &[]);
    let log = world.recorder.clone();

    let l = log.clone();
    registry
        .register(SystemSpec::on_world_event::<Ping, _>("world-side", move |_ctx, _ev| {
            l.push("world");
            Ok(())
        }))
        .unwrap();
    let l = log.clone();
    registry
        .register(SystemSpec::on_entity_event::<Ping, _>("entity-side", move |_ctx, _ev| {
            l.push("entity");
            Ok(())
        }))
        .unwrap();

    registry.dispatch_event(&Ping, &world.view()).unwrap();
    assert_eq!(log.snapshot(), vec!["entity", "world"]);
}
