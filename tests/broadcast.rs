/// Tests for room broadcasts, slow sessions and churn during delivery
mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tinyworld::world::{execute, parse_command, Delivery, OutputSink};

use common::{connect, drain, plaza_world};

#[test]
fn test_broadcast_reaches_only_the_room() {
    let world = plaza_world();
    let (ann, mut ann_rx) = connect(&world, "Ann");
    let (_ben, mut ben_rx) = connect(&world, "Ben");
    let (cat, mut cat_rx) = connect(&world, "Cat");
    cat.set_room(2);

    let plaza = world.room(1).unwrap();
    assert_eq!(plaza.broadcast(&world, "The clock strikes noon."), 2);
    assert_eq!(drain(&mut ann_rx), vec!["The clock strikes noon."]);
    assert_eq!(drain(&mut ben_rx), vec!["The clock strikes noon."]);
    assert!(drain(&mut cat_rx).is_empty());

    assert_eq!(plaza.broadcast_to_others(&world, "Ann waves.", &ann), 1);
    assert!(drain(&mut ann_rx).is_empty());
    assert_eq!(drain(&mut ben_rx), vec!["Ann waves."]);
}

#[test]
fn test_same_name_players_are_told_apart_by_id() {
    let world = plaza_world();
    let (first, mut first_rx) = connect(&world, "Twin");
    let (_second, mut second_rx) = connect(&world, "Twin");

    world
        .room(1)
        .unwrap()
        .broadcast_to_others(&world, "hello", &first);
    assert!(drain(&mut first_rx).is_empty());
    assert_eq!(drain(&mut second_rx), vec!["hello"]);
}

#[test]
fn test_say_is_heard_by_room_mates() {
    let world = plaza_world();
    let (ann, mut ann_rx) = connect(&world, "Ann");
    let (_ben, mut ben_rx) = connect(&world, "Ben");

    execute(&world, &ann, parse_command("say anyone seen my lantern?"));
    assert_eq!(drain(&mut ann_rx), vec!["You say: anyone seen my lantern?"]);
    assert_eq!(drain(&mut ben_rx), vec!["Ann says: anyone seen my lantern?"]);
}

#[test]
fn test_full_buffer_drops_instead_of_blocking() {
    let world = plaza_world();
    let (sink, mut slow_rx) = OutputSink::channel(2);
    let slow = world.join("Slow", sink);
    let (_fast, mut fast_rx) = connect(&world, "Fast");

    let plaza = world.room(1).unwrap();
    for n in 0..5 {
        plaza.broadcast(&world, &format!("line {}", n));
    }
    assert_eq!(drain(&mut slow_rx), vec!["line 0", "line 1"]);
    assert_eq!(drain(&mut fast_rx).len(), 5);
    assert!(slow.is_connected());
    assert_eq!(slow.send("after drain"), Delivery::Delivered);
}

#[test]
fn test_closed_session_is_reaped() {
    let world = plaza_world();
    let (gone, gone_rx) = connect(&world, "Gone");
    let (_stay, mut stay_rx) = connect(&world, "Stay");
    drop(gone_rx);

    assert_eq!(gone.send("anyone there?"), Delivery::Closed);
    let reaped = world.reap_disconnected();
    assert_eq!(reaped.len(), 1);
    assert_eq!(reaped[0].id(), gone.id());
    assert_eq!(world.player_count(), 1);

    world.room(1).unwrap().broadcast(&world, "still here");
    assert_eq!(drain(&mut stay_rx), vec!["still here"]);
}

#[test]
fn test_join_and_leave_during_broadcast() {
    let world = Arc::new(plaza_world());
    let (_anchor, mut anchor_rx) = connect(&world, "Anchor");
    let stop = Arc::new(AtomicBool::new(false));

    let churn = {
        let world = world.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            let mut n = 0u32;
            while !stop.load(Ordering::Relaxed) {
                let (sink, _rx) = OutputSink::channel(4);
                let player = world.join(&format!("Guest{}", n), sink);
                world.leave(&player);
                n += 1;
            }
            n
        })
    };

    let plaza = world.room(1).unwrap();
    for n in 0..200 {
        plaza.broadcast(&world, &format!("tick {}", n));
    }
    stop.store(true, Ordering::Relaxed);
    churn.join().unwrap();

    assert_eq!(world.player_count(), 1);
    let got = drain(&mut anchor_rx);
    assert_eq!(got.len(), 200);
    assert_eq!(got[199], "tick 199");
}
