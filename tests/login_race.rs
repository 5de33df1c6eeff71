/// Tests for simultaneous logins competing for one name or the last slot
mod common;

use std::sync::{Arc, Barrier};
use std::thread;

use tinyworld::world::{OutputSink, WorldError};

use common::plaza_world;

const CONTENDERS: usize = 8;

#[test]
fn test_simultaneous_logins_register_a_name_once() {
    for _ in 0..200 {
        let world = Arc::new(plaza_world());
        let barrier = Arc::new(Barrier::new(CONTENDERS));
        let handles: Vec<_> = (0..CONTENDERS)
            .map(|n| {
                let world = world.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    let (sink, _rx) = OutputSink::channel(4);
                    let name = if n % 2 == 0 { "Ada" } else { "ada" };
                    barrier.wait();
                    world.try_join(name, sink, 64)
                })
            })
            .collect();

        let mut joined = 0;
        for handle in handles {
            match handle.join().unwrap() {
                Ok(_) => joined += 1,
                Err(err) => assert!(matches!(err, WorldError::NameTaken(_))),
            }
        }
        assert_eq!(joined, 1);
        assert_eq!(world.player_count(), 1);
    }
}

#[test]
fn test_simultaneous_logins_respect_session_limit() {
    for _ in 0..100 {
        let world = Arc::new(plaza_world());
        let barrier = Arc::new(Barrier::new(CONTENDERS));
        let handles: Vec<_> = (0..CONTENDERS)
            .map(|n| {
                let world = world.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    let (sink, _rx) = OutputSink::channel(4);
                    barrier.wait();
                    world.try_join(&format!("Guest{}", n), sink, 3).is_ok()
                })
            })
            .collect();

        let joined = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(joined, 3);
        assert_eq!(world.player_count(), 3);
    }
}
