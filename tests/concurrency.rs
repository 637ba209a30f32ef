use rankset::Leaderboard;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::thread;

const THREADS: i64 = 8;
const UPDATES_PER_ID: i64 = 50;
const IDS_PER_THREAD: i64 = 16;

fn delta_for(id: i64, step: i64) -> Decimal {
    // Deterministic per-(id, step) delta in [-500, 500], mixed sign so
    // customers keep crossing the ranked/unranked boundary.
    Decimal::from(((id * 31 + step * 17) % 1001) - 500)
}

#[test]
fn concurrent_updates_match_sequential_application() {
    let board = Arc::new(Leaderboard::new());
    let mut workers = Vec::new();
    for t in 0..THREADS {
        let board = Arc::clone(&board);
        workers.push(thread::spawn(move || {
            for i in 0..IDS_PER_THREAD {
                let id = t * IDS_PER_THREAD + i;
                for step in 0..UPDATES_PER_ID {
                    board.update_score(id, delta_for(id, step)).unwrap();
                }
            }
        }));
    }
    for w in workers {
        w.join().unwrap();
    }

    // The same multiset of per-id deltas applied sequentially must land on
    // the same score table and the same ranking.
    let reference = Leaderboard::with_seed(99);
    for id in 0..THREADS * IDS_PER_THREAD {
        for step in 0..UPDATES_PER_ID {
            reference.update_score(id, delta_for(id, step)).unwrap();
        }
    }

    assert_eq!(board.total_count(), reference.total_count());
    for id in 0..THREADS * IDS_PER_THREAD {
        assert_eq!(board.score(id), reference.score(id));
        assert_eq!(board.contains(id), reference.contains(id));
    }
    let n = board.total_count() as u64;
    if n > 0 {
        assert_eq!(
            board.get_range(1, n).unwrap(),
            reference.get_range(1, n).unwrap()
        );
    }
}

#[test]
fn readers_never_observe_partial_updates() {
    let board = Arc::new(Leaderboard::new());
    for id in 0..64 {
        board.update_score(id, Decimal::from(id + 1)).unwrap();
    }

    let writer = {
        let board = Arc::clone(&board);
        thread::spawn(move || {
            for round in 0..200 {
                for id in 0..64 {
                    let delta = Decimal::from(if (id + round) % 3 == 0 { -40 } else { 25 });
                    board.update_score(id, delta).unwrap();
                }
            }
        })
    };

    let readers: Vec<_> = (0..4i64)
        .map(|r| {
            let board = Arc::clone(&board);
            thread::spawn(move || {
                for _ in 0..500 {
                    let n = board.total_count() as u64;
                    let out = board.get_range(1, n.max(1)).unwrap();
                    // Ranks must always be contiguous from 1 and the order
                    // strict, whatever interleaving the writer produced.
                    for (idx, c) in out.iter().enumerate() {
                        assert_eq!(c.rank, idx as u64 + 1);
                        assert!(c.score > Decimal::ZERO);
                        if idx > 0 {
                            let prev = &out[idx - 1];
                            assert!(
                                prev.score > c.score
                                    || (prev.score == c.score && prev.id < c.id)
                            );
                        }
                    }
                    if let Ok(win) = board.get_neighbors(r * 13, 5, 5) {
                        for pair in win.windows(2) {
                            assert_eq!(pair[1].rank, pair[0].rank + 1);
                        }
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }
}
