//! Shortcut Matching Benchmarks
//!
//! Every keydown goes through the matcher before it can be replayed, so the
//! miss path (ordinary typing) matters as much as the hit path.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use radiant_input::input::{
    KeyEvent, KeyModifiers, Platform, ShortcutAction, ShortcutBinding, ShortcutMatcher, ShortcutTable,
};

/// Default table plus `extra` user actions with two bindings each
fn table_with(extra: usize) -> ShortcutTable {
    let mut table = ShortcutTable::default_table();
    for i in 0..extra {
        let key = char::from(b'a' + (i % 26) as u8).to_string();
        table.set(ShortcutAction::new(
            format!("custom{}", i),
            vec![
                ShortcutBinding::new(["ctrl", "alt", key.as_str()]),
                ShortcutBinding::new(["meta", "shift", key.as_str()]),
            ],
        ));
    }
    table
}

fn bench_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("shortcut_match");

    let typing = KeyEvent::new("e", KeyModifiers::NONE);
    let hit_last = KeyEvent::new("0", KeyModifiers::ctrl());
    let shifted_symbol = KeyEvent::new("+", KeyModifiers::ctrl().with_shift());

    for extra in [0usize, 16, 64] {
        let matcher = ShortcutMatcher::new(table_with(extra), Platform::Other);
        group.throughput(Throughput::Elements(1));

        group.bench_with_input(BenchmarkId::new("miss", extra), &matcher, |b, m| {
            b.iter(|| m.match_event(black_box(&typing)))
        });
        group.bench_with_input(BenchmarkId::new("hit_last_default", extra), &matcher, |b, m| {
            b.iter(|| m.match_event(black_box(&hit_last)))
        });
        group.bench_with_input(BenchmarkId::new("shifted_symbol", extra), &matcher, |b, m| {
            b.iter(|| m.match_event(black_box(&shifted_symbol)))
        });
    }

    group.finish();
}

fn bench_record(c: &mut Criterion) {
    let event = KeyEvent::new("Unidentified", KeyModifiers::ctrl().with_alt()).with_code("KeyK");
    c.bench_function("binding_record", |b| {
        b.iter(|| ShortcutBinding::record(black_box(&event), Platform::Other))
    });
}

criterion_group!(benches, bench_match, bench_record);
criterion_main!(benches);
