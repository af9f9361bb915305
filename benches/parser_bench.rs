use compendium_loader::parser::scanner::TupleScanner;
use compendium_loader::parser::{parse, parse_inserts};
use compendium_loader::value::Value;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;

fn generate_monster_insert(rows: usize) -> String {
    let mut sql = String::from(
        "INSERT INTO compendium_monsters (name, description, gate_rank, cr, hp, tags, stats, image_url) VALUES\n",
    );

    for i in 0..rows {
        if i > 0 {
            sql.push_str(",\n");
        }
        sql.push_str(&format!(
            "('Monster {i}', 'A creature from gate {i}; it''s hostile.', 'C', {}.5, {}, \
             '{{\"beast\",\"rank-c\"}}', '{{\"str\": {}, \"dex\": 12}}', NULL)",
            i % 20,
            10 + i,
            i % 18
        ));
    }
    sql.push_str("\nON CONFLICT (name) DO NOTHING;\n");
    sql
}

fn generate_migration(tables: usize, rows_per_table: usize) -> String {
    let mut sql = String::new();
    for t in 0..tables {
        sql.push_str(&format!("-- table {t}\n"));
        sql.push_str(&format!(
            "INSERT INTO compendium_table_{t} (id, name, data) VALUES "
        ));
        let tuples: Vec<String> = (0..rows_per_table)
            .map(|r| format!("({r}, 'Name {r}', 'Lorem ipsum dolor sit amet, consectetur adipiscing elit.')"))
            .collect();
        sql.push_str(&tuples.join(", "));
        sql.push_str(";\n\n");
    }
    sql
}

fn bench_parse_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_throughput");

    for rows in [100, 1000, 10000] {
        let sql = generate_monster_insert(rows);
        group.throughput(Throughput::Bytes(sql.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("parse", format!("{}_rows", rows)),
            &sql,
            |b, sql| b.iter(|| black_box(parse(sql).len())),
        );
    }

    group.finish();
}

fn bench_scanner_only(c: &mut Criterion) {
    let sql = generate_monster_insert(5000);
    let values_start = sql.find("VALUES").map(|i| i + 6).unwrap_or(0);
    let body = &sql[values_start..];

    let mut group = c.benchmark_group("scanner");
    group.throughput(Throughput::Bytes(body.len() as u64));
    group.bench_function("tuples", |b| {
        b.iter(|| black_box(TupleScanner::new(body).count()))
    });
    group.finish();
}

fn bench_value_inference(c: &mut Criterion) {
    let tokens = [
        "NULL",
        "true",
        "42",
        "-3.25",
        "'Goblin'",
        "'it''s'",
        "'{\"small\",\"humanoid\"}'",
        "'{\"str\": 14, \"dex\": 12}'",
        "{a, {b, c}, d}",
        "now()",
    ];

    let mut group = c.benchmark_group("value_inference");
    for token in tokens {
        group.bench_with_input(BenchmarkId::from_parameter(token), &token, |b, token| {
            b.iter(|| black_box(Value::infer(black_box(token))))
        });
    }
    group.finish();
}

fn bench_multi_statement(c: &mut Criterion) {
    let mut group = c.benchmark_group("multi_statement");

    for (tables, rows) in [(10, 100), (50, 100), (4, 2500)] {
        let sql = generate_migration(tables, rows);
        group.throughput(Throughput::Bytes(sql.len() as u64));
        group.bench_with_input(
            BenchmarkId::new("parse_inserts", format!("{}x{}", tables, rows)),
            &sql,
            |b, sql| {
                b.iter(|| {
                    let total: usize = parse_inserts(sql).iter().map(|s| s.records.len()).sum();
                    black_box(total)
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_parse_throughput,
    bench_scanner_only,
    bench_value_inference,
    bench_multi_statement,
);
criterion_main!(benches);
