//! Performance benchmarks for the Commission Engine.
//!
//! This benchmark suite covers:
//! - Rate resolution through each strategy of the chain
//! - Payout calculation for a full transaction sheet
//! - Batch runs of growing size over an in-memory store
//!
//! Run with: `cargo bench`
//! HTML reports are generated in `target/criterion/`

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use indexmap::IndexMap;
use rust_decimal::Decimal;
use std::path::Path;

use commission_engine::calculation::{RateContext, calculate_line_payout, resolve_rate};
use commission_engine::config::Settings;
use commission_engine::models::{Cell, LineItem, RateValue, Sheet};
use commission_engine::processing::{BatchRunner, MemoryWorkbookStore, NoProgress};

const PROCEDURES: [&str; 6] = [
    "СТРИЖКИ",
    "ПИЛИНГ",
    "МАНИКЮР",
    "МАНИКЮР-ПЕДИКЮРЫ",
    "ЭПИЛЯЦИЯ",
    "МАССАЖ",
];

/// Creates a rate context shaped like one master's rulebook rows.
fn create_context() -> RateContext {
    let mut rates = IndexMap::new();
    for (i, name) in ["ПИЛИНГ", "МАНИКЮР-ПЕДИКЮР", "МАССАЖ лица", "ЧИСТКА ЛИЦА", "БРОВИ"]
        .iter()
        .enumerate()
    {
        rates.insert(name.to_string(), RateValue::Number(Decimal::new(40 + i as i64, 2)));
    }
    rates.insert("МАССАЖ ТЕЛА".to_string(), RateValue::Text("300 руб".to_string()));
    RateContext::new(rates, 0.8)
}

/// Creates a rulebook with `employees` masters sharing the same specializations.
fn create_rulebook(employees: usize) -> Sheet {
    let mut sheet = Sheet::from_text_rows(
        "расчет ЗП",
        &[&[], &["Правило", "Сотрудник", "Специализация", "Процент в ЗП"]],
    );
    for i in 0..employees {
        let row = i + 2;
        sheet.set(row, 0, Cell::Text("Мастер".to_string()));
        sheet.set(row, 1, Cell::Text(format!("Мастер{:04} Имя", i)));
        sheet.set(row, 2, Cell::Text("ПИЛИНГ\nМАНИКЮР-ПЕДИКЮР\nМАССАЖ лица".to_string()));
        sheet.set(row, 3, Cell::Number(Decimal::new(4, 1)));
    }
    sheet
}

/// Creates a sales export with `rows` line items.
fn create_sales(rows: usize) -> Sheet {
    let mut sheet = Sheet::from_text_rows(
        "Лист1",
        &[&["Продажи с 01.03 по 15.03.2025", "Кол-во", "", "", "", "", "Сумма", ""]],
    );
    for row in 1..=rows {
        sheet.set(row, 0, Cell::Text(PROCEDURES[row % PROCEDURES.len()].to_string()));
        sheet.set(row, 1, Cell::Number(Decimal::ONE));
        sheet.set(row, 6, Cell::Number(Decimal::from(1000 + row as i64)));
    }
    sheet
}

fn create_store(settings: &Settings, files: usize) -> MemoryWorkbookStore {
    let store = MemoryWorkbookStore::new();
    store.insert(&settings.info_path, create_rulebook(files));
    for i in 0..files {
        store.insert(
            settings.files_path.join(format!("Мастер{:04}.xlsx", i)),
            create_sales(50),
        );
    }
    store
}

/// Benchmark: one procedure through each resolution strategy.
fn bench_resolve_rate(c: &mut Criterion) {
    let context = create_context();
    let mut group = c.benchmark_group("resolve_rate");

    for procedure in PROCEDURES {
        group.bench_with_input(BenchmarkId::from_parameter(procedure), procedure, |b, p| {
            b.iter(|| black_box(resolve_rate(black_box(p), &context)))
        });
    }

    group.finish();
}

/// Benchmark: payouts for every row of a 200-row sheet.
fn bench_sheet_payouts(c: &mut Criterion) {
    let context = create_context();
    let sheet = create_sales(200);
    let items: Vec<LineItem> = sheet
        .rows
        .iter()
        .enumerate()
        .skip(1)
        .map(|(i, cells)| LineItem::from_cells(i, cells))
        .collect();

    c.bench_function("sheet_payouts_200", |b| {
        b.iter(|| {
            for (step, item) in items.iter().enumerate() {
                black_box(calculate_line_payout(item, &context, step as u32));
            }
        })
    });
}

/// Benchmark: batch runs of growing size.
fn bench_batch(c: &mut Criterion) {
    let settings = Settings::with_base(Path::new("/bench"));
    let mut group = c.benchmark_group("batch");

    for files in [1usize, 10, 50] {
        let store = create_store(&settings, files);
        group.throughput(Throughput::Elements(files as u64));
        group.bench_with_input(BenchmarkId::new("files", files), &files, |b, _| {
            b.iter(|| {
                let report = BatchRunner::new(&store, &settings)
                    .run(&mut NoProgress)
                    .unwrap();
                black_box(report)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_resolve_rate, bench_sheet_payouts, bench_batch);
criterion_main!(benches);
