use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use qimen_forecast::adjust::adjust;
use qimen_forecast::chart_parser::parse;
use qimen_forecast::deviation::{ActualOutcome, PredictedOutcome, evaluate};
use qimen_forecast::identify::identify;
use qimen_forecast::predict::{predict, predict_transcript};
use qimen_forecast::scorer::score;
use qimen_forecast::weights::WeightTable;

fn bench_chart_parse(c: &mut Criterion) {
    c.bench_function("chart_parse", |b| {
        b.iter(|| {
            let chart = parse(black_box(SAMPLE_CHART)).unwrap();
            black_box(chart.parsed_harm_count);
        })
    });
}

fn bench_identify_and_score(c: &mut Criterion) {
    let chart = parse(SAMPLE_CHART).unwrap();
    let weights = WeightTable::default();
    c.bench_function("identify_and_score", |b| {
        b.iter(|| {
            let identified = identify(black_box(&chart));
            black_box(score(&identified, &weights).total);
        })
    });
}

fn bench_predict(c: &mut Criterion) {
    let weights = WeightTable::default();
    let chart = identify(&parse(SAMPLE_CHART).unwrap());
    let result = score(&chart, &weights);
    c.bench_function("predict", |b| {
        b.iter(|| {
            let prediction = predict(black_box(&chart), &result, &weights);
            black_box(prediction.outcome.home);
        })
    });
}

fn bench_evaluate_and_adjust(c: &mut Criterion) {
    let weights = WeightTable::default();
    let (_, prediction) = predict_transcript(SAMPLE_CHART, &weights).unwrap();
    let predicted = PredictedOutcome::from(&prediction);
    let actual: ActualOutcome = serde_json::from_str(ACTUAL_JSON).unwrap();
    c.bench_function("evaluate_and_adjust", |b| {
        b.iter(|| {
            let record = evaluate(black_box(&predicted), black_box(&actual)).unwrap();
            black_box(adjust(&weights, &record).version);
        })
    });
}

criterion_group!(
    perf,
    bench_chart_parse,
    bench_identify_and_score,
    bench_predict,
    bench_evaluate_and_adjust
);
criterion_main!(perf);

static SAMPLE_CHART: &str = include_str!("../tests/fixtures/sample_chart.txt");
static ACTUAL_JSON: &str = include_str!("../tests/fixtures/actual_result.json");
