use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use gestpipe::ml::mlp::{TrainDataset, TrainOptions, train_mlp};

const SAMPLE_COUNT: usize = 512;
const INPUT_WIDTH: usize = 42;

fn synthetic_dataset() -> TrainDataset {
    let classes: Vec<String> = ["fist", "palm", "point", "ok"]
        .iter()
        .map(|name| name.to_string())
        .collect();
    let mut x = Vec::with_capacity(SAMPLE_COUNT);
    let mut y = Vec::with_capacity(SAMPLE_COUNT);
    for i in 0..SAMPLE_COUNT {
        let class = i % classes.len();
        let row = (0..INPUT_WIDTH)
            .map(|j| class as f32 + ((i * 7 + j * 13) % 17) as f32 * 0.01)
            .collect();
        x.push(row);
        y.push(class);
    }
    TrainDataset {
        x,
        y,
        classes,
        input_width: INPUT_WIDTH,
    }
}

fn bench_train_epoch(c: &mut Criterion) {
    let dataset = synthetic_dataset();
    let options = TrainOptions {
        epochs: 1,
        ..TrainOptions::default()
    };
    c.bench_with_input(
        BenchmarkId::new("train_epoch", SAMPLE_COUNT),
        &dataset,
        |b, dataset| {
            b.iter(|| {
                train_mlp(black_box(dataset), &options, None).expect("train_mlp");
            });
        },
    );
}

criterion_group!(benches, bench_train_epoch);
criterion_main!(benches);
