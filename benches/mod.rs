use criterion::{criterion_group, criterion_main};

mod dispatch;

criterion_group!(
    benches,
    dispatch::bench_single_subscriber,
    dispatch::bench_pipeline,
    dispatch::bench_unknown_topic,
    protocol::bench_send_data
);
criterion_main!(benches);
