use criterion::{BenchmarkId, Criterion, Throughput};
use gvcomm::transport::{Driver, MAX_SUBSCRIBERS_PER_TOPIC, Payload, Subscriber, Transport};
use std::hint::black_box;

const TOPIC: &str = "/devices/bench/actuators/a1/input";
const PAYLOAD: &[u8] = br#"{"cmd":"toggle","level":42}"#;

struct AcceptAll;

impl Driver for AcceptAll {
    fn subscribe(&mut self, _topic: &str) -> Result<(), gvcomm::Error> {
        Ok(())
    }
}

/// Flips one byte so every stage does a little work on the payload.
struct Flip(u8);

impl Subscriber for Flip {
    fn call(&self, mut payload: Payload) -> Payload {
        if let Some(first) = payload.first_mut() {
            *first ^= self.0;
        }
        payload
    }
}

pub fn bench_single_subscriber(c: &mut Criterion) {
    let stage = Flip(1);
    let transport = Transport::new(AcceptAll);
    transport.subscribe(TOPIC, &stage).expect("subscribe");

    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Bytes(PAYLOAD.len() as u64));
    group.bench_function("single_subscriber", |b| {
        b.iter(|| transport.callback(black_box(TOPIC), black_box(PAYLOAD)))
    });
    group.finish();
}

pub fn bench_pipeline(c: &mut Criterion) {
    let stages: Vec<Flip> = (0..MAX_SUBSCRIBERS_PER_TOPIC as u8).map(Flip).collect();

    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Bytes(PAYLOAD.len() as u64));
    for depth in [1, 2, 4, MAX_SUBSCRIBERS_PER_TOPIC] {
        let transport = Transport::new(AcceptAll);
        for stage in &stages[..depth] {
            transport.subscribe(TOPIC, stage).expect("subscribe");
        }
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| transport.callback(black_box(TOPIC), black_box(PAYLOAD)))
        });
    }
    group.finish();
}

pub fn bench_unknown_topic(c: &mut Criterion) {
    let stage = Flip(1);
    let transport = Transport::new(AcceptAll);
    transport.subscribe(TOPIC, &stage).expect("subscribe");

    c.bench_function("dispatch_unknown_topic", |b| {
        b.iter(|| transport.callback(black_box("/devices/bench/other"), black_box(PAYLOAD)))
    });
}
