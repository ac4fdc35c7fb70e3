use criterion::{Criterion, black_box, criterion_group, criterion_main};
use msidh_crypto::config::GenerationConfig;
use msidh_crypto::exchange::ExchangeOrchestrator;
use msidh_crypto::keypair::{MSidh, Sidh};
use msidh_crypto::params::ParameterFactory;
use msidh_crypto::provider::ReferenceProvider;

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;

fn bench_exchange_round(c: &mut Criterion) {
    // one-time setup, shared by both schemes
    let provider = Arc::new(ReferenceProvider::new());
    let factory = ParameterFactory::new(provider.clone(), GenerationConfig::default());
    let params = Arc::new(
        factory
            .from_preset("toy", &mut StdRng::seed_from_u64(0))
            .expect("build toy parameters"),
    );

    let sidh = ExchangeOrchestrator::new(Arc::new(Sidh::new(provider.clone(), params.clone())));
    let msidh = ExchangeOrchestrator::new(Arc::new(MSidh::new(provider, params)));

    c.bench_function("sidh_toy_round", |b| {
        b.iter(|| black_box(sidh.run_round().expect("sidh round").success))
    });
    c.bench_function("msidh_toy_round", |b| {
        b.iter(|| black_box(msidh.run_round().expect("msidh round").success))
    });
}

criterion_group!(benches, bench_exchange_round);
criterion_main!(benches);
