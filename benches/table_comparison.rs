use core::hash::BuildHasherDefault;
use core::hash::Hash;
use core::hint::black_box;

use criterion::AxisScale;
use criterion::BatchSize;
use criterion::Criterion;
use criterion::PlotConfiguration;
use criterion::Throughput;
use criterion::criterion_group;
use criterion::criterion_main;
use hashbrown::HashMap as HashbrownMap;
use probe_hash::Cloned;
use probe_hash::HashTable as ProbeHashTable;
use probe_hash::Hashed;
use rand::Rng;
use rand::SeedableRng;
use rand::TryRngCore;
use rand::rngs::OsRng;
use rand::rngs::SmallRng;
use rand::seq::SliceRandom;
use rand_distr::Zipf;
use siphasher::sip::SipHasher;

type SipBuildHasher = BuildHasherDefault<SipHasher>;
type ProbeTable<K> = ProbeHashTable<K, u64, Hashed<SipBuildHasher>, Cloned>;

trait BenchKey: Clone + Eq + Hash {
    fn new(key: u64) -> Self;
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct SmallKey(u64);

impl BenchKey for SmallKey {
    fn new(key: u64) -> Self {
        black_box(Self(key))
    }
}

#[derive(Clone, PartialEq, Eq, Hash)]
struct StringKey(String);

impl BenchKey for StringKey {
    fn new(key: u64) -> Self {
        black_box(Self(format!("key_{:016X}", key)))
    }
}

const SIZES: &[usize] = &[
    (1 << 10),
    (1 << 12),
    (1 << 14),
    (1 << 16),
    (1 << 18),
];

fn probe_table<K: BenchKey>() -> ProbeTable<K> {
    ProbeHashTable::new(Hashed::with_hasher(SipBuildHasher::default()), Cloned).unwrap()
}

fn random_keys<K: BenchKey>(count: usize) -> Vec<K> {
    let mut rng = OsRng;
    (0..count)
        .map(|_| K::new(rng.try_next_u64().unwrap()))
        .collect()
}

fn bench_insert_random<K: BenchKey>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("insert_random_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        let keys = random_keys::<K>(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("probe_hash/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut keys = keys.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    keys
                },
                |keys| {
                    let mut table = probe_table::<K>();
                    for (i, key) in keys.iter().enumerate() {
                        black_box(table.insert(key, &(i as u64)).unwrap());
                    }
                    black_box(table)
                },
                BatchSize::SmallInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut keys = keys.clone();
                    keys.shuffle(&mut SmallRng::from_os_rng());
                    keys
                },
                |keys| {
                    let mut map = HashbrownMap::with_hasher(SipBuildHasher::default());
                    for (i, key) in keys.iter().enumerate() {
                        black_box(map.insert(key.clone(), i as u64));
                    }
                    black_box(map)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_lookup_zipf<K: BenchKey>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("lookup_zipf_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        let keys = random_keys::<K>(size);
        let zipf = Zipf::new(size as f64, 1.1).unwrap();
        let mut rng = SmallRng::from_os_rng();
        let queries = (0..size)
            .map(|_| keys[rng.sample(zipf) as usize - 1].clone())
            .collect::<Vec<K>>();

        let mut table = probe_table::<K>();
        let mut map = HashbrownMap::with_hasher(SipBuildHasher::default());
        for (i, key) in keys.iter().enumerate() {
            table.insert(key, &(i as u64)).unwrap();
            map.insert(key.clone(), i as u64);
        }

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("probe_hash/{size}"), |b| {
            b.iter(|| {
                for query in &queries {
                    black_box(table.lookup(query));
                }
            })
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                for query in &queries {
                    black_box(map.get(query));
                }
            })
        });
    }

    group.finish();
}

fn bench_lookup_miss<K: BenchKey>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("lookup_miss_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        let keys = random_keys::<K>(size);
        let misses = random_keys::<K>(size);

        let mut table = probe_table::<K>();
        let mut map = HashbrownMap::with_hasher(SipBuildHasher::default());
        for (i, key) in keys.iter().enumerate() {
            table.insert(key, &(i as u64)).unwrap();
            map.insert(key.clone(), i as u64);
        }

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("probe_hash/{size}"), |b| {
            b.iter(|| {
                for miss in &misses {
                    black_box(table.lookup(miss));
                }
            })
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter(|| {
                for miss in &misses {
                    black_box(map.get(miss));
                }
            })
        });
    }

    group.finish();
}

/// Steady-state delete/insert cycling at a fixed live count, which leaves a
/// trail of tombstones behind.
fn bench_churn<K: BenchKey>(c: &mut Criterion) {
    let mut group = c.benchmark_group(format!("churn_{}", core::any::type_name::<K>()));
    group.plot_config(PlotConfiguration::default().summary_scale(AxisScale::Logarithmic));

    for &size in SIZES {
        let live = random_keys::<K>(size);
        let incoming = random_keys::<K>(size);

        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("probe_hash/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut table = probe_table::<K>();
                    for (i, key) in live.iter().enumerate() {
                        table.insert(key, &(i as u64)).unwrap();
                    }
                    table
                },
                |mut table| {
                    for (i, (old, new)) in live.iter().zip(&incoming).enumerate() {
                        black_box(table.delete(old));
                        black_box(table.insert(new, &(i as u64)).unwrap());
                    }
                    black_box(table)
                },
                BatchSize::LargeInput,
            )
        });

        group.bench_function(format!("hashbrown/{size}"), |b| {
            b.iter_batched(
                || {
                    let mut map = HashbrownMap::with_hasher(SipBuildHasher::default());
                    for (i, key) in live.iter().enumerate() {
                        map.insert(key.clone(), i as u64);
                    }
                    map
                },
                |mut map| {
                    for (i, (old, new)) in live.iter().zip(&incoming).enumerate() {
                        black_box(map.remove(old));
                        black_box(map.insert(new.clone(), i as u64));
                    }
                    black_box(map)
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_insert_random::<SmallKey>,
    bench_insert_random::<StringKey>,
    bench_lookup_zipf::<SmallKey>,
    bench_lookup_zipf::<StringKey>,
    bench_lookup_miss::<SmallKey>,
    bench_lookup_miss::<StringKey>,
    bench_churn::<SmallKey>,
    bench_churn::<StringKey>,
);
criterion_main!(benches);
