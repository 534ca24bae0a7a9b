use carbuf::config::EncodeConfig;
use carbuf::storage::{write_car, CarFile};
use carbuf::{decode, encode, Car, Manufacturer};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use tempfile::NamedTempFile;

fn bench_encode(c: &mut Criterion) {
    c.bench_function("encode_car", |b| {
        b.iter(|| {
            encode(
                black_box("Car King"),
                black_box(43),
                black_box("Flopper"),
                black_box(2032),
            )
            .unwrap()
        });
    });
}

fn bench_decode(c: &mut Criterion) {
    let buf = encode("Car King", 43, "Flopper", 2032).unwrap();

    c.bench_function("decode_all_fields", |b| {
        b.iter(|| {
            let car = decode(black_box(&buf)).unwrap();
            let make = car.make().unwrap();
            (
                car.model().unwrap().len(),
                car.year().unwrap(),
                make.name().unwrap().len(),
                make.coolness().unwrap(),
            )
        });
    });
}

fn bench_mapped_file(c: &mut Criterion) {
    let file = NamedTempFile::new().unwrap();

    // Setup: write one record
    let car = Car::new(Manufacturer::new("McCar", 22), "Nugget", 2033);
    write_car(file.path(), &car, &EncodeConfig::default()).unwrap();

    c.bench_function("open_and_read_file", |b| {
        b.iter(|| {
            let reader = CarFile::open(black_box(file.path())).unwrap();
            reader.car().unwrap().year().unwrap()
        });
    });
}

criterion_group!(benches, bench_encode, bench_decode, bench_mapped_file);
criterion_main!(benches);
