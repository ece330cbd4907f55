use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use terrain_sim::{
    raster::render_field, Canvas, DisplayMode, FieldGenerator, FieldGrid, GeneratorMode,
    TerrainConfig, TileClassifier, TileWeightTable,
};

fn bench_generate(c: &mut Criterion) {
    let config = TerrainConfig::builtin();
    let (width, height) = config.grid_size();
    let mut group = c.benchmark_group("generate");

    for mode in [
        GeneratorMode::FalloffBumps,
        GeneratorMode::FlatBumps,
        GeneratorMode::Diffusion,
    ] {
        let mut generator_config = config.generator.clone();
        generator_config.mode = mode;
        let field_gen = FieldGenerator::new(&generator_config, config.grid.value_range);

        group.bench_with_input(
            BenchmarkId::new("mode", format!("{:?}", mode)),
            &field_gen,
            |b, field_gen| {
                b.iter_batched(
                    || (FieldGrid::new(width, height), ChaCha8Rng::seed_from_u64(1337)),
                    |(mut grid, mut rng)| {
                        field_gen.generate(&mut grid, &mut rng);
                        grid
                    },
                    BatchSize::LargeInput,
                )
            },
        );
    }

    group.finish();
}

fn bench_render(c: &mut Criterion) {
    let config = TerrainConfig::builtin();
    let (grid_w, grid_h) = config.grid_size();
    let (screen_w, screen_h) = config.screen_size();

    let classifier = TileClassifier::new(
        TileWeightTable::new(config.tiles.clone()).expect("builtin tiles"),
        config.grid.value_range,
    )
    .expect("builtin classifier");
    let mut grid = FieldGrid::new(grid_w, grid_h);
    FieldGenerator::new(&config.generator, config.grid.value_range)
        .generate(&mut grid, &mut ChaCha8Rng::seed_from_u64(1337));

    let mut pixels = vec![0u32; screen_w as usize * screen_h as usize];
    let mut group = c.benchmark_group("render");

    for mode in [DisplayMode::Terrain, DisplayMode::Heightmap] {
        group.bench_function(BenchmarkId::new("display", format!("{:?}", mode)), |b| {
            b.iter(|| {
                let mut canvas = Canvas::new(&mut pixels, screen_w as usize, screen_h as usize)
                    .expect("surface size");
                render_field(
                    &mut canvas,
                    &grid,
                    &classifier,
                    mode,
                    config.render.background,
                );
            })
        });
    }

    group.finish();
}

criterion_group!(field_benches, bench_generate, bench_render);
criterion_main!(field_benches);
