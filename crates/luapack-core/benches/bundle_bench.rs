use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use luapack_core::diagnostics::TracingDiagnosticHandler;
use luapack_core::fs::MockFileSystem;
use luapack_core::scanner::scan;
use luapack_core::{Bundler, BundlerOptions};
use std::path::Path;
use std::sync::Arc;

/// A layered tree: module `n` requires `n + 1` and `n + 2`
fn layered_fs(modules: usize) -> MockFileSystem {
    let mut fs = MockFileSystem::new();
    for n in 0..modules {
        let mut source = String::from("-- generated module\nlocal M = {}\n");
        for next in [n + 1, n + 2] {
            if next < modules {
                source.push_str(&format!(
                    "M.dep{next} = require('./m{next}')\n",
                ));
            }
        }
        source.push_str("function M.value() return 1 end\nreturn M\n");
        fs.add_file(format!("/bench/m{}.lua", n), source);
    }
    fs
}

fn bench_scan(c: &mut Criterion) {
    let source = r#"
        local json = require("json")
        local util = require('lib.util')
        --[[ require("commented") ]]
        local s = "require('inside a string')"
        local h = require [[long.name]]
        return { json = json, util = util, h = h, s = s }
    "#
    .repeat(50);

    c.bench_function("scan_mixed_source", |b| {
        b.iter(|| scan(black_box(&source)).map(|refs| refs.len()))
    });
}

fn bench_bundle(c: &mut Criterion) {
    let mut group = c.benchmark_group("bundle_layered");
    for modules in [10, 100, 500] {
        let fs = layered_fs(modules);
        group.bench_with_input(BenchmarkId::from_parameter(modules), &fs, |b, fs| {
            b.iter(|| {
                let bundler = Bundler::with_dependencies(
                    BundlerOptions::default(),
                    Arc::new(TracingDiagnosticHandler::new()),
                    Arc::new(fs.clone()),
                );
                bundler.bundle(Path::new("/bench/m0.lua")).map(|s| s.len())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_scan, bench_bundle);
criterion_main!(benches);
