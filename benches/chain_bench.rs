use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use pnext_chain::{
    ChainReadable, OwningChain, RecordCopy, RecordView, ReferenceChain, StructureType, TagManifest,
};
use std::ffi::c_void;
use std::hint::black_box;
use std::ptr;

// ─── Bench Records ──────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Clone, Copy)]
struct DeviceFeatures {
    s_type: StructureType,
    flags: u32,
    p_next: *mut c_void,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct ShaderFeatures {
    s_type: StructureType,
    shader_int64: u32,
    p_next: *mut c_void,
    shader_float64: u32,
    shader_int16: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
struct LimitsInfo {
    s_type: StructureType,
    max_bindings: u32,
    p_next: *mut c_void,
    limits: [u64; 8],
}

impl Default for DeviceFeatures {
    fn default() -> Self {
        Self {
            s_type: StructureType::default(),
            flags: 0,
            p_next: ptr::null_mut(),
        }
    }
}

impl Default for ShaderFeatures {
    fn default() -> Self {
        Self {
            s_type: StructureType::default(),
            shader_int64: 1,
            p_next: ptr::null_mut(),
            shader_float64: 1,
            shader_int16: 0,
        }
    }
}

impl Default for LimitsInfo {
    fn default() -> Self {
        Self {
            s_type: StructureType::default(),
            max_bindings: 32,
            p_next: ptr::null_mut(),
            limits: [0; 8],
        }
    }
}

pnext_chain::extensible! {
    DeviceFeatures => StructureType(1_000_059_000);
    ShaderFeatures => StructureType(1_000_082_000);
    LimitsInfo => StructureType(1_000_059_001);
}

const MANIFEST_JSON: &str = r#"{
  "structures": [
    { "name": "DeviceFeatures", "tag": 1000059000 },
    { "name": "ShaderFeatures", "tag": 1000082000 },
    { "name": "LimitsInfo", "tag": 1000059001 },
    { "name": "Win32HandleInfo", "tag": 1000073000, "guard": "windows" }
  ]
}"#;

// ════════════════════════════════════════════════════════════════════════════
// 1. Building chains
// ════════════════════════════════════════════════════════════════════════════

fn bench_building_chains(c: &mut Criterion) {
    let mut group = c.benchmark_group("building_chains");

    group.bench_function("ReferenceChain (3 records)", |b| {
        b.iter(|| {
            let mut shader = ShaderFeatures::default();
            let mut limits = LimitsInfo::default();
            let mut chain = ReferenceChain::<DeviceFeatures>::new();
            chain.append(&mut shader);
            chain.append(&mut limits);
            black_box(chain.as_ptr());
        })
    });

    let shader = ShaderFeatures::default();
    let limits = LimitsInfo::default();
    group.bench_function("OwningChain (3 records)", |b| {
        b.iter(|| {
            let mut chain = OwningChain::<DeviceFeatures>::new();
            chain.append(black_box(&shader));
            chain.append(black_box(&limits));
            chain
        })
    });

    let copy = RecordCopy::new(&limits);
    group.bench_function("OwningChain::append_generic", |b| {
        b.iter(|| {
            let mut chain = OwningChain::<DeviceFeatures>::new();
            chain.append_generic(black_box(&copy));
            chain
        })
    });

    group.finish();
}

// ════════════════════════════════════════════════════════════════════════════
// 2. Growing an owning chain (every append relinks the whole buffer)
// ════════════════════════════════════════════════════════════════════════════

fn bench_owning_growth(c: &mut Criterion) {
    let mut group = c.benchmark_group("owning_growth");
    let shader = ShaderFeatures::default();

    for count in [4usize, 16, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut chain = OwningChain::<DeviceFeatures>::new();
                for _ in 0..count {
                    chain.append(&shader);
                }
                black_box(chain.byte_len())
            })
        });
    }

    group.finish();
}

// ════════════════════════════════════════════════════════════════════════════
// 3. Lookup and traversal
// ════════════════════════════════════════════════════════════════════════════

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");
    group.sample_size(500);

    let mut chain = OwningChain::<DeviceFeatures>::new();
    chain.append(&ShaderFeatures::default());
    chain.append(&LimitsInfo::default());

    group.bench_function("OwningChain::linked_as", |b| {
        b.iter(|| black_box(chain.linked_as::<LimitsInfo>().max_bindings))
    });

    group.bench_function("OwningChain::walk", |b| {
        b.iter(|| black_box(chain.walk().map(|r| r.bytes.len()).sum::<usize>()))
    });

    group.bench_function("OwningChain::verify", |b| b.iter(|| black_box(chain.verify().is_ok())));

    let mut shader = ShaderFeatures::default();
    group.bench_function("RecordView::stamped + RecordCopy::from_record", |b| {
        b.iter(|| {
            let view = RecordView::stamped(&mut shader);
            RecordCopy::from_record(black_box(&view))
        })
    });

    let manifest = TagManifest::from_json_str(MANIFEST_JSON).unwrap();
    group.bench_function("TagManifest::describe_chain", |b| {
        b.iter(|| black_box(manifest.describe_chain(&chain)))
    });

    group.finish();
}

criterion_group!(benches, bench_building_chains, bench_owning_growth, bench_lookup);
criterion_main!(benches);
