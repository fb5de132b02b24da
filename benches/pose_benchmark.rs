use bvh_pose::{load_bvh_from_string, Transform};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fmt::Write;

/// A root with `chains` arms of `length` joints each, animated over `frames` frames.
fn synthetic_bvh(chains: usize, length: usize, frames: usize) -> String {
    let mut bvh = String::from("HIERARCHY\nROOT Hips\n{\n  OFFSET 0 0 0\n  CHANNELS 6 Xposition Yposition Zposition Zrotation Xrotation Yrotation\n");
    for chain in 0..chains {
        for depth in 0..length {
            let indent = "  ".repeat(depth + 1);
            writeln!(bvh, "{indent}JOINT Chain{chain}_{depth}\n{indent}{{").unwrap();
            writeln!(bvh, "{indent}  OFFSET 0 1.5 0.25").unwrap();
            writeln!(bvh, "{indent}  CHANNELS 3 Zrotation Xrotation Yrotation").unwrap();
        }
        for depth in (0..length).rev() {
            let indent = "  ".repeat(depth + 1);
            if depth + 1 == length {
                writeln!(bvh, "{indent}  End Site {{ OFFSET 0 1 0 }}").unwrap();
            }
            writeln!(bvh, "{indent}}}").unwrap();
        }
    }
    bvh.push_str("}\nMOTION\n");
    writeln!(bvh, "Frames: {frames}\nFrame Time: 0.0083333").unwrap();

    let values = 6 + chains * length * 3;
    for frame in 0..frames {
        let line: Vec<String> = (0..values)
            .map(|i| format!("{:.4}", ((frame * 7 + i * 13) % 360) as f64 - 180.0))
            .collect();
        bvh.push_str(&line.join(" "));
        bvh.push('\n');
    }
    bvh
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let source = synthetic_bvh(5, 6, 600);
    let clip = load_bvh_from_string(&source).unwrap();
    let mut pose = vec![Transform::identity(); clip.joint_count()];

    let mut group = c.benchmark_group("bvh");
    group.sample_size(10);
    group.bench_function("parse 31 joints x 600 frames", |b| {
        b.iter(|| load_bvh_from_string(black_box(&source)).unwrap())
    });
    group.bench_function("evaluate whole clip", |b| {
        b.iter(|| {
            let mut frame = 0.0;
            while frame < clip.frame_count() as f64 {
                clip.evaluate(black_box(frame), &mut pose).unwrap();
                frame += 0.25;
            }
        })
    });
    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
