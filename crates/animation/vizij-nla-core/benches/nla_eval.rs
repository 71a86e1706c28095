use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use vizij_nla_core::{
    Action, AnimData, AnimationContext, BlendMode, Config, Curve, Interpolation, Keyframe,
    OwnerId, PropertyAccessor, PropertyHandle, Recalc, Strip, Track,
};

/// Flat array of scalar properties named `p0`, `p1`, ...
struct Props {
    values: Vec<f64>,
}

impl PropertyAccessor for Props {
    fn resolve(&mut self, _owner: OwnerId, path: &str) -> Option<PropertyHandle> {
        path.strip_prefix('p')?.parse().ok().map(PropertyHandle)
    }
    fn is_animatable(&self, _handle: PropertyHandle) -> bool {
        true
    }
    fn array_len(&self, _handle: PropertyHandle) -> usize {
        1
    }
    fn get(&self, handle: PropertyHandle, _index: usize) -> Option<f64> {
        self.values.get(handle.0 as usize).copied()
    }
    fn get_default(&self, _handle: PropertyHandle, _index: usize) -> f64 {
        0.0
    }
    fn set(&mut self, handle: PropertyHandle, _index: usize, value: f64) -> bool {
        match self.values.get_mut(handle.0 as usize) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }
}

fn mk_action(name: &str, channels: usize, keys: usize) -> Action {
    let mut action = Action::new(name);
    for c in 0..channels {
        let mut curve = Curve::new(format!("p{c}"), 0).with_keys(
            (0..keys)
                .map(|k| Keyframe::new(k as f32 * 10.0, ((c + k) % 7) as f32))
                .collect(),
        );
        curve.recalc_handles();
        action = action.with_curve(curve);
    }
    action
}

fn mk_scene(ctx: &mut AnimationContext, tracks: usize, channels: usize) -> AnimData {
    let mut anim = AnimData::new(OwnerId(0));
    for t in 0..tracks {
        let id = ctx.add_action(mk_action(&format!("a{t}"), channels, 8));
        let mode = if t == 0 { BlendMode::Replace } else { BlendMode::Add };
        let strip = Strip::clip(format!("s{t}"), id, (0.0, 70.0), 0.0)
            .with_blend_mode(mode)
            .with_blend(5.0, 5.0);
        anim.push_track(Track::from_strips(format!("t{t}"), vec![strip]).expect("fits"));
    }
    anim
}

fn bench_curve(c: &mut Criterion) {
    let mut group = c.benchmark_group("curve_evaluate");
    for interpolation in [Interpolation::Linear, Interpolation::Bezier, Interpolation::Elastic] {
        let mut curve = Curve::new("p0", 0).with_keys(
            (0..64)
                .map(|k| Keyframe::new(k as f32, (k % 5) as f32).with_interpolation(interpolation))
                .collect(),
        );
        curve.recalc_handles();
        group.bench_function(BenchmarkId::from_parameter(format!("{interpolation:?}")), |b| {
            let mut t = 0.0f32;
            b.iter(|| {
                t = (t + 0.37) % 64.0;
                black_box(curve.evaluate(black_box(t)))
            })
        });
    }
    group.finish();
}

fn bench_nla(c: &mut Criterion) {
    let mut group = c.benchmark_group("nla_evaluate");
    for &(tracks, channels) in &[(1usize, 16usize), (4, 64), (8, 256)] {
        let mut ctx = AnimationContext::new(Config::default());
        let mut anim = mk_scene(&mut ctx, tracks, channels);
        let mut props = Props {
            values: vec![0.0; channels],
        };
        group.bench_function(
            BenchmarkId::from_parameter(format!("{tracks}x{channels}")),
            |b| {
                let mut t = 0.0f32;
                b.iter(|| {
                    t = (t + 0.5) % 70.0;
                    black_box(ctx.evaluate(&mut anim, &mut props, t, Recalc::ANIM))
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_curve, bench_nla);
criterion_main!(benches);
