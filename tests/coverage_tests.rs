use std::time::Duration;

use frame_transitions::backend::FramePlan;
use frame_transitions::config::{EffectKind, ParamBag};
use frame_transitions::effect::kinds::{self, DirectionChoice};
use frame_transitions::effect::{EffectKernel, PrepareContext};
use frame_transitions::geometry::Size;
use frame_transitions::geometry::grid::{BlockGrid, StripAxis, strips};
use frame_transitions::geometry::raster::{CoverageMask, for_each_covered_pixel};
use frame_transitions::geometry::stagger::Edge;
use frame_transitions::geometry::RevealShape;
use rand::SeedableRng;
use rand::rngs::StdRng;

const SIZE: Size = Size {
    width: 120,
    height: 80,
};

const REVEAL_KINDS: &[EffectKind] = &[
    EffectKind::Wipe,
    EffectKind::Diffuse,
    EffectKind::BlockFlip,
    EffectKind::Blinds,
    EffectKind::Shuffle,
    EffectKind::Raindrops,
    EffectKind::ClawMarks,
];

fn prepared(kind: EffectKind, direction: DirectionChoice, seed: u64) -> Box<dyn EffectKernel> {
    let mut kernel = kinds::build(kind, &ParamBag::empty(kind), direction);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut ctx = PrepareContext {
        size: SIZE,
        duration: Duration::from_millis(1000),
        rng: &mut rng,
        precompute: None,
    };
    kernel.prepare(&mut ctx).unwrap();
    kernel
}

fn default_direction(kind: EffectKind) -> DirectionChoice {
    DirectionChoice::candidates(kind)[0]
}

fn coverage(kernel: &mut dyn EffectKernel, progress: f32) -> CoverageMask {
    match kernel.frame(progress) {
        FramePlan::Reveal(region) => CoverageMask::from_region(&region, SIZE),
        FramePlan::Complete => CoverageMask::full(SIZE),
        other => panic!("{} produced {other:?}", kernel.kind()),
    }
}

#[test]
fn nothing_is_revealed_at_the_start() {
    for kind in REVEAL_KINDS {
        let mut kernel = prepared(*kind, default_direction(*kind), 3);
        assert_eq!(coverage(kernel.as_mut(), 0.0).area(), 0, "{kind}");
    }
}

#[test]
fn coverage_grows_monotonically() {
    for kind in REVEAL_KINDS {
        for seed in [1, 2, 3] {
            let mut kernel = prepared(*kind, default_direction(*kind), seed);
            let mut last = CoverageMask::empty(SIZE);
            for step in 0..=50 {
                let mask = coverage(kernel.as_mut(), step as f32 / 50.0);
                assert!(
                    mask.covers(&last),
                    "{kind} (seed {seed}) lost pixels at step {step}"
                );
                last = mask;
            }
        }
    }
}

#[test]
fn grid_effects_cover_the_frame_at_the_end() {
    for kind in [
        EffectKind::Wipe,
        EffectKind::Diffuse,
        EffectKind::BlockFlip,
        EffectKind::Blinds,
        EffectKind::Shuffle,
        EffectKind::Raindrops,
    ] {
        let mut kernel = prepared(kind, default_direction(kind), 9);
        kernel.frame(0.5);
        assert!(coverage(kernel.as_mut(), 1.0).is_full(), "{kind}");
        assert_eq!(kernel.finish(), FramePlan::Complete, "{kind}");
    }
}

#[test]
fn every_wipe_direction_finishes_full() {
    for direction in DirectionChoice::candidates(EffectKind::Wipe) {
        let mut kernel = prepared(EffectKind::Wipe, direction, 0);
        let half = coverage(kernel.as_mut(), 0.5).area();
        assert!(half > 0 && half < SIZE.width as usize * SIZE.height as usize);
        assert!(coverage(kernel.as_mut(), 1.0).is_full(), "{}", direction.as_str());
    }
}

fn left_right_split(mask: &CoverageMask) -> (usize, usize) {
    let mut left = 0;
    let mut right = 0;
    for y in 0..SIZE.height {
        for x in 0..SIZE.width {
            if mask.contains(x, y) {
                if x < SIZE.width / 2 {
                    left += 1;
                } else {
                    right += 1;
                }
            }
        }
    }
    (left, right)
}

#[test]
fn edge_bias_reveals_as_a_wave() {
    for kind in [EffectKind::BlockFlip, EffectKind::Shuffle] {
        let mut kernel = prepared(kind, DirectionChoice::Edge(Some(Edge::Left)), 5);
        let (left, right) = left_right_split(&coverage(kernel.as_mut(), 0.3));
        assert!(left > right, "{kind}: left {left}, right {right}");

        let mut kernel = prepared(kind, DirectionChoice::Edge(Some(Edge::Right)), 5);
        let (left, right) = left_right_split(&coverage(kernel.as_mut(), 0.3));
        assert!(right > left, "{kind}: left {left}, right {right}");
    }
}

#[test]
fn wedge_block_flip_is_monotonic() {
    let mut options = frame_transitions::config::EffectOptions::new();
    options.set(EffectKind::BlockFlip, "wedge", true);
    let bag = options.for_effect(EffectKind::BlockFlip);
    let mut kernel = kinds::build(
        EffectKind::BlockFlip,
        &bag,
        DirectionChoice::Edge(Some(Edge::Top)),
    );
    let mut rng = StdRng::seed_from_u64(4);
    kernel
        .prepare(&mut PrepareContext {
            size: SIZE,
            duration: Duration::from_millis(1000),
            rng: &mut rng,
            precompute: None,
        })
        .unwrap();
    let mut last = CoverageMask::empty(SIZE);
    for step in 0..=40 {
        let mask = coverage(kernel.as_mut(), step as f32 / 40.0);
        assert!(mask.covers(&last), "wedge lost pixels at step {step}");
        last = mask;
    }
    assert!(last.is_full());
}

fn hit_counts(rects: impl IntoIterator<Item = frame_transitions::geometry::Rect>) -> Vec<u32> {
    let mut hits = vec![0u32; SIZE.width as usize * SIZE.height as usize];
    for rect in rects {
        for_each_covered_pixel(&RevealShape::rect(rect), SIZE, |x, y| {
            hits[y as usize * SIZE.width as usize + x as usize] += 1;
        });
    }
    hits
}

#[test]
fn grids_tile_the_frame_exactly_once() {
    for (w, h, cols) in [(120, 80, 4), (101, 67, 3), (640, 7, 8)] {
        let size = Size::new(w, h);
        let grid = BlockGrid::for_size(size, cols);
        let mut hits = vec![0u32; (w * h) as usize];
        for cell in grid.cells() {
            for_each_covered_pixel(&RevealShape::rect(cell.rect), size, |x, y| {
                hits[(y * w + x) as usize] += 1;
            });
        }
        assert!(hits.iter().all(|h| *h == 1), "{w}x{h} cols {cols}");
    }
}

#[test]
fn strips_tile_the_frame_exactly_once() {
    for axis in [StripAxis::Columns, StripAxis::Rows] {
        let hits = hit_counts(strips(SIZE, 7, axis));
        assert!(hits.iter().all(|h| *h == 1), "{axis:?}");
    }
}

#[test]
fn non_reveal_kernels_use_their_own_plans() {
    let mut crossfade = prepared(EffectKind::Crossfade, DirectionChoice::None, 0);
    assert_eq!(crossfade.frame(0.4), FramePlan::Blend { mix: 0.4 });

    let mut slide = prepared(EffectKind::Slide, default_direction(EffectKind::Slide), 0);
    assert!(matches!(slide.frame(0.5), FramePlan::Slide { .. }));

    let mut burn = prepared(EffectKind::Burn, DirectionChoice::Edge(Some(Edge::Bottom)), 0);
    assert!(!burn.supports_software());
    assert!(matches!(
        burn.frame(0.5),
        FramePlan::Shader { progress, .. } if (progress - 0.5).abs() < 1e-6
    ));
}

#[test]
fn unbiased_block_flip_still_fills_the_frame() {
    assert!(DirectionChoice::candidates(EffectKind::BlockFlip).contains(&DirectionChoice::Edge(None)));
    let mut kernel = prepared(EffectKind::BlockFlip, DirectionChoice::Edge(None), 12);
    let mut last = CoverageMask::empty(SIZE);
    for step in 0..=20 {
        let mask = coverage(kernel.as_mut(), step as f32 / 20.0);
        assert!(mask.covers(&last), "lost pixels at step {step}");
        last = mask;
    }
    assert!(last.is_full());
}
