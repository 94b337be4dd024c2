//! Optional off-thread precomputation of element layouts.
//!
//! Effects ask a [`PrecomputeWorker`] for a grid layout and wait for the answer
//! only briefly. A missing worker, a failed request or a timeout all lead to
//! the same result: the effect computes the layout itself.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, warn};

use crate::config::EffectKind;
use crate::error::Result;
use crate::geometry::grid::{BlockGrid, StripAxis, strips};
use crate::geometry::stagger::{Edge, Jitter, thresholds};
use crate::geometry::{Rect, Size};

/// Upper bound on how long an effect waits for a precomputed layout.
pub const POLL_BUDGET: Duration = Duration::from_millis(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutShape {
    Grid { columns: u32 },
    Strips { count: u32, axis: StripAxis },
}

/// Everything that determines a layout. Equal params give equal layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayoutParams {
    pub size: Size,
    pub shape: LayoutShape,
    pub bias: Option<Edge>,
    pub jitter: Jitter,
    pub seed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GridLayout {
    pub cols: u32,
    pub rows: u32,
    /// Element bounds in row-major order.
    pub cells: Vec<Rect>,
    pub thresholds: Vec<f32>,
}

pub fn compute_layout(params: &LayoutParams) -> GridLayout {
    let mut rng = StdRng::seed_from_u64(params.seed);
    let (cols, rows, cells) = match params.shape {
        LayoutShape::Grid { columns } => {
            let grid = BlockGrid::for_size(params.size, columns);
            let cells = grid.cells().map(|c| c.rect).collect();
            (grid.cols, grid.rows, cells)
        }
        LayoutShape::Strips { count, axis } => {
            let slats = strips(params.size, count, axis);
            let n = slats.len() as u32;
            match axis {
                StripAxis::Columns => (n, 1, slats),
                StripAxis::Rows => (1, n, slats),
            }
        }
    };
    let thresholds = thresholds(cols, rows, params.bias, params.jitter, &mut rng);
    GridLayout {
        cols,
        rows,
        cells,
        thresholds,
    }
}

#[derive(Debug, Clone)]
pub struct PrecomputeRequest {
    pub effect: EffectKind,
    pub params: LayoutParams,
    pub use_cache: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerKind {
    Layout,
}

#[derive(Debug, Clone)]
pub struct PrecomputeResponse {
    pub correlation_id: u64,
    pub success: bool,
    pub payload: Option<Arc<GridLayout>>,
    pub processing_time: Duration,
}

pub trait PrecomputeWorker {
    /// Queues a request. `None` means the worker is not accepting work.
    fn submit(&self, request: PrecomputeRequest) -> Option<u64>;

    /// Non-blocking; returns at most `max` finished responses.
    fn poll_responses(&self, kind: WorkerKind, max: usize) -> Vec<PrecomputeResponse>;
}

/// Submits `params` and polls for the matching answer until `budget` runs out.
pub fn fetch_layout(
    worker: &dyn PrecomputeWorker,
    effect: EffectKind,
    params: LayoutParams,
    budget: Duration,
) -> Option<Arc<GridLayout>> {
    let id = worker.submit(PrecomputeRequest {
        effect,
        params,
        use_cache: true,
    })?;
    let deadline = Instant::now() + budget;
    loop {
        for response in worker.poll_responses(WorkerKind::Layout, 8) {
            if response.correlation_id != id {
                continue;
            }
            if !response.success {
                debug!(effect = %effect, id, "layout_precompute_failed");
                return None;
            }
            debug!(
                effect = %effect,
                id,
                elapsed_us = response.processing_time.as_micros() as u64,
                "layout_precompute_hit"
            );
            return response.payload;
        }
        if Instant::now() >= deadline {
            debug!(effect = %effect, id, "layout_precompute_timeout");
            return None;
        }
        thread::sleep(Duration::from_micros(250));
    }
}

enum LayoutMsg {
    Compute(u64, PrecomputeRequest),
    Quit,
}

/// Background thread computing layouts, with a cache keyed by params.
pub struct LayoutWorker {
    tx: Sender<LayoutMsg>,
    rx: Receiver<PrecomputeResponse>,
    next_id: std::cell::Cell<u64>,
    handle: Option<thread::JoinHandle<()>>,
}

impl LayoutWorker {
    pub fn spawn() -> Result<Self> {
        let (job_tx, job_rx) = unbounded::<LayoutMsg>();
        let (done_tx, done_rx) = unbounded::<PrecomputeResponse>();
        let handle = thread::Builder::new()
            .name("layout-precompute".into())
            .spawn(move || run_worker(job_rx, done_tx))?;
        Ok(Self {
            tx: job_tx,
            rx: done_rx,
            next_id: std::cell::Cell::new(1),
            handle: Some(handle),
        })
    }
}

fn run_worker(rx: Receiver<LayoutMsg>, tx: Sender<PrecomputeResponse>) {
    let mut cache: HashMap<LayoutParams, Arc<GridLayout>> = HashMap::new();
    while let Ok(msg) = rx.recv() {
        let (id, request) = match msg {
            LayoutMsg::Quit => break,
            LayoutMsg::Compute(id, request) => (id, request),
        };
        let started = Instant::now();
        let cached = request
            .use_cache
            .then(|| cache.get(&request.params).cloned())
            .flatten();
        let layout = match cached {
            Some(layout) => layout,
            None => {
                let layout = Arc::new(compute_layout(&request.params));
                if request.use_cache {
                    cache.insert(request.params, Arc::clone(&layout));
                }
                layout
            }
        };
        let response = PrecomputeResponse {
            correlation_id: id,
            success: true,
            payload: Some(layout),
            processing_time: started.elapsed(),
        };
        if tx.send(response).is_err() {
            break;
        }
    }
}

impl PrecomputeWorker for LayoutWorker {
    fn submit(&self, request: PrecomputeRequest) -> Option<u64> {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        match self.tx.send(LayoutMsg::Compute(id, request)) {
            Ok(()) => Some(id),
            Err(_) => {
                warn!("layout_worker_gone");
                None
            }
        }
    }

    fn poll_responses(&self, kind: WorkerKind, max: usize) -> Vec<PrecomputeResponse> {
        match kind {
            WorkerKind::Layout => self.rx.try_iter().take(max).collect(),
        }
    }
}

impl Drop for LayoutWorker {
    fn drop(&mut self) {
        let _ = self.tx.send(LayoutMsg::Quit);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(seed: u64) -> LayoutParams {
        LayoutParams {
            size: Size::new(600, 400),
            shape: LayoutShape::Grid { columns: 4 },
            bias: Some(Edge::Left),
            jitter: Jitter::Grid,
            seed,
        }
    }

    #[test]
    fn local_layout_is_deterministic() {
        let a = compute_layout(&params(9));
        let b = compute_layout(&params(9));
        assert_eq!(a, b);
        assert_eq!(a.cells.len(), 40);
        assert_eq!(a.thresholds.len(), 40);
    }

    #[test]
    fn worker_matches_local_computation() {
        let worker = LayoutWorker::spawn().unwrap();
        let layout = fetch_layout(
            &worker,
            EffectKind::BlockFlip,
            params(3),
            Duration::from_secs(5),
        )
        .expect("worker answers within the test budget");
        assert_eq!(*layout, compute_layout(&params(3)));
    }

    #[test]
    fn strips_layout_is_one_dimensional() {
        let layout = compute_layout(&LayoutParams {
            size: Size::new(90, 60),
            shape: LayoutShape::Strips {
                count: 3,
                axis: StripAxis::Rows,
            },
            bias: None,
            jitter: Jitter::Span,
            seed: 1,
        });
        assert_eq!((layout.cols, layout.rows), (1, 6));
        assert_eq!(layout.cells.len(), 6);
    }
}
