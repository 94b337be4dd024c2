//! Two-phase element bookkeeping shared by the grid and scatter kernels.

use std::time::Duration;

use crate::geometry::timeline::{element_progress, expected_duration, is_started};

#[derive(Debug, Clone, PartialEq)]
pub struct Element<G> {
    pub geometry: G,
    pub progress: f32,
    pub start_threshold: f32,
    pub started: bool,
    pub complete: bool,
}

impl<G> Element<G> {
    pub fn new(geometry: G, start_threshold: f32) -> Self {
        Self {
            geometry,
            progress: 0.0,
            start_threshold: start_threshold.clamp(0.0, 1.0),
            started: false,
            complete: false,
        }
    }

    fn finish(&mut self) {
        self.started = true;
        self.complete = true;
        self.progress = 1.0;
    }
}

/// Elements of one run driven by a single global progress value.
///
/// Local progress never moves backwards, and a complete element stays at 1.0
/// until the set is rebuilt for the next run.
#[derive(Debug, Clone)]
pub struct ElementSet<G> {
    elements: Vec<Element<G>>,
    duration: Duration,
    element_duration: Duration,
    expected: Duration,
}

impl<G> ElementSet<G> {
    pub fn empty() -> Self {
        Self {
            elements: Vec::new(),
            duration: Duration::ZERO,
            element_duration: Duration::ZERO,
            expected: Duration::ZERO,
        }
    }

    pub fn new(
        items: impl IntoIterator<Item = (G, f32)>,
        duration: Duration,
        element_duration: Duration,
    ) -> Self {
        Self {
            elements: items
                .into_iter()
                .map(|(geometry, threshold)| Element::new(geometry, threshold))
                .collect(),
            duration,
            element_duration,
            expected: expected_duration(duration, element_duration),
        }
    }

    pub fn update(&mut self, global: f32) {
        if global >= 1.0 {
            self.finish_all();
            return;
        }
        for el in self.elements.iter_mut().filter(|el| !el.complete) {
            if !el.started {
                if !is_started(global, el.start_threshold, self.duration, self.expected) {
                    continue;
                }
                el.started = true;
            }
            let local = element_progress(
                global,
                el.start_threshold,
                self.duration,
                self.expected,
                self.element_duration,
            );
            el.progress = el.progress.max(local);
            if el.progress >= 1.0 {
                el.progress = 1.0;
                el.complete = true;
            }
        }
    }

    /// Forces every straggler to completion.
    pub fn finish_all(&mut self) {
        self.elements.iter_mut().for_each(Element::finish);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element<G>> {
        self.elements.iter()
    }

    /// Elements that currently show part of the new image.
    pub fn revealed(&self) -> impl Iterator<Item = &Element<G>> {
        self.elements.iter().filter(|el| el.progress > 0.0)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn all_complete(&self) -> bool {
        self.elements.iter().all(|el| el.complete)
    }

    pub fn clear(&mut self) {
        self.elements.clear();
    }
}
