//! Integrate the open fraction over every transition in memory-sized batches
//!
//! Transitions are processed in batches of consecutive control points, each
//! batch sharing its last control point with the first of the next. The
//! memory consumed by a batch is measured and used to scale the next one so
//! the predicted use stays within a fraction of what is available.

// crate modules
use crate::aperture::{weighted_open_fraction, ApertureFractions};
use crate::error::{Error, Result};
use crate::grid::CalcGrid;
use crate::kernel::{edge_blocked_fractions, Edge};
use crate::memory::MemoryProbe;

// mutools modules
use mutools_delivery::Delivery;

// external crates
use kdam::{Bar, BarBuilder, BarExt};
use log::{debug, trace, warn};
use ndarray::{s, Array2, Axis};

/// Adaptive number of transitions per batch
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BatchSizer {
    size: usize,
    min: usize,
    ram_fraction: f64,
}

impl BatchSizer {
    /// Start at the minimum batch size
    pub fn new(min: usize, ram_fraction: f64) -> Self {
        Self {
            size: min,
            min,
            ram_fraction,
        }
    }

    /// Number of transitions in the next batch
    pub fn size(&self) -> usize {
        self.size
    }

    /// Rescale from the memory a batch of `transitions` actually used
    ///
    /// Nothing changes unless some memory use was measured.
    pub fn resize(&mut self, used: u64, available: u64, transitions: usize) {
        if used == 0 || transitions == 0 {
            return;
        }

        let per_transition = used as f64 / transitions as f64;
        let affordable = (self.ram_fraction * available as f64 / per_transition).floor();

        // float to int casts saturate
        self.size = (affordable as usize).max(self.min);
    }
}

/// Batched sweep over all transitions of a delivery
#[derive(Debug)]
pub(crate) struct Sweep<'a> {
    sizer: BatchSizer,
    probe: &'a mut dyn MemoryProbe,
    disable_progress: bool,
}

impl<'a> Sweep<'a> {
    pub fn new(sizer: BatchSizer, probe: &'a mut dyn MemoryProbe, disable_progress: bool) -> Self {
        Self {
            sizer,
            probe,
            disable_progress,
        }
    }

    /// MU density of the whole delivery on the calculation grid
    pub fn integrate(&mut self, delivery: &Delivery, calc: &CalcGrid) -> Result<Array2<f64>> {
        let transitions = delivery.len().saturating_sub(1);
        let mut density = Array2::zeros(calc.grid.shape());

        if self.probe.available().is_none() {
            warn!(
                "Host memory is unavailable, using a fixed batch size of {}",
                self.sizer.size()
            );
        }

        let mut progress_bar = self.init_progress_bar(transitions)?;
        if !self.disable_progress {
            progress_bar.refresh()?;
        }

        let mut current = 0;
        let mut batches = 0;
        while current < transitions {
            let stop = (current + self.sizer.size()).min(transitions);
            let used = self.integrate_batch(delivery, calc, current, stop, &mut density)?;

            if let (Some(used), Some(available)) = (used, self.probe.available()) {
                self.sizer.resize(used, available, stop - current);
            }

            trace!(
                "Transitions {current}..{stop} used {} bytes, next batch {}",
                used.unwrap_or_default(),
                self.sizer.size()
            );

            progress_bar.update(stop - current)?;
            current = stop;
            batches += 1;
        }

        if !self.disable_progress {
            eprintln!()
        };

        debug!("Integrated {transitions} transitions in {batches} batches");
        Ok(density)
    }

    /// Add the transitions between control points `start..=stop` to `density`
    ///
    /// Returns the memory the batch tensors took up, if it could be measured.
    fn integrate_batch(
        &mut self,
        delivery: &Delivery,
        calc: &CalcGrid,
        start: usize,
        stop: usize,
        density: &mut Array2<f64>,
    ) -> Result<Option<u64>> {
        let before = self.probe.used();

        let leaves = calc.leaves.clone();
        let mlc = delivery.mlc();
        let mlc = mlc.slice(s![start..=stop, leaves, ..]);
        let jaw = delivery.jaw();
        let jaw = jaw.slice(s![start..=stop, ..]);

        let x = calc.grid.x.view();
        let y = calc.grid.y.view();

        let aperture = ApertureFractions {
            left: edge_blocked_fractions(Edge::Left, x, mlc.index_axis(Axis(2), 0))?,
            right: edge_blocked_fractions(Edge::Right, x, mlc.index_axis(Axis(2), 1))?,
            bottom: edge_blocked_fractions(Edge::Bottom, y, jaw.slice(s![.., 0..1]))?,
            top: edge_blocked_fractions(Edge::Top, y, jaw.slice(s![.., 1..2]))?,
        };
        let open = aperture.open_fraction(&calc.leaf_map)?;

        let after = self.probe.used();

        let mu = delivery.mu();
        let mu = mu.slice(s![start..=stop]);
        let delta_mu = &mu.slice(s![1..]) - &mu.slice(s![..-1]);
        *density += &weighted_open_fraction(open.view(), delta_mu.view());

        Ok(match (before, after) {
            (Some(before), Some(after)) => Some(after.saturating_sub(before)),
            _ => None,
        })
    }

    /// Initialise the progress bar, if wanted
    fn init_progress_bar(&self, total: usize) -> Result<Bar> {
        BarBuilder::default()
            .total(total)
            .unit(" transitions")
            .disable(self.disable_progress)
            .build()
            .map_err(Error::ProgressBar)
    }
}
