use crate::{
    DeltaMethod, Design, Error, InformationMatrix, Model, ModelEvaluator, ModelOrder, Result,
    sampler::{HitAndRun, box_constraints},
};
use faer::Mat;
use nalgebra::DVector;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rayon::prelude::*;
use std::{fmt::Display, iter::zip};
use tracing::{debug, info, trace, warn};

/// Configuration of the coordinate exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeCriteria {
    /// Number of evenly spaced candidate values per coordinate.
    pub steps: usize,
    /// Lower bound of every coded factor.
    pub low: f64,
    /// Upper bound of every coded factor.
    pub high: f64,
    /// A candidate is accepted only if its delta is strictly greater.
    pub min_improvement: f64,
    /// Maximal number of passes over all (run, factor) pairs.
    pub max_passes: usize,
    /// Number of bootstrap draws before giving up on a singular start.
    pub bootstrap_attempts: usize,
    /// Number of independent searches, the best result is kept.
    pub restarts: usize,
    /// Evaluation of the exchange delta.
    pub delta_method: DeltaMethod,
}

impl Default for ExchangeCriteria {
    fn default() -> Self {
        Self {
            steps: 12,
            low: -1.,
            high: 1.,
            min_improvement: 1. + f64::EPSILON,
            max_passes: 100,
            bootstrap_attempts: 100,
            restarts: 1,
            delta_method: DeltaMethod::default(),
        }
    }
}

impl ExchangeCriteria {
    /// Returns the default criteria.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the candidate grid of `steps` evenly spaced values from `low` to `high`.
    pub fn candidates(&self) -> Vec<f64> {
        let last = self.steps.saturating_sub(1).max(1) as f64;
        (0..self.steps)
            .map(|i| self.low + (self.high - self.low) * i as f64 / last)
            .collect()
    }

    fn validate(&self) -> Result<()> {
        let min_values = [
            ("steps", self.steps, 2),
            ("restarts", self.restarts, 1),
            ("bootstrap_attempts", self.bootstrap_attempts, 1),
        ];
        if let Some((vector, value, ge_value)) = min_values.into_iter().find(|(_, v, ge)| v < ge) {
            return Err(Error::MinValue {
                vector,
                dim: 0,
                value,
                ge_value,
            });
        }
        if self.high - self.low <= 0. {
            return Err(Error::MinDistanceBetweenVectors {
                vector1: "low",
                vector2: "high",
                dim: 0,
                distance: self.high - self.low,
                gt_distance: 0.,
            });
        }
        Ok(())
    }
}

/// Result of a single bootstrap and exchange run.
struct Search {
    design: Design,
    info: InformationMatrix,
    passes: usize,
    exchanges: usize,
    history: Vec<f64>,
}

#[cfg_attr(doc, katexit::katexit)]
/// D-optimal design solver
///
/// The solver bootstraps a non-singular design by hit-and-run sampling inside the box
/// $[low, high]^k$ and improves it by coordinate exchange: every coordinate of every run is
/// replaced by the value of a discrete candidate grid that maximizes $\det X^T X$. Each
/// evaluation uses the rank-2 update of [InformationMatrix], so a candidate costs $O(p^2)$. The
/// search stops when a full pass over all coordinates makes no exchange.
pub struct OptimalDesign<M: ModelEvaluator> {
    model: M,
    run_count: Option<usize>,
    criteria: ExchangeCriteria,
    design: Option<Design>,
    d_optimality: f64,
    passes: usize,
    exchanges: usize,
    history: Vec<f64>,
}

impl<M: ModelEvaluator> Display for OptimalDesign<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = (6 + self.model.factor_count() * 9).max(28);
        let design = match &self.design {
            Some(design) => format!("{design}"),
            None => format!("{:-^1$}\nnot solved", " Design ", width),
        };
        let stats_title = format!("{:-^1$}", " Statistics ", width);
        let footer = format!("{:-^1$}", "", width);
        let d_optimality = format!("D-optimality: {:.6}", self.d_optimality);
        let runs = format!(
            "Runs: {}",
            self.design.as_ref().map(|d| d.run_count()).unwrap_or(0)
        );
        let passes = format!("Passes: {}", self.passes);
        let exchanges = format!("Exchanges: {}", self.exchanges);
        write!(
            f,
            "{design}\n{stats_title}\n{d_optimality}\n{runs}\n{passes}\n{exchanges}\n{footer}"
        )
    }
}

impl<M: ModelEvaluator> OptimalDesign<M> {
    /// Returns the solver for a model. The run count defaults to the model size.
    pub fn new(model: M) -> Self {
        Self {
            model,
            run_count: None,
            criteria: ExchangeCriteria::default(),
            design: None,
            d_optimality: f64::INFINITY,
            passes: 0,
            exchanges: 0,
            history: vec![],
        }
    }

    /// Returns the solver with given number of runs.
    pub fn with_run_count(mut self, run_count: usize) -> Self {
        self.run_count = Some(run_count);
        self
    }

    /// Returns the solver with given [ExchangeCriteria].
    pub fn with_criteria(mut self, criteria: ExchangeCriteria) -> Self {
        self.criteria = criteria;
        self
    }

    /// Model the design is optimized for.
    pub fn model(&self) -> &M {
        &self.model
    }

    /// Number of runs of the resulting design.
    pub fn run_count(&self) -> usize {
        self.run_count.unwrap_or(self.model.model_size())
    }

    /// Returns the design of the last [OptimalDesign::solve] call.
    pub fn design(&self) -> Option<&Design> {
        self.design.as_ref()
    }

    /// D-optimality $\ln \det (X^T X)^{-1}$ of the solved design, infinite before solving.
    pub fn d_optimality(&self) -> f64 {
        self.d_optimality
    }

    /// Number of passes of the kept search.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Number of committed exchanges of the kept search.
    pub fn exchanges(&self) -> usize {
        self.exchanges
    }

    /// D-optimality after bootstrap followed by the value after each pass of the kept search.
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Returns a locally D-optimal design.
    ///
    /// Fails immediately with [Error::MinValue] for a model without factors and with
    /// [Error::RunCountTooSmall] if fewer runs than model terms are requested, and with
    /// [Error::SingularStart] if no bootstrap draw is non-singular.
    pub fn solve<R: Rng>(&mut self, rng: &mut R) -> Result<&Design> {
        let factor_count = self.model.factor_count();
        if factor_count == 0 {
            return Err(Error::MinValue {
                vector: "factor_count",
                dim: 0,
                value: factor_count,
                ge_value: 1,
            });
        }
        let model_size = self.model.model_size();
        let run_count = self.run_count();
        if run_count < model_size {
            return Err(Error::RunCountTooSmall {
                run_count,
                model_size,
            });
        }
        self.criteria.validate()?;
        let candidates = self.criteria.candidates();

        let mut best: Option<Search> = None;
        for restart in 0..self.criteria.restarts {
            let search = self.search(run_count, &candidates, rng)?;
            debug!(
                restart,
                d_optimality = search.info.d_optimality(),
                passes = search.passes,
                "search finished"
            );
            if best
                .as_ref()
                .is_none_or(|b| search.info.d_optimality() < b.info.d_optimality())
            {
                best = Some(search);
            }
        }
        let best = best.ok_or(Error::SingularStart {
            attempts: self.criteria.bootstrap_attempts,
        })?;
        self.d_optimality = best.info.d_optimality();
        self.passes = best.passes;
        self.exchanges = best.exchanges;
        self.history = best.history;
        Ok(&*self.design.insert(best.design))
    }

    /// Draws non-singular start designs until one is found.
    fn bootstrap<R: Rng>(
        &self,
        run_count: usize,
        rng: &mut R,
    ) -> Result<(Design, InformationMatrix)> {
        let factor_count = self.model.factor_count();
        let (low, high) = (self.criteria.low, self.criteria.high);
        let (a, b) = box_constraints(factor_count, low, high);
        let center = DVector::from_element(factor_count, (low + high) / 2.);
        for attempt in 1..=self.criteria.bootstrap_attempts {
            let points =
                HitAndRun::new(center.clone(), a.clone(), b.clone())?.sample(run_count, rng)?;
            let design = Design::new(points);
            match InformationMatrix::from_model_matrix(&self.model.model_matrix(&design)) {
                Ok(info) => return Ok((design, info)),
                Err(Error::SingularMatrix { .. }) => {
                    warn!(attempt, "singular bootstrap design, resampling")
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::SingularStart {
            attempts: self.criteria.bootstrap_attempts,
        })
    }

    fn search<R: Rng>(&self, run_count: usize, candidates: &[f64], rng: &mut R) -> Result<Search> {
        let (mut design, mut info) = self.bootstrap(run_count, rng)?;
        let mut history = vec![info.d_optimality()];
        let mut passes = 0;
        let mut exchanges = 0;
        loop {
            if passes == self.criteria.max_passes {
                warn!(passes, "pass limit reached before convergence");
                break;
            }
            passes += 1;
            let mut pass_exchanges = 0;
            for run in 0..design.run_count() {
                for factor in 0..design.factor_count() {
                    let mut point = design.point(run).to_vec();
                    let v_old = self.model.feature_vec(&point);
                    let Some((value, delta)) =
                        self.best_candidate(&info, &point, factor, &v_old, candidates)
                    else {
                        continue;
                    };
                    point[factor] = value;
                    let v_new = self.model.feature_vec(&point);
                    match info.exchange(&v_new, &v_old) {
                        Ok(_) => {
                            design.set_coordinate(run, factor, value);
                            pass_exchanges += 1;
                            trace!(run, factor, value, delta, "exchange");
                        }
                        Err(Error::SingularMatrix { .. }) => {
                            trace!(run, factor, value, "singular exchange skipped")
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
            exchanges += pass_exchanges;
            history.push(info.d_optimality());
            debug!(
                pass = passes,
                exchanges = pass_exchanges,
                d_optimality = info.d_optimality(),
                "pass finished"
            );
            if pass_exchanges == 0 {
                info!(
                    passes,
                    d_optimality = info.d_optimality(),
                    "coordinate exchange converged"
                );
                break;
            }
        }
        Ok(Search {
            design,
            info,
            passes,
            exchanges,
            history,
        })
    }

    /// Returns the candidate value with the largest delta above the improvement threshold. Ties
    /// and differences within machine epsilon keep the earliest grid value.
    fn best_candidate(
        &self,
        info: &InformationMatrix,
        point: &[f64],
        factor: usize,
        v_old: &Mat<f64>,
        candidates: &[f64],
    ) -> Option<(f64, f64)> {
        let evaluate = |value: &f64| {
            let mut x = point.to_vec();
            x[factor] = *value;
            let v_new = self.model.feature_vec(&x);
            info.delta_with(self.criteria.delta_method, &v_new, v_old)
        };
        let deltas = match candidates.len() {
            0..=2 => candidates.iter().map(&evaluate).collect::<Vec<f64>>(),
            3.. => candidates.par_iter().map(&evaluate).collect::<Vec<f64>>(),
        };
        select_exchange(candidates, &deltas, self.criteria.min_improvement)
    }
}

/// Returns the candidate and its delta if the delta exceeds `min_improvement`. A later candidate
/// replaces the current best only if it is larger by more than machine epsilon.
fn select_exchange(
    candidates: &[f64],
    deltas: &[f64],
    min_improvement: f64,
) -> Option<(f64, f64)> {
    let mut best: Option<(f64, f64)> = None;
    for (value, delta) in zip(candidates, deltas) {
        if !delta.is_finite() || *delta <= min_improvement {
            continue;
        }
        match best {
            Some((_, best_delta)) if delta - best_delta <= f64::EPSILON => {}
            _ => best = Some((*value, *delta)),
        }
    }
    best
}

/// Returns a locally D-optimal design for a polynomial model of the given order including pure
/// powers, with `run_count` defaulting to the model size.
///
/// ```
/// use dexopt::{ModelOrder, build_optimal};
///
/// let design = build_optimal(2, ModelOrder::Quadratic, None, 42).unwrap();
/// assert_eq!(design.run_count(), 6);
/// ```
pub fn build_optimal(
    factor_count: usize,
    order: ModelOrder,
    run_count: Option<usize>,
    seed: u64,
) -> Result<Design> {
    let model = Model::from_order(factor_count, order, true);
    let mut solver = OptimalDesign::new(model);
    if let Some(run_count) = run_count {
        solver = solver.with_run_count(run_count);
    }
    let mut rng = StdRng::seed_from_u64(seed);
    solver.solve(&mut rng).cloned()
}
