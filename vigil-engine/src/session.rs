use std::time::Duration;

use rand::Rng;
use vigil_core::{InputSource, Outcome, ResultsSink, StimulusPresenter, TrialRecord, Vigilance};
use vigil_timing::Timer;

use crate::bins::bin_of;
use crate::classify::classify_response;
use crate::config::{ConfigError, TestConfig};
use crate::posterior::PosteriorEngine;
use crate::scheduler::{IsiScheduler, StimulusWait};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Finalized(Vigilance),
}

/// The trial-loop controller. Owns the test clock, the ISI scheduler, and
/// the posterior engine; collaborators are handed in at run time.
///
/// Single-threaded and cooperative: the only suspension points are the ISI
/// wait and the response wait, both inside one trial, so no trial overlaps
/// another and records are totally ordered by index and onset.
pub struct Session<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    config: TestConfig,
    timer: T,
    scheduler: IsiScheduler<R>,
    engine: PosteriorEngine,
    records: Vec<TrialRecord>,
    state: SessionState,
}

impl<T, R> Session<T, R>
where
    T: Timer<Timestamp = u64>,
    R: Rng,
{
    pub fn new(
        config: TestConfig,
        engine: PosteriorEngine,
        timer: T,
        rng: R,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let scheduler = IsiScheduler::new(&config, rng);
        Ok(Self {
            config,
            timer,
            scheduler,
            engine,
            records: Vec::new(),
            state: SessionState::Running,
        })
    }

    /// Runs trials until the posterior engine decides or the duration cap
    /// fires, then finalizes the sink and returns the classification.
    /// Calling it again on a finalized session is a no-op returning the
    /// stored verdict.
    pub fn run(
        &mut self,
        presenter: &mut dyn StimulusPresenter,
        input: &mut dyn InputSource,
        sink: &mut dyn ResultsSink,
    ) -> Vigilance {
        if let SessionState::Finalized(v) = self.state {
            return v;
        }

        let start_ms = self.timer.now();
        loop {
            // The cap is an absolute deadline from test start, checked at
            // trial-loop granularity. This pre-trial check only fires when
            // the clock crossed the cap between the previous trial's own
            // check and here; the trial that straddles the cap is caught
            // below and carries the fallback verdict on its record.
            if self.elapsed_ms(start_ms) >= self.config.max_duration_ms {
                let verdict = self.engine.fallback_classification();
                if let Some(last) = self.records.last_mut() {
                    last.classification = Some(verdict);
                }
                return self.finalize(sink, verdict);
            }

            let verdict = self.run_trial(start_ms, presenter, input, sink);
            if let Some(v) = verdict {
                return self.finalize(sink, v);
            }
        }
    }

    fn run_trial(
        &mut self,
        start_ms: u64,
        presenter: &mut dyn StimulusPresenter,
        input: &mut dyn InputSource,
        sink: &mut dyn ResultsSink,
    ) -> Option<Vigilance> {
        let trial_index = self.records.len();
        let isi_ms = self.scheduler.next_isi();

        let (outcome, onset_ms, response_ms) =
            match self.scheduler.schedule(&self.timer, input, isi_ms) {
                StimulusWait::Preempted { tap_ms } => {
                    (Outcome::FalseStart { rt_ms: None }, None, Some(tap_ms))
                }
                StimulusWait::Fired { onset_ms } => {
                    presenter.present_stimulus(onset_ms);
                    let ceiling = Duration::from_millis(self.config.response_ceiling_ms());
                    let tap = input.await_response(onset_ms, ceiling);
                    presenter.clear_stimulus();
                    let outcome = classify_response(&self.config, onset_ms, tap);
                    // A malformed (pre-onset) report was classified as "no
                    // response" and is not recorded as one either.
                    let response_ms = tap.filter(|t| *t >= onset_ms);
                    (outcome, Some(onset_ms), response_ms)
                }
            };

        // Elapsed time at stimulus onset; for a cancelled attempt the tap is
        // the closest defined event.
        let elapsed_ms = onset_ms
            .or(response_ms)
            .unwrap_or_else(|| self.timer.now())
            .saturating_sub(start_ms);
        let bin = bin_of(elapsed_ms);
        let snapshot = self.engine.observe(bin, outcome.class());

        presenter.show_feedback(
            &outcome,
            Duration::from_millis(self.config.feedback_duration_ms),
        );

        let verdict = snapshot.decision.or_else(|| {
            (self.elapsed_ms(start_ms) >= self.config.max_duration_ms)
                .then(|| self.engine.fallback_classification())
        });

        let record = TrialRecord {
            trial_index,
            rt_ms: outcome.rt_ms(),
            isi_ms,
            stimulus_onset_timestamp: onset_ms,
            response_timestamp: response_ms,
            is_lapse: matches!(outcome, Outcome::Lapse { .. }),
            is_false_start: matches!(outcome, Outcome::FalseStart { .. }),
            cumulative_lpfs: snapshot.cumulative_lpfs,
            elapsed_test_time_ms: elapsed_ms,
            time_bin: bin,
            posterior_high: snapshot.high,
            posterior_medium: snapshot.medium,
            posterior_low: snapshot.low,
            classification: verdict,
        };
        sink.record(&record);
        self.records.push(record);

        verdict
    }

    fn finalize(&mut self, sink: &mut dyn ResultsSink, verdict: Vigilance) -> Vigilance {
        self.state = SessionState::Finalized(verdict);
        sink.complete(&self.records, verdict);
        verdict
    }

    fn elapsed_ms(&self, start_ms: u64) -> u64 {
        self.timer.now().saturating_sub(start_ms)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn classification(&self) -> Option<Vigilance> {
        match self.state {
            SessionState::Running => None,
            SessionState::Finalized(v) => Some(v),
        }
    }

    pub fn records(&self) -> &[TrialRecord] {
        &self.records
    }
}
