use std::time::{SystemTime, UNIX_EPOCH};
use std::{env, fs};

use anyhow::{Context, Result, bail};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;
use vigil_engine::{LikelihoodTable, PosteriorEngine, Session, TestConfig};
use vigil_timing::{MonotonicTimer, Timer, VirtualTimer};

use crate::sim::{ConsolePresenter, JsonLineSink, Profile, SimulatedParticipant};

const USAGE: &str = "usage: vigil-app [--config <json>] [--table <json>] \
[--profile alert|weary|exhausted] [--seed <n>] [--realtime]";

pub struct App {
    config: TestConfig,
    table: LikelihoodTable,
    profile: Profile,
    seed: u64,
    realtime: bool,
}

impl App {
    pub fn from_args() -> Result<Self> {
        let mut config = TestConfig::default();
        let mut table = LikelihoodTable::default();
        let mut profile = Profile::Alert;
        let mut seed = 1;
        let mut realtime = false;

        let mut args = env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let path = args.next().context("--config needs a file path")?;
                    let text = fs::read_to_string(&path)
                        .with_context(|| format!("reading config {path}"))?;
                    let value: Value = serde_json::from_str(&text)
                        .with_context(|| format!("parsing config {path}"))?;
                    let map = value
                        .as_object()
                        .with_context(|| format!("config {path} must be a flat JSON object"))?;
                    config = TestConfig::from_map(map)?;
                }
                "--table" => {
                    let path = args.next().context("--table needs a file path")?;
                    let text = fs::read_to_string(&path)
                        .with_context(|| format!("reading likelihood table {path}"))?;
                    table = LikelihoodTable::from_json(&text)
                        .with_context(|| format!("loading likelihood table {path}"))?;
                }
                "--profile" => {
                    let name = args.next().context("--profile needs a name")?;
                    profile = Profile::from_name(&name)
                        .with_context(|| format!("unknown profile `{name}`"))?;
                }
                "--seed" => {
                    let value = args.next().context("--seed needs a number")?;
                    seed = value
                        .parse()
                        .with_context(|| format!("unparsable seed `{value}`"))?;
                }
                "--realtime" => realtime = true,
                "--help" | "-h" => {
                    println!("{USAGE}");
                    std::process::exit(0);
                }
                other => bail!("unknown argument `{other}`\n{USAGE}"),
            }
        }

        Ok(Self {
            config,
            table,
            profile,
            seed,
            realtime,
        })
    }

    pub fn run(self) -> Result<()> {
        println!("=== ADAPTIVE VIGILANCE TEST ===");
        println!(
            "cap {} s, ISI {}..{} ms, thresholds {}/{} ms, decide at {}",
            self.config.max_duration_ms / 1_000,
            self.config.min_isi_ms,
            self.config.max_isi_ms,
            self.config.false_start_threshold_ms,
            self.config.lapse_threshold_ms,
            self.config.decision_threshold,
        );
        println!("participant profile: {:?}, seed {}\n", self.profile, self.seed);

        if self.realtime {
            self.run_with(MonotonicTimer::new())
        } else {
            // Virtual time, anchored to the current epoch so timestamps
            // look like the real thing.
            let epoch_ms = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0);
            self.run_with(VirtualTimer::new(epoch_ms))
        }
    }

    fn run_with<T>(self, timer: T) -> Result<()>
    where
        T: Timer<Timestamp = u64>,
    {
        let engine = PosteriorEngine::new(self.table, self.config.decision_threshold);
        let mut session = Session::new(
            self.config,
            engine,
            timer.clone(),
            StdRng::seed_from_u64(self.seed),
        )?;

        let mut participant = SimulatedParticipant::new(
            timer.clone(),
            StdRng::seed_from_u64(self.seed.wrapping_mul(0x9e37_79b9)),
            self.profile,
        );
        let mut presenter = ConsolePresenter::new(timer);
        let mut sink = JsonLineSink::default();

        let verdict = session.run(&mut presenter, &mut participant, &mut sink);

        let records = session.records();
        let lpfs = records.last().map(|r| r.cumulative_lpfs).unwrap_or(0);
        println!(
            "\nclassified {:?} after {} trials ({} LpFS, {:.1} s of test time)",
            verdict,
            records.len(),
            lpfs,
            records
                .last()
                .map(|r| r.elapsed_test_time_ms as f64 / 1_000.0)
                .unwrap_or(0.0),
        );
        Ok(())
    }
}
