use crate::{actions::ActionReport, session::Session};
use chrono::{Duration as ChronoDuration, Local};

/// Position in the three-cycle rotation. Check-in is daily, so it only runs on the first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cycle(u8);

impl Cycle {
    pub fn first() -> Self {
        Cycle(1)
    }

    pub fn number(self) -> u8 {
        self.0
    }

    pub fn next(self) -> Self {
        Cycle(self.0 % 3 + 1)
    }

    pub fn includes_check_in(self) -> bool {
        self.0 == 1
    }
}

pub struct Scheduler<'s, 'a> {
    session: &'s mut Session<'a>,
    cycle: Cycle,
}

impl<'s, 'a> Scheduler<'s, 'a> {
    pub fn new(session: &'s mut Session<'a>) -> Self {
        Self {
            session,
            cycle: Cycle::first(),
        }
    }

    /// Refreshes every bearer, runs the cycle's actions with a cooldown
    /// between them, then rebuilds the account snapshots.
    pub fn run_cycle(&mut self) -> Vec<ActionReport> {
        log::info!(
            "Starting cycle {} at {}",
            self.cycle.number(),
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        self.session.acquire_all();
        log::info!("All bearers have been updated");

        let cooldown = self.session.pacing().cooldown;
        let mut reports = Vec::new();
        if self.cycle.includes_check_in() {
            reports.push(self.session.check_in_all());
            self.session.pause(cooldown);
        }
        reports.push(self.session.claim_farm_all());
        self.session.pause(cooldown);
        reports.push(self.session.start_farm_all());

        self.session.rebuild_snapshots();
        reports
    }

    /// Sleeps until the next cycle is due and advances the counter.
    pub fn wait_for_next(&mut self) {
        let interval = self.session.pacing().cycle_interval;
        let next = self.cycle.next();
        let due = ChronoDuration::from_std(interval)
            .map(|d| (Local::now() + d).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|_| format!("{:?} from now", interval));
        log::info!(
            "Cycle {} completed; cycle {} will start at {}",
            self.cycle.number(),
            next.number(),
            due
        );
        self.session.pause(interval);
        self.cycle = next;
    }

    /// One full iteration: run the cycle, log its summaries, hand the
    /// results to `on_cycle`, then wait for the next one.
    pub fn step(&mut self, on_cycle: &mut impl FnMut(&Session<'a>, &[ActionReport])) {
        let reports = self.run_cycle();
        for report in &reports {
            log::info!("{}", report.summary());
        }
        on_cycle(&*self.session, &reports);
        self.wait_for_next();
    }

    /// Never returns; the process is expected to be stopped externally.
    pub fn run_forever(&mut self, mut on_cycle: impl FnMut(&Session<'a>, &[ActionReport])) -> ! {
        loop {
            self.step(&mut on_cycle);
        }
    }
}
