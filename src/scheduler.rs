//! Toy process schedulers.
//!
//! Each policy owns a ready queue of [`Process`]es and hands out one slice of
//! work per [`Scheduler::schedule`] call. The cooperative policies run the
//! chosen process to completion, the preemptive ones cap a slice at a
//! configurable time slice and re-queue whatever is left.

use std::cmp::Reverse;
use std::collections::VecDeque;

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod scheduler_test;

pub const DEFAULT_TIMESLICE: u32 = 5;

const VIRTUAL_TIME_EPSILON: f64 = 1e-6;

#[derive(PartialEq, Debug, Clone, Copy, Default)]
pub struct Process {
    pub pid: u32,
    pub remaining_time: u32,
    pub priority: u32,
    /// Length of the slice granted by the last [`Scheduler::schedule`] call.
    pub scheduled_time: u32,
    pub virtual_time: f64,
}

impl Process {
    pub fn new(pid: u32, remaining_time: u32, priority: u32) -> Self {
        Self {
            pid,
            remaining_time,
            priority,
            ..Self::default()
        }
    }

    fn run_for(&mut self, time: u32) {
        self.scheduled_time = time.min(self.remaining_time);
        self.remaining_time -= self.scheduled_time;
    }
}

pub trait Scheduler {
    fn add_process(&mut self, process: Process);

    /// Picks the next process and runs it for one slice. Returns its state after the slice, or `None` once no work is left.
    fn schedule(&mut self) -> Option<Process>;

    fn name(&self) -> &'static str;
}

/// Drains `scheduler`, returning every slice it hands out in order.
pub fn run_to_completion(scheduler: &mut dyn Scheduler) -> Vec<Process> {
    std::iter::from_fn(|| scheduler.schedule()).collect()
}

/// Inserts `process` after every queued process whose key is not greater, keeping insertion order among ties.
fn insert_sorted_by_key<K: Ord>(queue: &mut VecDeque<Process>, process: Process, key: impl Fn(&Process) -> K) {
    let process_key = key(&process);
    let index = queue.partition_point(|queued| key(queued) <= process_key);
    queue.insert(index, process);
}

fn resort_all_but_last<K: Ord>(queue: &mut VecDeque<Process>, key: impl Fn(&Process) -> K) {
    if queue.len() > 2 {
        let end = queue.len() - 1;
        queue.make_contiguous()[..end].sort_by_key(key);
    }
}

#[derive(Default)]
pub struct FirstComeFirstServed {
    ready: VecDeque<Process>,
}

impl Scheduler for FirstComeFirstServed {
    fn add_process(&mut self, process: Process) {
        self.ready.push_back(process);
    }

    fn schedule(&mut self) -> Option<Process> {
        let mut process = self.ready.pop_front()?;
        process.run_for(process.remaining_time);
        Some(process)
    }

    fn name(&self) -> &'static str {
        "Coop_FCFS"
    }
}

#[derive(Default)]
pub struct ShortestJobFirst {
    ready: VecDeque<Process>,
}

impl Scheduler for ShortestJobFirst {
    fn add_process(&mut self, process: Process) {
        insert_sorted_by_key(&mut self.ready, process, |p| p.remaining_time);
    }

    fn schedule(&mut self) -> Option<Process> {
        let mut process = self.ready.pop_front()?;
        process.run_for(process.remaining_time);
        Some(process)
    }

    fn name(&self) -> &'static str {
        "Coop_SJF"
    }
}

#[derive(Default)]
pub struct CoopPriority {
    ready: VecDeque<Process>,
}

impl Scheduler for CoopPriority {
    fn add_process(&mut self, process: Process) {
        insert_sorted_by_key(&mut self.ready, process, |p| Reverse(p.priority));
    }

    fn schedule(&mut self) -> Option<Process> {
        let mut process = self.ready.pop_front()?;
        process.run_for(process.remaining_time);
        Some(process)
    }

    fn name(&self) -> &'static str {
        "Coop_Prio"
    }
}

pub struct RoundRobin {
    ready: VecDeque<Process>,
    timeslice: u32,
}

impl RoundRobin {
    pub fn new(timeslice: u32) -> Self {
        Self {
            ready: VecDeque::new(),
            timeslice: timeslice.max(1),
        }
    }
}

impl Default for RoundRobin {
    fn default() -> Self {
        Self::new(DEFAULT_TIMESLICE)
    }
}

impl Scheduler for RoundRobin {
    fn add_process(&mut self, process: Process) {
        self.ready.push_back(process);
    }

    fn schedule(&mut self) -> Option<Process> {
        let mut process = self.ready.pop_front()?;
        process.run_for(self.timeslice);
        if process.remaining_time > 0 {
            self.ready.push_back(process);
        }
        Some(process)
    }

    fn name(&self) -> &'static str {
        "Preempt_RR"
    }
}

pub struct ShortestRemainingTimeFirst {
    ready: VecDeque<Process>,
    timeslice: u32,
}

impl ShortestRemainingTimeFirst {
    pub fn new(timeslice: u32) -> Self {
        Self {
            ready: VecDeque::new(),
            timeslice: timeslice.max(1),
        }
    }
}

impl Default for ShortestRemainingTimeFirst {
    fn default() -> Self {
        Self::new(DEFAULT_TIMESLICE)
    }
}

impl Scheduler for ShortestRemainingTimeFirst {
    fn add_process(&mut self, process: Process) {
        insert_sorted_by_key(&mut self.ready, process, |p| p.remaining_time);
    }

    fn schedule(&mut self) -> Option<Process> {
        let mut process = self.ready.pop_front()?;
        process.run_for(self.timeslice);
        if process.remaining_time > 0 {
            // the process that just ran waits at the back, everything else by remaining time
            self.ready.push_back(process);
            resort_all_but_last(&mut self.ready, |p| p.remaining_time);
        }
        Some(process)
    }

    fn name(&self) -> &'static str {
        "Preempt_SRTF"
    }
}

pub struct PreemptivePriority {
    ready: VecDeque<Process>,
    timeslice: u32,
}

impl PreemptivePriority {
    pub fn new(timeslice: u32) -> Self {
        Self {
            ready: VecDeque::new(),
            timeslice: timeslice.max(1),
        }
    }
}

impl Default for PreemptivePriority {
    fn default() -> Self {
        Self::new(DEFAULT_TIMESLICE)
    }
}

impl Scheduler for PreemptivePriority {
    fn add_process(&mut self, process: Process) {
        insert_sorted_by_key(&mut self.ready, process, |p| Reverse(p.priority));
    }

    fn schedule(&mut self) -> Option<Process> {
        let mut process = self.ready.pop_front()?;
        process.run_for(self.timeslice);
        if process.remaining_time > 0 {
            self.ready.push_back(process);
            resort_all_but_last(&mut self.ready, |p| Reverse(p.priority));
        }
        Some(process)
    }

    fn name(&self) -> &'static str {
        "Preempt_Prio"
    }
}

/// Weighted fair scheduling: the process that has received the least service relative to its priority runs next.
pub struct CompletelyFair {
    ready: Vec<Process>,
    timeslice: u32,
    total_weight: u32,
}

impl CompletelyFair {
    pub fn new(timeslice: u32) -> Self {
        Self {
            ready: Vec::new(),
            timeslice: timeslice.max(1),
            total_weight: 0,
        }
    }

    fn weight(process: &Process) -> u32 {
        process.priority.max(1)
    }

    /// Less virtual time wins, near-equal virtual times go to the higher priority.
    fn runs_before(candidate: &Process, current: &Process) -> bool {
        if (candidate.virtual_time - current.virtual_time).abs() < VIRTUAL_TIME_EPSILON {
            candidate.priority > current.priority
        } else {
            candidate.virtual_time < current.virtual_time
        }
    }
}

impl Default for CompletelyFair {
    fn default() -> Self {
        Self::new(DEFAULT_TIMESLICE)
    }
}

impl Scheduler for CompletelyFair {
    fn add_process(&mut self, process: Process) {
        self.ready.push(process);
        self.total_weight = self.ready.iter().map(Self::weight).sum();
    }

    fn schedule(&mut self) -> Option<Process> {
        let mut next = 0;
        for (index, candidate) in self.ready.iter().enumerate().skip(1) {
            if Self::runs_before(candidate, &self.ready[next]) {
                next = index;
            }
        }
        let process = self.ready.get_mut(next)?;

        let slice = (self.total_weight / self.timeslice).max(1);
        let weight = Self::weight(process);
        process.run_for(slice);
        process.virtual_time += f64::from(process.scheduled_time) / f64::from(weight);

        let process = *process;
        if process.remaining_time == 0 {
            self.ready.remove(next);
        }
        Some(process)
    }

    fn name(&self) -> &'static str {
        "Preempt_CFS"
    }
}
