use assertor::{assert_that, EqualityAssertion, OptionAssertion, VecAssertion};

use crate::scheduler::*;

fn reference_processes() -> Vec<Process> {
    vec![
        Process::new(0, 10, 1),
        Process::new(1, 20, 3),
        Process::new(2, 30, 2),
        Process::new(3, 10, 3),
        Process::new(4, 1, 1),
    ]
}

fn schedule_reference(scheduler: &mut dyn Scheduler) -> Vec<Process> {
    for process in reference_processes() {
        scheduler.add_process(process);
    }
    run_to_completion(scheduler)
}

fn pids(slices: &[Process]) -> Vec<u32> {
    slices.iter().map(|slice| slice.pid).collect()
}

fn total_time_per_pid(slices: &[Process]) -> Vec<u32> {
    let mut totals = vec![0; reference_processes().len()];
    for slice in slices {
        totals[slice.pid as usize] += slice.scheduled_time;
    }
    totals
}

#[test]
fn test_fcfs_runs_in_admission_order() {
    let slices = schedule_reference(&mut FirstComeFirstServed::default());
    assert_that!(pids(&slices)).contains_exactly_in_order(vec![0, 1, 2, 3, 4]);
    assert_that!(slices.iter().map(|s| s.scheduled_time).collect::<Vec<_>>())
        .contains_exactly_in_order(vec![10, 20, 30, 10, 1]);
    assert!(slices.iter().all(|s| s.remaining_time == 0));
}

#[test]
fn test_sjf_runs_shortest_first_and_keeps_ties_in_insertion_order() {
    let slices = schedule_reference(&mut ShortestJobFirst::default());
    assert_that!(pids(&slices)).contains_exactly_in_order(vec![4, 0, 3, 1, 2]);
    assert!(slices.iter().all(|s| s.remaining_time == 0));
}

#[test]
fn test_coop_priority_runs_highest_priority_first() {
    let slices = schedule_reference(&mut CoopPriority::default());
    assert_that!(pids(&slices)).contains_exactly_in_order(vec![1, 3, 2, 0, 4]);
}

#[test]
fn test_empty_scheduler_has_no_work() {
    assert_that!(FirstComeFirstServed::default().schedule()).is_none();
    assert_that!(ShortestJobFirst::default().schedule()).is_none();
    assert_that!(RoundRobin::default().schedule()).is_none();
    assert_that!(CompletelyFair::default().schedule()).is_none();
}

#[test]
fn test_round_robin_rotates_in_time_slices() {
    let slices = schedule_reference(&mut RoundRobin::new(5));
    assert_that!(pids(&slices))
        .contains_exactly_in_order(vec![0, 1, 2, 3, 4, 0, 1, 2, 3, 1, 2, 1, 2, 2, 2]);
    assert!(slices.iter().all(|s| s.scheduled_time <= 5));
    assert_that!(total_time_per_pid(&slices)).contains_exactly_in_order(vec![10, 20, 30, 10, 1]);
}

#[test]
fn test_srtf_keeps_preempted_process_at_the_back() {
    let slices = schedule_reference(&mut ShortestRemainingTimeFirst::new(5));
    assert_that!(pids(&slices))
        .contains_exactly_in_order(vec![4, 0, 3, 0, 1, 3, 2, 1, 2, 1, 2, 1, 2, 2, 2]);
    assert_that!(total_time_per_pid(&slices)).contains_exactly_in_order(vec![10, 20, 30, 10, 1]);
}

#[test]
fn test_preemptive_priority_serves_every_process() {
    let slices = schedule_reference(&mut PreemptivePriority::new(5));
    assert_that!(slices[0].pid).is_equal_to(1);
    assert_that!(slices[1].pid).is_equal_to(3);
    assert_that!(total_time_per_pid(&slices)).contains_exactly_in_order(vec![10, 20, 30, 10, 1]);
}

#[test]
fn test_cfs_starts_with_heaviest_process_and_tracks_virtual_time() {
    let slices = schedule_reference(&mut CompletelyFair::new(5));

    // total weight 10 over a time slice of 5
    assert_that!(slices[0].pid).is_equal_to(1);
    assert_that!(slices[0].scheduled_time).is_equal_to(2);
    assert!((slices[0].virtual_time - 2.0 / 3.0).abs() < 1e-9);

    assert_that!(total_time_per_pid(&slices)).contains_exactly_in_order(vec![10, 20, 30, 10, 1]);
    assert_that!(slices.last().map(|s| s.remaining_time)).has_value(0);
}

#[test]
fn test_scheduler_names() {
    assert_that!(FirstComeFirstServed::default().name()).is_equal_to("Coop_FCFS");
    assert_that!(ShortestJobFirst::default().name()).is_equal_to("Coop_SJF");
    assert_that!(RoundRobin::default().name()).is_equal_to("Preempt_RR");
}
