use std::str::FromStr;
use std::sync::Arc;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use argh::FromArgs;
use bounded_buffer::scheduler::{self, Process, Scheduler};
use bounded_buffer::{BoundedBuffer, MonitorSemaphore, PriorityBoundedBuffer, Semaphore, SpinBoundedBuffer};
use log::{error, info, LevelFilter};
use parking_lot::lock_api::RawMutex;
use rand::Rng;

mod logger;

#[derive(FromArgs)]
/// Producer/consumer and scheduling demonstrations.
struct Args {
    /// maximum log level: off, error, warn, info, debug or trace
    #[argh(option, default = "LevelFilter::Info")]
    log_level: LevelFilter,

    #[argh(subcommand)]
    command: Command,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Command {
    Buffer(BufferArgs),
    Sched(SchedArgs),
    Order(OrderArgs),
}

#[derive(FromArgs)]
/// Runs one producer and one consumer thread against a bounded buffer.
#[argh(subcommand, name = "buffer")]
struct BufferArgs {
    /// synchronization backend: monitor, spin or priority
    #[argh(option, default = "Variant::Monitor")]
    variant: Variant,

    /// number of slots in the buffer
    #[argh(option, default = "10")]
    capacity: usize,

    /// number of items to produce, runs forever when absent
    #[argh(option)]
    items: Option<u64>,

    /// pause after every put, in milliseconds
    #[argh(option, default = "0")]
    producer_delay_ms: u64,

    /// pause after every get, in milliseconds
    #[argh(option, default = "0")]
    consumer_delay_ms: u64,
}

#[derive(FromArgs)]
/// Prints the slices every scheduling policy hands out for a fixed set of processes.
#[argh(subcommand, name = "sched")]
struct SchedArgs {
    /// time slice of the preemptive policies
    #[argh(option, default = "scheduler::DEFAULT_TIMESLICE")]
    timeslice: u32,
}

#[derive(FromArgs)]
/// Starts four threads in reverse order and lets semaphores put them back in order.
#[argh(subcommand, name = "order")]
struct OrderArgs {
    /// pause of every thread before it prints, in milliseconds
    #[argh(option, default = "200")]
    delay_ms: u64,
}

#[derive(Clone, Copy, Debug)]
enum Variant {
    Monitor,
    Spin,
    Priority,
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "monitor" => Ok(Variant::Monitor),
            "spin" => Ok(Variant::Spin),
            "priority" => Ok(Variant::Priority),
            other => Err(format!("unknown variant '{}', expected monitor, spin or priority", other)),
        }
    }
}

fn main() {
    let args: Args = argh::from_env();
    if let Err(e) = logger::init(args.log_level) {
        eprintln!("Could not install logger: {}", e);
        std::process::exit(1);
    }

    match args.command {
        Command::Buffer(args) => run_buffer(&args),
        Command::Sched(args) => run_schedulers(args.timeslice),
        Command::Order(args) => run_ordered_threads(Duration::from_millis(args.delay_ms)),
    }
}

fn run_buffer(args: &BufferArgs) {
    if args.capacity == 0 {
        error!("Capacity must be non-zero");
        std::process::exit(1);
    }
    info!("running {:?} buffer with {} slots", args.variant, args.capacity);
    match args.variant {
        Variant::Monitor => run_pair(Arc::new(BoundedBuffer::new(args.capacity)), args, |buffer, item| {
            buffer.put(item);
            info!("Inserted {}, number of elements now: {}", item, buffer.len());
        }),
        Variant::Spin => run_pair(Arc::new(SpinBoundedBuffer::with_backends(args.capacity)), args, |buffer, item| {
            buffer.put(item);
            info!("Inserted {}, number of elements now: {}", item, buffer.len());
        }),
        Variant::Priority => run_pair(Arc::new(PriorityBoundedBuffer::with_backends(args.capacity)), args, |buffer, item| {
            let priority = rand::thread_rng().gen_range(0..=9);
            buffer.put_with_priority(item, priority);
            info!("Inserted {} (priority: {}), number of elements now: {}", item, priority, buffer.len());
        }),
    }
}

fn run_pair<S, R>(
    buffer: Arc<BoundedBuffer<u64, S, R>>,
    args: &BufferArgs,
    put: impl Fn(&BoundedBuffer<u64, S, R>, u64) + Send + 'static,
) where
    S: Semaphore + 'static,
    R: RawMutex + Send + Sync + 'static,
{
    let limit = args.items.unwrap_or(u64::MAX);
    let producer_delay = Duration::from_millis(args.producer_delay_ms);
    let consumer_delay = Duration::from_millis(args.consumer_delay_ms);

    let producer_buffer = Arc::clone(&buffer);
    let producer = thread::spawn(move || {
        for item in 0..limit {
            put(&*producer_buffer, item);
            check_outstanding(&producer_buffer);
            thread::sleep(producer_delay);
        }
    });

    let consumer_buffer = Arc::clone(&buffer);
    let consumer = thread::spawn(move || {
        for _ in 0..limit {
            let item = consumer_buffer.get();
            check_outstanding(&consumer_buffer);
            info!("Removed {}, number of elements now: {}", item, consumer_buffer.len());
            thread::sleep(consumer_delay);
        }
    });

    join_all(vec![producer, consumer]);
}

fn check_outstanding<S: Semaphore, R: RawMutex>(buffer: &BoundedBuffer<u64, S, R>) {
    if buffer.len() > buffer.num_slots() {
        error!("Maximum number of elements exceeded (should not happen)!");
        std::process::exit(-1);
    }
}

fn run_schedulers(timeslice: u32) {
    let schedulers: Vec<Box<dyn Scheduler>> = vec![
        Box::new(scheduler::FirstComeFirstServed::default()),
        Box::new(scheduler::ShortestJobFirst::default()),
        Box::new(scheduler::CoopPriority::default()),
        Box::new(scheduler::RoundRobin::new(timeslice)),
        Box::new(scheduler::ShortestRemainingTimeFirst::new(timeslice)),
        Box::new(scheduler::PreemptivePriority::new(timeslice)),
        Box::new(scheduler::CompletelyFair::new(timeslice)),
    ];

    for mut policy in schedulers {
        for process in [
            Process::new(0, 10, 1),
            Process::new(1, 20, 3),
            Process::new(2, 30, 2),
            Process::new(3, 10, 3),
            Process::new(4, 1, 1),
        ] {
            policy.add_process(process);
        }

        info!("Scheduler: {}", policy.name());
        for slice in scheduler::run_to_completion(policy.as_mut()) {
            info!(
                "Scheduling process {} for {} time units, remaining process time: {}, virtual time: {:.4}.",
                slice.pid, slice.scheduled_time, slice.remaining_time, slice.virtual_time
            );
        }
    }
}

fn run_ordered_threads(delay: Duration) {
    let batons: Arc<[MonitorSemaphore; 3]> = Arc::new([
        MonitorSemaphore::new(0),
        MonitorSemaphore::new(0),
        MonitorSemaphore::new(0),
    ]);
    let labels = ["first", "second", "third", "fourth"];

    // spawned last-to-first, each one waits for the baton of its predecessor
    let handles = (0..labels.len())
        .rev()
        .map(|position| {
            let batons = Arc::clone(&batons);
            let label = labels[position];
            thread::spawn(move || {
                if position > 0 {
                    batons[position - 1].acquire();
                }
                thread::sleep(delay);
                info!("This should execute {}.", label);
                if position < batons.len() {
                    batons[position].release();
                }
            })
        })
        .collect();

    join_all(handles);
}

fn join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        if handle.join().is_err() {
            error!("worker thread panicked");
        }
    }
}
