//! Jobmill CLI - demo driver for the job manager.
//!
//! Schedules a batch of worker jobs alongside a periodic heartbeat, waits
//! for the workers with a filter, and shuts the manager down.

use clap::Parser;
use jobmill::{filter, JobInput, JobManager, JobManagerConfig};
use std::process;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "jobmill")]
#[command(version = jobmill::VERSION)]
#[command(about = "Run a demo batch of jobs through the jobmill manager", long_about = None)]
struct Args {
    /// Number of worker jobs to schedule
    #[arg(long, default_value = "8")]
    jobs: usize,

    /// Simulated work duration per job in milliseconds
    #[arg(long, default_value = "250")]
    work_ms: u64,

    /// Heartbeat period in milliseconds
    #[arg(long, default_value = "100")]
    heartbeat_ms: u64,

    /// Maximum number of concurrently executing jobs
    #[arg(long, default_value = "4")]
    workers: usize,

    /// Overall wait timeout in seconds
    #[arg(long, default_value = "30")]
    timeout_secs: u64,

    /// Directory for the log file
    #[arg(long, default_value = "logs")]
    log_dir: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if args.jobs == 0 {
        eprintln!("Error: --jobs must be at least 1");
        process::exit(1);
    }
    if args.workers == 0 {
        eprintln!("Error: --workers must be at least 1");
        process::exit(1);
    }

    let _logging = match jobmill::logging::init(&args.log_dir, "jobmill.log") {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error initializing logging: {}", e);
            process::exit(1);
        }
    };

    println!("jobmill v{}", jobmill::VERSION);
    println!(
        "  Jobs: {} ({}ms each), worker limit: {}",
        args.jobs, args.work_ms, args.workers
    );
    println!("  Heartbeat: every {}ms", args.heartbeat_ms);
    println!();

    let manager = JobManager::with_config(JobManagerConfig {
        worker_limit: args.workers,
    });

    // Periodic heartbeat, independent of the worker batch.
    let heartbeat = manager.schedule_at_fixed_rate(
        JobInput::new("heartbeat", "Heartbeat").with_hint("demo"),
        Duration::ZERO,
        Duration::from_millis(args.heartbeat_ms),
        |ctx| async move {
            tracing::info!(job_id = %ctx.future().id(), "Heartbeat tick");
            Ok(())
        },
    );
    let heartbeat = match heartbeat {
        Ok(future) => future,
        Err(e) => {
            eprintln!("Error scheduling heartbeat: {}", e);
            process::exit(1);
        }
    };

    let work = Duration::from_millis(args.work_ms);
    for i in 0..args.jobs {
        let result = manager.schedule(
            JobInput::new(format!("worker-{}", i), "Worker").with_hint("demo"),
            move |ctx| async move {
                tracing::info!(job_id = %ctx.future().id(), "Worker starting");
                ctx.sleep(work).await?;
                Ok(())
            },
        );
        if let Err(e) = result {
            eprintln!("Error scheduling worker {}: {}", i, e);
            process::exit(1);
        }
    }

    println!("Waiting for {} workers...", args.jobs);
    let start = std::time::Instant::now();

    let done = manager
        .wait_until_done(
            filter::named("Worker"),
            Duration::from_secs(args.timeout_secs),
        )
        .await;

    if !done {
        eprintln!(
            "Error: workers did not finish within {}s ({} still active)",
            args.timeout_secs,
            manager.futures(filter::named("Worker")).len()
        );
        manager.shutdown();
        process::exit(1);
    }

    println!(
        "All workers finished in {:.2}s",
        start.elapsed().as_secs_f64()
    );

    heartbeat.cancel(true);
    manager.shutdown();
    let _ = manager
        .wait_until_done(filter::always(), Duration::from_secs(5))
        .await;

    println!("Shutdown complete.");
}
