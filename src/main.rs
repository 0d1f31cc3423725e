use dramawatch::{Config, run};

fn main() -> anyhow::Result<()> {
    // Config is read again inside `run`; here it only sizes the runtime.
    let worker_threads = Config::load()?.general.worker_threads;

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all().thread_name("dramawatch-worker");

    if worker_threads > 0 {
        builder.worker_threads(worker_threads);
    }

    builder.build()?.block_on(run())
}
