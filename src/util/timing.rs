use std::future::Future;
use std::time::{Duration, SystemTime};
use tracing::{debug, info};

/// Run an async operation and log how long it took.
///
/// `trace_log_fn` renders extra details about a successful result.
pub async fn measure_dur_async<F, Fut, T, E>(
    metric_name: &str,
    operation: F,
    trace_log_fn: Option<fn(&T) -> String>,
) -> Result<T, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let start = SystemTime::now();
    let result = operation().await;
    let dur = start.elapsed().unwrap_or_else(|_| Duration::from_millis(0));
    match &result {
        Ok(r) => {
            let log_line = trace_log_fn.map(|f| f(r)).unwrap_or_default();
            info!("{} | {}, took={}", metric_name, log_line, dur.as_millis());
        }
        Err(e) => debug!("{} | failed: {}, took={}", metric_name, e, dur.as_millis()),
    }
    result
}
