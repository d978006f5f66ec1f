//! Panic hook for crash reporting

use backtrace::Backtrace;
use chrono::Local;
use std::panic::PanicHookInfo;

/// Initialize the panic hook for crash reporting
pub fn init_panic_hook() {
    std::panic::set_hook(Box::new(panic_handler));
    tracing::debug!("Panic hook initialized");
}

fn panic_payload(info: &PanicHookInfo) -> String {
    let payload = info.payload();
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "<unknown>".to_string())
}

fn crash_report(info: &PanicHookInfo, backtrace: &Backtrace) -> String {
    let thread = std::thread::current();

    format!(
        "=== CRITICAL PANIC ===\n\
         Timestamp: {}\n\
         Thread: {}\n\
         Location: {:?}\n\
         Payload: {}\n\n\
         Stack Trace:\n{:?}",
        Local::now().to_rfc3339(),
        thread.name().unwrap_or("<unnamed>"),
        info.location(),
        panic_payload(info),
        backtrace
    )
}

fn panic_handler(info: &PanicHookInfo) {
    let report = crash_report(info, &Backtrace::new());

    // stderr first: the subscriber may already be gone
    eprintln!("{}", report);
    tracing::error!("{}", report);

    let dump_path = std::env::temp_dir().join(format!(
        "photo_widget_crash_{}.txt",
        Local::now().format("%Y%m%d_%H%M%S")
    ));

    if let Err(e) = std::fs::write(&dump_path, &report) {
        eprintln!("Failed to write crash dump: {}", e);
    }
}
