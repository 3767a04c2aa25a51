//! Shared test helpers: logging setup and structured assertion macros.

/// Initializes tracing for tests if not already done.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_test_writer()
        .try_init();
}

/// Phase tracking macro for structured test logging.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(test = $name, "=== TEST START ===");
    };
}

/// Section marker within a multi-phase test.
#[macro_export]
macro_rules! test_section {
    ($name:expr) => {
        tracing::info!(section = $name, "--- section ---");
    };
}

/// Completion marker paired with `test_phase!`, with optional summary fields.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = $name, "=== TEST COMPLETE ===");
    };
    ($name:expr, $($field:ident = $value:expr),+ $(,)?) => {
        tracing::info!(test = $name, $($field = $value,)+ "=== TEST COMPLETE ===");
    };
}

/// Assertion with logging for better test output.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        if !$cond {
            tracing::error!(
                message = $msg,
                expected = ?$expected,
                actual = ?$actual,
                "Assertion failed"
            );
        }
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}
