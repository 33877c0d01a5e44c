use tracing_subscriber::layer::SubscriberExt;
use tracing_wasm::{ConsoleConfig, WASMLayerConfigBuilder};
use wasm_bindgen_test::*;
use wellstore_core::{EngineError, IndexSpec, UpgradeHandler, VersionChange};

wasm_bindgen_test_configure!(run_in_browser);

pub fn setup() {
    console_error_panic_hook::set_once();

    let _ = tracing::subscriber::set_global_default(
        tracing_subscriber::registry::Registry::default().with(tracing_wasm::WASMLayer::new(
            WASMLayerConfigBuilder::new()
                .set_report_logs_in_timings(true)
                .set_console_config(ConsoleConfig::ReportWithoutConsoleColor)
                .set_max_level(tracing::Level::INFO)
                .build(),
        )),
    );
}

/// A database name no other test run uses.
pub fn db_name() -> String { format!("test_db_{}", (js_sys::Math::random() * 1e16) as u64) }

#[allow(unused)]
pub fn create_wellness() -> UpgradeHandler {
    Box::new(|tx: &mut dyn VersionChange| -> Result<(), EngineError> {
        tx.create_collection("emotions", "id")?;
        tx.create_index("emotions", &IndexSpec::new("userId", "userId"))?;
        tx.create_index("emotions", &IndexSpec::new("timestamp", "timestamp"))?;
        tx.create_collection("users", "id")?;
        tx.create_index("users", &IndexSpec::unique("email", "email"))?;
        Ok(())
    })
}

#[allow(unused)]
pub fn no_upgrade() -> UpgradeHandler {
    Box::new(|_: &mut dyn VersionChange| -> Result<(), EngineError> { Err(EngineError::Aborted("no upgrade expected".into())) })
}
