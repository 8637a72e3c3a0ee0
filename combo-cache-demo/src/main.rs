mod config;
mod error;
mod source;

use std::path::PathBuf;
use std::sync::Arc;

use combo_cache::fetch::SpawnedSource;
use combo_cache::CacheEvent;
use combo_cache::DataProviderController;
use combo_cache::Slot;
use log::info;
use simplelog::ColorChoice;
use simplelog::Config;
use simplelog::TermLogger;
use simplelog::TerminalMode;
use tokio::sync::mpsc;

use crate::config::DemoConfig;
use crate::error::DemoError;
use crate::source::SimulatedBackend;

/// Rows a widget would show at once.
const VISIBLE_ROWS: usize = 12;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), DemoError> {
    let path = std::env::args().nth(1).map(PathBuf::from);
    let config = DemoConfig::load(path.as_deref())?;

    TermLogger::init(
        config.level_filter(),
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )?;
    info!("config: {:?}", config);

    let controller = Arc::new(DataProviderController::new(config.controller.clone())?);
    let backend = SimulatedBackend::new(config.item_count, config.latency());
    controller.set_data_source(Arc::new(SpawnedSource::from_current(backend)?))?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    controller.subscribe(move |event| {
        let _ = tx.send(event.clone());
    });

    // Widget opens: first page, then the visible window.
    controller.load_first_page();
    wait_idle(&controller, &mut rx).await;
    controller.ensure_range_loaded(0..VISIBLE_ROWS);
    wait_idle(&controller, &mut rx).await;
    print_window(&controller, 0);

    // Scroll to the end while the user is already typing a filter.
    if let Some(size) = controller.size() {
        let start = size.saturating_sub(VISIBLE_ROWS);
        controller.ensure_range_loaded(start..size);
    }
    controller.set_filter(config.second_filter.clone());
    controller.load_first_page();
    wait_idle(&controller, &mut rx).await;
    controller.ensure_range_loaded(0..VISIBLE_ROWS);
    wait_idle(&controller, &mut rx).await;
    print_window(&controller, 0);

    controller.dispose();
    Ok(())
}

/// Drains events until nothing is in flight.
async fn wait_idle(
    controller: &DataProviderController<String>,
    rx: &mut mpsc::UnboundedReceiver<CacheEvent>,
) {
    while controller.is_loading() {
        match rx.recv().await {
            Some(CacheEvent::PageLoaded {
                page_index,
                size,
                first_since_clear,
            }) => info!(
                "page {} loaded (size {}{})",
                page_index,
                size,
                if first_since_clear { ", first" } else { "" }
            ),
            Some(CacheEvent::Cleared { generation }) => info!("cache cleared, {}", generation),
            Some(_) => {}
            None => break,
        }
    }
}

fn print_window(controller: &DataProviderController<String>, start: usize) {
    let size = controller.size().unwrap_or(0);
    println!(
        "filter {:?}: {} items, pages {:?}",
        controller.filter(),
        size,
        controller.loaded_pages()
    );
    for row in start..(start + VISIBLE_ROWS).min(size) {
        match controller.item(row) {
            Some(Slot::Loaded(label)) => println!("  {:>4}  {}", row, label),
            Some(Slot::Placeholder) | None => println!("  {:>4}  …", row),
        }
    }
}
