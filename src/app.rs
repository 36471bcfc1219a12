use std::sync::Arc;

use anyhow::{Context, Result};

use crate::analytics;
use crate::catalog;
use crate::config;
use crate::controller;
use crate::storage;
use crate::trace;
use crate::ui;

pub fn run(start_location: Option<String>) -> Result<()> {
    let cfg = config::load(config::LoadOptions::default()).context("load config")?;
    let config_path = config::default_path();
    let display_path = friendly_path(config_path.as_ref());

    let mut status =
        "Browsing Dark Kokan. Press Enter to play, o to share, q to quit.".to_string();

    let catalog = match catalog::Catalog::load(cfg.catalog.path.as_deref()) {
        Ok(catalog) => catalog,
        Err(err) => {
            status = format!("Catalog file unusable ({err:#}); using built-in content.");
            let mut fallback = catalog::default_catalog();
            fallback.sanitize();
            fallback
        }
    };

    // Analytics is strictly optional: when the store cannot be opened the
    // controller runs with no collector and behaves identically.
    let mut collector: Option<Arc<analytics::StoreCollector>> = None;
    if cfg.analytics.enabled {
        match storage::Store::open(storage::Options {
            path: cfg.analytics.db_path.clone(),
        }) {
            Ok(store) => {
                let store = Arc::new(store);
                let cutoff = chrono::Utc::now() - chrono::Duration::days(90);
                if let Err(err) = store.prune_before(cutoff) {
                    trace::debug_log(format!("event prune failed: {err:#}"));
                }
                collector = Some(Arc::new(analytics::StoreCollector::new(store)));
            }
            Err(err) => {
                trace::debug_log(format!("analytics disabled: {err:#}"));
            }
        }
    }

    let settings = controller::Settings {
        tab_hide_delay: cfg.transitions.tab_hide,
        player_clear_delay: cfg.transitions.player_clear,
        card_count: catalog.videos.len(),
        analytics: collector
            .clone()
            .map(|c| c as Arc<dyn analytics::Collector>),
    };
    let start = start_location.unwrap_or_else(|| cfg.site.default_tab.clone());
    let controller = controller::Controller::new(settings, Some(&start));

    let options = ui::Options {
        status_message: status,
        catalog,
        controller,
        config_path: display_path,
    };

    let mut model = ui::Model::new(options);
    model.run()?;

    if let Some(collector) = collector {
        collector.close();
    }

    Ok(())
}

fn friendly_path(path: Option<&std::path::PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "~/.config/dark-kokan/config.yaml".to_string()
    }
}
