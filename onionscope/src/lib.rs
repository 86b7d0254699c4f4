// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    ConfigEdits, CrawlOverrides, build_classifier, create_configuration_assets, load_crawl_config,
    load_urls_from_file, load_urls_from_source, parse_url_line,
};

// Re-export report helpers from onionscope-core
pub use onionscope_core::report::{extract_url_path, generate_crawl_report};
