pub mod alerts;
pub mod checkpoint;
pub mod classifier;
pub mod config;
pub mod crawl;
pub mod error;
pub mod keywords;
pub mod report;
pub mod similarity;

mod jsonl;

use colored::Colorize;

pub use alerts::{Alert, AlertLog, AlertStats};
pub use checkpoint::CheckpointStore;
pub use classifier::{CategoryClassifier, CategoryInfo, CategoryRule};
pub use config::CrawlConfig;
pub use crawl::{CrawlOptions, CrawlProgressCallback, CrawlSession, SessionFiles};
pub use error::{CrawlError, LoadError, PersistenceError};
pub use keywords::{KeywordMatch, KeywordMatcher, KeywordTable};
pub use report::CrawlSummary;

pub fn print_banner() {
    let banner = r#"
   ____        _
  / __ \____  (_)___  ____  ______________  ____  ___
 / / / / __ \/ / __ \/ __ \/ ___/ ___/ __ \/ __ \/ _ \
/ /_/ / / / / / /_/ / / / (__  ) /__/ /_/ / /_/ /  __/
\____/_/ /_/_/\____/_/ /_/____/\___/\____/ .___/\___/
                                        /_/
"#;
    println!("{}", banner.bright_magenta().bold());
    println!(
        "  {} {}\n",
        "onion-service crawler and classifier".bright_white(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
