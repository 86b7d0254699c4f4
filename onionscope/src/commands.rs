use crate::CLAP_STYLING;
use clap::{arg, command};
use std::path::PathBuf;
use url::Url;

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("onionscope")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("onionscope")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .subcommand_required(false)
        .subcommand(
            command!("init")
                .about("Writes a default config, keyword table and example categories")
                .arg(
                    arg!([PATH])
                        .required(false)
                        .help("Configuration directory")
                        .default_value("~/.config/onionscope/"),
                )
                .arg(
                    arg!(-f --"force")
                        .help("Overwrite existing configuration files without asking")
                        .required(false),
                ),
        )
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl onion services breadth-first, classify every page and record \
                alerts.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("A single onion URL to start from")
                        .value_parser(clap::value_parser!(Url))
                        .conflicts_with("seeds-file"),
                )
                .arg(
                    arg!(-s --"seeds-file" <PATH>)
                        .required(false)
                        .help("Text or CSV file of onion URLs to start from")
                        .value_parser(clap::value_parser!(PathBuf))
                        .conflicts_with("url"),
                )
                .arg(
                    arg!(-c --"config" <PATH>)
                        .required(false)
                        .help("Crawl configuration (default: ~/.config/onionscope/config.json)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-m --"max-pages" <NUM>)
                        .required(false)
                        .help("Stop after this many pages")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(-d --"max-depth" <NUM>)
                        .required(false)
                        .help("Do not follow links below this depth")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(-r --"rotation-threshold" <NUM>)
                        .required(false)
                        .help("Request a new identity after this many requests")
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(
                    arg!(--"delay" <SECONDS>)
                        .required(false)
                        .help("Pause between requests")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    arg!(-a --"alert-threshold" <PERCENT>)
                        .required(false)
                        .help("Minimum confidence (0-100) for a classification to raise an alert")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    arg!(--"categories" <NAMES>)
                        .required(false)
                        .help("Comma-separated categories to classify (default: all)")
                        .value_delimiter(','),
                )
                .arg(
                    arg!(-k --"keywords" <PATH>)
                        .required(false)
                        .help("Keyword table CSV (default: bundled table)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"custom-categories" <PATH>)
                        .required(false)
                        .help("JSON file of extra or overriding categories")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(-o --"output-dir" <PATH>)
                        .required(false)
                        .help("Where page checkpoints, alerts and summaries are written"),
                )
                .arg(
                    arg!(--"proxy" <URL>)
                        .required(false)
                        .help("SOCKS proxy of the anonymity layer (default: socks5h://127.0.0.1:9050)")
                        .conflicts_with("direct"),
                )
                .arg(
                    arg!(--"control-port" <PORT>)
                        .required(false)
                        .help("Control port used for identity rotation")
                        .value_parser(clap::value_parser!(u16)),
                )
                .arg(
                    arg!(--"direct")
                        .required(false)
                        .help("Connect without the SOCKS proxy (local test servers only)")
                        .action(clap::ArgAction::SetTrue)
                        .conflicts_with("proxy"),
                ),
        )
        .subcommand(
            command!("alerts")
                .about("Query a session's alert log")
                .arg(
                    arg!(-f --"file" <PATH>)
                        .required(true)
                        .help("Alert log (alerts_<session>.jsonl)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"category" <NAME>)
                        .required(false)
                        .help("Only alerts for this category"),
                )
                .arg(
                    arg!(--"min-severity" <LEVEL>)
                        .required(false)
                        .help("Only alerts at or above this severity (1-5)")
                        .value_parser(clap::value_parser!(u8).range(1..=5)),
                )
                .arg(
                    arg!(-l --"limit" <NUM>)
                        .required(false)
                        .help("Show at most this many alerts, newest first")
                        .value_parser(clap::value_parser!(usize)),
                ),
        )
        .subcommand(
            command!("config")
                .about("Change stored crawl settings, or show them when no change is given")
                .arg(
                    arg!(-c --"config" <PATH>)
                        .required(false)
                        .help("Config file to edit (default: ~/.config/onionscope/config.json)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"set-depth" <NUM>)
                        .required(false)
                        .help("Store the maximum crawl depth")
                        .value_parser(clap::value_parser!(usize)),
                )
                .arg(
                    arg!(--"set-rotation" <NUM>)
                        .required(false)
                        .help("Store the number of requests per identity")
                        .value_parser(clap::value_parser!(u32).range(1..)),
                )
                .arg(
                    arg!(--"set-scan-frequency" <SECONDS>)
                        .required(false)
                        .help("Store the pause between requests")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    arg!(--"enable-category" <NAME>)
                        .required(false)
                        .help("Enable a category (repeatable)")
                        .action(clap::ArgAction::Append),
                )
                .arg(
                    arg!(--"disable-category" <NAME>)
                        .required(false)
                        .help("Disable a category (repeatable)")
                        .action(clap::ArgAction::Append),
                )
                .arg(
                    arg!(--"import-seeds" <PATH>)
                        .required(false)
                        .help("Add the onion URLs of a text or CSV file to the stored seeds")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            command!("categories")
                .about("List known categories with their severity")
                .arg(
                    arg!(-k --"keywords" <PATH>)
                        .required(false)
                        .help("Keyword table CSV (default: bundled table)")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"custom-categories" <PATH>)
                        .required(false)
                        .help("JSON file of extra or overriding categories")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_tree_is_consistent() {
        command_argument_builder().debug_assert();
    }

    #[test]
    fn test_crawl_overrides_parse() {
        let matches = command_argument_builder()
            .try_get_matches_from([
                "onionscope",
                "crawl",
                "--url",
                "http://abc.onion",
                "--max-pages",
                "5",
                "--categories",
                "Drugs,Weapons",
                "--direct",
            ])
            .unwrap();
        let (name, crawl) = matches.subcommand().unwrap();
        assert_eq!(name, "crawl");
        assert_eq!(crawl.get_one::<usize>("max-pages"), Some(&5));
        let categories: Vec<&String> = crawl.get_many::<String>("categories").unwrap().collect();
        assert_eq!(categories, vec!["Drugs", "Weapons"]);
        assert!(crawl.get_flag("direct"));
    }

    #[test]
    fn test_config_edits_parse() {
        let matches = command_argument_builder()
            .try_get_matches_from([
                "onionscope",
                "config",
                "--set-depth",
                "4",
                "--disable-category",
                "Drugs",
                "--disable-category",
                "Weapons",
            ])
            .unwrap();
        let (name, config) = matches.subcommand().unwrap();
        assert_eq!(name, "config");
        assert_eq!(config.get_one::<usize>("set-depth"), Some(&4));
        let disabled: Vec<&String> = config.get_many::<String>("disable-category").unwrap().collect();
        assert_eq!(disabled, vec!["Drugs", "Weapons"]);
    }

    #[test]
    fn test_zero_rotation_rejected() {
        let result = command_argument_builder().try_get_matches_from([
            "onionscope",
            "config",
            "--set-rotation",
            "0",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_url_and_seeds_file_conflict() {
        let result = command_argument_builder().try_get_matches_from([
            "onionscope",
            "crawl",
            "--url",
            "http://abc.onion",
            "--seeds-file",
            "seeds.txt",
        ]);
        assert!(result.is_err());
    }
}
