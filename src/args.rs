use clap::Parser;
use sift_page::Strategy;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "sift-page")]
#[command(about = "Extracts structured content sections from a single web page")]
#[command(version)]
pub struct Args {
    /// Page URL to scrape (scheme defaults to https)
    pub url: String,

    /// Always render the page in a browser
    #[arg(long, conflicts_with = "static_only")]
    pub use_js: bool,

    /// Never start a browser, even for thin pages
    #[arg(long)]
    pub static_only: bool,

    /// Maximum number of pages to visit when following pagination
    #[arg(short = 'd', long, value_parser = clap::value_parser!(u8).range(1..=5))]
    pub max_depth: Option<u8>,

    /// JSON configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(short, long)]
    pub pretty: bool,
}

impl Args {
    pub fn strategy(&self) -> Strategy {
        if self.static_only {
            Strategy::StaticOnly
        } else {
            Strategy::from_force_dynamic(Some(self.use_js))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["sift-page", "example.com"]).unwrap();
        assert_eq!(args.url, "example.com");
        assert_eq!(args.strategy(), Strategy::Auto);
        assert_eq!(args.max_depth, None);
        assert!(!args.pretty);
    }

    #[test]
    fn test_strategy_flags() {
        let args = Args::try_parse_from(["sift-page", "--use-js", "example.com"]).unwrap();
        assert_eq!(args.strategy(), Strategy::JsOnly);

        let args = Args::try_parse_from(["sift-page", "--static-only", "example.com"]).unwrap();
        assert_eq!(args.strategy(), Strategy::StaticOnly);

        assert!(
            Args::try_parse_from(["sift-page", "--use-js", "--static-only", "example.com"])
                .is_err()
        );
    }

    #[test]
    fn test_max_depth_range() {
        let args = Args::try_parse_from(["sift-page", "-d", "5", "example.com"]).unwrap();
        assert_eq!(args.max_depth, Some(5));
        assert!(Args::try_parse_from(["sift-page", "-d", "0", "example.com"]).is_err());
        assert!(Args::try_parse_from(["sift-page", "--max-depth", "6", "example.com"]).is_err());
    }
}
