use std::path::PathBuf;
use structopt::StructOpt;

/// Multi-account check-in, farming and task automation for the Blum mini app
#[derive(StructOpt, Debug)]
#[structopt()]
pub struct Args {
    /// JSON array of Telegram query strings, one per account
    #[structopt(long, default_value = "query_ids.json", parse(from_os_str))]
    pub seeds: PathBuf,

    /// Bearer token cache, index-aligned with the seeds file
    #[structopt(long, default_value = "bearers.json", parse(from_os_str))]
    pub bearers: PathBuf,

    /// Run the farming cycles forever instead of showing the menu
    #[structopt(long)]
    pub unattended: bool,

    /// Re-authenticate every account at startup, ignoring cached bearers
    #[structopt(long)]
    pub fresh: bool,

    /// Timeout for a single HTTP request
    #[structopt(long, default_value = "10", parse(try_from_str = non_zero))]
    pub timeout_secs: u64,

    /// Delay between consecutive accounts within one action
    #[structopt(long, default_value = "500", parse(try_from_str = non_zero))]
    pub pacing_ms: u64,
}

fn non_zero(src: &str) -> Result<u64, String> {
    match src.parse::<u64>() {
        Ok(0) => Err("must be greater than zero".to_string()),
        Ok(value) => Ok(value),
        Err(err) => Err(err.to_string()),
    }
}

impl Args {
    pub fn parse_args() -> Self {
        Self::from_args()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply() {
        let args = Args::from_iter_safe(["blum-autofarm"]).unwrap();
        assert_eq!(args.timeout_secs, 10);
        assert_eq!(args.pacing_ms, 500);
        assert!(!args.unattended);
    }

    #[test]
    fn zero_timeout_and_pacing_are_rejected() {
        assert!(Args::from_iter_safe(["blum-autofarm", "--pacing-ms", "0"]).is_err());
        assert!(Args::from_iter_safe(["blum-autofarm", "--timeout-secs", "0"]).is_err());
        let args =
            Args::from_iter_safe(["blum-autofarm", "--pacing-ms", "900", "--timeout-secs", "3"])
                .unwrap();
        assert_eq!(args.pacing_ms, 900);
        assert_eq!(args.timeout_secs, 3);
    }
}
