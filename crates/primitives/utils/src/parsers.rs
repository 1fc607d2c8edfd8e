use anyhow::{bail, Context};
use std::time::Duration;
use url::Url;

/// Parses a string duration with a unit suffix: `100ms`, `15s`, `5min`, `2h`.
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).with_context(|| format!("missing unit in duration `{s}`"))?;
    let (digits, unit) = s.split_at(split);
    let value: u64 = digits.parse().with_context(|| format!("invalid number in duration `{s}`"))?;
    match unit.trim() {
        "ms" => Ok(Duration::from_millis(value)),
        "s" => Ok(Duration::from_secs(value)),
        "min" => Ok(Duration::from_secs(value * 60)),
        "h" => Ok(Duration::from_secs(value * 3600)),
        _ => bail!("unknown duration unit `{unit}` in `{s}`"),
    }
}

/// Parses a URL, requiring an http(s) scheme.
pub fn parse_url(s: &str) -> anyhow::Result<Url> {
    let url = Url::parse(s).with_context(|| format!("invalid url `{s}`"))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        bail!("unsupported url scheme `{}` in `{s}`", url.scheme());
    }
    Ok(url)
}
