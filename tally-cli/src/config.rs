use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tally_core::{Calendar, EpochUnit};
use tally_report::View;

use crate::state::ensure_tally_home;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiSection,
    pub refresh: RefreshSection,
    pub calendar: CalendarSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub base_url: String,
    pub timeout_secs: u64,
    /// Unit of `created_at`; unset means guess from magnitude
    pub epoch_unit: Option<EpochUnit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSection {
    pub today_minutes: u64,
    pub daily_minutes: u64,
    pub monthly_minutes: u64,
    pub yearly_minutes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarSection {
    /// IANA zone name used for every date and hour
    pub timezone: String,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            timeout_secs: 30,
            epoch_unit: None,
        }
    }
}

impl Default for RefreshSection {
    fn default() -> Self {
        Self {
            today_minutes: 5,
            daily_minutes: 10,
            monthly_minutes: 15,
            yearly_minutes: 15,
        }
    }
}

impl Default for CalendarSection {
    fn default() -> Self {
        Self {
            timezone: "UTC".to_string(),
        }
    }
}

impl ApiSection {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

impl RefreshSection {
    pub fn interval(&self, view: View) -> Duration {
        let minutes = match view {
            View::Today => self.today_minutes,
            View::Daily => self.daily_minutes,
            View::Monthly => self.monthly_minutes,
            View::Yearly => self.yearly_minutes,
        };
        Duration::from_secs(minutes.max(1) * 60)
    }
}

impl Config {
    pub fn calendar(&self) -> Result<Calendar> {
        Calendar::from_name(&self.calendar.timezone)
            .with_context(|| format!("calendar.timezone = {:?}", self.calendar.timezone))
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_tally_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(p: &Path) -> Result<Config> {
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).with_context(|| format!("parse {}", p.display()))
}

pub fn save_config_to(cfg: &Config, p: &Path) -> Result<()> {
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

/// Print `cfg` as TOML under a header naming where it lives.
pub fn show_config(out: &mut impl Write, path: &Path, cfg: &Config) -> Result<()> {
    writeln!(out, "# {}\n", path.display())?;
    write!(out, "{}", toml::to_string_pretty(cfg).context("serialize config")?)?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config_to(&Config::default(), &p)?;
    println!("Wrote {}", p.display());
    Ok(())
}
