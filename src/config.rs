//! Engine configuration: crisp term tables and status bands per channel.
//!
//! Sprinkler and alarm are fixed. The auxiliary channel carries its own name and
//! terms, which is how one engine serves both the ventilation and the
//! evacuation variants of the controller.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::terms::{Channel, CrispTable, StatusBands};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    pub terms: CrispTable,
    pub bands: StatusBands,
}

impl ChannelConfig {
    pub fn new(name: impl Into<String>, terms: CrispTable, bands: StatusBands) -> Self {
        Self {
            name: name.into(),
            terms,
            bands,
        }
    }

    pub fn sprinkler() -> Self {
        Self::new("sprinkler", four_level_terms(), four_level_bands())
    }

    pub fn alarm() -> Self {
        let terms = CrispTable::new().with("off", 0.).with("warning", 0.5).with("on", 1.);
        let bands = StatusBands::new("on").below(0.25, "off").below(0.75, "warning");

        Self::new("alarm", terms, bands)
    }

    pub fn ventilation() -> Self {
        Self::new("ventilation", four_level_terms(), four_level_bands())
    }

    pub fn evacuation() -> Self {
        let terms = CrispTable::new().with("none", 0.).with("prepare", 0.5).with("immediate", 1.);
        let bands = StatusBands::new("immediate").below(0.25, "none").below(0.75, "prepare");

        Self::new("evacuation", terms, bands)
    }

    fn validate(&self) -> Result<()> {
        self.terms.validate(&self.name)?;
        self.bands.validate(&self.name)
    }
}

fn four_level_terms() -> CrispTable {
    CrispTable::new()
        .with("off", 0.)
        .with("low", 0.33)
        .with("medium", 0.66)
        .with("high", 1.)
}

fn four_level_bands() -> StatusBands {
    StatusBands::new("high")
        .below(0.25, "off")
        .below(0.5, "low")
        .below(0.75, "medium")
}

/// Immutable per-engine configuration, safe to share between threads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    sprinkler: ChannelConfig,
    alarm: ChannelConfig,
    auxiliary: ChannelConfig,
}

impl EngineConfig {
    pub fn new(sprinkler: ChannelConfig, alarm: ChannelConfig, auxiliary: ChannelConfig) -> Result<Self> {
        let this = Self {
            sprinkler,
            alarm,
            auxiliary,
        };

        this.validate()?;

        Ok(this)
    }

    /// Fire suppression with an evacuation channel (none/prepare/immediate)
    pub fn evacuation() -> Self {
        Self {
            sprinkler: ChannelConfig::sprinkler(),
            alarm: ChannelConfig::alarm(),
            auxiliary: ChannelConfig::evacuation(),
        }
    }

    /// Fire suppression with a ventilation channel (off/low/medium/high)
    pub fn ventilation() -> Self {
        Self {
            sprinkler: ChannelConfig::sprinkler(),
            alarm: ChannelConfig::alarm(),
            auxiliary: ChannelConfig::ventilation(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let this: Self = serde_json::from_str(json)?;

        this.validate()?;

        Ok(this)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&fs::read_to_string(path)?)
    }

    pub fn channel(&self, channel: Channel) -> &ChannelConfig {
        match channel {
            Channel::Sprinkler => &self.sprinkler,
            Channel::Alarm => &self.alarm,
            Channel::Auxiliary => &self.auxiliary,
        }
    }

    fn validate(&self) -> Result<()> {
        Channel::ALL.into_iter().try_for_each(|c| self.channel(c).validate())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::evacuation()
    }
}

#[test]
fn test_presets_are_valid() {
    for config in [EngineConfig::evacuation(), EngineConfig::ventilation()] {
        assert!(config.validate().is_ok());

        for channel in Channel::ALL {
            let (lo, hi) = config.channel(channel).terms.bounds().unwrap();
            assert!(0. <= lo && hi <= 1.);
        }
    }

    assert_eq!(EngineConfig::ventilation().channel(Channel::Auxiliary).name, "ventilation");
    assert_eq!(EngineConfig::default().channel(Channel::Auxiliary).name, "evacuation");
}

#[test]
fn test_config_from_json_rejects_bad_tables() {
    let json = serde_json::to_string(&EngineConfig::ventilation()).unwrap();
    let config = EngineConfig::from_json_str(&json).unwrap();

    assert_eq!(config, EngineConfig::ventilation());

    let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
    value["auxiliary"]["terms"]["turbo"] = serde_json::json!(2.0);

    let err = EngineConfig::from_json_str(&value.to_string()).unwrap_err();
    assert!(matches!(err, crate::error::Error::CrispOutOfRange { ref term, .. } if term == "turbo"));
}

#[test]
fn test_custom_channel_config() {
    let purge = ChannelConfig::new(
        "purge",
        CrispTable::new().with("idle", 0.).with("full", 1.),
        StatusBands::new("full").below(0.5, "idle"),
    );
    let config = EngineConfig::new(ChannelConfig::sprinkler(), ChannelConfig::alarm(), purge).unwrap();

    assert!(config.channel(Channel::Auxiliary).terms.contains("full"));

    let broken = ChannelConfig::new("purge", CrispTable::new(), StatusBands::new("full"));
    assert!(EngineConfig::new(ChannelConfig::sprinkler(), ChannelConfig::alarm(), broken).is_err());
}

#[test]
fn test_config_from_path() {
    let path = std::env::temp_dir().join(format!("fuzzy-suppression-config-{}.json", std::process::id()));

    fs::write(&path, serde_json::to_string(&EngineConfig::ventilation()).unwrap()).unwrap();
    let config = EngineConfig::from_path(&path);
    fs::remove_file(&path).unwrap();

    assert_eq!(config.unwrap(), EngineConfig::ventilation());

    let missing = std::env::temp_dir().join("fuzzy-suppression-no-such-config.json");
    assert!(matches!(EngineConfig::from_path(missing), Err(crate::error::Error::Io(_))));
}
