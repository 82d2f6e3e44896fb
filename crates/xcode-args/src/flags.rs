//! Build flag override parser
//!
//! User build flags come in two shapes:
//! - Option pairs with a space-separated value: `-scheme MyScheme`
//! - Build settings in a single token: `CONFIGURATION_BUILD_DIR=/some/dir`
//!
//! Nine of them replace a computed default in the composed argument list.
//! Anything else is kept as a pass-through "other flag".

use serde::{Deserialize, Serialize};

/// Flags with a computed default and a fixed position in the argument list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownFlag {
    Xcconfig,
    Workspace,
    Scheme,
    Configuration,
    Sdk,
    Destination,
    ArchivePath,
    ConfigurationBuildDir,
    SharedPrecompsDir,
}

impl KnownFlag {
    /// The flag as it appears on the xcodebuild command line
    pub fn as_str(self) -> &'static str {
        match self {
            KnownFlag::Xcconfig => "-xcconfig",
            KnownFlag::Workspace => "-workspace",
            KnownFlag::Scheme => "-scheme",
            KnownFlag::Configuration => "-configuration",
            KnownFlag::Sdk => "-sdk",
            KnownFlag::Destination => "-destination",
            KnownFlag::ArchivePath => "-archivePath",
            KnownFlag::ConfigurationBuildDir => "CONFIGURATION_BUILD_DIR",
            KnownFlag::SharedPrecompsDir => "SHARED_PRECOMPS_DIR",
        }
    }
}

/// How a known flag is recognized in a token
#[derive(Debug, Clone, Copy)]
enum Marker {
    /// `-flag value`; the override is the value
    Option(&'static str),
    /// `KEY=value`; the override is the whole token
    Setting(&'static str),
}

/// Matchers evaluated in order, first match wins
const MATCHERS: &[(KnownFlag, Marker)] = &[
    (KnownFlag::Xcconfig, Marker::Option("-xcconfig")),
    (KnownFlag::Workspace, Marker::Option("-workspace")),
    (KnownFlag::Scheme, Marker::Option("-scheme")),
    (KnownFlag::Configuration, Marker::Option("-configuration")),
    (KnownFlag::Sdk, Marker::Option("-sdk")),
    (KnownFlag::Destination, Marker::Option("-destination")),
    (KnownFlag::ArchivePath, Marker::Option("-archivePath")),
    (
        KnownFlag::ConfigurationBuildDir,
        Marker::Setting("CONFIGURATION_BUILD_DIR="),
    ),
    (
        KnownFlag::SharedPrecompsDir,
        Marker::Setting("SHARED_PRECOMPS_DIR="),
    ),
];

/// What a matcher extracted from a token
enum Matched {
    Value(String),
    Empty,
}

impl Marker {
    fn apply(self, token: &str) -> Option<Matched> {
        match self {
            Marker::Option(flag) => {
                let rest = token.strip_prefix(flag)?;
                // `-sdkfoo` is some other flag, not `-sdk foo`
                if !rest.is_empty() && !rest.starts_with(char::is_whitespace) {
                    return None;
                }
                let value = rest.trim();
                if value.is_empty() {
                    Some(Matched::Empty)
                } else {
                    Some(Matched::Value(value.to_string()))
                }
            }
            Marker::Setting(prefix) => token
                .starts_with(prefix)
                .then(|| Matched::Value(token.to_string())),
        }
    }
}

/// User build flags: absent, one string, or an ordered list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BuildFlags {
    Single(String),
    Multiple(Vec<String>),
}

impl BuildFlags {
    /// Iterate the entries in the order given
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        let entries: &[String] = match self {
            BuildFlags::Single(flag) => std::slice::from_ref(flag),
            BuildFlags::Multiple(flags) => flags,
        };
        entries.iter().map(String::as_str)
    }
}

impl From<&str> for BuildFlags {
    fn from(flag: &str) -> Self {
        BuildFlags::Single(flag.to_string())
    }
}

impl From<String> for BuildFlags {
    fn from(flag: String) -> Self {
        BuildFlags::Single(flag)
    }
}

impl From<Vec<String>> for BuildFlags {
    fn from(flags: Vec<String>) -> Self {
        BuildFlags::Multiple(flags)
    }
}

impl From<&[&str]> for BuildFlags {
    fn from(flags: &[&str]) -> Self {
        BuildFlags::Multiple(flags.iter().map(|f| f.to_string()).collect())
    }
}

/// Accumulated overrides from user build flags
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlagOverrides {
    pub xcconfig: Option<String>,
    pub workspace: Option<String>,
    pub scheme: Option<String>,
    pub configuration: Option<String>,
    pub sdk: Option<String>,
    pub destination: Option<String>,
    pub archive_path: Option<String>,
    /// Whole `CONFIGURATION_BUILD_DIR=...` token
    pub configuration_build_dir: Option<String>,
    /// Whole `SHARED_PRECOMPS_DIR=...` token
    pub shared_precomps_dir: Option<String>,
    /// Unrecognized tokens in input order
    pub other_flags: Vec<String>,
}

impl FlagOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every entry of `flags` in order into one set of overrides.
    ///
    /// Later entries replace earlier ones for the same known flag; other
    /// flags accumulate across all entries.
    pub fn from_build_flags(flags: Option<&BuildFlags>) -> Self {
        let mut overrides = Self::new();
        for token in flags.into_iter().flat_map(|flags| flags.iter()) {
            parse_flag_token(token, &mut overrides);
        }
        overrides
    }

    /// Override for a known flag, if one was given
    pub fn get(&self, flag: KnownFlag) -> Option<&str> {
        self.slot(flag).as_deref()
    }

    fn slot(&self, flag: KnownFlag) -> &Option<String> {
        match flag {
            KnownFlag::Xcconfig => &self.xcconfig,
            KnownFlag::Workspace => &self.workspace,
            KnownFlag::Scheme => &self.scheme,
            KnownFlag::Configuration => &self.configuration,
            KnownFlag::Sdk => &self.sdk,
            KnownFlag::Destination => &self.destination,
            KnownFlag::ArchivePath => &self.archive_path,
            KnownFlag::ConfigurationBuildDir => &self.configuration_build_dir,
            KnownFlag::SharedPrecompsDir => &self.shared_precomps_dir,
        }
    }

    fn slot_mut(&mut self, flag: KnownFlag) -> &mut Option<String> {
        match flag {
            KnownFlag::Xcconfig => &mut self.xcconfig,
            KnownFlag::Workspace => &mut self.workspace,
            KnownFlag::Scheme => &mut self.scheme,
            KnownFlag::Configuration => &mut self.configuration,
            KnownFlag::Sdk => &mut self.sdk,
            KnownFlag::Destination => &mut self.destination,
            KnownFlag::ArchivePath => &mut self.archive_path,
            KnownFlag::ConfigurationBuildDir => &mut self.configuration_build_dir,
            KnownFlag::SharedPrecompsDir => &mut self.shared_precomps_dir,
        }
    }

    /// True if no flag of any kind was recorded
    pub fn is_empty(&self) -> bool {
        MATCHERS.iter().all(|(flag, _)| self.get(*flag).is_none()) && self.other_flags.is_empty()
    }
}

/// Parse a single build flag token into `overrides`.
///
/// Never fails: anything that is not one of the known flags is kept as a
/// pass-through flag. Option-style tokens (`-flag value`) are split once on
/// whitespace into two tokens, unless the value is a quoted setting such as
/// `-key="a b"`. Build settings (`KEY=value`) are kept verbatim.
pub fn parse_flag_token(token: &str, overrides: &mut FlagOverrides) {
    for (flag, marker) in MATCHERS {
        match marker.apply(token) {
            Some(Matched::Value(value)) => {
                log::warn!("Overriding xcodebuild arg: {}", token);
                *overrides.slot_mut(*flag) = Some(value);
                return;
            }
            Some(Matched::Empty) => {
                log::debug!("Ignoring {} without a value", flag.as_str());
                return;
            }
            None => {}
        }
    }

    if token.starts_with('-') && !is_quoted_setting(token) {
        if let Some((name, value)) = token.split_once(char::is_whitespace) {
            overrides.other_flags.push(name.to_string());
            overrides.other_flags.push(value.to_string());
            return;
        }
    }

    overrides.other_flags.push(token.to_string());
}

/// `key="quoted value"` or `key='quoted value'`
fn is_quoted_setting(token: &str) -> bool {
    let Some((_, value)) = token.split_once('=') else {
        return false;
    };
    value.len() >= 2
        && ((value.starts_with('"') && value.ends_with('"'))
            || (value.starts_with('\'') && value.ends_with('\'')))
}
