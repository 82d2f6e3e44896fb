//! Simulator device types and default target selection
//!
//! Device types come from `xcrun simctl list devicetypes -j`. When no target
//! is given for a simulator build, [`DEFAULT_SIMULATOR_NAME`] is preferred,
//! falling back to the first available iOS device type.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::runner::{RunError, ToolRunner};

/// Preferred simulator when none is requested
pub const DEFAULT_SIMULATOR_NAME: &str = "iPhone X";

/// Prefix stripped from device type identifiers to form `sim_identifier`
const DEVICE_TYPE_PREFIX: &str = "com.apple.CoreSimulator.SimDeviceType.";

/// Product families that can run an iOS app
const IOS_FAMILIES: &[&str] = &["iPhone", "iPad"];

/// Errors from simulator operations
#[derive(Debug, Error)]
pub enum SimulatorError {
    #[error("simctl command failed: {0}")]
    SimctlFailed(#[from] RunError),

    #[error("failed to parse simctl output: {0}")]
    ParseError(String),

    #[error("no iOS simulator device types available")]
    NoneAvailable,
}

/// Result type for simulator operations
pub type SimulatorResult<T> = Result<T, SimulatorError>;

/// A simulator device type that can be built for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatorTarget {
    /// Display name, e.g. "iPhone X"
    pub name: String,
    /// e.g. "com.apple.CoreSimulator.SimDeviceType.iPhone-X"
    pub identifier: String,
    /// e.g. "iPhone-X"
    pub sim_identifier: String,
}

impl SimulatorTarget {
    pub fn new(name: impl Into<String>, identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        let sim_identifier = identifier
            .strip_prefix(DEVICE_TYPE_PREFIX)
            .unwrap_or(&identifier)
            .to_string();

        Self {
            name: name.into(),
            identifier,
            sim_identifier,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimctlDeviceType {
    name: String,
    identifier: String,
    #[serde(default)]
    product_family: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SimctlDeviceTypes {
    devicetypes: Vec<SimctlDeviceType>,
}

/// Parse `simctl list devicetypes -j` output, keeping iOS device types.
///
/// Entries without a product family (older Xcode) are kept.
pub fn parse_device_types(json: &str) -> SimulatorResult<Vec<SimulatorTarget>> {
    let parsed: SimctlDeviceTypes = serde_json::from_str(json)
        .map_err(|e| SimulatorError::ParseError(format!("failed to parse device types: {}", e)))?;

    Ok(parsed
        .devicetypes
        .into_iter()
        .filter(|device| {
            device
                .product_family
                .as_deref()
                .map_or(true, |family| IOS_FAMILIES.contains(&family))
        })
        .map(|device| SimulatorTarget::new(device.name, device.identifier))
        .collect())
}

/// List the iOS simulator device types known to the installed Xcode.
pub fn list_device_types(runner: &dyn ToolRunner) -> SimulatorResult<Vec<SimulatorTarget>> {
    let args: Vec<String> = ["simctl", "list", "devicetypes", "-j"]
        .into_iter()
        .map(String::from)
        .collect();
    let stdout = runner.capture("xcrun", &args)?;
    parse_device_types(&stdout)
}

/// Pick the default simulator: the one named exactly
/// [`DEFAULT_SIMULATOR_NAME`], else the first one.
pub fn default_simulator_target(targets: &[SimulatorTarget]) -> Option<&SimulatorTarget> {
    targets
        .iter()
        .find(|target| target.name == DEFAULT_SIMULATOR_NAME)
        .or_else(|| targets.first())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target(name: &str, sim_identifier: &str) -> SimulatorTarget {
        SimulatorTarget::new(name, format!("{}{}", DEVICE_TYPE_PREFIX, sim_identifier))
    }

    #[test]
    fn test_default_is_iphone_x() {
        let targets = vec![
            target("iPhone 7", "iPhone-7"),
            target("iPhone 8", "iPhone-8"),
            target("iPhone X", "iPhone-X"),
        ];

        let selected = default_simulator_target(&targets).unwrap();
        assert_eq!(
            selected,
            &SimulatorTarget {
                name: "iPhone X".to_string(),
                identifier: "com.apple.CoreSimulator.SimDeviceType.iPhone-X".to_string(),
                sim_identifier: "iPhone-X".to_string(),
            }
        );
    }

    #[test]
    fn test_default_falls_back_to_first() {
        let targets = vec![target("iPhone 15", "iPhone-15"), target("iPad Air", "iPad-Air")];
        assert_eq!(default_simulator_target(&targets).unwrap().name, "iPhone 15");
    }

    #[test]
    fn test_default_requires_exact_name() {
        let targets = vec![target("iPhone 8", "iPhone-8"), target("iPhone XR", "iPhone-XR")];
        assert_eq!(default_simulator_target(&targets).unwrap().name, "iPhone 8");
    }

    #[test]
    fn test_default_empty() {
        assert!(default_simulator_target(&[]).is_none());
    }

    #[test]
    fn test_parse_device_types_filters_families() {
        let json = r#"{
            "devicetypes": [
                {"name": "iPhone X", "identifier": "com.apple.CoreSimulator.SimDeviceType.iPhone-X", "productFamily": "iPhone"},
                {"name": "Apple Watch Series 9 (45mm)", "identifier": "com.apple.CoreSimulator.SimDeviceType.Apple-Watch-Series-9-45mm", "productFamily": "Apple Watch"},
                {"name": "iPad Pro (11-inch)", "identifier": "com.apple.CoreSimulator.SimDeviceType.iPad-Pro--11-inch-", "productFamily": "iPad"},
                {"name": "iPhone 5s", "identifier": "com.apple.CoreSimulator.SimDeviceType.iPhone-5s"}
            ]
        }"#;

        let targets = parse_device_types(json).unwrap();
        let names: Vec<_> = targets.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["iPhone X", "iPad Pro (11-inch)", "iPhone 5s"]);
        assert_eq!(targets[0].sim_identifier, "iPhone-X");
    }

    #[test]
    fn test_parse_device_types_invalid_json() {
        assert!(matches!(
            parse_device_types("not json"),
            Err(SimulatorError::ParseError(_))
        ));
    }
}
