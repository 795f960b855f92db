//! Qualified device names and identifier syntax
//!
//! A qualified device name has the form `vendor/class=name`, for example
//! `nvidia.com/gpu=0`. The vendor/class pair is the specification's kind.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
    #[error("missing '/' between vendor and class in {0:?}")]
    MissingVendor(String),
    #[error("missing '=' between class and device name in {0:?}")]
    MissingDevice(String),
    #[error("invalid vendor {0:?}: {1}")]
    InvalidVendor(String, &'static str),
    #[error("invalid class {0:?}: {1}")]
    InvalidClass(String, &'static str),
    #[error("invalid device name {0:?}: {1}")]
    InvalidDevice(String, &'static str),
}

/// Globally unique identifier of a device: `vendor/class=name`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QualifiedName {
    vendor: String,
    class: String,
    name: String,
}

impl QualifiedName {
    /// Build a qualified name, checking each component
    pub fn new(vendor: &str, class: &str, name: &str) -> Result<Self, NameError> {
        validate_vendor(vendor)?;
        validate_class(class)?;
        validate_device_name(name)?;
        Ok(Self {
            vendor: vendor.to_string(),
            class: class.to_string(),
            name: name.to_string(),
        })
    }

    /// Parse `vendor/class=name`
    pub fn parse(s: &str) -> Result<Self, NameError> {
        let (kind, name) = s
            .split_once('=')
            .ok_or_else(|| NameError::MissingDevice(s.to_string()))?;
        let (vendor, class) = kind
            .split_once('/')
            .ok_or_else(|| NameError::MissingVendor(s.to_string()))?;
        Self::new(vendor, class, name)
    }

    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The `vendor/class` part
    pub fn kind(&self) -> String {
        format!("{}/{}", self.vendor, self.class)
    }

    fn rendered_chars(&self) -> impl Iterator<Item = char> + '_ {
        self.vendor
            .chars()
            .chain(['/'])
            .chain(self.class.chars())
            .chain(['='])
            .chain(self.name.chars())
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}={}", self.vendor, self.class, self.name)
    }
}

// Ordered by the rendered `vendor/class=name` string, not field by field.
impl Ord for QualifiedName {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rendered_chars().cmp(other.rendered_chars())
    }
}

impl PartialOrd for QualifiedName {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for QualifiedName {
    type Err = NameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for QualifiedName {
    type Error = NameError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<QualifiedName> for String {
    fn from(name: QualifiedName) -> Self {
        name.to_string()
    }
}

/// Split a `vendor/class` kind into its parts
pub fn parse_kind(kind: &str) -> Result<(String, String), NameError> {
    let (vendor, class) = kind
        .split_once('/')
        .ok_or_else(|| NameError::MissingVendor(kind.to_string()))?;
    validate_vendor(vendor)?;
    validate_class(class)?;
    Ok((vendor.to_string(), class.to_string()))
}

/// Vendor: letter first, then alphanumerics or `-_.`, ending alphanumeric
pub fn validate_vendor(vendor: &str) -> Result<(), NameError> {
    check_ident(vendor, |c| matches!(c, '-' | '_' | '.'), true)
        .map_err(|reason| NameError::InvalidVendor(vendor.to_string(), reason))
}

/// Class: letter first, then alphanumerics or `-_`, ending alphanumeric
pub fn validate_class(class: &str) -> Result<(), NameError> {
    check_ident(class, |c| matches!(c, '-' | '_'), true)
        .map_err(|reason| NameError::InvalidClass(class.to_string(), reason))
}

/// Device name: alphanumerics or `-_.:`, starting and ending alphanumeric
pub fn validate_device_name(name: &str) -> Result<(), NameError> {
    check_ident(name, |c| matches!(c, '-' | '_' | '.' | ':'), false)
        .map_err(|reason| NameError::InvalidDevice(name.to_string(), reason))
}

fn check_ident(
    s: &str,
    allowed_punct: impl Fn(char) -> bool,
    letter_first: bool,
) -> Result<(), &'static str> {
    let first = s.chars().next().ok_or("empty")?;
    if letter_first && !first.is_ascii_alphabetic() {
        return Err("must start with a letter");
    }
    if !first.is_ascii_alphanumeric() {
        return Err("must start with a letter or digit");
    }
    if let Some(last) = s.chars().last() {
        if !last.is_ascii_alphanumeric() {
            return Err("must end with a letter or digit");
        }
    }
    if s.chars().any(|c| !c.is_ascii_alphanumeric() && !allowed_punct(c)) {
        return Err("contains invalid characters");
    }
    Ok(())
}
