//! Warehouse drivers and the probe that reports which ones are usable.

use std::fmt;
use std::str::FromStr;

/// Database client used to reach the warehouse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarehouseDriver {
    /// Azure Synapse dedicated SQL pool over TDS.
    Synapse,
    /// Local `SQLite` file.
    Sqlite,
}

impl WarehouseDriver {
    /// Returns the configuration name of the driver.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Synapse => "synapse",
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for WarehouseDriver {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Error returned when a driver name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown warehouse driver {0:?} (expected synapse or sqlite)")]
pub struct UnknownDriver(String);

impl FromStr for WarehouseDriver {
    type Err = UnknownDriver;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "synapse" | "mssql" | "sqlserver" => Ok(Self::Synapse),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(UnknownDriver(value.to_owned())),
        }
    }
}

/// Reports the drivers usable in this process, most preferred first.
pub trait DriverProbe: Send + Sync {
    /// Lists the available drivers.
    fn available(&self) -> Vec<WarehouseDriver>;
}

/// Probe reporting the drivers compiled into the binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct CompiledDriverProbe;

impl DriverProbe for CompiledDriverProbe {
    fn available(&self) -> Vec<WarehouseDriver> {
        let mut drivers = Vec::with_capacity(2);
        if cfg!(feature = "synapse") {
            drivers.push(WarehouseDriver::Synapse);
        }
        drivers.push(WarehouseDriver::Sqlite);
        drivers
    }
}

/// Probe returning a fixed list.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StaticDriverProbe(Vec<WarehouseDriver>);

impl StaticDriverProbe {
    /// Creates a probe reporting exactly `drivers`.
    #[must_use]
    pub const fn new(drivers: Vec<WarehouseDriver>) -> Self {
        Self(drivers)
    }

    /// Creates a probe that finds no driver at all.
    #[must_use]
    pub const fn none() -> Self {
        Self(Vec::new())
    }
}

impl DriverProbe for StaticDriverProbe {
    fn available(&self) -> Vec<WarehouseDriver> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{CompiledDriverProbe, DriverProbe, WarehouseDriver};

    #[rstest]
    #[case("synapse", WarehouseDriver::Synapse)]
    #[case(" SQLite ", WarehouseDriver::Sqlite)]
    #[case("mssql", WarehouseDriver::Synapse)]
    fn parses_driver_names(#[case] input: &str, #[case] expected: WarehouseDriver) {
        assert_eq!(input.parse::<WarehouseDriver>(), Ok(expected));
    }

    #[rstest]
    fn rejects_unknown_driver() {
        let error = "odbc".parse::<WarehouseDriver>().expect_err("odbc is not a driver");
        assert!(error.to_string().contains("odbc"));
    }

    #[rstest]
    fn compiled_probe_always_offers_sqlite_last() {
        let drivers = CompiledDriverProbe.available();

        assert_eq!(drivers.last(), Some(&WarehouseDriver::Sqlite));
        assert_eq!(
            drivers.contains(&WarehouseDriver::Synapse),
            cfg!(feature = "synapse")
        );
    }
}
